//! Data source abstraction for fetching on-chain call records and trade
//! volume from the external GraphQL service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod bitquery;
pub mod mock;

pub use bitquery::BitqueryDataSource;
pub use mock::MockDataSource;

use async_trait::async_trait;

/// Source of raw mint and liquidity-change call records.
///
/// Implementations must treat any non-success upstream status as an error;
/// the caller decides which fetches are fatal.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch mint calls for the tracked pair within a time window.
    async fn fetch_mint_calls(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CallRecord>, DataSourceError>;

    /// Fetch increase/decrease-liquidity calls for a set of position
    /// identifiers within a time window.
    async fn fetch_liquidity_calls(
        &self,
        nft_ids: &[u64],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CallRecord>, DataSourceError>;
}

/// Injected capability for fetching aggregated trade volume over a price
/// interval and time window.
#[async_trait]
pub trait VolumeSource: Send + Sync {
    async fn fetch_volume(
        &self,
        price_low: f64,
        price_high: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<f64, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone, Error)]
pub enum DataSourceError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Rate limited")]
    RateLimited,
}

/// One call record as returned by the GraphQL source: ordered argument and
/// return-value lists plus block/transaction timestamps.
///
/// Parsed into this tagged shape at the boundary so the pipeline never
/// touches untyped key-value maps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CallRecord {
    #[serde(rename = "Arguments")]
    pub arguments: Vec<CallArgument>,
    #[serde(rename = "Returns")]
    pub returns: Vec<CallReturn>,
    #[serde(rename = "Call")]
    pub call: Option<CallInfo>,
    #[serde(rename = "Block")]
    pub block: Option<BlockInfo>,
    #[serde(rename = "Transaction")]
    pub transaction: Option<TransactionInfo>,
}

impl CallRecord {
    /// The call's signature name, e.g. "mint" or "increaseLiquidity".
    pub fn signature_name(&self) -> Option<&str> {
        self.call
            .as_ref()
            .and_then(|c| c.signature.as_ref())
            .and_then(|s| s.name.as_deref())
    }

    /// Record timestamp, preferring block time over transaction time.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.block
            .as_ref()
            .and_then(|b| b.time)
            .or_else(|| self.transaction.as_ref().and_then(|t| t.time))
    }

    /// Look up an argument by its declared index.
    pub fn argument_at(&self, index: u32) -> Option<&CallArgument> {
        self.arguments.iter().find(|a| a.index == Some(index))
    }

    /// Look up a return value by name.
    pub fn return_named(&self, name: &str) -> Option<&CallReturn> {
        self.returns.iter().find(|r| r.name.as_deref() == Some(name))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CallArgument {
    #[serde(rename = "Index")]
    pub index: Option<u32>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Value")]
    pub value: AbiValue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CallReturn {
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Type")]
    pub type_name: Option<String>,
    #[serde(rename = "Value")]
    pub value: AbiValue,
}

/// A decoded ABI value. The GraphQL schema returns one leg per value kind;
/// absent legs deserialize to None.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AbiValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "bigInteger", skip_serializing_if = "Option::is_none")]
    pub big_integer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hex: Option<String>,
    #[serde(rename = "bool", skip_serializing_if = "Option::is_none")]
    pub boolean: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integer: Option<i64>,
}

impl AbiValue {
    pub fn as_address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Parse the bigInteger leg. Raw token amounts exceed u64, so i128.
    pub fn as_big_integer(&self) -> Option<i128> {
        self.big_integer.as_deref().and_then(|s| s.parse().ok())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CallInfo {
    #[serde(rename = "Signature")]
    pub signature: Option<SignatureInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureInfo {
    #[serde(rename = "Name")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockInfo {
    #[serde(rename = "Time")]
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionInfo {
    #[serde(rename = "Time")]
    pub time: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_record_deserializes_graphql_shape() {
        let record: CallRecord = serde_json::from_value(json!({
            "Arguments": [
                {"Index": 0, "Name": "token0", "Value": {"address": "0xabc"}},
                {"Index": 3, "Name": "tickLower", "Value": {"bigInteger": "-100"}}
            ],
            "Returns": [
                {"Name": "tokenId", "Value": {"bigInteger": "42"}}
            ],
            "Call": {"Signature": {"Name": "mint"}},
            "Block": {"Time": "2024-01-01T00:00:00Z"},
            "Transaction": {"Time": "2024-01-01T00:00:05Z"}
        }))
        .unwrap();

        assert_eq!(record.signature_name(), Some("mint"));
        assert_eq!(
            record.argument_at(0).unwrap().value.as_address(),
            Some("0xabc")
        );
        assert_eq!(
            record.argument_at(3).unwrap().value.as_big_integer(),
            Some(-100)
        );
        assert_eq!(
            record.return_named("tokenId").unwrap().value.as_big_integer(),
            Some(42)
        );
    }

    #[test]
    fn test_timestamp_prefers_block_time() {
        let record: CallRecord = serde_json::from_value(json!({
            "Block": {"Time": "2024-01-01T00:00:00Z"},
            "Transaction": {"Time": "2024-06-01T00:00:00Z"}
        }))
        .unwrap();
        assert_eq!(
            record.timestamp().unwrap().to_rfc3339(),
            "2024-01-01T00:00:00+00:00"
        );

        let record: CallRecord = serde_json::from_value(json!({
            "Transaction": {"Time": "2024-06-01T00:00:00Z"}
        }))
        .unwrap();
        assert_eq!(
            record.timestamp().unwrap().to_rfc3339(),
            "2024-06-01T00:00:00+00:00"
        );
    }

    #[test]
    fn test_big_integer_parses_beyond_u64() {
        let value = AbiValue {
            big_integer: Some("1000000000000000000000000".to_string()),
            ..Default::default()
        };
        assert_eq!(value.as_big_integer(), Some(1_000_000_000_000_000_000_000_000));
    }

    #[test]
    fn test_datasource_error_display() {
        let err = DataSourceError::Network("connection timeout".to_string());
        assert_eq!(err.to_string(), "Network error: connection timeout");

        let err = DataSourceError::Http {
            status: 429,
            message: "Too many requests".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error 429: Too many requests");
    }
}
