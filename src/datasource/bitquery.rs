//! Bitquery GraphQL client implementation.

use super::{CallRecord, DataSource, DataSourceError, VolumeSource};
use crate::config::Config;
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Uniswap v3 NonfungiblePositionManager contract, the target of mint and
/// increase/decrease-liquidity calls.
const POSITION_MANAGER: &str = "0xC36442b4a4522E871399CD717aBDD847Ab11FE88";

const ABI_VALUE_FRAGMENT: &str = r#"
        Value {
          ... on EVM_ABI_Address_Value_Arg {
            address
          }
          ... on EVM_ABI_BigInt_Value_Arg {
            bigInteger
          }
          ... on EVM_ABI_Bytes_Value_Arg {
            hex
          }
          ... on EVM_ABI_Boolean_Value_Arg {
            bool
          }
          ... on EVM_ABI_String_Value_Arg {
            string
          }
          ... on EVM_ABI_Integer_Value_Arg {
            integer
          }
        }
"#;

fn mint_positions_query() -> String {
    format!(
        r#"query Positions($startDate: DateTime!, $endDate: DateTime!) {{
  EVM(dataset: archive, network: eth) {{
    Calls(
      where: {{Call: {{Signature: {{Name: {{is: "mint"}}}}, To: {{is: "{manager}"}}}}, Arguments: {{includes: {{Value: {{Address: {{in: ["{weth}", "{usdt}"]}}}}}}}}, Block: {{Time: {{since: $startDate, till: $endDate}}}}}}
      limit: {{count: 10000}}
      orderBy: {{descending: Block_Number}}
    ) {{
      Arguments {{
        Index
        Name
        Type
{values}
      }}
      Call {{
        Signature {{
          Name
        }}
      }}
      Transaction {{
        Time
      }}
      Block {{
        Number
        Time
      }}
      Returns {{
        Name
        Type
{values}
      }}
    }}
  }}
}}"#,
        manager = POSITION_MANAGER,
        weth = crate::domain::WETH_ADDRESS,
        usdt = crate::domain::USDT_ADDRESS,
        values = ABI_VALUE_FRAGMENT,
    )
}

fn liquidity_calls_query() -> String {
    format!(
        r#"query LiquidityCalls($nftIds: [String!], $startDate: DateTime!, $endDate: DateTime!) {{
  EVM(dataset: archive, network: eth) {{
    Calls(
      orderBy: {{descending: Block_Number}}
      where: {{
        Call: {{
          Signature: {{Name: {{in: ["increaseLiquidity", "decreaseLiquidity"]}}}}
          To: {{is: "{manager}"}}
        }}
        Arguments: {{includes: {{Value: {{BigInteger: {{in: $nftIds}}}}}}}}
        Block: {{Time: {{since: $startDate, till: $endDate}}}}
      }}
      limit: {{count: 10000}}
    ) {{
      Arguments {{
        Index
        Name
        Type
{values}
      }}
      Call {{
        Signature {{
          Name
        }}
      }}
      Transaction {{
        Time
      }}
      Block {{
        Number
        Time
      }}
      Returns {{
        Name
        Type
{values}
      }}
    }}
  }}
}}"#,
        manager = POSITION_MANAGER,
        values = ABI_VALUE_FRAGMENT,
    )
}

fn trading_volume_query() -> String {
    format!(
        r#"query TradingVolume($priceLow: Float, $priceHigh: Float, $startDate: DateTime!, $endDate: DateTime!) {{
  EVM(network: eth, dataset: archive) {{
    DEXTradeByTokens(
      where: {{
        Trade: {{
          Currency: {{SmartContract: {{is: "{weth}"}}}}
          Side: {{Currency: {{SmartContract: {{is: "{usdt}"}}}}}}
          Dex: {{ProtocolFamily: {{is: "Uniswap"}}}}
          PriceInUSD: {{ge: $priceLow, le: $priceHigh}}
        }}
        Block: {{Time: {{since: $startDate, till: $endDate}}}}
        TransactionStatus: {{Success: true}}
      }}
    ) {{
      volume: sum(of: Trade_AmountInUSD)
    }}
  }}
}}"#,
        weth = crate::domain::WETH_ADDRESS,
        usdt = crate::domain::USDT_ADDRESS,
    )
}

/// Data source backed by the Bitquery streaming GraphQL API.
#[derive(Debug, Clone)]
pub struct BitqueryDataSource {
    client: Client,
    url: String,
    api_key: String,
    request_timeout: Duration,
}

#[derive(Deserialize)]
struct CallsEnvelope {
    data: Option<CallsData>,
}

#[derive(Deserialize)]
struct CallsData {
    #[serde(rename = "EVM")]
    evm: Option<CallsEvm>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CallsEvm {
    #[serde(rename = "Calls")]
    calls: Vec<CallRecord>,
}

#[derive(Deserialize)]
struct VolumeEnvelope {
    data: Option<VolumeData>,
}

#[derive(Deserialize)]
struct VolumeData {
    #[serde(rename = "EVM")]
    evm: Option<VolumeEvm>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct VolumeEvm {
    #[serde(rename = "DEXTradeByTokens")]
    trades: Vec<VolumeRow>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct VolumeRow {
    volume: Option<serde_json::Value>,
}

impl BitqueryDataSource {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            url: config.bitquery_api_url.clone(),
            api_key: config.bitquery_api_key.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    async fn post_graphql(
        &self,
        query: String,
        variables: serde_json::Value,
    ) -> Result<serde_json::Value, DataSourceError> {
        let payload = serde_json::json!({
            "query": query,
            "variables": variables,
        });

        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(60)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .timeout(self.request_timeout)
                .json(&payload)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(DataSourceError::Network(e.to_string())))?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(DataSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(DataSourceError::Http {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(DataSourceError::Http {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(DataSourceError::Parse(e.to_string())))
        })
        .await
    }

    fn parse_calls(value: serde_json::Value) -> Result<Vec<CallRecord>, DataSourceError> {
        let envelope: CallsEnvelope =
            serde_json::from_value(value).map_err(|e| DataSourceError::Parse(e.to_string()))?;
        Ok(envelope
            .data
            .and_then(|d| d.evm)
            .map(|evm| evm.calls)
            .unwrap_or_default())
    }
}

#[async_trait]
impl DataSource for BitqueryDataSource {
    async fn fetch_mint_calls(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CallRecord>, DataSourceError> {
        debug!("Fetching mint calls from {} to {}", start, end);

        let variables = serde_json::json!({
            "startDate": format_datetime(start),
            "endDate": format_datetime(end),
        });

        let response = self.post_graphql(mint_positions_query(), variables).await?;
        Self::parse_calls(response)
    }

    async fn fetch_liquidity_calls(
        &self,
        nft_ids: &[u64],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CallRecord>, DataSourceError> {
        debug!(
            "Fetching liquidity calls for {} position ids from {} to {}",
            nft_ids.len(),
            start,
            end
        );

        let ids: Vec<String> = nft_ids.iter().map(|id| id.to_string()).collect();
        let variables = serde_json::json!({
            "nftIds": ids,
            "startDate": format_datetime(start),
            "endDate": format_datetime(end),
        });

        let response = self.post_graphql(liquidity_calls_query(), variables).await?;
        Self::parse_calls(response)
    }
}

#[async_trait]
impl VolumeSource for BitqueryDataSource {
    async fn fetch_volume(
        &self,
        price_low: f64,
        price_high: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<f64, DataSourceError> {
        debug!(
            "Fetching trading volume for price range [{}, {}]",
            price_low, price_high
        );

        let variables = serde_json::json!({
            "priceLow": price_low.to_string(),
            "priceHigh": price_high.to_string(),
            "startDate": format_datetime(start),
            "endDate": format_datetime(end),
        });

        let response = self.post_graphql(trading_volume_query(), variables).await?;
        let envelope: VolumeEnvelope =
            serde_json::from_value(response).map_err(|e| DataSourceError::Parse(e.to_string()))?;

        Ok(parse_volume(&envelope))
    }
}

fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// The aggregate comes back as a string in practice, but the schema allows a
/// number; missing or unparseable values count as zero volume.
fn parse_volume(envelope: &VolumeEnvelope) -> f64 {
    envelope
        .data
        .as_ref()
        .and_then(|d| d.evm.as_ref())
        .and_then(|evm| evm.trades.first())
        .and_then(|row| row.volume.as_ref())
        .and_then(|v| match v {
            serde_json::Value::String(s) => s.parse::<f64>().ok(),
            other => other.as_f64(),
        })
        .unwrap_or(0.0)
}
