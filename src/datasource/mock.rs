//! Mock data source for testing without network calls.

use super::{CallRecord, DataSource, DataSourceError, VolumeSource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Mock data source returning predefined call records and volumes.
///
/// Tracks how many times each fetch was issued so cache tests can assert
/// that no additional upstream call happened.
#[derive(Debug, Default)]
pub struct MockDataSource {
    mint_calls: Vec<CallRecord>,
    liquidity_calls: Vec<CallRecord>,
    volume: f64,
    fail_mints: bool,
    fail_liquidity: bool,
    fail_volume: bool,
    mint_fetches: AtomicUsize,
    liquidity_fetches: AtomicUsize,
    volume_fetches: AtomicUsize,
}

impl MockDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mint_call(mut self, call: CallRecord) -> Self {
        self.mint_calls.push(call);
        self
    }

    pub fn with_mint_calls(mut self, calls: Vec<CallRecord>) -> Self {
        self.mint_calls.extend(calls);
        self
    }

    pub fn with_liquidity_call(mut self, call: CallRecord) -> Self {
        self.liquidity_calls.push(call);
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    /// Make mint fetches fail with an HTTP 500.
    pub fn failing_mints(mut self) -> Self {
        self.fail_mints = true;
        self
    }

    /// Make liquidity fetches fail with an HTTP 500.
    pub fn failing_liquidity(mut self) -> Self {
        self.fail_liquidity = true;
        self
    }

    /// Make volume fetches fail with an HTTP 500.
    pub fn failing_volume(mut self) -> Self {
        self.fail_volume = true;
        self
    }

    pub fn mint_fetch_count(&self) -> usize {
        self.mint_fetches.load(Ordering::SeqCst)
    }

    pub fn liquidity_fetch_count(&self) -> usize {
        self.liquidity_fetches.load(Ordering::SeqCst)
    }

    pub fn volume_fetch_count(&self) -> usize {
        self.volume_fetches.load(Ordering::SeqCst)
    }

    fn server_error() -> DataSourceError {
        DataSourceError::Http {
            status: 500,
            message: "Server error".to_string(),
        }
    }
}

#[async_trait]
impl DataSource for MockDataSource {
    async fn fetch_mint_calls(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<CallRecord>, DataSourceError> {
        self.mint_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_mints {
            return Err(Self::server_error());
        }
        Ok(self.mint_calls.clone())
    }

    async fn fetch_liquidity_calls(
        &self,
        _nft_ids: &[u64],
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<CallRecord>, DataSourceError> {
        self.liquidity_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_liquidity {
            return Err(Self::server_error());
        }
        Ok(self.liquidity_calls.clone())
    }
}

#[async_trait]
impl VolumeSource for MockDataSource {
    async fn fetch_volume(
        &self,
        _price_low: f64,
        _price_high: f64,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<f64, DataSourceError> {
        self.volume_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_volume {
            return Err(Self::server_error());
        }
        Ok(self.volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_canned_calls_and_counts() {
        let mock = MockDataSource::new().with_mint_call(CallRecord::default());
        let calls = mock
            .fetch_mint_calls(Utc::now(), Utc::now())
            .await
            .unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(mock.mint_fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_failing_mints() {
        let mock = MockDataSource::new().failing_mints();
        let result = mock.fetch_mint_calls(Utc::now(), Utc::now()).await;
        assert!(result.is_err());
        assert_eq!(mock.mint_fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_volume() {
        let mock = MockDataSource::new().with_volume(123.0);
        let volume = mock
            .fetch_volume(100.0, 200.0, Utc::now(), Utc::now())
            .await
            .unwrap();
        assert_eq!(volume, 123.0);
        assert_eq!(mock.volume_fetch_count(), 1);
    }
}
