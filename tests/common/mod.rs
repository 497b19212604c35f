#![allow(dead_code)]

use bandrec::datasource::{CallRecord, DataSource, MockDataSource, VolumeSource};
use bandrec::domain::{USDT_ADDRESS, WETH_ADDRESS};
use bandrec::orchestration::RecommendationService;
use bandrec::Config;
use serde_json::json;
use std::sync::Arc;

pub fn test_config(num_bins: usize, cache_ttl_minutes: i64) -> Config {
    Config {
        port: 0,
        bitquery_api_url: "http://example.invalid".to_string(),
        bitquery_api_key: "test-key".to_string(),
        num_bins,
        cache_ttl_minutes,
        time_range_hours: 240,
        request_timeout_secs: 5,
    }
}

/// A mint call for the tracked pair carrying 1 WETH and 2000 USDT.
pub fn mint_call(nft_id: u64, tick_lower: i32, tick_upper: i32) -> CallRecord {
    mint_call_with_amounts(nft_id, tick_lower, tick_upper, "1000000000000000000", "2000000000")
}

pub fn mint_call_with_amounts(
    nft_id: u64,
    tick_lower: i32,
    tick_upper: i32,
    amount0: &str,
    amount1: &str,
) -> CallRecord {
    serde_json::from_value(json!({
        "Arguments": [
            {"Index": 0, "Name": "token0", "Value": {"address": WETH_ADDRESS}},
            {"Index": 1, "Name": "token1", "Value": {"address": USDT_ADDRESS}},
            {"Index": 2, "Name": "fee", "Value": {"bigInteger": "3000"}},
            {"Index": 3, "Name": "tickLower", "Value": {"bigInteger": tick_lower.to_string()}},
            {"Index": 4, "Name": "tickUpper", "Value": {"bigInteger": tick_upper.to_string()}},
        ],
        "Returns": [
            {"Name": "tokenId", "Value": {"bigInteger": nft_id.to_string()}},
            {"Name": "liquidity", "Value": {"bigInteger": "1"}},
            {"Name": "amount0", "Value": {"bigInteger": amount0}},
            {"Name": "amount1", "Value": {"bigInteger": amount1}},
        ],
        "Call": {"Signature": {"Name": "mint"}},
        "Block": {"Time": "2024-01-01T00:00:00Z"},
    }))
    .unwrap()
}

pub fn liquidity_call(signature: &str, nft_id: u64, amount0: &str, amount1: &str) -> CallRecord {
    serde_json::from_value(json!({
        "Arguments": [
            {"Index": 0, "Name": "tokenId", "Value": {"bigInteger": nft_id.to_string()}},
        ],
        "Returns": [
            {"Name": "liquidity", "Value": {"bigInteger": "1"}},
            {"Name": "amount0", "Value": {"bigInteger": amount0}},
            {"Name": "amount1", "Value": {"bigInteger": amount1}},
        ],
        "Call": {"Signature": {"Name": signature}},
        "Block": {"Time": "2024-01-02T00:00:00Z"},
    }))
    .unwrap()
}

// Ticks whose decimals-adjusted prices land near round USDT-per-WETH
// levels, with WETH in the token0 slot.
pub const TICK_P1000: i32 = -207243;
pub const TICK_P1050: i32 = -206755;
pub const TICK_P1100: i32 = -206290;
pub const TICK_P1150: i32 = -205846;
pub const TICK_P2000: i32 = -200311;
pub const TICK_P2100: i32 = -199823;

/// Three tracked-pair mints whose price ranges are roughly [1000, 1100],
/// [1050, 1150], and [2000, 2100].
pub fn three_band_mints() -> Vec<CallRecord> {
    vec![
        mint_call(1, TICK_P1000, TICK_P1100),
        mint_call(2, TICK_P1050, TICK_P1150),
        mint_call(3, TICK_P2000, TICK_P2100),
    ]
}

pub fn service_with(
    mock: MockDataSource,
    config: Config,
) -> (Arc<MockDataSource>, RecommendationService) {
    let mock = Arc::new(mock);
    let datasource: Arc<dyn DataSource> = mock.clone();
    let volume_source: Arc<dyn VolumeSource> = mock.clone();
    let service = RecommendationService::new(datasource, volume_source, config);
    (mock, service)
}
