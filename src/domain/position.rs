//! Position records reconstructed from mint and liquidity-change calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tokens::{normalize_address, WETH_ADDRESS};

/// A liquidity position created by a mint call.
///
/// Carries both the decimals-naive prices (`1.0001^tick`) and the
/// decimals-adjusted prices used by the rest of the pipeline. Never mutated
/// after extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub nft_id: u64,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub timestamp: DateTime<Utc>,
    /// Lowercased token0 address.
    pub token0: String,
    /// Lowercased token1 address.
    pub token1: String,
    pub price_lower: f64,
    pub price_upper: f64,
    pub price_lower_adjusted: f64,
    pub price_upper_adjusted: f64,
    /// Raw token0 amount in smallest units. Raw 18-decimal amounts exceed
    /// u64, hence i128.
    pub amount0: Option<i128>,
    /// Raw token1 amount in smallest units.
    pub amount1: Option<i128>,
    pub amount_weth: Option<f64>,
    pub amount_usdt: Option<f64>,
}

impl Position {
    /// Whether WETH occupies the token0 slot of the pair.
    pub fn is_weth_token0(&self) -> bool {
        self.token0 == normalize_address(WETH_ADDRESS)
    }
}

/// Net liquidity change folded over all increase/decrease calls for one
/// position identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LiquidityDelta {
    /// Number of increase/decrease events seen, regardless of direction.
    pub count: u32,
    /// Signed net raw token0 amount: increases add, decreases subtract.
    pub total_amount0: i128,
    /// Signed net raw token1 amount.
    pub total_amount1: i128,
}

/// A mint position merged with its net liquidity delta.
///
/// Price bounds are always the mint-time bounds; deltas only move amounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryPosition {
    pub nft_id: u64,
    pub create_time: DateTime<Utc>,
    /// 1 for the mint plus one per liquidity-change event.
    pub number_of_positions: u32,
    pub price_lower: f64,
    pub price_upper: f64,
    pub amount_weth: f64,
    pub amount_usdt: f64,
}
