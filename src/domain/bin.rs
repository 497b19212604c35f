//! Price bins and the ranked bands derived from them.

use serde::{Deserialize, Serialize};

/// One contiguous price band accumulating liquidity from overlapping
/// positions. Bins within a run are contiguous and equal-width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBin {
    pub bin_index: usize,
    pub price_lower: f64,
    pub price_upper: f64,
    pub amount_weth: f64,
    pub amount_usdt: f64,
    /// Number of positions overlapping this bin. A position counts once per
    /// bin it touches, regardless of how small the overlap is.
    pub count_nfts: u32,
}

impl PriceBin {
    pub fn new(bin_index: usize, price_lower: f64, price_upper: f64) -> Self {
        Self {
            bin_index,
            price_lower,
            price_upper,
            amount_weth: 0.0,
            amount_usdt: 0.0,
            count_nfts: 0,
        }
    }
}

/// A bin selected for recommendation, augmented with its USD-equivalent
/// value and optionally recent trading volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationBand {
    #[serde(flatten)]
    pub bin: PriceBin,
    pub total_liquidity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trading_volume_24h: Option<f64>,
}
