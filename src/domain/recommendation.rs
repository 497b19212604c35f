//! The JSON response shape served by the recommendations endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bin::RecommendationBand;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub top_liquidity_bands: Vec<RecommendationBand>,
    pub metadata: RecommendationMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationMetadata {
    pub total_positions: usize,
    pub total_bins: usize,
    pub bins_with_positions: usize,
    pub analysis_date: DateTime<Utc>,
    pub time_range_hours: i64,
    pub cache_timestamp: DateTime<Utc>,
    pub price_filter_lower: Option<f64>,
    pub price_filter_upper: Option<f64>,
}
