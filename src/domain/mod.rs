//! Domain types for the WETH/USDT liquidity pipeline.

pub mod bin;
pub mod position;
pub mod recommendation;
pub mod tokens;

pub use bin::{PriceBin, RecommendationBand};
pub use position::{LiquidityDelta, Position, SummaryPosition};
pub use recommendation::{Recommendation, RecommendationMetadata};
pub use tokens::{normalize_address, USDT_ADDRESS, USDT_DECIMALS, WETH_ADDRESS, WETH_DECIMALS};
