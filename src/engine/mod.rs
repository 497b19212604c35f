//! Pure computation stages of the liquidity pipeline: tick conversion,
//! outlier filtering, position normalization, binning, and ranking.

pub mod binning;
pub mod normalize;
pub mod outlier;
pub mod recommend;
pub mod ticks;

pub use binning::BinningError;
pub use outlier::OutlierError;
