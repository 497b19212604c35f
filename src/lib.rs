pub mod api;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use datasource::{BitqueryDataSource, CallRecord, DataSource, DataSourceError, MockDataSource, VolumeSource};
pub use domain::{
    LiquidityDelta, Position, PriceBin, Recommendation, RecommendationBand, RecommendationMetadata,
    SummaryPosition,
};
pub use error::AppError;
pub use orchestration::{RecommendationQuery, RecommendationService};
