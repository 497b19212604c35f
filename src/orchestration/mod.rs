pub mod service;

pub use service::{filter_bins_by_price_range, RecommendationQuery, RecommendationService, ServiceError};
