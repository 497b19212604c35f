//! Recommendations endpoint.

use crate::api::AppState;
use crate::domain::Recommendation;
use crate::error::AppError;
use crate::orchestration::RecommendationQuery;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::warn;

/// Raw query string parameters. Prices arrive as strings so an empty or
/// unparseable value degrades to "not provided" instead of rejecting the
/// request.
#[derive(Debug, Default, Deserialize)]
pub struct RecommendationsParams {
    pub price_lower: Option<String>,
    pub price_upper: Option<String>,
    pub refresh: Option<String>,
}

pub async fn get_recommendations(
    Query(params): Query<RecommendationsParams>,
    State(state): State<AppState>,
) -> Result<Json<Recommendation>, AppError> {
    let price_lower = parse_price(params.price_lower.as_deref(), "price_lower");
    let price_upper = parse_price(params.price_upper.as_deref(), "price_upper");

    // Reject inverted ranges before touching the cache or upstream.
    if let (Some(lower), Some(upper)) = (price_lower, price_upper) {
        if lower > upper {
            return Err(AppError::BadRequest(
                "Invalid price range: lower price must be less than or equal to upper price"
                    .to_string(),
            ));
        }
    }

    let use_cache = params.refresh.as_deref() != Some("true");

    let recommendation = state
        .service
        .get_recommendations(RecommendationQuery {
            price_lower,
            price_upper,
            use_cache,
        })
        .await?;

    Ok(Json(recommendation))
}

fn parse_price(raw: Option<&str>, field: &str) -> Option<f64> {
    let raw = raw.filter(|s| !s.is_empty())?;
    match raw.parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Invalid {} value: {}", field, raw);
            None
        }
    }
}
