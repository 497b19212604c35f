//! Cache-backed recommendation service orchestrating the pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::datasource::{DataSource, VolumeSource};
use crate::domain::{PriceBin, Recommendation, RecommendationMetadata};
use crate::engine::outlier::{MAX_REASONABLE_PRICE, MIN_REASONABLE_PRICE};
use crate::engine::{binning, normalize, recommend};

/// Bands returned for an unfiltered request.
const TOP_BANDS_UNFILTERED: usize = 5;
/// Bands returned when a price filter is active.
const TOP_BANDS_FILTERED: usize = 3;
/// Volume lookback for band enrichment.
const VOLUME_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The mint-position fetch failed; fatal to the current refresh.
    #[error("error fetching mint positions: {0}")]
    Fetch(String),
    /// Upstream was reachable but produced nothing usable.
    #[error("{0}")]
    NoData(String),
}

/// Query parameters resolved at the API boundary.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationQuery {
    pub price_lower: Option<f64>,
    pub price_upper: Option<f64>,
    /// False when the caller requested a cache bypass. Only honored for
    /// unfiltered requests.
    pub use_cache: bool,
}

impl RecommendationQuery {
    fn has_filters(&self) -> bool {
        self.price_lower.is_some() || self.price_upper.is_some()
    }
}

/// Immutable result of one full refresh. Readers always observe a complete
/// snapshot; refreshes publish a new one atomically.
struct CacheSnapshot {
    /// Unfiltered bins, kept for price-filtered re-ranking.
    bins: Vec<PriceBin>,
    /// Full unfiltered recommendation. None when the refresh that produced
    /// this snapshot served a filtered request; filtered results are never
    /// cached.
    recommendation: Option<Recommendation>,
    total_positions: usize,
    created_at: DateTime<Utc>,
}

pub struct RecommendationService {
    datasource: Arc<dyn DataSource>,
    volume_source: Arc<dyn VolumeSource>,
    config: Config,
    cache: RwLock<Option<Arc<CacheSnapshot>>>,
    /// Serializes full refreshes so concurrent writers cannot interleave
    /// bins and timestamps from different runs.
    refresh_lock: Mutex<()>,
}

impl RecommendationService {
    pub fn new(
        datasource: Arc<dyn DataSource>,
        volume_source: Arc<dyn VolumeSource>,
        config: Config,
    ) -> Self {
        Self {
            datasource,
            volume_source,
            config,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Serve a recommendation, reusing cached state where the query allows.
    pub async fn get_recommendations(
        &self,
        query: RecommendationQuery,
    ) -> Result<Recommendation, ServiceError> {
        if query.has_filters() {
            info!(
                "Price filters active (lower={:?}, upper={:?})",
                query.price_lower, query.price_upper
            );
            if let Some(snapshot) = self.warm_snapshot().await {
                info!("Serving filtered recommendation from cached bins");
                return Ok(self.recommend_from_snapshot(&snapshot, &query).await);
            }
            info!("No warm cached bins, falling through to full refresh");
        } else if query.use_cache {
            if let Some(recommendation) = self.warm_full_recommendation().await {
                info!("Serving full recommendation from cache");
                return Ok(recommendation);
            }
            info!("Cache miss for full recommendation");
        } else {
            info!("Cache bypass requested");
        }

        let _guard = self.refresh_lock.lock().await;

        // Another writer may have completed a refresh while this request
        // waited on the guard; serve its snapshot instead of refetching.
        if query.has_filters() {
            if let Some(snapshot) = self.warm_snapshot().await {
                return Ok(self.recommend_from_snapshot(&snapshot, &query).await);
            }
        } else if query.use_cache {
            if let Some(recommendation) = self.warm_full_recommendation().await {
                return Ok(recommendation);
            }
        }

        self.refresh(&query).await
    }

    /// The cached snapshot when it is younger than the TTL.
    async fn warm_snapshot(&self) -> Option<Arc<CacheSnapshot>> {
        let snapshot = self.cache.read().await.clone()?;
        let age = Utc::now() - snapshot.created_at;
        if age < Duration::minutes(self.config.cache_ttl_minutes) {
            Some(snapshot)
        } else {
            info!(
                "Cache expired (age: {:.2} minutes)",
                age.num_seconds() as f64 / 60.0
            );
            None
        }
    }

    async fn warm_full_recommendation(&self) -> Option<Recommendation> {
        self.warm_snapshot()
            .await
            .and_then(|s| s.recommendation.clone())
    }

    /// Re-rank cached bins under the query's price filter. No upstream
    /// fetch happens here beyond per-band volume enrichment.
    async fn recommend_from_snapshot(
        &self,
        snapshot: &CacheSnapshot,
        query: &RecommendationQuery,
    ) -> Recommendation {
        let bins =
            filter_bins_by_price_range(&snapshot.bins, query.price_lower, query.price_upper);
        info!("Filtered to {} bins matching price range", bins.len());

        let (volume_start, volume_end) = volume_window();
        let bands = recommend::recommend(
            &bins,
            TOP_BANDS_FILTERED,
            Some(self.volume_source.as_ref()),
            volume_start,
            volume_end,
        )
        .await;

        Recommendation {
            top_liquidity_bands: bands,
            metadata: self.metadata(&bins, snapshot.total_positions, snapshot.created_at, query),
        }
    }

    /// Full fetch-and-compute cycle. Publishes a fresh snapshot; the full
    /// recommendation is cached only for unfiltered requests.
    async fn refresh(&self, query: &RecommendationQuery) -> Result<Recommendation, ServiceError> {
        info!("Fetching new data from upstream");
        let end = Utc::now();
        let start = end - Duration::hours(self.config.time_range_hours);

        let mint_calls = self
            .datasource
            .fetch_mint_calls(start, end)
            .await
            .map_err(|e| {
                error!("Mint position fetch failed: {}", e);
                ServiceError::Fetch(e.to_string())
            })?;

        let positions = normalize::extract_positions(&mint_calls);
        if positions.is_empty() {
            return Err(ServiceError::NoData("no mint positions found".to_string()));
        }
        info!("Parsed {} mint positions", positions.len());

        let nft_ids: Vec<u64> = positions.iter().map(|p| p.nft_id).collect();
        let deltas = match self
            .datasource
            .fetch_liquidity_calls(&nft_ids, start, end)
            .await
        {
            Ok(calls) => normalize::fold_liquidity_deltas(&calls),
            Err(e) => {
                // Non-fatal: positions fall back to their mint-only amounts.
                warn!("Liquidity event fetch failed, using empty deltas: {}", e);
                HashMap::new()
            }
        };

        let summary = normalize::build_summary(&positions, &deltas);
        let bins = binning::aggregate(
            summary,
            self.config.num_bins,
            MIN_REASONABLE_PRICE,
            MAX_REASONABLE_PRICE,
        )
        .map_err(|e| ServiceError::NoData(e.to_string()))?;

        let created_at = Utc::now();
        let total_positions = positions.len();

        let (selected, top_n) = if query.has_filters() {
            let filtered =
                filter_bins_by_price_range(&bins, query.price_lower, query.price_upper);
            info!("Filtered to {} bins matching price range", filtered.len());
            (filtered, TOP_BANDS_FILTERED)
        } else {
            (bins.clone(), TOP_BANDS_UNFILTERED)
        };

        let (volume_start, volume_end) = volume_window();
        let bands = recommend::recommend(
            &selected,
            top_n,
            Some(self.volume_source.as_ref()),
            volume_start,
            volume_end,
        )
        .await;

        let recommendation = Recommendation {
            top_liquidity_bands: bands,
            metadata: self.metadata(&selected, total_positions, created_at, query),
        };

        let snapshot = Arc::new(CacheSnapshot {
            bins,
            recommendation: (!query.has_filters()).then(|| recommendation.clone()),
            total_positions,
            created_at,
        });
        *self.cache.write().await = Some(snapshot);
        info!("Refresh complete, snapshot cached");

        Ok(recommendation)
    }

    fn metadata(
        &self,
        bins: &[PriceBin],
        total_positions: usize,
        cache_timestamp: DateTime<Utc>,
        query: &RecommendationQuery,
    ) -> RecommendationMetadata {
        RecommendationMetadata {
            total_positions,
            total_bins: bins.len(),
            bins_with_positions: bins.iter().filter(|b| b.count_nfts > 0).count(),
            analysis_date: Utc::now(),
            time_range_hours: self.config.time_range_hours,
            cache_timestamp,
            price_filter_lower: query.price_lower,
            price_filter_upper: query.price_upper,
        }
    }
}

fn volume_window() -> (DateTime<Utc>, DateTime<Utc>) {
    let end = Utc::now();
    (end - Duration::hours(VOLUME_WINDOW_HOURS), end)
}

/// Keep bins overlapping the requested range. With only one bound given the
/// other side is open.
pub fn filter_bins_by_price_range(
    bins: &[PriceBin],
    price_lower: Option<f64>,
    price_upper: Option<f64>,
) -> Vec<PriceBin> {
    bins.iter()
        .filter(|bin| match (price_lower, price_upper) {
            (Some(lower), Some(upper)) => bin.price_lower <= upper && bin.price_upper >= lower,
            (Some(lower), None) => bin.price_upper >= lower,
            (None, Some(upper)) => bin.price_lower <= upper,
            (None, None) => true,
        })
        .cloned()
        .collect()
}
