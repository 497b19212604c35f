//! Ranking of bins by USD-equivalent liquidity and volume enrichment.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::warn;

use crate::datasource::VolumeSource;
use crate::domain::{PriceBin, RecommendationBand};

/// Estimated USD value of a bin: `amount_usdt + amount_weth * mid_price`.
///
/// The bin's own midpoint approximates the volatile token's USD price; no
/// external oracle is consulted. Mid-price is zero unless both bounds are
/// positive.
pub fn band_value(bin: &PriceBin) -> f64 {
    let mid_price = if bin.price_lower > 0.0 && bin.price_upper > 0.0 {
        (bin.price_lower + bin.price_upper) / 2.0
    } else {
        0.0
    };
    bin.amount_usdt + bin.amount_weth * mid_price
}

/// Top `k` bins by descending band value. The sort is stable, so ties keep
/// their original bin order.
pub fn top_bands(bins: &[PriceBin], k: usize) -> Vec<PriceBin> {
    let mut sorted = bins.to_vec();
    sorted.sort_by(|a, b| band_value(b).total_cmp(&band_value(a)));
    sorted.truncate(k);
    sorted
}

/// Select the top `k` bands and, when a volume source is supplied, attach
/// 24-hour trading volume to each band with strictly positive bounds.
///
/// Volume fetches are issued concurrently; a failed fetch records zero
/// volume for that band and never aborts the others.
pub async fn recommend(
    bins: &[PriceBin],
    k: usize,
    volume_source: Option<&dyn VolumeSource>,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<RecommendationBand> {
    let top = top_bands(bins, k);

    let volumes: Vec<Option<f64>> = match volume_source {
        Some(source) => {
            let fetches = top.iter().map(|bin| {
                let (low, high) = (bin.price_lower, bin.price_upper);
                async move {
                    if low > 0.0 && high > 0.0 {
                        match source.fetch_volume(low, high, window_start, window_end).await {
                            Ok(volume) => Some(volume),
                            Err(e) => {
                                warn!(
                                    "Volume fetch failed for band [{}, {}]: {}",
                                    low, high, e
                                );
                                Some(0.0)
                            }
                        }
                    } else {
                        Some(0.0)
                    }
                }
            });
            join_all(fetches).await
        }
        None => vec![None; top.len()],
    };

    top.into_iter()
        .zip(volumes)
        .map(|(bin, trading_volume_24h)| {
            let total_liquidity = band_value(&bin);
            RecommendationBand {
                bin,
                total_liquidity,
                trading_volume_24h,
            }
        })
        .collect()
}
