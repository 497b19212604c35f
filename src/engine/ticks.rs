//! Tick-to-price conversion.

/// Price in tick space: `1.0001^tick`.
///
/// Total over all i32 ticks; extreme ticks yield very large or very small
/// floats and are handled downstream by the outlier filter.
pub fn price_from_tick(tick: i32) -> f64 {
    1.0001_f64.powi(tick)
}

/// Human-scaled price: `1.0001^tick / 10^(decimals1 - decimals0)`.
pub fn price_with_decimals(tick: i32, decimals0: i32, decimals1: i32) -> f64 {
    price_from_tick(tick) / 10_f64.powi(decimals1 - decimals0)
}
