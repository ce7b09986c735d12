//! Presentation helpers for distances in metres.

/// Render a distance for display.
///
/// Distances below one kilometre are rounded to whole metres; longer
/// distances use kilometres with two decimals. Non-finite input renders as
/// an em dash placeholder.
///
/// # Examples
///
/// ```
/// use lumigram_core::format_distance;
///
/// assert_eq!(format_distance(12.4), "12 m");
/// assert_eq!(format_distance(1534.0), "1.53 km");
/// assert_eq!(format_distance(f64::NAN), "\u{2014}");
/// ```
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "unit conversion from metres to kilometres"
)]
pub fn format_distance(meters: f64) -> String {
    if !meters.is_finite() {
        return String::from("\u{2014}");
    }
    if meters < 1000.0 {
        return format!("{} m", meters.round());
    }
    format!("{:.2} km", meters / 1000.0)
}

/// Fraction in `[0, 1]` describing how close `distance_m` is to the check-in
/// threshold.
///
/// The value reaches `1.0` once the distance is at or below the threshold and
/// falls off as `threshold / distance` beyond it. A non-finite distance
/// yields `0.0`.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "ratio of two distances")]
pub fn distance_progress(distance_m: f64, threshold_m: f64) -> f64 {
    if !distance_m.is_finite() || threshold_m <= 0.0 {
        return 0.0;
    }
    (threshold_m / distance_m.max(threshold_m)).min(1.0)
}
