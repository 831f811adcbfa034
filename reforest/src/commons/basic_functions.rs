/// `part` as a percentage of `total`
///
/// Returns `None` when `total` is zero or not finite, leaving the fallback
/// to the caller.
pub fn percentage(part: f64, total: f64) -> Option<f64> {
    if total.is_finite() && total > 0.0 {
        Some(part / total * 100.0)
    } else {
        None
    }
}

/// Round to two decimals for display
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Normalize a hex color to `#rrggbb`
pub fn hex_color(color: &str) -> String {
    let trimmed = color.trim().trim_start_matches('#');
    format!("#{}", trimmed.to_ascii_lowercase())
}
