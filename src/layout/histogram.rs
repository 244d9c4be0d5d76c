use crate::state::HistogramEntry;

#[derive(Debug, Clone, PartialEq)]
pub struct ScaledBar {
    pub server_ref: String,
    pub load_count: u64,
    /// `load_count` over the largest load in the set, in `[0, 1]`.
    pub height_fraction: f64,
    /// `height_fraction * max_bar_height`.
    pub height: f64,
}

/// Sizes one bar per entry against the busiest server. Order is preserved.
pub fn scale(entries: &[HistogramEntry], max_bar_height: f64) -> Vec<ScaledBar> {
    // Floor of 1 keeps an all-idle cluster at zero height.
    let max_observed = entries.iter().map(|e| e.load_count).max().unwrap_or(0).max(1) as f64;
    let max_bar_height = if max_bar_height.is_finite() { max_bar_height.max(0.0) } else { 0.0 };

    entries
        .iter()
        .map(|entry| {
            let height_fraction = entry.load_count as f64 / max_observed;
            ScaledBar {
                server_ref: entry.server_ref.clone(),
                load_count: entry.load_count,
                height_fraction,
                height: height_fraction * max_bar_height,
            }
        })
        .collect()
}
