//! Thumbnail timestamp handling.

/// Parse a time given as seconds (`12.5`) or clock form (`HH:MM:SS[.ms]`, `MM:SS`).
pub fn parse_time(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let mut seconds = 0.0;
    for part in value.split(':') {
        let part: f64 = part.trim().parse().ok()?;
        if !part.is_finite() || part < 0.0 {
            return None;
        }
        seconds = seconds * 60.0 + part;
    }
    (value.split(':').count() <= 3).then_some(seconds)
}

/// Resolve a thumbnail timestamp into a seek position FFmpeg accepts.
///
/// Percentages are taken of the input duration; without a known duration they
/// seek to the start.
pub fn resolve_timestamp(timestamp: &str, duration: Option<f64>) -> String {
    let timestamp = timestamp.trim();
    match timestamp.strip_suffix('%') {
        Some(pct) => {
            let fraction = pct.trim().parse::<f64>().unwrap_or(0.0).clamp(0.0, 100.0) / 100.0;
            let seconds = duration.map(|d| d * fraction).unwrap_or(0.0);
            format!("{:.3}", seconds)
        }
        None => timestamp.to_string(),
    }
}
