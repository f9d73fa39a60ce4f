//! Free-form `H:MM` / `H:MM:SS` duration strings.

/// Converts a duration string into fractional minutes.
///
/// Two parts read as `H + M / 60`, three parts as `H * 60 + M + S / 60`.
/// Anything else yields `0.0`; this never fails.
pub fn parse_duration(text: Option<&str>) -> f64 {
    let Some(text) = text else {
        return 0.0;
    };

    let parts: Option<Vec<u64>> = text
        .split(':')
        .map(|part| part.trim().parse::<u64>().ok())
        .collect();

    match parts.as_deref() {
        Some([h, m]) => *h as f64 + *m as f64 / 60.0,
        Some([h, m, s]) => *h as f64 * 60.0 + *m as f64 + *s as f64 / 60.0,
        _ => 0.0,
    }
}
