//! Final-score aggregation: the arithmetic mean of per-question overall
//! scores, rounded to one decimal place. 0.0 means "no answers recorded".

/// Inputs are guaranteed in 1–10 by the evaluator and fallback scorer, so the
/// result is always 0.0 or within [1.0, 10.0].
pub fn final_score(overalls: &[u8]) -> f64 {
    if overalls.is_empty() {
        return 0.0;
    }
    let sum: u32 = overalls.iter().map(|&s| u32::from(s)).sum();
    let mean = f64::from(sum) / overalls.len() as f64;
    (mean * 10.0).round() / 10.0
}
