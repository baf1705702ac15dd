//! Numeric primitives shared by the binning and threshold engines (STAT).

use crate::sentinel::{INVALID, USTAR_THRESHOLD_NOT_FOUND, is_valid};

/// Mean of `count` consecutive elements of `values` starting at `index`.
/// Returns [`INVALID`] if the window runs past the end of the slice or
/// any element in it is invalid; returns `0.0` if `index` is already out
/// of range (mirrors the degenerate "empty window" case).
pub fn meanws(values: &[f64], index: usize, count: usize) -> f64 {
    if index >= values.len() {
        return 0.0;
    }
    let end = index + count;
    if end > values.len() {
        return INVALID;
    }
    let window = &values[index..end];
    if window.iter().any(|v| !is_valid(*v) || v.is_nan()) {
        return INVALID;
    }
    window.iter().sum::<f64>() / count as f64
}

/// Pearson correlation coefficient of `xs` against `ys` over
/// `[start, end)`. Returns [`INVALID`] if either series holds an
/// invalid element in the window or the result is NaN (zero variance
/// on either side).
pub fn correlation(xs: &[f64], ys: &[f64], start: usize, end: usize) -> f64 {
    let window_x = &xs[start..end];
    let window_y = &ys[start..end];
    if window_x.iter().chain(window_y.iter()).any(|v| !is_valid(*v) || v.is_nan()) {
        return INVALID;
    }

    let n = (end - start) as f64;
    let mean_x = window_x.iter().sum::<f64>() / n;
    let mean_y = window_y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in window_x.iter().zip(window_y.iter()) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let r = cov / (var_x.sqrt() * var_y.sqrt());
    if r.is_nan() { INVALID } else { r }
}

/// Median of the values that are neither [`INVALID`] nor the
/// [`USTAR_THRESHOLD_NOT_FOUND`] marker. Returns [`INVALID`] if nothing
/// qualifies.
pub fn median_filtered(values: &[f64]) -> f64 {
    let mut filtered: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| is_valid(*v) && (*v - USTAR_THRESHOLD_NOT_FOUND).abs() > 1e-7)
        .collect();
    if filtered.is_empty() {
        return INVALID;
    }
    filtered.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = filtered.len();
    if n % 2 == 0 {
        (filtered[n / 2 - 1] + filtered[n / 2]) / 2.0
    } else {
        filtered[n / 2]
    }
}

/// Rank-based percentile of a value already known to be sorted
/// ascending. `p` is in `0..=100`; index = `ceil(p*N/100) - 1`, clamped
/// to the slice. No interpolation between ranks.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return INVALID;
    }
    let n = sorted.len() as f64;
    let rank = (p * n / 100.0).ceil() as i64 - 1;
    let index = rank.clamp(0, sorted.len() as i64 - 1) as usize;
    sorted[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meanws_out_of_range_index_is_zero() {
        assert_eq!(meanws(&[1.0, 2.0], 5, 1), 0.0);
    }

    #[test]
    fn meanws_window_past_end_is_invalid() {
        assert_eq!(meanws(&[1.0, 2.0], 1, 5), INVALID);
    }

    #[test]
    fn meanws_any_invalid_element_is_invalid() {
        assert_eq!(meanws(&[1.0, INVALID, 3.0], 0, 3), INVALID);
    }

    #[test]
    fn meanws_simple_average() {
        assert_eq!(meanws(&[2.0, 4.0, 6.0], 0, 3), 4.0);
    }

    #[test]
    fn correlation_perfect_positive() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, 4.0, 6.0, 8.0];
        assert!((correlation(&xs, &ys, 0, 4) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn correlation_constant_series_is_invalid() {
        let xs = [1.0, 1.0, 1.0];
        let ys = [1.0, 2.0, 3.0];
        assert_eq!(correlation(&xs, &ys, 0, 3), INVALID);
    }

    #[test]
    fn correlation_invalid_element_propagates() {
        let xs = [1.0, INVALID, 3.0];
        let ys = [1.0, 2.0, 3.0];
        assert_eq!(correlation(&xs, &ys, 0, 3), INVALID);
    }

    #[test]
    fn median_filtered_excludes_sentinels() {
        let values = [1.0, USTAR_THRESHOLD_NOT_FOUND, INVALID, 3.0, 5.0];
        assert_eq!(median_filtered(&values), 3.0);
    }

    #[test]
    fn median_filtered_even_count_averages() {
        assert_eq!(median_filtered(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    }

    #[test]
    fn median_filtered_empty_is_invalid() {
        assert_eq!(median_filtered(&[INVALID, USTAR_THRESHOLD_NOT_FOUND]), INVALID);
    }

    #[test]
    fn percentile_median_of_five() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&sorted, 50.0), 3.0);
    }
}
