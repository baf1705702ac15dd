//! The six threshold-detection kernels (UST mode kernels).
//!
//! Each kernel walks a u*-class-ordered pair of `(ustar_mean, fx_mean)`
//! arrays looking for the u* class beyond which the mean flux no longer
//! responds to further increases in friction velocity — a plateau. The
//! forward kernels scan from low u* upward; the back kernels scan from
//! a high percentile class downward. Both carry a percentile
//! short-circuit: if the percentile check is enabled and the scan
//! reaches a u*-class at or beyond the configured percentile before a
//! plateau is found by the main rule, that class is accepted directly
//! and marked percentiled.

use crate::sentinel::{INVALID, USTAR_THRESHOLD_NOT_FOUND, is_valid};
use crate::stat::meanws;

/// Outcome of a mode kernel: a threshold found by the plateau rule, one
/// accepted via the percentile short-circuit, a scan that ran to
/// completion without a class qualifying, or too little data to even
/// attempt the scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModeOutcome {
    Plateau(f64),
    Percentiled(f64),
    NotFound,
    Insufficient,
}

impl ModeOutcome {
    pub fn value(self) -> f64 {
        match self {
            ModeOutcome::Plateau(v) | ModeOutcome::Percentiled(v) => v,
            ModeOutcome::NotFound => USTAR_THRESHOLD_NOT_FOUND,
            ModeOutcome::Insufficient => INVALID,
        }
    }

    pub fn is_percentiled(self) -> bool {
        matches!(self, ModeOutcome::Percentiled(_))
    }
}

/// Scans `fx_mean`/`ustar_mean` (length `un`) from the low end.
///
/// At each class `i` in `0..un-n`: if `percentile_check` is on and
/// `ustar_mean[i+n-1] >= percentile_value`, accept that class directly
/// (percentiled). Otherwise compute the forward windowed means
/// `m_j = meanws(fx_mean, i+1+j, window)` for `j in 0..n`; if all are
/// valid and `fx_mean[i+j] >= m_j * threshold_check` for every `j`,
/// accept `ustar_mean[i]`.
#[allow(clippy::too_many_arguments)]
pub fn forward_mode(
    ustar_mean: &[f64],
    fx_mean: &[f64],
    un: usize,
    window: usize,
    n: usize,
    percentile_check: bool,
    percentile_value: f64,
    threshold_check: f64,
) -> ModeOutcome {
    if un < n {
        return ModeOutcome::Insufficient;
    }

    for i in 0..=(un - n) {
        if percentile_check && ustar_mean[i + n - 1] >= percentile_value {
            return ModeOutcome::Percentiled(ustar_mean[i + n - 1]);
        }

        let mut all_pass = true;
        for j in 0..n {
            let m_j = meanws(fx_mean, i + 1 + j, window);
            if !is_valid(m_j) || fx_mean[i + j] < m_j * threshold_check {
                all_pass = false;
                break;
            }
        }
        if all_pass {
            return ModeOutcome::Plateau(ustar_mean[i]);
        }
    }

    ModeOutcome::NotFound
}

/// Scans `fx_mean`/`ustar_mean` (length `un`) from a high percentile
/// class downward. `start = floor(un * percentile_value / 100)`; the
/// loop runs `i = start; i > n; i--` (the upper bound `n` itself is
/// never visited — this mirrors the source kernel's loop condition,
/// preserved as-is per the accompanying design notes). At each `i`,
/// `size = min(un - i, max_window)`; skipped if `size == 0`. Let
/// `m = meanws(fx_mean, i, size)`; if valid and
/// `fx_mean[i-1-j] <= m * threshold_check` for every `j in 0..n`,
/// accept `ustar_mean[i-1]`. If nothing qualifies and
/// `percentile_check` is on, accept `ustar_mean[start]` (percentiled).
#[allow(clippy::too_many_arguments)]
pub fn back_mode(
    ustar_mean: &[f64],
    fx_mean: &[f64],
    un: usize,
    max_window: usize,
    n: usize,
    percentile_check: bool,
    percentile_value: f64,
    threshold_check: f64,
) -> ModeOutcome {
    if un == 0 {
        return ModeOutcome::Insufficient;
    }
    let start = ((un as f64) * percentile_value / 100.0).floor() as usize;
    let start = start.min(un - 1);

    let mut i = start as i64;
    while i > n as i64 {
        let idx = i as usize;
        let size = (un - idx).min(max_window);
        if size == 0 {
            i -= 1;
            continue;
        }
        let m = meanws(fx_mean, idx, size);
        let mut all_pass = is_valid(m);
        if all_pass {
            for j in 0..n {
                if idx < 1 + j {
                    all_pass = false;
                    break;
                }
                let back_idx = idx - 1 - j;
                if fx_mean[back_idx] > m * threshold_check {
                    all_pass = false;
                    break;
                }
            }
        }
        if all_pass {
            return ModeOutcome::Plateau(ustar_mean[idx - 1]);
        }
        i -= 1;
    }

    if percentile_check {
        ModeOutcome::Percentiled(ustar_mean[start])
    } else {
        ModeOutcome::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_mode_finds_plateau() {
        let fx = vec![1.0, 2.0, 3.0, 5.0, 5.1, 5.0, 5.2, 5.0, 5.1, 5.0];
        let ustar = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];
        let outcome = forward_mode(&ustar, &fx, fx.len(), 3, 2, false, 90.0, 1.0);
        match outcome {
            ModeOutcome::Plateau(v) => assert!(v >= 0.3 && v <= 0.5),
            other => panic!("expected a plateau, got {other:?}"),
        }
    }

    #[test]
    fn forward_mode_not_found_on_monotonic_rise() {
        let fx = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let ustar = vec![0.1, 0.2, 0.3, 0.4, 0.5];
        assert_eq!(
            forward_mode(&ustar, &fx, fx.len(), 3, 2, false, 90.0, 1.0),
            ModeOutcome::NotFound
        );
    }

    #[test]
    fn forward_mode_percentile_short_circuit() {
        let fx = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let ustar = vec![0.1, 0.2, 0.3, 0.4, 0.5];
        let outcome = forward_mode(&ustar, &fx, fx.len(), 3, 1, true, 0.2, 1.0);
        assert_eq!(outcome, ModeOutcome::Percentiled(0.2));
    }

    #[test]
    fn back_mode_falls_back_to_percentile_class() {
        let fx = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let ustar = vec![0.1, 0.2, 0.3, 0.4, 0.5];
        let outcome = back_mode(&ustar, &fx, fx.len(), 2, 1, true, 90.0, 1.0);
        assert!(matches!(outcome, ModeOutcome::Percentiled(_)));
    }

    #[test]
    fn back_mode_not_found_without_percentile_check() {
        let fx = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let ustar = vec![0.1, 0.2, 0.3, 0.4, 0.5];
        let outcome = back_mode(&ustar, &fx, fx.len(), 2, 1, false, 90.0, 1.0);
        assert_eq!(outcome, ModeOutcome::NotFound);
    }

    #[test]
    fn back_mode_finds_descending_plateau() {
        let fx = vec![5.0, 5.1, 5.0, 4.9, 3.0, 2.0, 1.0];
        let ustar = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7];
        let outcome = back_mode(&ustar, &fx, fx.len(), 3, 1, false, 90.0, 1.0);
        assert!(matches!(outcome, ModeOutcome::Plateau(_)));
    }

    #[test]
    fn forward_mode_insufficient_data_returns_invalid() {
        let fx = vec![1.0, 2.0];
        let ustar = vec![0.1, 0.2];
        let outcome = forward_mode(&ustar, &fx, fx.len(), 3, 5, false, 90.0, 1.0);
        assert_eq!(outcome, ModeOutcome::Insufficient);
        assert_eq!(outcome.value(), crate::sentinel::INVALID);
    }

    #[test]
    fn back_mode_insufficient_data_returns_invalid() {
        let outcome = back_mode(&[], &[], 0, 2, 1, false, 90.0, 1.0);
        assert_eq!(outcome, ModeOutcome::Insufficient);
        assert_eq!(outcome.value(), crate::sentinel::INVALID);
    }

    #[test]
    fn back_mode_does_not_re_check_element_validity() {
        // The back-check's span can include an INVALID entry when an
        // upstream u*-class bin was empty; the source only validates the
        // window mean `m`, never the individual compared elements.
        let fx = vec![1.0, crate::sentinel::INVALID, 5.0];
        let ustar = vec![0.1, 0.2, 0.3];
        let outcome = back_mode(&ustar, &fx, fx.len(), 3, 1, false, 90.0, 1.0);
        assert_eq!(outcome, ModeOutcome::Plateau(0.2));
    }
}
