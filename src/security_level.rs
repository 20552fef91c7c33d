//! Security-level estimation for SLH-DSA parameter sets.
//!
//! After `2^m` signatures every hypertree leaf has been used a
//! Poisson(`lambda`) number of times, `lambda = 2^(m - h)`. A forger wins if a
//! single fresh digest lands on FORS leaves that are all already revealed.
//! Conditioning on `g` uses of the FORS instance behind a leaf, that
//! probability is `(1 - (1 - 2^-t)^g)^k`, so the overall forgery probability is
//!
//! ```text
//! e^-lambda * sum_{g >= 1} lambda^g / g! * (1 - (1 - 2^-t)^g)^k
//! ```
//!
//! The series is summed in the log2 domain, one term per `g`, until the
//! remaining terms cannot move the result. Both the exact estimator and the
//! early-exit check walk the same [`ForgerySeries`].

use std::f64::consts::{LN_2, LOG2_E};

use crate::parameter_set::ParameterSet;

/// Below this miss probability `log2(1 - x)` is taken from its Taylor expansion.
const TAYLOR_THRESHOLD: f64 = 0.00001;

/// Minimum number of terms summed before the tail test may stop the series.
const MIN_TERMS: u32 = 10;

/// The series stops once the running sum exceeds the current term by 2^20.
const TAIL_MARGIN_BITS: f64 = 20.0;

/// How far past the hypertree height `signatures_at_level` scans before giving up.
const SCAN_HEADROOM: u32 = 64;

/// `log2(2^a + 2^b)` without overflowing or underflowing the exponentials.
#[inline]
pub(crate) fn log2_add(a: f64, b: f64) -> f64 {
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    if lo == f64::NEG_INFINITY {
        return hi;
    }
    hi + (1.0 + (lo - hi).exp2()).log2()
}

/// Running state of the forgery-probability series for one parameter set and
/// one signature count.
#[derive(Clone, Debug)]
pub(crate) struct ForgerySeries {
    /// Expected number of signatures per hypertree leaf
    lambda: f64,
    log_lambda: f64,
    k: f64,
    /// Probability that one probe misses one revealed FORS leaf
    prob_not_single_hit: f64,
    /// Probability that one probe misses all `g` revealed leaves of a tree
    prob_not_g_hit: f64,
    /// log2(lambda^g / g!)
    log_a: f64,
    /// log2 of the partial sum, without the e^-lambda factor
    log_sum: f64,
    g: u32,
}

impl ForgerySeries {
    pub(crate) fn new(params: &ParameterSet, m: f64) -> Self {
        let h = params.hypertree_height() as f64;
        let lambda = if m > h { (m - h).exp2() } else { 0.5f64.powf(h - m) };

        Self {
            lambda,
            log_lambda: m - h,
            k: params.k as f64,
            prob_not_single_hit: 1.0 - 0.5f64.powi(params.t as i32),
            prob_not_g_hit: 1.0,
            log_a: 0.0,
            log_sum: f64::NEG_INFINITY,
            g: 0,
        }
    }

    /// Adds the term for the next `g` to the running sum.
    pub(crate) fn advance(&mut self) {
        self.g += 1;
        self.log_a += self.log_lambda;
        self.log_a -= (self.g as f64).log2();
        self.prob_not_g_hit *= self.prob_not_single_hit;

        // log2 of the chance that a forgery query hits only revealed leaves
        let x = self.prob_not_g_hit;
        let log_b = if x < TAYLOR_THRESHOLD {
            // 1 - x rounds to 1 here; use the first two Taylor terms instead
            -self.k * (x / LN_2 + x * x / (2.0 * LN_2))
        } else {
            self.k * (1.0 - x).log2()
        };

        let log_term = self.log_a + log_b;
        self.log_sum = if self.g == 1 {
            log_term
        } else {
            log2_add(self.log_sum, log_term)
        };
    }

    /// True once the remaining terms are below 2^-20 of the sum. `log_a`
    /// bounds every later term since `log_b <= 0` and `log_a` only shrinks
    /// from here on.
    pub(crate) fn tail_is_negligible(&self) -> bool {
        if self.g < MIN_TERMS {
            return false;
        }
        // every term so far was zero and stays zero (degenerate FORS height)
        self.log_sum > TAIL_MARGIN_BITS + self.log_a || self.log_sum == f64::NEG_INFINITY
    }

    /// log2 of an upper bound on all terms after the current one, available
    /// once `g > 2 * lambda`: each further term shrinks by at least
    /// `p = lambda / (g + 1) < 1/2`, so the tail is at most `a_g * p / (1 - p)`.
    pub(crate) fn log_tail_bound(&self) -> Option<f64> {
        if (self.g as f64) <= 2.0 * self.lambda {
            return None;
        }
        let p = self.lambda / (self.g as f64 + 1.0);
        Some(self.log_a + p.log2() - (1.0 - p).log2())
    }

    /// Security bits implied by the current partial sum.
    pub(crate) fn security_bits(&self) -> f64 {
        self.lambda * LOG2_E - self.log_sum
    }

    /// The largest `log_sum` that still leaves `target` bits of security.
    pub(crate) fn log_sum_limit(&self, target: u32) -> f64 {
        self.lambda * LOG2_E - target as f64
    }
}

/// Estimated security in bits of `params` after `2^m` signatures.
pub fn security_level(params: &ParameterSet, m: f64) -> f64 {
    let mut series = ForgerySeries::new(params, m);
    loop {
        series.advance();
        if series.tail_is_negligible() {
            return series.security_bits();
        }
    }
}

/// Whether `params` keeps at least `target` bits of security after `2^m`
/// signatures.
///
/// Agrees with `security_level(params, m) >= target` but stops as soon as the
/// answer is decided: the partial sum only grows, so crossing the limit means
/// failure, and a tail bound that cannot reach the limit means success.
pub fn meets_security_level(params: &ParameterSet, m: f64, target: u32) -> bool {
    let mut series = ForgerySeries::new(params, m);
    let limit = series.log_sum_limit(target);
    loop {
        series.advance();

        if series.log_sum > limit {
            return false;
        }
        if let Some(log_tail) = series.log_tail_bound() {
            if log2_add(series.log_sum, log_tail) <= limit {
                return true;
            }
        }
        if series.tail_is_negligible() {
            return true;
        }
    }
}

/// log2 of the number of signatures `params` supports while keeping
/// `target` bits of security, to a granularity of 1/100.
///
/// Scans whole units of `m` first, then hundredths inside the last unit,
/// probing the middle of each hundredth.
pub fn signatures_at_level(params: &ParameterSet, target: u32) -> f64 {
    let target = target as f64;
    let limit = params.hypertree_height().saturating_add(SCAN_HEADROOM);

    let mut lower = 0u32;
    while lower < limit && security_level(params, (lower + 1) as f64) > target {
        lower += 1;
    }

    let mut fract = 0u32;
    while fract < 100
        && security_level(params, lower as f64 + fract as f64 / 100.0 + 0.005) > target
    {
        fract += 1;
    }

    lower as f64 + fract as f64 / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a1() -> ParameterSet {
        ParameterSet::new(128, 5, 4, 4, 23, 8)
    }

    #[test]
    fn test_log2_add() {
        assert!((log2_add(3.0, 3.0) - 4.0).abs() < 1e-12);
        assert!((log2_add(0.0, 1.0) - 3f64.log2()).abs() < 1e-12);
        assert_eq!(log2_add(-2000.0, f64::NEG_INFINITY), -2000.0);
        // 2^-1500 underflows, the shifted form does not
        assert!((log2_add(-1500.0, -1500.0) + 1499.0).abs() < 1e-9);
    }

    #[test]
    fn test_security_level_at_reference_counts() {
        let params = a1();
        // far below the hypertree capacity nearly all of the target remains
        assert!(params.security_level(10.0) > 128.0);
        assert!(params.security_level(30.0) < 112.0);
    }

    #[test]
    fn test_security_level_is_monotone_in_signature_count() {
        let params = a1();
        let mut previous = f64::INFINITY;
        for step in 0..120 {
            let m = step as f64 * 0.25;
            let level = params.security_level(m);
            assert!(level <= previous + 1e-4, "m = {m}: {level} > {previous}");
            previous = level;
        }
    }

    #[test]
    fn test_check_agrees_with_exact() {
        for params in [
            a1(),
            ParameterSet::new(128, 4, 8, 4, 15, 9),
            ParameterSet::new(192, 8, 3, 4, 18, 12),
        ] {
            for step in 0..128 {
                let m = step as f64 * 0.25;
                let exact = params.security_level(m);
                if (exact - params.target_security_level as f64).abs() < 1e-9 {
                    continue;
                }
                assert_eq!(
                    params.check_security_level(m),
                    exact >= params.target_security_level as f64,
                    "{params:?} at m = {m}: exact {exact}"
                );
            }
        }
    }

    #[test]
    fn test_overuse_check_uses_overuse_level() {
        let params = a1().with_overuse_security_level(112);
        // 2^21 signatures: below 128 bits, still above 112
        assert!(params.security_level(21.0) < 128.0);
        assert!(!params.check_security_level(21.0));
        assert!(params.check_overuse_security_level(21.0));
    }

    #[test]
    fn test_degenerate_fors_height_terminates() {
        let params = ParameterSet::new(128, 5, 4, 4, 23, 60);
        assert!(params.security_level(20.0).is_infinite());
        assert!(params.check_security_level(20.0));
    }
}
