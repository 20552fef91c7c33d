//! Enumeration of the parameter grid.
//!
//! A [`SearchSpace`] holds one list of acceptable values per structural knob.
//! [`Candidates`] walks their cartesian product with an explicit index vector,
//! `h'` outermost and `t` innermost. The order carries no meaning for the
//! search; it only makes enumeration reproducible.

use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::parameter_set::{
    check_bounds, ParameterSet, MAX_FORS_HEIGHT, MAX_LAYER_HEIGHT, MAX_LG_W,
};

/// Number of structural knobs enumerated per candidate.
const AXES: usize = 5;

/// Returns every integer in `start..=end` (empty when `start > end`).
pub fn inclusive_range(start: u32, end: u32) -> Vec<u32> {
    (start..=end).collect()
}

/// The parameter grid explored by a search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSpace {
    /// Target security level copied into every candidate
    pub target_security_level: u32,
    /// Overuse security level copied into every candidate (0 = unused)
    pub overuse_security_level: u32,
    /// Acceptable XMSS layer heights
    pub h_prime: Vec<u32>,
    /// Acceptable numbers of hypertree layers
    pub d: Vec<u32>,
    /// Acceptable values of lg(w)
    pub lg_w: Vec<u32>,
    /// Acceptable numbers of FORS trees
    pub k: Vec<u32>,
    /// Acceptable FORS tree heights
    pub t: Vec<u32>,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            target_security_level: 128,
            overuse_security_level: 112,
            h_prime: inclusive_range(1, 30),
            d: inclusive_range(1, 30),
            lg_w: inclusive_range(1, 8),
            k: inclusive_range(1, 30),
            t: inclusive_range(1, 30),
        }
    }
}

impl SearchSpace {
    fn axes(&self) -> [&[u32]; AXES] {
        [&self.h_prime, &self.d, &self.lg_w, &self.k, &self.t]
    }

    /// Number of grid points, saturating at `usize::MAX`.
    pub fn len(&self) -> usize {
        self.axes()
            .iter()
            .fold(1usize, |acc, axis| acc.saturating_mul(axis.len()))
    }

    /// True when at least one range is empty.
    pub fn is_empty(&self) -> bool {
        self.axes().iter().any(|axis| axis.is_empty())
    }

    /// Checks every configured value against the envelope the model supports.
    /// Empty ranges are allowed and simply yield no candidates.
    pub fn validate(&self) -> Result<()> {
        if self.target_security_level == 0 {
            return Err(SearchError::InvalidSecurityLevel(self.target_security_level));
        }
        for &value in &self.h_prime {
            check_bounds("h_prime", value, 0, MAX_LAYER_HEIGHT)?;
        }
        for &value in &self.d {
            check_bounds("d", value, 1, u32::MAX)?;
        }
        for &value in &self.lg_w {
            check_bounds("lg_w", value, 1, MAX_LG_W)?;
        }
        for &value in &self.k {
            check_bounds("k", value, 1, u32::MAX)?;
        }
        for &value in &self.t {
            check_bounds("t", value, 0, MAX_FORS_HEIGHT)?;
        }
        Ok(())
    }

    /// A fresh pass over every grid point.
    pub fn candidates(&self) -> Candidates<'_> {
        Candidates::new(self)
    }
}

impl<'a> IntoIterator for &'a SearchSpace {
    type Item = ParameterSet;
    type IntoIter = Candidates<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates()
    }
}

/// Iterator over the cartesian product of a [`SearchSpace`].
///
/// The only state is the index vector of the next grid point, so cloning the
/// iterator forks the enumeration and dropping it early releases nothing.
#[derive(Clone, Debug)]
pub struct Candidates<'a> {
    space: &'a SearchSpace,
    /// Index into each axis of the next candidate
    index: [usize; AXES],
    remaining: usize,
}

impl<'a> Candidates<'a> {
    fn new(space: &'a SearchSpace) -> Self {
        let remaining = if space.is_empty() { 0 } else { space.len() };
        Self {
            space,
            index: [0; AXES],
            remaining,
        }
    }

    fn current(&self) -> ParameterSet {
        let space = self.space;
        ParameterSet {
            target_security_level: space.target_security_level,
            overuse_security_level: space.overuse_security_level,
            h_prime: space.h_prime[self.index[0]],
            d: space.d[self.index[1]],
            lg_w: space.lg_w[self.index[2]],
            k: space.k[self.index[3]],
            t: space.t[self.index[4]],
        }
    }

    /// Moves the index vector to the next grid point, innermost axis first.
    fn step(&mut self) {
        let axes = self.space.axes();
        for axis in (0..AXES).rev() {
            self.index[axis] += 1;
            if self.index[axis] < axes[axis].len() {
                return;
            }
            self.index[axis] = 0;
        }
    }
}

impl Iterator for Candidates<'_> {
    type Item = ParameterSet;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let candidate = self.current();
        self.remaining -= 1;
        self.step();
        Some(candidate)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Candidates<'_> {}

impl FusedIterator for Candidates<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn space(
        h_prime: Vec<u32>,
        d: Vec<u32>,
        lg_w: Vec<u32>,
        k: Vec<u32>,
        t: Vec<u32>,
    ) -> SearchSpace {
        SearchSpace {
            target_security_level: 128,
            overuse_security_level: 0,
            h_prime,
            d,
            lg_w,
            k,
            t,
        }
    }

    #[test]
    fn test_single_point_grid() {
        let space = space(vec![1], vec![1], vec![1], vec![1], vec![1]);
        let all: Vec<_> = space.candidates().collect();
        assert_eq!(all, vec![ParameterSet::new(128, 1, 1, 1, 1, 1)]);
    }

    #[test]
    fn test_empty_range_yields_nothing() {
        let space = space(vec![1, 2], vec![], vec![4], vec![10], vec![8]);
        assert!(space.is_empty());
        assert_eq!(space.candidates().count(), 0);
        assert_eq!(space.candidates().len(), 0);
    }

    #[test]
    fn test_cartesian_product_order_and_size() {
        let space = space(vec![2, 3], vec![1, 4], vec![4], vec![10, 11, 12], vec![6, 7]);
        let all: Vec<_> = space.candidates().collect();
        assert_eq!(all.len(), 2 * 2 * 3 * 2);
        assert_eq!(all.len(), space.len());
        assert_eq!(all[0].shape(), (2, 1, 4, 10, 6));
        assert_eq!(all[1].shape(), (2, 1, 4, 10, 7));
        assert_eq!(all[2].shape(), (2, 1, 4, 11, 6));
        assert_eq!(all.last().map(|p| p.shape()), Some((3, 4, 4, 12, 7)));

        let mut shapes: Vec<_> = all.iter().map(|p| p.shape()).collect();
        shapes.sort_unstable();
        shapes.dedup();
        assert_eq!(shapes.len(), all.len());
    }

    #[test]
    fn test_restart_and_early_stop() {
        let space = space(vec![1, 2, 3], vec![1, 2], vec![4], vec![5], vec![6]);
        let mut first = space.candidates();
        let head: Vec<_> = first.by_ref().take(2).collect();
        assert_eq!(first.len(), 4);
        drop(first);

        let again: Vec<_> = space.candidates().take(2).collect();
        assert_eq!(head, again);
        assert_eq!((&space).into_iter().count(), 6);
    }

    #[test]
    fn test_candidates_carry_levels() {
        let mut space = space(vec![5], vec![4], vec![4], vec![23], vec![8]);
        space.overuse_security_level = 112;
        let candidate = space.candidates().next().unwrap();
        assert_eq!(candidate.target_security_level, 128);
        assert_eq!(candidate.overuse_security_level, 112);
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        assert!(SearchSpace::default().validate().is_ok());

        let bad = space(vec![5], vec![4], vec![4, 17], vec![23], vec![8]);
        assert!(matches!(
            bad.validate(),
            Err(SearchError::ParameterOutOfRange { name: "lg_w", value: 17, .. })
        ));

        let empty = space(vec![], vec![], vec![], vec![], vec![]);
        assert!(empty.validate().is_ok());
    }

    #[test]
    fn test_inclusive_range() {
        assert_eq!(inclusive_range(1, 4), vec![1, 2, 3, 4]);
        assert!(inclusive_range(5, 4).is_empty());
    }
}
