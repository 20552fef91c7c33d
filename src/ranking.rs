//! Ordering of accepted candidates and the bounded top-K result container.

use serde::{Deserialize, Serialize};

use crate::parameter_set::ParameterSet;

/// A caller-supplied preference between parameter sets.
///
/// `is_better(a, b)` must be a strict weak ordering: irreflexive, transitive,
/// with incomparability transitive as well. Candidates that compare equal are
/// ordered by their shape `(h', d, lg_w, k, t)`.
pub trait Ranking: Send + Sync {
    /// Returns `true` iff `a` is strictly better than `b`.
    fn is_better(&self, a: &ParameterSet, b: &ParameterSet) -> bool;
}

impl<F> Ranking for F
where
    F: Fn(&ParameterSet, &ParameterSet) -> bool + Send + Sync,
{
    fn is_better(&self, a: &ParameterSet, b: &ParameterSet) -> bool {
        self(a, b)
    }
}

/// Which signing cost a [`WeightedCost`] ranking looks at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningCost {
    /// Full signing cost, every hypertree layer rebuilt
    #[default]
    Raw,
    /// Signing cost with the hypertree layer above the FORS cached
    Cached,
}

/// Weighted log-cost ranking: lower `sum(weight_i * ln(metric_i))` wins.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightedCost {
    pub signature_size: f64,
    pub signing_hashes: f64,
    pub verify_hashes: f64,
    pub signing_cost: SigningCost,
}

impl Default for WeightedCost {
    fn default() -> Self {
        Self {
            signature_size: 0.5,
            signing_hashes: 0.0,
            verify_hashes: 0.5,
            signing_cost: SigningCost::Raw,
        }
    }
}

impl WeightedCost {
    /// The cost of one candidate. Metrics with a zero weight are skipped.
    pub fn cost(&self, params: &ParameterSet) -> f64 {
        let mut cost = 0.0;
        if self.signature_size != 0.0 {
            cost += self.signature_size * (params.signature_size() as f64).ln();
        }
        if self.signing_hashes != 0.0 {
            let hashes = match self.signing_cost {
                SigningCost::Raw => params.signature_hashes(),
                SigningCost::Cached => params.cached_signature_hashes(),
            };
            cost += self.signing_hashes * (hashes as f64).ln();
        }
        if self.verify_hashes != 0.0 {
            cost += self.verify_hashes * (params.verify_hashes() as f64).ln();
        }
        cost
    }
}

impl Ranking for WeightedCost {
    fn is_better(&self, a: &ParameterSet, b: &ParameterSet) -> bool {
        self.cost(a) < self.cost(b)
    }
}

/// The best `capacity` candidates seen so far, best first.
///
/// Kept sorted by binary-search insertion; once full, every insertion drops
/// the worst entry. Ties under the ranking are broken by shape so the final
/// contents do not depend on insertion order.
pub struct BoundedRanking<'r> {
    capacity: usize,
    ranking: &'r dyn Ranking,
    entries: Vec<ParameterSet>,
}

impl<'r> BoundedRanking<'r> {
    pub fn new(capacity: usize, ranking: &'r dyn Ranking) -> Self {
        Self {
            capacity,
            ranking,
            entries: Vec::with_capacity(capacity.saturating_add(1).min(1024)),
        }
    }

    /// Whether `a` sorts strictly before `b`.
    fn precedes(&self, a: &ParameterSet, b: &ParameterSet) -> bool {
        if self.ranking.is_better(a, b) {
            return true;
        }
        !self.ranking.is_better(b, a) && a.shape() < b.shape()
    }

    /// Offers a candidate; returns whether it was kept.
    pub fn insert(&mut self, candidate: ParameterSet) -> bool {
        let position = self
            .entries
            .partition_point(|entry| !self.precedes(&candidate, entry));
        if position >= self.capacity {
            return false;
        }
        self.entries.insert(position, candidate);
        self.entries.truncate(self.capacity);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[ParameterSet] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<ParameterSet> {
        self.entries
    }
}
