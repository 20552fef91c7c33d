//! Parallel search over the parameter grid.
//!
//! Every candidate is evaluated independently on a rayon pool. Accepted
//! candidates are sent over a channel to a single merge thread, the only
//! writer of the [`BoundedRanking`], so the ranked list stays sorted and
//! bounded without any locking on the evaluation side.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use rayon::iter::{ParallelBridge, ParallelIterator};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::acceptance::{AcceptanceCriteria, Rejection};
use crate::candidates::SearchSpace;
use crate::error::{Result, SearchError};
use crate::parameter_set::ParameterSet;
use crate::ranking::{BoundedRanking, Ranking, WeightedCost};

/// Everything a search needs. Read-only while the search runs.
#[derive(Clone)]
pub struct SearchConfig {
    /// The grid to enumerate, with the security levels copied into candidates
    pub space: SearchSpace,
    /// log2 of the number of signatures the target level must survive
    pub min_signatures_log2: f64,
    /// log2 of the number of signatures the overuse level must survive.
    /// The overuse check runs only when this is set and the overuse level is
    /// non-zero.
    pub overuse_min_signatures_log2: Option<f64>,
    pub acceptance: AcceptanceCriteria,
    pub ranking: Arc<dyn Ranking>,
    /// Maximum number of ranked results
    pub max_results: usize,
    /// Worker threads for a dedicated pool; `None` uses rayon's global pool
    pub threads: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            space: SearchSpace::default(),
            min_signatures_log2: 20.0,
            overuse_min_signatures_log2: None,
            acceptance: AcceptanceCriteria::default(),
            ranking: Arc::new(WeightedCost::default()),
            max_results: 20,
            threads: None,
        }
    }
}

impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("space", &self.space)
            .field("min_signatures_log2", &self.min_signatures_log2)
            .field("overuse_min_signatures_log2", &self.overuse_min_signatures_log2)
            .field("acceptance", &self.acceptance)
            .field("max_results", &self.max_results)
            .field("threads", &self.threads)
            .finish_non_exhaustive()
    }
}

impl SearchConfig {
    /// Runs every acceptance test on one candidate, cheapest first, and
    /// reports the first one that fails.
    pub fn evaluate(&self, candidate: &ParameterSet) -> std::result::Result<(), Rejection> {
        if candidate.validate().is_err() {
            return Err(Rejection::Malformed);
        }
        self.acceptance.check(candidate)?;
        if !candidate.check_security_level(self.min_signatures_log2) {
            return Err(Rejection::SecurityLevel);
        }
        if let Some(overuse_log2) = self.overuse_min_signatures_log2 {
            if candidate.overuse_security_level > 0
                && !candidate.check_overuse_security_level(overuse_log2)
            {
                return Err(Rejection::OveruseSecurityLevel);
            }
        }
        Ok(())
    }

    /// Checks the grid and the numeric thresholds.
    pub fn validate(&self) -> Result<()> {
        self.space.validate()?;
        if !self.min_signatures_log2.is_finite() {
            return Err(SearchError::InvalidConfiguration(format!(
                "minimum signature count 2^{} is not finite",
                self.min_signatures_log2
            )));
        }
        if let Some(overuse_log2) = self.overuse_min_signatures_log2 {
            if !overuse_log2.is_finite() {
                return Err(SearchError::InvalidConfiguration(format!(
                    "overuse signature count 2^{overuse_log2} is not finite"
                )));
            }
        }
        if self.threads == Some(0) {
            return Err(SearchError::InvalidConfiguration(
                "thread count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// The outcome of a search: at most `max_results` parameter sets, best first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RankedResult {
    entries: Vec<ParameterSet>,
    /// Grid points evaluated
    pub evaluated: u64,
    /// Grid points that passed every acceptance test
    pub accepted: u64,
}

impl RankedResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParameterSet> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[ParameterSet] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<ParameterSet> {
        self.entries
    }
}

impl IntoIterator for RankedResult {
    type Item = ParameterSet;
    type IntoIter = std::vec::IntoIter<ParameterSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a RankedResult {
    type Item = &'a ParameterSet;
    type IntoIter = std::slice::Iter<'a, ParameterSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A validated search, optionally bound to its own thread pool.
pub struct SearchEngine {
    config: SearchConfig,
    pool: Option<ThreadPool>,
}

impl SearchEngine {
    /// Validates `config` and builds the worker pool it asks for.
    pub fn new(config: SearchConfig) -> Result<Self> {
        config.validate()?;
        let pool = match config.threads {
            Some(threads) => Some(
                ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|index| format!("slh-search-{index}"))
                    .build()?,
            ),
            None => None,
        };
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Runs the search to completion.
    pub fn run(&self) -> RankedResult {
        match &self.pool {
            Some(pool) => pool.install(|| execute(&self.config)),
            None => execute(&self.config),
        }
    }
}

/// Searches the whole grid described by `config` on the global rayon pool and
/// returns the best `config.max_results` accepted parameter sets.
///
/// Never fails: candidates the model cannot evaluate are rejected like any
/// other, so a malformed configuration yields a short or empty result.
pub fn search(config: &SearchConfig) -> RankedResult {
    execute(config)
}

fn execute(config: &SearchConfig) -> RankedResult {
    tracing::debug!(
        grid = config.space.len(),
        max_results = config.max_results,
        workers = rayon::current_num_threads(),
        "starting parameter search"
    );

    let evaluated = AtomicU64::new(0);
    let (sender, receiver) = mpsc::channel::<ParameterSet>();
    let ranking = config.ranking.as_ref();
    let capacity = config.max_results;

    let (entries, accepted) = thread::scope(|scope| {
        let merger = scope.spawn(move || {
            let mut top = BoundedRanking::new(capacity, ranking);
            let mut accepted = 0u64;
            for candidate in receiver {
                accepted += 1;
                top.insert(candidate);
            }
            (top.into_vec(), accepted)
        });

        config
            .space
            .candidates()
            .par_bridge()
            .for_each_with(sender, |sender, candidate| {
                evaluated.fetch_add(1, Ordering::Relaxed);
                match config.evaluate(&candidate) {
                    Ok(()) => {
                        // the merger only stops once every sender is dropped
                        let _ = sender.send(candidate);
                    }
                    Err(rejection) => {
                        tracing::trace!(
                            shape = ?candidate.shape(),
                            %rejection,
                            "candidate rejected"
                        );
                    }
                }
            });

        merger
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    });

    let evaluated = evaluated.into_inner();
    tracing::info!(
        evaluated,
        accepted,
        retained = entries.len(),
        "parameter search finished"
    );

    RankedResult {
        entries,
        evaluated,
        accepted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acceptance::Limits;
    use crate::candidates::inclusive_range;

    fn small_space() -> SearchSpace {
        SearchSpace {
            target_security_level: 128,
            overuse_security_level: 0,
            h_prime: inclusive_range(3, 8),
            d: inclusive_range(2, 8),
            lg_w: vec![4],
            k: inclusive_range(10, 30),
            t: inclusive_range(6, 14),
        }
    }

    fn small_config() -> SearchConfig {
        SearchConfig {
            space: small_space(),
            min_signatures_log2: 20.0,
            acceptance: Limits {
                max_signature_size: 8000,
                max_verify_hashes: 3000,
                ..Limits::default()
            }
            .into(),
            max_results: 10,
            ..SearchConfig::default()
        }
    }

    #[test]
    fn test_search_is_bounded_sorted_and_accepted() {
        let config = small_config();
        let result = search(&config);

        assert_eq!(result.evaluated, config.space.len() as u64);
        assert!(result.accepted >= result.len() as u64);
        assert_eq!(result.len(), 10);

        for candidate in &result {
            assert_eq!(config.evaluate(candidate), Ok(()));
            assert!(candidate.signature_size() <= 8000);
            assert!(candidate.verify_hashes() < 3000);
            assert!(candidate.security_level(20.0) >= 128.0);
        }
        for pair in result.as_slice().windows(2) {
            assert!(!config.ranking.is_better(&pair[1], &pair[0]));
        }
    }

    #[test]
    fn test_search_matches_sequential_reference() {
        let config = small_config();
        let result = search(&config);

        let mut reference: Vec<_> = config
            .space
            .candidates()
            .filter(|candidate| config.evaluate(candidate).is_ok())
            .collect();
        assert_eq!(result.accepted, reference.len() as u64);
        let cost = WeightedCost::default();
        reference.sort_by(|a, b| {
            cost.cost(a)
                .total_cmp(&cost.cost(b))
                .then(a.shape().cmp(&b.shape()))
        });
        reference.truncate(config.max_results);

        assert_eq!(result.as_slice(), reference.as_slice());
    }

    #[test]
    fn test_search_is_deterministic() {
        let config = small_config();
        let first = search(&config);
        let second = search(&config);
        assert_eq!(first, second);
    }

    #[test]
    fn test_engine_with_dedicated_pool() {
        let config = SearchConfig {
            threads: Some(2),
            ..small_config()
        };
        let engine = SearchEngine::new(config.clone()).unwrap();
        assert_eq!(engine.run(), search(&config));
    }

    #[test]
    fn test_single_candidate_grid() {
        let config = SearchConfig {
            space: SearchSpace {
                target_security_level: 128,
                overuse_security_level: 0,
                h_prime: vec![5],
                d: vec![4],
                lg_w: vec![4],
                k: vec![23],
                t: vec![8],
            },
            min_signatures_log2: 10.0,
            ..SearchConfig::default()
        };
        let result = search(&config);
        assert_eq!(result.evaluated, 1);
        assert_eq!(result.as_slice(), &[ParameterSet::new(128, 5, 4, 4, 23, 8)]);
    }

    #[test]
    fn test_empty_range_yields_empty_result() {
        let mut config = small_config();
        config.space.k.clear();
        let result = search(&config);
        assert_eq!(result.evaluated, 0);
        assert!(result.is_empty());
    }

    #[test]
    fn test_rejecting_everything_yields_empty_result() {
        let config = SearchConfig {
            acceptance: AcceptanceCriteria::accept_all().with_signature_size(|_| false),
            ..small_config()
        };
        let result = search(&config);
        assert_eq!(result.accepted, 0);
        assert!(result.is_empty());
    }

    #[test]
    fn test_malformed_candidates_are_rejected() {
        let mut config = small_config();
        config.space.lg_w = vec![0, 4];
        assert!(SearchEngine::new(config.clone()).is_err());

        let result = search(&config);
        assert!(!result.is_empty());
        assert!(result.iter().all(|p| p.lg_w == 4));
        assert_eq!(
            config.evaluate(&ParameterSet::new(128, 5, 4, 0, 23, 8)),
            Err(Rejection::Malformed)
        );
    }

    #[test]
    fn test_overuse_check() {
        // A-1 keeps 128 bits at 2^20 signatures and 112 bits up to 2^21.69
        let a1 = ParameterSet::new(128, 5, 4, 4, 23, 8).with_overuse_security_level(112);
        let mut config = SearchConfig {
            min_signatures_log2: 20.0,
            overuse_min_signatures_log2: Some(21.5),
            ..SearchConfig::default()
        };
        assert_eq!(config.evaluate(&a1), Ok(()));

        config.overuse_min_signatures_log2 = Some(22.0);
        assert_eq!(config.evaluate(&a1), Err(Rejection::OveruseSecurityLevel));

        // no overuse level on the candidate: the check is skipped
        let plain = ParameterSet::new(128, 5, 4, 4, 23, 8);
        assert_eq!(config.evaluate(&plain), Ok(()));
    }

    #[test]
    fn test_validate_config() {
        assert!(small_config().validate().is_ok());

        let config = SearchConfig {
            threads: Some(0),
            ..small_config()
        };
        assert!(matches!(
            config.validate(),
            Err(SearchError::InvalidConfiguration(_))
        ));

        let config = SearchConfig {
            min_signatures_log2: f64::NAN,
            ..small_config()
        };
        assert!(config.validate().is_err());
    }
}
