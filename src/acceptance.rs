//! Acceptance predicates applied to every candidate before ranking.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::parameter_set::ParameterSet;

/// A caller-supplied accept/reject test on one metric.
pub type Predicate<T> = Arc<dyn Fn(T) -> bool + Send + Sync>;

/// Why a candidate was discarded, in evaluation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// Outside the numeric envelope the model supports
    Malformed,
    SignatureSize,
    SigningHashes,
    CachedSigningHashes,
    VerifyHashes,
    SecurityLevel,
    OveruseSecurityLevel,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Rejection::Malformed => "malformed parameter set",
            Rejection::SignatureSize => "signature size",
            Rejection::SigningHashes => "signing hashes",
            Rejection::CachedSigningHashes => "cached signing hashes",
            Rejection::VerifyHashes => "verification hashes",
            Rejection::SecurityLevel => "security level",
            Rejection::OveruseSecurityLevel => "overuse security level",
        };
        f.write_str(reason)
    }
}

/// The four cost predicates a candidate must pass.
#[derive(Clone)]
pub struct AcceptanceCriteria {
    signature_size: Predicate<u64>,
    signing_hashes: Predicate<u64>,
    cached_signing_hashes: Predicate<u64>,
    verify_hashes: Predicate<u64>,
}

impl Default for AcceptanceCriteria {
    fn default() -> Self {
        Self::accept_all()
    }
}

impl fmt::Debug for AcceptanceCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcceptanceCriteria").finish_non_exhaustive()
    }
}

impl AcceptanceCriteria {
    /// Criteria that accept every cost.
    pub fn accept_all() -> Self {
        Self {
            signature_size: Arc::new(|_| true),
            signing_hashes: Arc::new(|_| true),
            cached_signing_hashes: Arc::new(|_| true),
            verify_hashes: Arc::new(|_| true),
        }
    }

    pub fn with_signature_size(
        mut self,
        predicate: impl Fn(u64) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.signature_size = Arc::new(predicate);
        self
    }

    pub fn with_signing_hashes(
        mut self,
        predicate: impl Fn(u64) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.signing_hashes = Arc::new(predicate);
        self
    }

    pub fn with_cached_signing_hashes(
        mut self,
        predicate: impl Fn(u64) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.cached_signing_hashes = Arc::new(predicate);
        self
    }

    pub fn with_verify_hashes(
        mut self,
        predicate: impl Fn(u64) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.verify_hashes = Arc::new(predicate);
        self
    }

    /// Runs the cost predicates in order, stopping at the first failure.
    pub fn check(&self, candidate: &ParameterSet) -> Result<(), Rejection> {
        if !(self.signature_size)(candidate.signature_size()) {
            return Err(Rejection::SignatureSize);
        }
        if !(self.signing_hashes)(candidate.signature_hashes()) {
            return Err(Rejection::SigningHashes);
        }
        if !(self.cached_signing_hashes)(candidate.cached_signature_hashes()) {
            return Err(Rejection::CachedSigningHashes);
        }
        if !(self.verify_hashes)(candidate.verify_hashes()) {
            return Err(Rejection::VerifyHashes);
        }
        Ok(())
    }
}

/// Numeric cost thresholds, the usual way of building [`AcceptanceCriteria`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Largest acceptable signature, in bytes (inclusive)
    pub max_signature_size: u64,
    /// Signing must cost strictly more than this many hashes
    pub min_signing_hashes: u64,
    /// Signing must cost strictly fewer than this many hashes
    pub max_signing_hashes: u64,
    /// Cached signing must cost strictly fewer than this many hashes
    pub max_cached_signing_hashes: u64,
    /// Verification must cost strictly fewer than this many hashes
    pub max_verify_hashes: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_signature_size: 4000,
            min_signing_hashes: 0,
            max_signing_hashes: 2_000_000_000,
            max_cached_signing_hashes: 2_000_000_000,
            max_verify_hashes: 2000,
        }
    }
}

impl From<Limits> for AcceptanceCriteria {
    fn from(limits: Limits) -> Self {
        let Limits {
            max_signature_size,
            min_signing_hashes,
            max_signing_hashes,
            max_cached_signing_hashes,
            max_verify_hashes,
        } = limits;

        AcceptanceCriteria::accept_all()
            .with_signature_size(move |size| size <= max_signature_size)
            .with_signing_hashes(move |hashes| {
                min_signing_hashes < hashes && hashes < max_signing_hashes
            })
            .with_cached_signing_hashes(move |hashes| hashes < max_cached_signing_hashes)
            .with_verify_hashes(move |hashes| hashes < max_verify_hashes)
    }
}
