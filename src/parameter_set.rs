//! SLH-DSA parameter sets and their closed-form cost model.
//!
//! A [`ParameterSet`] is identified by five integer knobs (the XMSS layer
//! height `h'`, the number of hypertree layers `d`, `lg(w)`, the number of
//! FORS trees `k` and the FORS tree height `a`, written `t` here) together with
//! the security levels it is judged against. Every other quantity (digest
//! length, signature size, signing and verification cost, security level) is
//! a pure function of those fields and is recomputed on demand.
//!
//! Costs are counted in hash-function invocations. No hashing is performed;
//! the model only predicts what a real implementation would spend.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::security_level;

/// Largest supported `lg(w)`.
pub const MAX_LG_W: u32 = 16;

/// Largest supported FORS tree height. Past 52 the per-probe miss probability
/// `1 - 2^-t` is exactly 1.0 in `f64` and the forgery series degenerates.
pub const MAX_FORS_HEIGHT: u32 = 52;

/// Largest supported XMSS layer height.
pub const MAX_LAYER_HEIGHT: u32 = 62;

/// Integer ceiling of `num / denom`.
#[inline]
pub(crate) fn ceil_div(num: u32, denom: u32) -> u32 {
    num.div_ceil(denom)
}

/// `2^exp`, saturating at `u64::MAX`.
#[inline]
pub(crate) fn pow2(exp: u32) -> u64 {
    1u64.checked_shl(exp).unwrap_or(u64::MAX)
}

/// One point of the SLH-DSA parameter space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Target security level in bits (e.g. 128 for NIST level 1)
    pub target_security_level: u32,
    /// Secondary, lower security level tolerated under key overuse (0 = unused)
    pub overuse_security_level: u32,
    /// Height of each XMSS layer (h')
    pub h_prime: u32,
    /// Number of hypertree layers (d)
    pub d: u32,
    /// log2 of the Winternitz parameter w
    pub lg_w: u32,
    /// Number of FORS trees (k)
    pub k: u32,
    /// log2 of the number of leaves per FORS tree (a)
    pub t: u32,
}

impl ParameterSet {
    /// Creates a parameter set without an overuse security level.
    pub fn new(
        target_security_level: u32,
        h_prime: u32,
        d: u32,
        lg_w: u32,
        k: u32,
        t: u32,
    ) -> Self {
        Self {
            target_security_level,
            overuse_security_level: 0,
            h_prime,
            d,
            lg_w,
            k,
            t,
        }
    }

    /// Returns a copy judged against `level` bits when overused.
    pub fn with_overuse_security_level(mut self, level: u32) -> Self {
        self.overuse_security_level = level;
        self
    }

    /// The five structural knobs in enumeration order `(h', d, lg_w, k, t)`.
    pub fn shape(&self) -> (u32, u32, u32, u32, u32) {
        (self.h_prime, self.d, self.lg_w, self.k, self.t)
    }

    /// Checks that the parameter set lies inside the envelope the model supports.
    pub fn validate(&self) -> Result<()> {
        if self.target_security_level == 0 {
            return Err(SearchError::InvalidSecurityLevel(self.target_security_level));
        }
        check_bounds("h_prime", self.h_prime, 0, MAX_LAYER_HEIGHT)?;
        check_bounds("d", self.d, 1, u32::MAX)?;
        check_bounds("lg_w", self.lg_w, 1, MAX_LG_W)?;
        check_bounds("k", self.k, 1, u32::MAX)?;
        check_bounds("t", self.t, 0, MAX_FORS_HEIGHT)?;
        Ok(())
    }

    /// Total hypertree height `h = h' * d`.
    pub fn hypertree_height(&self) -> u32 {
        self.h_prime.saturating_mul(self.d)
    }

    /// Length in bytes of the message digest that selects the FORS leaves and
    /// the hypertree leaf.
    pub fn message_digest_bytes(&self) -> u32 {
        let h = self.hypertree_height();
        ceil_div(h.saturating_sub(self.h_prime), 8)
            + ceil_div(self.h_prime, 8)
            + ceil_div(self.k.saturating_mul(self.t), 8)
    }

    /// Byte length of one hash output implied by the target security level.
    pub fn hash_bytes(&self) -> u32 {
        ceil_div(self.target_security_level, 8)
    }

    /// Number of base-w digits in one WOTS+ signature: message digits plus
    /// enough checksum digits to hold `(w - 1) * message_digits`.
    ///
    /// # Panics
    ///
    /// Panics if `lg_w` is zero.
    pub fn winternitz_digits(&self) -> u32 {
        let hash_digits = ceil_div(self.target_security_level, self.lg_w);
        let w = pow2(self.lg_w);
        let max_checksum = (w - 1).saturating_mul(hash_digits as u64);

        let mut checksum_digits = 1;
        let mut capacity = w;
        while capacity < max_checksum {
            checksum_digits += 1;
            capacity = capacity.saturating_mul(w);
        }
        hash_digits.saturating_add(checksum_digits)
    }

    /// Size in bytes of one signature: randomizer, FORS signature and one
    /// WOTS+ signature plus authentication path per hypertree layer.
    pub fn signature_size(&self) -> u64 {
        let per_layer = self.winternitz_digits() as u64 + self.h_prime as u64;
        let hashes = 1u64
            .saturating_add(self.fors_nodes())
            .saturating_add((self.d as u64).saturating_mul(per_layer));
        (self.hash_bytes() as u64).saturating_mul(hashes)
    }

    /// FORS leaves plus authentication-path nodes, `k * (t + 1)`.
    fn fors_nodes(&self) -> u64 {
        (self.k as u64).saturating_mul(self.t as u64 + 1)
    }

    /// Hash invocations needed to build all `k` FORS trees and sign with them.
    fn fors_hashes(&self) -> u64 {
        (self.k as u64).saturating_mul(pow2(self.t).saturating_mul(3) - 1)
    }

    /// Hash invocations needed to produce one signature, rebuilding every
    /// hypertree layer from scratch.
    pub fn signature_hashes(&self) -> u64 {
        let cost_ots =
            1u64.saturating_add((self.winternitz_digits() as u64).saturating_mul(pow2(self.lg_w)));
        let cost_hypertree = (self.d as u64).saturating_mul(
            cost_ots.saturating_add(1).saturating_mul(pow2(self.h_prime)) - 1,
        );
        3u64
            .saturating_add(cost_hypertree)
            .saturating_add(self.fors_hashes())
    }

    /// Hash invocations needed to produce one signature when the hypertree
    /// layer above the FORS is cached, leaving only the FORS work.
    pub fn cached_signature_hashes(&self) -> u64 {
        3u64.saturating_add(self.fors_hashes())
    }

    /// Hash invocations needed to verify one signature.
    pub fn verify_hashes(&self) -> u64 {
        let chain_hashes = (self.winternitz_digits() as u64).saturating_mul(pow2(self.lg_w)) / 2;
        let per_layer = chain_hashes.saturating_add(1 + self.h_prime as u64);
        2u64
            .saturating_add(self.fors_nodes())
            .saturating_add((self.d as u64).saturating_mul(per_layer))
    }

    /// Estimated security in bits after `2^m` signatures.
    pub fn security_level(&self, m: f64) -> f64 {
        security_level::security_level(self, m)
    }

    /// Whether the target security level still holds after `2^m` signatures.
    pub fn check_security_level(&self, m: f64) -> bool {
        security_level::meets_security_level(self, m, self.target_security_level)
    }

    /// Whether the overuse security level still holds after `2^m` signatures.
    pub fn check_overuse_security_level(&self, m: f64) -> bool {
        security_level::meets_security_level(self, m, self.overuse_security_level)
    }

    /// log2 of the number of signatures (to 1/100) that keep at least
    /// `target` bits of security.
    pub fn signatures_at_level(&self, target: u32) -> f64 {
        security_level::signatures_at_level(self, target)
    }
}

pub(crate) fn check_bounds(name: &'static str, value: u32, min: u32, max: u32) -> Result<()> {
    if value < min || value > max {
        return Err(SearchError::ParameterOutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}
