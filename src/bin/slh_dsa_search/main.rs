//! SLH-DSA parameter search CLI
//!
//! Enumerates SLH-DSA parameter sets, keeps those that survive the requested
//! number of signatures within the size and cost limits, and prints the best
//! ones as a table.
//!
//! Usage:
//!   slh-dsa-search --target-security-level 128 --min-sig-count 20 \
//!     --overuse-security-level 112 --min-sig-count-at-overuse 24 \
//!     --max-sig-size 4000 --table-format markdown

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use slh_dsa_search::{ParameterSet, SearchEngine, SearchProfile, SigningCost};

mod table;

use table::{pretty_big_number, Table, TableFormat};

/// A list of integers written as `1-30`, `4` or `4,8,16`.
#[derive(Clone, Debug, PartialEq)]
struct ValueList(Vec<u32>);

impl FromStr for ValueList {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut values = Vec::new();
        for part in s.split(',').map(str::trim) {
            let parse = |v: &str| {
                v.trim()
                    .parse::<u32>()
                    .map_err(|e| format!("invalid value {v:?}: {e}"))
            };
            match part.split_once('-') {
                Some((start, end)) => {
                    let (start, end) = (parse(start)?, parse(end)?);
                    if start > end {
                        return Err(format!("empty range {part:?}"));
                    }
                    values.extend(start..=end);
                }
                None => values.push(parse(part)?),
            }
        }
        Ok(Self(values))
    }
}

#[derive(Parser, Debug)]
#[command(name = "slh-dsa-search")]
#[command(about = "Search the SLH-DSA parameter space for small, fast parameter sets")]
struct Args {
    /// JSON search profile; flags given on the command line override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target security (in bits) [default: 128]
    #[arg(long)]
    target_security_level: Option<u32>,

    /// Security level tolerated under key overuse [default: 112]
    #[arg(long)]
    overuse_security_level: Option<u32>,

    /// log2 of the minimum number of signatures at the target security level [default: 20]
    #[arg(long)]
    min_sig_count: Option<f64>,

    /// log2 of the minimum number of signatures at the overuse security level (0 disables)
    #[arg(long)]
    min_sig_count_at_overuse: Option<f64>,

    /// Maximum signature size in bytes [default: 4000]
    #[arg(long)]
    max_sig_size: Option<u64>,

    /// Signing must cost more than this many hashes [default: 0]
    #[arg(long)]
    min_sig_hashes: Option<u64>,

    /// Signing must cost fewer than this many hashes [default: 2000000000]
    #[arg(long)]
    max_sig_hashes: Option<u64>,

    /// Cached signing must cost fewer than this many hashes [default: 2000000000]
    #[arg(long)]
    max_cached_sig_hashes: Option<u64>,

    /// Rank signing cost by the cached cost instead of the uncached one
    #[arg(long)]
    compare_cached_sig_hashes: bool,

    /// Verification must cost fewer than this many hashes [default: 2000]
    #[arg(long)]
    max_verify_hashes: Option<u64>,

    /// Weight of signature size in the ranking [default: 0.5]
    #[arg(long)]
    eval_sig_size: Option<f64>,

    /// Weight of signing cost in the ranking [default: 0]
    #[arg(long)]
    eval_sig_hashes: Option<f64>,

    /// Weight of verification cost in the ranking [default: 0.5]
    #[arg(long)]
    eval_verify_hashes: Option<f64>,

    /// XMSS layer heights to try [default: 1-30]
    #[arg(long)]
    h_prime: Option<ValueList>,

    /// Numbers of hypertree layers to try [default: 1-30]
    #[arg(long)]
    d: Option<ValueList>,

    /// Values of lg(w) to try [default: 1-8]
    #[arg(long)]
    lg_w: Option<ValueList>,

    /// Numbers of FORS trees to try [default: 1-30]
    #[arg(long)]
    k: Option<ValueList>,

    /// FORS tree heights to try [default: 1-30]
    #[arg(long)]
    t: Option<ValueList>,

    /// Number of parameter sets to print [default: 20]
    #[arg(long)]
    candidates: Option<usize>,

    /// Worker threads (defaults to one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Output style
    #[arg(long, value_enum, default_value_t = TableFormat::Console)]
    table_format: TableFormat,

    /// Prefix for parameter set IDs
    #[arg(long, default_value = "")]
    name_prefix: String,
}

impl Args {
    /// Applies every flag given on the command line on top of `profile`.
    fn apply(&self, profile: &mut SearchProfile) {
        let space = &mut profile.space;
        if let Some(level) = self.target_security_level {
            space.target_security_level = level;
        }
        if let Some(level) = self.overuse_security_level {
            space.overuse_security_level = level;
        }
        for (flag, range) in [
            (&self.h_prime, &mut space.h_prime),
            (&self.d, &mut space.d),
            (&self.lg_w, &mut space.lg_w),
            (&self.k, &mut space.k),
            (&self.t, &mut space.t),
        ] {
            if let Some(ValueList(values)) = flag {
                range.clone_from(values);
            }
        }

        if let Some(count) = self.min_sig_count {
            profile.min_signatures_log2 = count;
        }
        if let Some(count) = self.min_sig_count_at_overuse {
            profile.overuse_min_signatures_log2 = (count > 0.0).then_some(count);
        }

        let limits = &mut profile.limits;
        if let Some(size) = self.max_sig_size {
            limits.max_signature_size = size;
        }
        if let Some(hashes) = self.min_sig_hashes {
            limits.min_signing_hashes = hashes;
        }
        if let Some(hashes) = self.max_sig_hashes {
            limits.max_signing_hashes = hashes;
        }
        if let Some(hashes) = self.max_cached_sig_hashes {
            limits.max_cached_signing_hashes = hashes;
        }
        if let Some(hashes) = self.max_verify_hashes {
            limits.max_verify_hashes = hashes;
        }

        let weights = &mut profile.weights;
        if let Some(weight) = self.eval_sig_size {
            weights.signature_size = weight;
        }
        if let Some(weight) = self.eval_sig_hashes {
            weights.signing_hashes = weight;
        }
        if let Some(weight) = self.eval_verify_hashes {
            weights.verify_hashes = weight;
        }
        if self.compare_cached_sig_hashes {
            weights.signing_cost = SigningCost::Cached;
        }

        if let Some(candidates) = self.candidates {
            profile.max_results = candidates;
        }
        if self.threads.is_some() {
            profile.threads = self.threads;
        }
    }
}

fn title(profile: &SearchProfile) -> String {
    let mut title = format!(
        "Target security level {}, 2^{:.0} signatures",
        profile.space.target_security_level, profile.min_signatures_log2
    );
    if let Some(overuse) = profile.overuse_min_signatures_log2 {
        title.push_str(&format!(
            " (level {} @ 2^{:.0} signatures)",
            profile.space.overuse_security_level, overuse
        ));
    }
    title
}

/// log2 of the signature count at `level`, or `-` when no overuse level is set.
fn signatures_at(params: &ParameterSet, level: u32) -> String {
    if level == 0 {
        return "-".to_string();
    }
    format!("{:.2}", params.signatures_at_level(level))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut profile = match &args.config {
        Some(path) => SearchProfile::load(path)
            .with_context(|| format!("failed to load profile {}", path.display()))?,
        None => SearchProfile::default(),
    };
    args.apply(&mut profile);

    tracing::info!(
        target_security_level = profile.space.target_security_level,
        overuse_security_level = profile.space.overuse_security_level,
        grid = profile.space.len(),
        "searching parameter space"
    );

    let title = title(&profile);
    let overuse_level = profile.space.overuse_security_level;
    let engine = SearchEngine::new(profile.into_config()).context("invalid search configuration")?;
    let results = engine.run();

    let mut table = Table::new(title);
    table.set_header([
        "id".to_string(),
        "h".to_string(),
        "d".to_string(),
        "h'".to_string(),
        "a".to_string(),
        "k".to_string(),
        "lg w".to_string(),
        "m".to_string(),
        "sig bytes".to_string(),
        "sign time".to_string(),
        "sign cached".to_string(),
        "verify time".to_string(),
        format!("sigs at {overuse_level}"),
    ]);
    for (i, params) in results.iter().enumerate() {
        table.push_row([
            format!("{}{}", args.name_prefix, i + 1),
            params.hypertree_height().to_string(),
            params.d.to_string(),
            params.h_prime.to_string(),
            params.t.to_string(),
            params.k.to_string(),
            params.lg_w.to_string(),
            params.message_digest_bytes().to_string(),
            params.signature_size().to_string(),
            pretty_big_number(params.signature_hashes()),
            pretty_big_number(params.cached_signature_hashes()),
            params.verify_hashes().to_string(),
            signatures_at(params, overuse_level),
        ]);
    }

    println!("{}", table.render(args.table_format)?);
    Ok(())
}
