//! Deterministic, offline CLI argument parsing and validation (`spec.md`
//! §6 "CLI surface").

use std::path::{Path, PathBuf};

use audit_algo::PickCountyFunc;
use audit_core::AuditSeed;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "audit", about = "Post-election risk-limiting audit engine")]
pub struct Args {
    /// Directory name of the election to operate on, under `--elections_root`.
    pub election_dirname: String,

    #[arg(long, default_value = "./elections")]
    pub elections_root: PathBuf,

    /// Override the seed recorded in `audit-spec-seed.csv` for this run.
    #[arg(long)]
    pub set_audit_seed: Option<String>,

    /// Load and validate `1-election-spec/` only; do not audit.
    #[arg(long)]
    pub read_election_spec: bool,

    /// Load `1-election-spec/` and `2-reported/` and validate; do not audit.
    #[arg(long)]
    pub read_reported: bool,

    /// (Re)compute and write every collection's audit order; do not audit.
    #[arg(long)]
    pub make_audit_orders: bool,

    /// Run the stage loop to completion.
    #[arg(long)]
    pub audit: bool,

    /// Stop after one stage instead of looping (useful for inspection/tests).
    #[arg(long)]
    pub pause: bool,

    #[arg(long)]
    pub sample_by_size: bool,

    #[arg(long)]
    pub use_discrete_rm: bool,

    #[arg(long, default_value_t = 1)]
    pub num_winners: usize,

    #[arg(long, default_value_t = 20)]
    pub max_num_it: usize,

    #[arg(long, value_enum, default_value_t = PickCountyFuncArg::RoundRobin)]
    pub pick_county_func: PickCountyFuncArg,
}

#[derive(Clone, Copy, Eq, PartialEq, Debug, clap::ValueEnum)]
pub enum PickCountyFuncArg {
    RoundRobin,
    RandomNaive,
    RandomMinVar,
}

impl From<PickCountyFuncArg> for PickCountyFunc {
    fn from(a: PickCountyFuncArg) -> Self {
        match a {
            PickCountyFuncArg::RoundRobin => PickCountyFunc::RoundRobin,
            PickCountyFuncArg::RandomNaive => PickCountyFunc::RandomNaive,
            PickCountyFuncArg::RandomMinVar => PickCountyFunc::RandomMinVar,
        }
    }
}

#[derive(Debug)]
pub enum CliError {
    NoModeSelected,
    NotFound(String),
    BadSeed(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::NoModeSelected => write!(
                f,
                "no mode selected: pass one of --read_election_spec, --read_reported, --make_audit_orders, --audit"
            ),
            CliError::NotFound(p) => write!(f, "election directory not found: {p}"),
            CliError::BadSeed(s) => write!(f, "invalid --set_audit_seed: {s:?}"),
        }
    }
}

impl std::error::Error for CliError {}

/// Parse argv and apply the validation the spec requires before any I/O
/// happens: a mode flag is selected, the election directory exists, and an
/// explicit seed override (if given) is a valid decimal integer.
pub fn parse_and_validate() -> Result<Args, CliError> {
    let args = Args::parse();

    if !(args.read_election_spec || args.read_reported || args.make_audit_orders || args.audit) {
        return Err(CliError::NoModeSelected);
    }

    let election_dir = args.elections_root.join(&args.election_dirname);
    if !election_dir.is_dir() {
        return Err(CliError::NotFound(election_dir.display().to_string()));
    }

    if let Some(seed) = &args.set_audit_seed {
        AuditSeed::parse(seed).map_err(|_| CliError::BadSeed(seed.clone()))?;
    }

    Ok(args)
}

pub fn election_dir(args: &Args) -> PathBuf {
    args.elections_root.join(&args.election_dirname)
}

pub fn elections_root(args: &Args) -> &Path {
    &args.elections_root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_county_func_maps_onto_algo_enum() {
        assert_eq!(PickCountyFunc::from(PickCountyFuncArg::RandomMinVar), PickCountyFunc::RandomMinVar);
    }
}
