//! The top-level driver (`spec.md` §4.6): initialise, then repeat the
//! stage loop until every measurement is terminal-or-inactive or the run
//! has passed its `max_stage_time` budget.

use std::thread;
use std::time::Duration;

use audit_io::layout::ElectionLayout;
use audit_io::{audit_spec, saved_state};
use audit_model::Election;
use audit_algo::OracleRegistry;
use audit_core::StageTime;
use tracing::info;

use crate::clock;
use crate::errors::StageResult;
use crate::init::{self, Initialised};
use crate::stage::{self, RunConfig, StageOutcome};

/// Minimum wall-clock gap enforced between successive stages so two stages
/// never collide on the same `StageTime` label (§4.6).
const MIN_STAGE_GAP: Duration = Duration::from_secs(1);

/// `audit-spec-global.csv`'s `Max Stage Time` row, if present: the run-wide
/// time budget the stage loop stops at.
fn read_max_stage_time(layout: &ElectionLayout) -> StageResult<Option<StageTime>> {
    let global = audit_spec::read_global(layout)?;
    let raw = global.iter().find_map(|(k, v)| (k.eq_ignore_ascii_case("Max Stage Time")).then(|| v.clone()));
    Ok(match raw {
        Some(s) if !s.trim().is_empty() => Some(StageTime::parse(s.trim()).map_err(audit_model::ModelError::from)?),
        _ => None,
    })
}

/// Run the full audit to completion: initialise, write the `t0` snapshot,
/// then loop `run_one_stage` until a measurement-status or time-budget
/// break condition is hit. Returns every stage's outcome, in order.
///
/// `planner` carries the CLI's planner-tuning flags (`--sample_by_size`,
/// `--use_discrete_rm`, ...); pass `PlannerConfig::default()` for the
/// baseline-only planner.
pub fn run_to_completion(
    layout: &ElectionLayout,
    planner: audit_algo::PlannerConfig,
) -> StageResult<Vec<StageOutcome>> {
    let Initialised { mut election, seed, audit_order, max_audit_rate_p } = init::load(layout)?;
    let max_stage_time = read_max_stage_time(layout)?;

    stage::write_initial_saved_state(layout, &mut election, &max_audit_rate_p)?;

    let oracle = OracleRegistry::with_defaults();
    let config = RunConfig { max_stage_time, planner, ..RunConfig::default() };
    let mut rng = stage::seed_rng(&seed);

    let mut outcomes = Vec::new();
    loop {
        let t = clock::now();
        if let Some(max_t) = &config.max_stage_time {
            if &t > max_t {
                info!(stage = %t, max = %max_t, "max_stage_time exceeded; stopping");
                break;
            }
        }

        let outcome = stage::run_one_stage(layout, &mut election, &oracle, &audit_order, t, &config, &mut rng)?;
        let done = !stage::any_open_and_active(&election);
        outcomes.push(outcome);
        if done {
            info!("every measurement terminal or inactive; audit complete");
            break;
        }

        thread::sleep(MIN_STAGE_GAP);
    }

    Ok(outcomes)
}

/// Load and validate an election without running any stages — the
/// `--read_election_spec`/`--read_reported` dry-run modes (§6). Note that
/// `init::load` still writes each collection's `32-audit-orders/` file as
/// part of materialising the audit order; nothing beyond that is written.
pub fn read_only(layout: &ElectionLayout) -> StageResult<Election> {
    Ok(init::load(layout)?.election)
}

/// Re-derive and overwrite every collection's audit order against the
/// configured seed — the `--make_audit_orders` CLI mode (§6).
pub fn make_audit_orders(layout: &ElectionLayout) -> StageResult<()> {
    init::load(layout)?;
    Ok(())
}

/// Resume from the most recent saved state on disk rather than the
/// all-zero initial snapshot, for a process restarted mid-audit.
pub fn resume_from_saved_state(layout: &ElectionLayout) -> StageResult<saved_state::SavedState> {
    Ok(saved_state::read_latest_saved_state(layout, None)?)
}
