//! The saved-state snapshot: a JSON capture of everything the stage loop
//! needs to resume — `stage_time`, `sn_tp`, `status_tm`, `plan_tp` — written
//! atomically after every stage.
//!
//! The very first snapshot (written before any ballots are drawn) is not
//! all-zero: `plan_tp[t0][pbcid]` starts at that collection's configured
//! `max_audit_rate`, not `0`, so the first real stage has a draw target to
//! work from. `sn_tp` is `0` everywhere, and `status_tm` holds each
//! measurement's configured initial status (normally `Open`).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use audit_core::{CollectionId, MeasurementId, StageTime};
use audit_model::{Election, MeasurementStatus};

use crate::atomic::{to_canonical_bytes, write_bytes_atomically};
use crate::errors::{IoError, IoResult};
use crate::layout::{greatest_versioned, ElectionLayout};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedState {
    pub stage_time: StageTime,
    pub sn_tp: BTreeMap<CollectionId, u64>,
    pub status_tm: BTreeMap<MeasurementId, MeasurementStatus>,
    pub plan_tp: BTreeMap<CollectionId, u64>,
}

/// Build the initial snapshot: `sn_tp` all zero, `status_tm` from each
/// measurement's current (configured) status, `plan_tp` seeded from
/// `max_audit_rate_p`.
pub fn initial_saved_state(
    election: &Election,
    max_audit_rate_p: &BTreeMap<CollectionId, u64>,
) -> SavedState {
    let stage_time = StageTime::initial();
    let sn_tp = election.collections.keys().map(|p| (p.clone(), 0)).collect();
    let status_tm = election
        .measurements
        .iter()
        .map(|(mid, m)| (mid.clone(), m.status))
        .collect();
    let plan_tp = election
        .collections
        .keys()
        .map(|p| (p.clone(), max_audit_rate_p.get(p).copied().unwrap_or(0)))
        .collect();
    SavedState { stage_time, sn_tp, status_tm, plan_tp }
}

pub fn write_saved_state(layout: &ElectionLayout, state: &SavedState) -> IoResult<()> {
    let path = layout.saved_state_json(state.stage_time.as_str());
    let value = serde_json::to_value(state).map_err(|e| IoError::Json { path: path.display().to_string(), source: e })?;
    let bytes = to_canonical_bytes(&value)?;
    write_bytes_atomically(&path, &bytes)
}

pub fn read_saved_state_at(layout: &ElectionLayout, stage_time: &str) -> IoResult<SavedState> {
    let path = layout.saved_state_json(stage_time);
    read_saved_state_file(&path)
}

/// Read the most recent saved-state at or before `max_stage_time`
/// (`None` means "the latest one available").
pub fn read_latest_saved_state(
    layout: &ElectionLayout,
    max_stage_time: Option<&str>,
) -> IoResult<SavedState> {
    let dir = layout.audit_output_dir();
    let path = greatest_versioned(
        &dir,
        "audit-output-saved-state-",
        ".json",
        max_stage_time,
    )?;
    read_saved_state_file(&path)
}

fn read_saved_state_file(path: &Path) -> IoResult<SavedState> {
    let bytes = std::fs::read(path).map_err(|e| IoError::Path { path: path.display().to_string(), source: e })?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|e| IoError::Json { path: path.display().to_string(), source: e })?;
    serde_json::from_value(value).map_err(|e| IoError::Json { path: path.display().to_string(), source: e })
}
