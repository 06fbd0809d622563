//! Measurements and the per-measurement status state machine
//! (`spec.md` §3 "Measurement `mid`" and §4.6 "Stage state machine").

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use audit_core::{ContestId, MeasurementId};

/// Risk measurement method. `Bayes` is the only one the kernel implements
/// today; the field exists so a future method can be selected without
/// changing the `Measurement` shape.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RiskMethod {
    Bayes,
}

/// Whether and how the planner should allocate ballots for this
/// measurement.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SamplingMode {
    Active,
    Opportunistic,
    Off,
}

/// The measurement status state machine: `Open` is the only non-terminal
/// state; once a measurement leaves it, it never returns (invariant 4).
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MeasurementStatus {
    #[default]
    Open,
    Passed,
    Upset,
    Exhausted,
    Off,
}

impl MeasurementStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, MeasurementStatus::Open)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MeasurementStatus::Open => "Open",
            MeasurementStatus::Passed => "Passed",
            MeasurementStatus::Upset => "Upset",
            MeasurementStatus::Exhausted => "Exhausted",
            MeasurementStatus::Off => "Off",
        }
    }

    /// Whether moving from `self` to `next` respects monotonicity: `Open`
    /// may move anywhere; every other state is a fixed point (including
    /// `Off`, which is inert rather than terminal-by-audit-result but still
    /// never transitions once set).
    pub fn can_transition_to(self, next: MeasurementStatus) -> bool {
        self == next || self == MeasurementStatus::Open
    }
}

/// A single statistical test for one contest (`mid`).
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Measurement {
    pub mid: MeasurementId,
    pub cid: ContestId,
    pub risk_method: RiskMethod,
    pub risk_limit: f64,
    pub upset_threshold: f64,
    pub sampling_mode: SamplingMode,
    pub status: MeasurementStatus,
    pub param1: Option<String>,
    pub param2: Option<String>,
}

impl Measurement {
    pub fn new(mid: MeasurementId, cid: ContestId, risk_limit: f64, upset_threshold: f64) -> Self {
        Self {
            mid,
            cid,
            risk_method: RiskMethod::Bayes,
            risk_limit,
            upset_threshold,
            sampling_mode: SamplingMode::Active,
            status: MeasurementStatus::Open,
            param1: None,
            param2: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == MeasurementStatus::Open
    }

    pub fn is_active(&self) -> bool {
        matches!(self.sampling_mode, SamplingMode::Active)
    }

    /// Apply a status transition, panicking only on a genuine monotonicity
    /// violation (a bug in the caller, not a data condition — the stage
    /// loop never attempts to un-terminate a measurement).
    pub fn set_status(&mut self, next: MeasurementStatus) {
        debug_assert!(
            self.status.can_transition_to(next),
            "measurement {} attempted {:?} -> {:?}",
            self.mid,
            self.status,
            next
        );
        self.status = next;
    }
}
