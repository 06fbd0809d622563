//! Directory-layout conventions for election artefacts.
//!
//! `<root>/<election_dirname>/1-election-spec/...`, `2-reported/...`,
//! `3-audit/...`. This module only knows paths; it does not parse file
//! contents (see `csv_util`/the per-section readers).

use std::path::{Path, PathBuf};

use crate::errors::{IoError, IoResult};

/// The root of one election's artefact tree.
#[derive(Clone, Debug)]
pub struct ElectionLayout {
    pub root: PathBuf,
}

impl ElectionLayout {
    pub fn new(elections_root: impl AsRef<Path>, election_dirname: impl AsRef<Path>) -> Self {
        Self { root: elections_root.as_ref().join(election_dirname.as_ref()) }
    }

    pub fn election_spec_dir(&self) -> PathBuf {
        self.root.join("1-election-spec")
    }
    pub fn election_spec_general_csv(&self) -> PathBuf {
        self.election_spec_dir().join("election-spec-general.csv")
    }
    pub fn election_spec_contests_csv(&self) -> PathBuf {
        self.election_spec_dir().join("election-spec-contests.csv")
    }
    pub fn election_spec_contest_groups_csv(&self) -> PathBuf {
        self.election_spec_dir().join("election-spec-contest-groups.csv")
    }
    pub fn election_spec_collections_csv(&self) -> PathBuf {
        self.election_spec_dir().join("election-spec-collections.csv")
    }

    pub fn reported_dir(&self) -> PathBuf {
        self.root.join("2-reported")
    }
    pub fn manifests_dir(&self) -> PathBuf {
        self.reported_dir().join("21-reported-ballot-manifests")
    }
    pub fn manifest_csv(&self, pbcid: &str) -> PathBuf {
        self.manifests_dir().join(format!("manifest-{pbcid}.csv"))
    }
    pub fn reported_cvrs_dir(&self) -> PathBuf {
        self.reported_dir().join("22-reported-cvrs")
    }
    pub fn reported_cvrs_csv(&self, pbcid: &str) -> PathBuf {
        self.reported_cvrs_dir().join(format!("reported-cvrs-{pbcid}.csv"))
    }
    pub fn reported_outcomes_csv(&self) -> PathBuf {
        self.reported_dir().join("23-reported-outcomes.csv")
    }

    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("3-audit")
    }
    pub fn audit_spec_dir(&self) -> PathBuf {
        self.audit_dir().join("31-audit-spec")
    }
    pub fn audit_spec_global_csv(&self) -> PathBuf {
        self.audit_spec_dir().join("audit-spec-global.csv")
    }
    pub fn audit_spec_contest_csv(&self) -> PathBuf {
        self.audit_spec_dir().join("audit-spec-contest.csv")
    }
    pub fn audit_spec_collection_csv(&self) -> PathBuf {
        self.audit_spec_dir().join("audit-spec-collection.csv")
    }
    pub fn audit_spec_seed_csv(&self) -> PathBuf {
        self.audit_spec_dir().join("audit-spec-seed.csv")
    }

    pub fn audit_orders_dir(&self) -> PathBuf {
        self.audit_dir().join("32-audit-orders")
    }
    pub fn audit_order_csv(&self, pbcid: &str, stamp: &str) -> PathBuf {
        self.audit_orders_dir().join(format!("audit-order-{pbcid}-{stamp}.csv"))
    }

    pub fn audited_votes_dir(&self) -> PathBuf {
        self.audit_dir().join("33-audited-votes")
    }
    pub fn audited_votes_csv(&self, pbcid: &str) -> PathBuf {
        self.audited_votes_dir().join(format!("audited-votes-{pbcid}.csv"))
    }

    pub fn audit_output_dir(&self) -> PathBuf {
        self.audit_dir().join("34-audit-output")
    }
    pub fn contest_status_csv(&self, stage_time: &str) -> PathBuf {
        self.audit_output_dir().join(format!("audit-output-contest-status-{stage_time}.csv"))
    }
    pub fn collection_status_csv(&self, stage_time: &str) -> PathBuf {
        self.audit_output_dir().join(format!("audit-output-collection-status-{stage_time}.csv"))
    }
    pub fn saved_state_json(&self, stage_time: &str) -> PathBuf {
        self.audit_output_dir().join(format!("audit-output-saved-state-{stage_time}.json"))
    }
}

/// Select the lexicographically greatest filename under `dir` that starts
/// with `prefix` and ends with `suffix`, optionally bounded above by
/// `max_label` (the portion of the filename between `prefix` and `suffix`).
/// Lexicographic order on fixed-format timestamps equals chronological
/// order, so this doubles as "most recent file at or before a cutoff".
pub fn greatest_versioned(
    dir: &Path,
    prefix: &str,
    suffix: &str,
    max_label: Option<&str>,
) -> IoResult<PathBuf> {
    let mut best: Option<String> = None;
    let entries = std::fs::read_dir(dir).map_err(|e| IoError::Path { path: dir.display().to_string(), source: e })?;
    for entry in entries {
        let entry = entry.map_err(|e| IoError::Path { path: dir.display().to_string(), source: e })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(prefix) || !name.ends_with(suffix) {
            continue;
        }
        let label = &name[prefix.len()..name.len() - suffix.len()];
        if let Some(max) = max_label {
            if label > max {
                continue;
            }
        }
        let is_better = match best.as_deref() {
            Some(b) => name.as_str() > b,
            None => true,
        };
        if is_better {
            best = Some(name);
        }
    }
    best.map(|n| dir.join(n))
        .ok_or_else(|| IoError::NoVersionedFile { dir: dir.display().to_string(), prefix: prefix.to_string() })
}
