//! Readers for `3-audit/31-audit-spec/*.csv` — global parameters, per-
//! measurement definitions, per-collection audit rates, and the seed.

use std::collections::BTreeMap;

use audit_core::{AuditSeed, CollectionId, ContestId, MeasurementId};
use audit_model::{Election, Measurement, MeasurementStatus, RiskMethod, SamplingMode};

use crate::csv_util::read_fixed_table;
use crate::errors::IoResult;
use crate::layout::ElectionLayout;

/// `audit-spec-global.csv` (Global Audit Parameter,Value): returned as a
/// key/value list — `max_stage_time` and similar run-wide knobs live here.
pub fn read_global(layout: &ElectionLayout) -> IoResult<BTreeMap<String, String>> {
    let path = layout.audit_spec_global_csv();
    let table = read_fixed_table(&path, &["Global Audit Parameter", "Value"])?;
    let c_param = table.col("Global Audit Parameter").unwrap_or(0);
    let c_val = table.col("Value").unwrap_or(1);
    Ok(table.rows.iter().map(|r| (r.get(c_param).to_string(), r.get(c_val).to_string())).collect())
}

/// `audit-spec-contest.csv` (Measurement id,Contest,Risk Measurement
/// Method,Risk Limit,Risk Upset Threshold,Sampling Mode,Initial Status,
/// Param 1,Param 2).
pub fn read_measurements(layout: &ElectionLayout, election: &mut Election) -> IoResult<()> {
    let path = layout.audit_spec_contest_csv();
    let table = read_fixed_table(
        &path,
        &[
            "Measurement id",
            "Contest",
            "Risk Measurement Method",
            "Risk Limit",
            "Risk Upset Threshold",
            "Sampling Mode",
            "Initial Status",
        ],
    )?;
    let c_mid = table.col("Measurement id").unwrap_or(0);
    let c_cid = table.col("Contest").unwrap_or(1);
    let c_limit = table.col("Risk Limit").unwrap_or(3);
    let c_upset = table.col("Risk Upset Threshold").unwrap_or(4);
    let c_mode = table.col("Sampling Mode").unwrap_or(5);
    let c_status = table.col("Initial Status").unwrap_or(6);
    let c_p1 = table.col("Param 1");
    let c_p2 = table.col("Param 2");

    for row in &table.rows {
        let mid = MeasurementId::new(row.get(c_mid));
        let cid = ContestId::new(row.get(c_cid));
        let limit: f64 = row.get(c_limit).parse().unwrap_or(0.05);
        let upset: f64 = row.get(c_upset).parse().unwrap_or(0.98);
        let mut m = Measurement::new(mid.clone(), cid, limit, upset);
        m.risk_method = RiskMethod::Bayes;
        m.sampling_mode = match row.get(c_mode).to_ascii_lowercase().as_str() {
            "opportunistic" => SamplingMode::Opportunistic,
            "off" => SamplingMode::Off,
            _ => SamplingMode::Active,
        };
        m.status = match row.get(c_status).to_ascii_lowercase().as_str() {
            "passed" => MeasurementStatus::Passed,
            "upset" => MeasurementStatus::Upset,
            "exhausted" => MeasurementStatus::Exhausted,
            "off" => MeasurementStatus::Off,
            _ => MeasurementStatus::Open,
        };
        m.param1 = c_p1.map(|c| row.get(c).to_string()).filter(|s| !s.is_empty());
        m.param2 = c_p2.map(|c| row.get(c).to_string()).filter(|s| !s.is_empty());
        election.measurements.insert(mid, m);
    }
    Ok(())
}

/// `audit-spec-collection.csv` (Collection,Max audit rate).
pub fn read_max_audit_rates(layout: &ElectionLayout, election: &mut Election) -> IoResult<BTreeMap<CollectionId, u64>> {
    let path = layout.audit_spec_collection_csv();
    let table = read_fixed_table(&path, &["Collection", "Max audit rate"])?;
    let c_coll = table.col("Collection").unwrap_or(0);
    let c_rate = table.col("Max audit rate").unwrap_or(1);

    let mut rates = BTreeMap::new();
    for row in &table.rows {
        let pbcid = CollectionId::new(row.get(c_coll));
        let rate: u64 = row.get(c_rate).parse().unwrap_or(0);
        if let Some(coll) = election.collections.get_mut(&pbcid) {
            coll.max_audit_rate = rate;
        }
        rates.insert(pbcid, rate);
    }
    Ok(rates)
}

/// `audit-spec-seed.csv` (Audit seed): a single data row, a decimal string
/// of arbitrary width (§4.3 / `AuditSeed`).
pub fn read_seed(layout: &ElectionLayout) -> IoResult<AuditSeed> {
    let path = layout.audit_spec_seed_csv();
    let table = read_fixed_table(&path, &["Audit seed"])?;
    let c_seed = table.col("Audit seed").unwrap_or(0);
    let raw = table.rows.first().map(|r| r.get(c_seed).to_string()).unwrap_or_default();
    AuditSeed::parse(&raw)
        .map_err(|_| crate::errors::IoError::InvalidSeed { path: path.display().to_string(), raw })
}
