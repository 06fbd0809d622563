//! Social-choice oracle (`spec.md` §4.2): a pure function from a tally to
//! an outcome, pluggable behind one trait so non-plurality rules can be
//! added without touching the risk kernel.

use std::collections::BTreeMap;

use audit_core::Vote;
use audit_model::ContestType;

use crate::errors::AlgoError;

/// The interface every social-choice rule implements: `outcome(params,
/// tally) -> vote`. The risk kernel and planner only ever call through
/// this trait, never a concrete rule, so adding IRV/approval/etc. later
/// requires no change to either.
pub trait SocialChoiceRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn outcome(&self, cid: &str, params: &[String], tally: &BTreeMap<Vote, u64>) -> Result<Vote, AlgoError>;
}

/// Plurality: the vote `v` maximising `tally[v]` among valid votes (length
/// exactly 1, selid not an error sentinel). Ties broken deterministically
/// by `Vote`'s `Ord` (its sort order), which in turn is lexicographic over
/// `SelId`s — so the same vote vocabulary always ties the same way.
pub struct Plurality;

impl SocialChoiceRule for Plurality {
    fn name(&self) -> &'static str {
        "plurality"
    }

    fn outcome(&self, cid: &str, _params: &[String], tally: &BTreeMap<Vote, u64>) -> Result<Vote, AlgoError> {
        let mut best: Option<(&Vote, u64)> = None;
        for (vote, &count) in tally {
            if !vote.is_valid_plurality_choice() {
                continue;
            }
            match best {
                None => best = Some((vote, count)),
                Some((best_vote, best_count)) => {
                    // Strict '>' keeps the first (lowest-sorted, since
                    // `tally` iterates in ascending Vote order) winner on
                    // ties — deterministic tie-break by sort order.
                    if count > best_count {
                        best = Some((vote, count));
                    } else if count == best_count && vote < best_vote {
                        best = Some((vote, count));
                    }
                }
            }
        }
        best.map(|(v, _)| v.clone()).ok_or_else(|| AlgoError::NoValidOutcome {
            cid: cid.to_string(),
            rule: "plurality".to_string(),
        })
    }
}

/// A small, explicit registry of social-choice rules keyed by contest-type
/// name, with `plurality` registered out of the box.
pub struct OracleRegistry {
    rules: BTreeMap<String, Box<dyn SocialChoiceRule>>,
}

impl OracleRegistry {
    pub fn with_defaults() -> Self {
        let mut rules: BTreeMap<String, Box<dyn SocialChoiceRule>> = BTreeMap::new();
        rules.insert("plurality".to_string(), Box::new(Plurality));
        Self { rules }
    }

    pub fn register(&mut self, rule: Box<dyn SocialChoiceRule>) {
        self.rules.insert(rule.name().to_string(), rule);
    }

    pub fn outcome(
        &self,
        cid: &str,
        contest_type: &ContestType,
        params: &[String],
        tally: &BTreeMap<Vote, u64>,
    ) -> Result<Vote, AlgoError> {
        let rule = self
            .rules
            .get(contest_type.as_str())
            .ok_or_else(|| AlgoError::UnknownRule(contest_type.as_str().to_string()))?;
        rule.outcome(cid, params, tally)
    }
}

impl Default for OracleRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
