//! Identifier newtypes and the `Vote` type.
//!
//! `cid`, `pbcid`, `bid`, `selid`, `mid`, `gid` are all short interned
//! strings (`SmolStr` keeps the common case — short tokens — inline,
//! same choice the teacher's RNG module made but never wired up).

use std::cmp::Ordering;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::errors::CoreError;

/// Strip leading/trailing whitespace, collapse internal whitespace runs to a
/// single space, and drop non-printable characters.
pub fn clean_id(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_space = false;
    for ch in raw.chars() {
        if ch.is_whitespace() {
            if !out.is_empty() {
                last_was_space = true;
            }
            continue;
        }
        if !ch.is_control() {
            if last_was_space {
                out.push(' ');
            }
            out.push(ch);
            last_was_space = false;
        }
    }
    out
}

/// Keep only alphanumerics, hyphen, underscore, plus — safe for filenames.
pub fn filename_safe(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
        .collect()
}

macro_rules! def_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(SmolStr);

        impl $name {
            pub fn new(s: impl AsRef<str>) -> Self {
                Self(SmolStr::new(clean_id(s.as_ref())))
            }
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.0.as_str())
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.0.as_str()
            }
        }
    };
}

def_id!(ContestId, "Contest identifier (`cid`).");
def_id!(CollectionId, "Paper-ballot-collection identifier (`pbcid`).");
def_id!(BallotId, "Ballot identifier, unique within a `pbcid` (`bid`).");
def_id!(MeasurementId, "Measurement identifier (`mid`).");
def_id!(GroupId, "Contest-group identifier (`gid`).");

/// Selection identifier (`selid`). Prefixed `+` for write-ins, `-` for error
/// sentinels such as `-NoSuchContest`, `-Invalid`, `-noCVR`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SelId(SmolStr);

impl SelId {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(SmolStr::new(clean_id(s.as_ref())))
    }
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
    pub fn is_write_in(&self) -> bool {
        self.0.starts_with('+')
    }
    pub fn is_error(&self) -> bool {
        self.0.starts_with('-')
    }
    /// The `(-NoSuchContest,)` sentinel used when an inspected ballot has no
    /// recorded audited vote for a relevant contest.
    pub fn no_such_contest() -> Self {
        Self(SmolStr::new_inline("-NoSuchContest"))
    }
    pub fn invalid() -> Self {
        Self(SmolStr::new_inline("-Invalid"))
    }
    /// The sentinel reported vote for every ballot in a `noCVR` collection.
    pub fn no_cvr() -> Self {
        Self(SmolStr::new_inline("-noCVR"))
    }
}

impl fmt::Display for SelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<&str> for SelId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// An ordered tuple of selections. Empty = undervote; length > 1 for a
/// plurality contest = overvote. `Ord` gives the deterministic tie-break
/// order the social-choice oracle relies on.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Vote(pub Vec<SelId>);

impl Vote {
    pub fn new(sels: impl IntoIterator<Item = SelId>) -> Self {
        Self(sels.into_iter().collect())
    }

    pub fn single(sel: SelId) -> Self {
        Self(vec![sel])
    }

    pub fn no_cvr() -> Self {
        Self::single(SelId::no_cvr())
    }

    pub fn no_such_contest() -> Self {
        Self::single(SelId::no_such_contest())
    }

    pub fn is_undervote(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_overvote_for_plurality(&self) -> bool {
        self.0.len() > 1
    }

    /// Valid for plurality scoring: exactly one selection and it is not an
    /// error sentinel (write-ins count as valid).
    pub fn is_valid_plurality_choice(&self) -> bool {
        self.0.len() == 1 && !self.0[0].is_error()
    }
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, s) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{s}")?;
        }
        write!(f, ")")
    }
}

impl FromIterator<SelId> for Vote {
    fn from_iter<T: IntoIterator<Item = SelId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A monotone `YYYY-MM-DD-HH-MM-SS` stage-time key. Lexicographic order on
/// the wrapped string matches chronological order by construction.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct StageTime(String);

impl StageTime {
    pub const INITIAL: &'static str = "0000-00-00-00-00-00";

    pub fn initial() -> Self {
        Self(Self::INITIAL.to_string())
    }

    /// Parse and validate a stage-time string (`YYYY-MM-DD-HH-MM-SS`, all
    /// digit groups except the dash separators).
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let bytes = s.as_bytes();
        if bytes.len() != 19 {
            return Err(CoreError::InvalidTimestamp);
        }
        let dash_positions = [4usize, 7, 10, 13, 16];
        for (i, &b) in bytes.iter().enumerate() {
            if dash_positions.contains(&i) {
                if b != b'-' {
                    return Err(CoreError::InvalidTimestamp);
                }
            } else if !b.is_ascii_digit() {
                return Err(CoreError::InvalidTimestamp);
            }
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StageTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Ord for StageTime {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lexicographic == chronological for this fixed-width format.
        self.0.cmp(&other.0)
    }
}
impl PartialOrd for StageTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_id_collapses_whitespace() {
        assert_eq!(clean_id("  Alice   B.  "), "Alice B.");
        assert_eq!(clean_id("no\u{0007}control"), "nocontrol");
    }

    #[test]
    fn filename_safe_strips_punctuation() {
        assert_eq!(filename_safe("pbc/42:east (annex)"), "pbc42eastannex");
    }

    #[test]
    fn selid_classifiers() {
        assert!(SelId::new("+Write-In").is_write_in());
        assert!(SelId::new("-NoSuchContest").is_error());
        assert!(!SelId::new("Alice").is_write_in());
        assert!(!SelId::new("Alice").is_error());
    }

    #[test]
    fn vote_ordering_is_deterministic() {
        let a = Vote::single(SelId::new("Alice"));
        let b = Vote::single(SelId::new("Bob"));
        assert!(a < b);
    }

    #[test]
    fn vote_validity_for_plurality() {
        assert!(Vote::single(SelId::new("Alice")).is_valid_plurality_choice());
        assert!(!Vote::no_such_contest().is_valid_plurality_choice());
        assert!(!Vote::default().is_valid_plurality_choice());
        let over = Vote::new([SelId::new("Alice"), SelId::new("Bob")]);
        assert!(over.is_overvote_for_plurality());
    }

    #[test]
    fn stage_time_parses_and_orders() {
        let t0 = StageTime::initial();
        let t1 = StageTime::parse("2026-07-28-09-00-00").unwrap();
        let t2 = StageTime::parse("2026-07-28-09-00-01").unwrap();
        assert!(t0 < t1);
        assert!(t1 < t2);
        assert!(StageTime::parse("bad").is_err());
    }
}
