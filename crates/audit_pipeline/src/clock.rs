//! Wall-clock stage times (`spec.md` §4.6 `current_datetime_string()`).
//!
//! `StageTime` itself is a bare parsed/formatted string in `audit_core`, with
//! no notion of "now" — that would pull `chrono` into the leaf crate for a
//! concern only the driver has. This module is the one place the stage loop
//! turns the system clock into a `StageTime`.

use audit_core::StageTime;
use chrono::Utc;

/// The current UTC instant, formatted the way `StageTime::parse` expects:
/// `YYYY-MM-DD-HH-MM-SS`.
pub fn now() -> StageTime {
    let stamp = Utc::now().format("%Y-%m-%d-%H-%M-%S").to_string();
    StageTime::parse(&stamp).expect("chrono format string always produces a valid StageTime")
}
