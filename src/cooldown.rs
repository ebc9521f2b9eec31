//! Cooldown gate: refuses to repeat an action (refresh, update) before a
//! minimum interval has passed since the last recorded one.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{human_duration, OrkoError};

/// Why the gate let the caller through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    NoPriorAction,
    Elapsed(Duration),
}

/// Time between `last` and `now`. A `last` in the future (clock skew) counts
/// as zero elapsed time.
pub fn elapsed_since(last: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(last)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

const RELATIVE_UNITS: [(u64, &str); 6] = [
    (365 * 24 * 3600, "year"),
    (30 * 24 * 3600, "month"),
    (24 * 3600, "day"),
    (3600, "hour"),
    (60, "minute"),
    (1, "second"),
];

/// "3 hours ago" style rendering of `last` relative to `now`, truncated to
/// the largest whole unit.
pub fn time_ago(last: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = elapsed_since(last, now).as_secs();
    RELATIVE_UNITS
        .iter()
        .find(|(unit, _)| secs >= *unit)
        .map(|(unit, name)| {
            let count = secs / unit;
            let plural = if count == 1 { "" } else { "s" };
            format!("{count} {name}{plural} ago")
        })
        .unwrap_or_else(|| "just now".to_string())
}

/// Reads an RFC 3339 timestamp out of a store value.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            warn!(error = %e, value = raw, "Ignoring unparseable timestamp");
            None
        }
    }
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)
}

/// Allows when nothing was recorded or at least `min_interval` has passed,
/// otherwise fails with [`OrkoError::CooldownActive`] carrying the remaining wait.
pub fn check(
    action: &str,
    last: Option<DateTime<Utc>>,
    min_interval: Duration,
    now: DateTime<Utc>,
) -> Result<GateDecision, OrkoError> {
    let Some(last) = last else {
        info!(action, "No previous {action} recorded, proceeding");
        return Ok(GateDecision::NoPriorAction);
    };

    let elapsed = elapsed_since(last, now);
    if elapsed >= min_interval {
        info!(
            action,
            last = %format_timestamp(last),
            "Cooldown elapsed, last {action} was {}",
            time_ago(last, now)
        );
        Ok(GateDecision::Elapsed(elapsed))
    } else {
        let remaining = min_interval - elapsed;
        warn!(
            action,
            remaining = %human_duration(&remaining),
            "Cooldown still active"
        );
        Err(OrkoError::CooldownActive {
            remaining,
            interval: min_interval,
        })
    }
}
