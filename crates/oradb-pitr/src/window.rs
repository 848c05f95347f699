//! Recovery windows from backups and agent-reported ranges
//!
//! A range the agent can recover into is only usable from the first
//! successful backup inside it, since restore starts from a backup and rolls
//! forward. Ranges are taken in agent order and are neither sorted nor
//! coalesced here.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use kube::ResourceExt;
use oradb_agent::RecoverableRange;
use oradb_common::crd::{Backup, BackupPhase, ScnWindow, TimeWindow};
use tracing::warn;

/// A successful backup usable as the start of a window
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupAnchor {
    /// When the backup was taken
    pub time: DateTime<Utc>,
    /// SCN at which the backup was taken
    pub scn: String,
    /// Incarnation the backup belongs to
    pub incarnation: Option<String>,
}

/// Windows published in Pitr status
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecoveryWindows {
    /// Time windows, one per usable range
    pub time: Vec<TimeWindow>,
    /// SCN windows, parallel to `time`
    pub scn: Vec<ScnWindow>,
    /// Incarnation as reported by the database
    pub current_incarnation: String,
}

/// Succeeded backups with readable timestamp and SCN annotations
///
/// A backup whose annotations are missing or unparsable is logged and
/// skipped.
pub fn succeeded_anchors(backups: &[Backup]) -> Vec<BackupAnchor> {
    backups
        .iter()
        .filter(|b| b.phase() == BackupPhase::Succeeded)
        .filter_map(|b| match anchor(b) {
            Ok(a) => Some(a),
            Err(reason) => {
                warn!(backup = %b.name_any(), %reason, "skipping backup");
                None
            }
        })
        .collect()
}

fn anchor(backup: &Backup) -> Result<BackupAnchor, String> {
    let raw = backup
        .timestamp_annotation()
        .ok_or("missing timestamp annotation")?;
    let time = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| format!("bad timestamp '{raw}': {e}"))?
        .with_timezone(&Utc);
    let scn = backup.scn_annotation().ok_or("missing SCN annotation")?;
    Ok(BackupAnchor {
        time,
        scn: scn.to_string(),
        incarnation: backup.incarnation().map(String::from),
    })
}

/// Windows for `ranges` anchored at the first backup inside each range
///
/// For each range the earliest anchor at or after the range start is used;
/// the range yields nothing if there is none or it falls after the range
/// end. Anchors sharing a timestamp collapse to the last one given.
pub fn merge_windows(
    anchors: &[BackupAnchor],
    ranges: &[RecoverableRange],
) -> (Vec<TimeWindow>, Vec<ScnWindow>) {
    let by_time: BTreeMap<DateTime<Utc>, &BackupAnchor> =
        anchors.iter().map(|a| (a.time, a)).collect();

    let mut time = Vec::new();
    let mut scn = Vec::new();
    for range in ranges {
        let Some((_, first)) = by_time.range(range.start.time..).next() else {
            continue;
        };
        if first.time > range.end.time {
            continue;
        }
        time.push(TimeWindow {
            begin: first.time,
            end: range.end.time,
        });
        scn.push(ScnWindow {
            begin: first.scn.clone(),
            end: range.end.scn.clone(),
        });
    }
    (time, scn)
}

/// Filter `backups` to usable anchors and merge them with `ranges`
pub fn compute_windows(
    backups: &[Backup],
    ranges: &[RecoverableRange],
    current_incarnation: &str,
) -> RecoveryWindows {
    let anchors = succeeded_anchors(backups);
    let (time, scn) = merge_windows(&anchors, ranges);
    RecoveryWindows {
        time,
        scn,
        current_incarnation: current_incarnation.to_string(),
    }
}
