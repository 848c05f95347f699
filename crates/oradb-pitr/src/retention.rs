//! How many scheduled backups cover a recovery window

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;

/// Parse a 5-field (minute precision) or 6/7-field (seconds, optional year)
/// cron expression
pub fn parse_schedule(expr: &str) -> Result<Schedule, cron::error::Error> {
    let normalized = if expr.split_whitespace().count() == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    };
    Schedule::from_str(&normalized)
}

/// Parse a duration such as `7d`, `168h`, `90m` or `1d12h`
///
/// Units are `d`, `h`, `m` and `s`; the total must be positive.
pub fn parse_window(input: &str) -> Result<Duration, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("duration is empty".to_string());
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    for c in trimmed.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let unit_secs = match c {
            'd' => 86_400,
            'h' => 3_600,
            'm' => 60,
            's' => 1,
            other => return Err(format!("unknown unit '{other}' in '{input}'")),
        };
        if digits.is_empty() {
            return Err(format!("unit '{c}' without a number in '{input}'"));
        }
        let n: u64 = digits
            .parse()
            .map_err(|_| format!("number too large in '{input}'"))?;
        total = n
            .checked_mul(unit_secs)
            .and_then(|s| total.checked_add(s))
            .ok_or_else(|| format!("duration '{input}' overflows"))?;
        digits.clear();
    }
    if !digits.is_empty() {
        return Err(format!("missing unit after '{digits}' in '{input}'"));
    }
    if total == 0 {
        return Err(format!("duration '{input}' must be positive"));
    }
    Ok(Duration::from_secs(total))
}

/// Number of backups to keep so the oldest still predates `window`
///
/// Walks the schedule from a fixed epoch, counting fire times until one lands
/// past `epoch + window`, then adds one. A fire time exactly on the boundary
/// counts, so the result errs toward keeping more.
pub fn retention_count(schedule: &Schedule, window: Duration) -> u64 {
    let epoch = DateTime::<Utc>::default();
    let Ok(window) = chrono::Duration::from_std(window) else {
        return u64::MAX;
    };
    let Some(end) = epoch.checked_add_signed(window) else {
        return u64::MAX;
    };

    let mut count = 0u64;
    let mut current = epoch;
    while let Some(next) = schedule.after(&current).next() {
        if next > end {
            break;
        }
        count += 1;
        current = next;
    }
    count + 1
}
