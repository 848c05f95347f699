//! Pitr spec validation
//!
//! Every violation is collected so a user fixing a spec sees all problems
//! in one pass.

use std::time::Duration;

use cron::Schedule;
use oradb_common::crd::PitrSpec;

use crate::retention::{parse_schedule, parse_window};

/// Storage URI schemes backups can be written to
pub const SUPPORTED_STORAGE_SCHEMES: &[&str] = &["gs://", "s3://"];

/// One invalid field
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldViolation {
    /// Field path (e.g., "spec.backupSchedule")
    pub field: String,
    /// What is wrong with it
    pub message: String,
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All violations found in one spec
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    /// Record a violation
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: field.into(),
            message: message.into(),
        });
    }

    /// True if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Recorded violations in discovery order
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Schedule and window, parsed
#[derive(Clone, Debug)]
pub struct RetentionInputs {
    /// Parsed backup schedule
    pub schedule: Schedule,
    /// Requested recovery window
    pub window: Duration,
}

/// Check a storage URI has a supported scheme and a bucket
pub fn check_storage_uri(uri: &str) -> Result<(), String> {
    let Some(rest) = SUPPORTED_STORAGE_SCHEMES
        .iter()
        .find_map(|scheme| uri.strip_prefix(scheme))
    else {
        return Err(format!(
            "unsupported scheme in '{uri}', expected one of {}",
            SUPPORTED_STORAGE_SCHEMES.join(", ")
        ));
    };
    if rest.split('/').next().unwrap_or_default().is_empty() {
        return Err(format!("'{uri}' has no bucket name"));
    }
    Ok(())
}

/// Parse a schedule and window, collecting violations from both
pub fn validate_retention_inputs(
    schedule: &str,
    window: &str,
) -> Result<RetentionInputs, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let parsed = collect(schedule, window, &mut errors);
    match parsed {
        Some(inputs) if errors.is_empty() => Ok(inputs),
        _ => Err(errors),
    }
}

/// Validate a Pitr spec
pub fn validate_pitr_spec(spec: &PitrSpec) -> Result<RetentionInputs, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if spec.instance_ref.trim().is_empty() {
        errors.push("spec.instanceRef", "must name an Instance");
    }
    if let Err(msg) = check_storage_uri(&spec.storage_uri) {
        errors.push("spec.storageUri", msg);
    }
    let parsed = collect(&spec.backup_schedule, &spec.recovery_window, &mut errors);
    match parsed {
        Some(inputs) if errors.is_empty() => Ok(inputs),
        _ => Err(errors),
    }
}

fn collect(schedule: &str, window: &str, errors: &mut ValidationErrors) -> Option<RetentionInputs> {
    let schedule = parse_schedule(schedule)
        .map_err(|e| errors.push("spec.backupSchedule", format!("invalid cron '{schedule}': {e}")))
        .ok();
    let window = parse_window(window)
        .map_err(|e| errors.push("spec.recoveryWindow", e))
        .ok();
    Some(RetentionInputs {
        schedule: schedule?,
        window: window?,
    })
}
