use crate::fleet::record::{FleetInstanceStatus, FleetOperationKind, FleetOperationRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a fleet run ended as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FleetOutcome {
    /// Every instance succeeded or was skipped
    Succeeded,
    /// A canary failed; post-canary instances were never started
    CanaryFailed,
    /// At least one post-canary instance failed
    Failed,
    /// The operator stopped the run
    Cancelled,
    /// The run exceeded its total timeout
    TimedOut,
}

impl fmt::Display for FleetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::CanaryFailed => write!(f, "canary failed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::TimedOut => write!(f, "timed out"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetSummary {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Aggregate result of one fleet run, one record per instance in inventory order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetReport {
    pub offering_id: String,
    pub operation: FleetOperationKind,
    pub outcome: FleetOutcome,
    pub records: Vec<FleetOperationRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl FleetReport {
    pub fn is_success(&self) -> bool {
        self.outcome == FleetOutcome::Succeeded
    }

    pub fn summary(&self) -> FleetSummary {
        self.records
            .iter()
            .fold(FleetSummary::default(), |mut summary, record| {
                summary.total += 1;
                match record.status {
                    FleetInstanceStatus::Pending => summary.pending += 1,
                    FleetInstanceStatus::InProgress => summary.in_progress += 1,
                    FleetInstanceStatus::Succeeded => summary.succeeded += 1,
                    FleetInstanceStatus::Skipped => summary.skipped += 1,
                    FleetInstanceStatus::Failed => summary.failed += 1,
                }
                summary
            })
    }

    pub fn failures(&self) -> Vec<&FleetOperationRecord> {
        self.records
            .iter()
            .filter(|record| record.status == FleetInstanceStatus::Failed)
            .collect()
    }

    pub fn record(&self, instance_guid: &str) -> Option<&FleetOperationRecord> {
        self.records
            .iter()
            .find(|record| record.instance_guid == instance_guid)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for FleetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary();
        writeln!(
            f,
            "[{}] {} of offering {}: {}",
            self.finished_at.to_rfc3339(),
            self.operation,
            self.offering_id,
            self.outcome
        )?;
        writeln!(
            f,
            "Summary: {} instances, {} succeeded, {} skipped, {} failed, {} pending",
            summary.total, summary.succeeded, summary.skipped, summary.failed, summary.pending
        )?;
        for record in self.failures() {
            writeln!(
                f,
                "  {} failed after {} attempt(s): {}",
                record.instance_guid,
                record.attempts,
                record.last_error.as_deref().unwrap_or("no error detail reported")
            )?;
        }
        Ok(())
    }
}
