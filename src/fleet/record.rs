use crate::gateway::Instance;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bulk operation applied to every instance of an offering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FleetOperationKind {
    Upgrade,
    Recreate,
}

impl fmt::Display for FleetOperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upgrade => write!(f, "upgrade"),
            Self::Recreate => write!(f, "recreate"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FleetInstanceStatus {
    /// Not started; canary failures and stopped runs leave instances here
    Pending,
    InProgress,
    Succeeded,
    /// Nothing to do for this instance; counts as success
    Skipped,
    Failed,
}

impl FleetInstanceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Skipped | Self::Failed)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Skipped)
    }
}

impl fmt::Display for FleetInstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Working state for one instance during a fleet run.
///
/// Created `Pending`, driven by the iterator's coordinator, and frozen once it
/// reaches a terminal status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetOperationRecord {
    pub instance_guid: String,
    pub plan_id: String,
    pub status: FleetInstanceStatus,
    /// Backend or broker detail for the most recent failure
    pub last_error: Option<String>,
    pub attempts: u32,
    /// Why an instance was skipped
    pub note: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl FleetOperationRecord {
    pub fn pending(instance: &Instance) -> Self {
        Self {
            instance_guid: instance.guid.clone(),
            plan_id: instance.plan_id.clone(),
            status: FleetInstanceStatus::Pending,
            last_error: None,
            attempts: 0,
            note: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Record the start of attempt number `attempt`. Ignored once terminal.
    pub fn begin_attempt(&mut self, attempt: u32) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        self.status = FleetInstanceStatus::InProgress;
        self.attempts = self.attempts.max(attempt);
        true
    }

    /// Freeze the record in a terminal status. Ignored once terminal.
    pub fn finish(
        &mut self,
        status: FleetInstanceStatus,
        attempts: u32,
        last_error: Option<String>,
        note: Option<String>,
    ) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.attempts = self.attempts.max(attempts);
        self.last_error = last_error;
        self.note = note;
        self.finished_at = Some(Utc::now());
        true
    }
}
