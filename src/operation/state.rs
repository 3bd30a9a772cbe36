use crate::gateway::TaskState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one asynchronous instance operation
///
/// `Requested → Submitted → {InProgress, Succeeded, Failed, Gone}`. `Gone` only
/// applies to deletes whose deployment no longer exists, and counts as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    /// Request received, nothing submitted yet
    Requested,
    /// Backend task accepted, token handed to the caller
    Submitted,
    /// Backend task queued or processing
    InProgress,
    Succeeded,
    Failed,
    /// Delete of a deployment that does not exist
    Gone,
}

impl OperationState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Gone)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Gone)
    }

    /// Check whether `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: OperationState) -> bool {
        match self {
            Self::Requested => matches!(next, Self::Submitted | Self::Gone | Self::Failed),
            Self::Submitted | Self::InProgress => !matches!(next, Self::Requested | Self::Submitted),
            Self::Succeeded | Self::Failed | Self::Gone => false,
        }
    }

    /// Project onto the three states the marketplace protocol understands
    pub fn last_operation_state(&self) -> LastOperationState {
        match self {
            Self::Requested | Self::Submitted | Self::InProgress => LastOperationState::InProgress,
            Self::Succeeded | Self::Gone => LastOperationState::Succeeded,
            Self::Failed => LastOperationState::Failed,
        }
    }
}

impl From<TaskState> for OperationState {
    fn from(state: TaskState) -> Self {
        match state {
            TaskState::Queued | TaskState::Processing => Self::InProgress,
            TaskState::Done => Self::Succeeded,
            TaskState::Error | TaskState::Timeout | TaskState::Cancelled => Self::Failed,
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => write!(f, "requested"),
            Self::Submitted => write!(f, "submitted"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Gone => write!(f, "gone"),
        }
    }
}

/// Marketplace-visible state of the last operation on an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LastOperationState {
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "succeeded")]
    Succeeded,
    #[serde(rename = "failed")]
    Failed,
}

impl LastOperationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl fmt::Display for LastOperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "in progress"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Result of a LastOperation poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastOperation {
    pub state: LastOperationState,
    /// Human-readable detail; for failures, the backend's error text verbatim
    pub description: String,
}

impl LastOperation {
    pub fn new(state: LastOperationState, description: impl Into<String>) -> Self {
        Self {
            state,
            description: description.into(),
        }
    }

    pub fn in_progress(description: impl Into<String>) -> Self {
        Self::new(LastOperationState::InProgress, description)
    }

    pub fn succeeded(description: impl Into<String>) -> Self {
        Self::new(LastOperationState::Succeeded, description)
    }

    pub fn failed(description: impl Into<String>) -> Self {
        Self::new(LastOperationState::Failed, description)
    }
}
