//! # Fleet Rollouts
//!
//! Bulk upgrade and recreate across every instance of a service offering. See
//! [`FleetIterator`] for the phase and concurrency model.

pub mod classifier;
pub mod config;
pub mod iterator;
pub mod record;
pub mod report;

use crate::gateway::InventoryError;
use thiserror::Error;

pub use classifier::FailureClass;
pub use config::FleetConfig;
pub use iterator::FleetIterator;
pub use record::{FleetInstanceStatus, FleetOperationKind, FleetOperationRecord};
pub use report::{FleetOutcome, FleetReport, FleetSummary};

/// Run-level failures raised before any instance is touched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FleetError {
    #[error("Failed to list instances: {0}")]
    Inventory(#[from] InventoryError),

    #[error("Invalid fleet configuration: {reason}")]
    InvalidConfig { reason: String },
}
