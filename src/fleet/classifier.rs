//! Transient-versus-fatal classification of per-instance failures.
//!
//! Transient failures are retried on the same instance up to `max_attempts`;
//! fatal failures mark the instance `Failed` immediately.
//!
//! | Source | Transient | Fatal |
//! |---|---|---|
//! | trigger | deployment busy, backend unreachable, timeout, 5xx | client errors, rejection, not found |
//! | poll | any transport error except not found/rejection | client errors, not found, rejection |
//! | task | | task terminated failed |
//! | deadline | | per-instance timeout, abandoned on stop |

use crate::error::{BrokerError, ClientError};
use crate::gateway::{CredentialStoreError, GatewayError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    Transient,
    Fatal,
}

impl FailureClass {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// Classify an error returned while triggering an instance operation
pub fn classify_trigger_error(err: &BrokerError) -> FailureClass {
    match err {
        BrokerError::Client(ClientError::OperationInProgress { .. }) => FailureClass::Transient,
        BrokerError::Client(_) => FailureClass::Fatal,
        BrokerError::Gateway(gateway) if gateway.is_transient() => FailureClass::Transient,
        BrokerError::Gateway(_) => FailureClass::Fatal,
        BrokerError::CredentialStore(store) => classify_store_error(store),
    }
}

/// Classify an error returned while polling a triggered operation
pub fn classify_poll_error(err: &BrokerError) -> FailureClass {
    match err {
        BrokerError::Gateway(GatewayError::NotFound { .. } | GatewayError::Rejected { .. }) => {
            FailureClass::Fatal
        }
        BrokerError::Gateway(_) => FailureClass::Transient,
        BrokerError::Client(_) => FailureClass::Fatal,
        BrokerError::CredentialStore(store) => classify_store_error(store),
    }
}

/// A backend task that ran and terminated failed is not retried
pub fn classify_task_failure() -> FailureClass {
    FailureClass::Fatal
}

/// A timed-out instance may still have a backend task running, so it is never re-triggered
pub fn classify_instance_timeout() -> FailureClass {
    FailureClass::Fatal
}

fn classify_store_error(err: &CredentialStoreError) -> FailureClass {
    match err {
        CredentialStoreError::DnsUnresolvable { .. } | CredentialStoreError::Connection { .. } => {
            FailureClass::Transient
        }
        _ => FailureClass::Fatal,
    }
}
