use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A provisioned service instance as enumerated by the platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instance {
    pub guid: String,
    pub plan_id: String,
}

impl Instance {
    pub fn new(guid: impl Into<String>, plan_id: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            plan_id: plan_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("service offering {offering_id} not found")]
    OfferingNotFound { offering_id: String },

    #[error("platform inventory unavailable: {reason}")]
    Unavailable { reason: String },
}

#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Instances of an offering in the platform's natural, stable order
    async fn list_instances(&self, offering_id: &str) -> Result<Vec<Instance>, InventoryError>;
}
