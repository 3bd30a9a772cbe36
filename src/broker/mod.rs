//! # Broker
//!
//! The marketplace lifecycle contract ([`ServiceBroker`]), the operator-facing
//! management surface used by fleet rollouts ([`ManagementSurface`]) and their
//! deployment-backed implementation, [`BrokerCore`].
//!
//! Augmentations such as credential persistence wrap a broker and implement the
//! same traits, so they can be chained or left out by configuration.

pub mod core;
pub mod requests;

use crate::error::BrokerResult;
use crate::gateway::Instance;
use crate::operation::{LastOperation, OperationToken};
use async_trait::async_trait;

pub use self::core::BrokerCore;
pub use requests::{
    BindRequest, BindResponse, DeprovisionRequest, DeprovisionResponse, OperationAccepted,
    ProvisionRequest, TriggerOutcome, UnbindRequest, UpdateRequest,
};

/// Marketplace lifecycle contract
#[async_trait]
pub trait ServiceBroker: Send + Sync {
    async fn provision(&self, request: ProvisionRequest) -> BrokerResult<OperationAccepted>;

    async fn update(&self, request: UpdateRequest) -> BrokerResult<OperationAccepted>;

    async fn deprovision(&self, request: DeprovisionRequest) -> BrokerResult<DeprovisionResponse>;

    async fn bind(&self, request: BindRequest) -> BrokerResult<BindResponse>;

    async fn unbind(&self, request: UnbindRequest) -> BrokerResult<()>;

    /// Resolve the opaque `operation` string issued for `instance_id`
    async fn last_operation(
        &self,
        instance_id: &str,
        operation_data: &str,
    ) -> BrokerResult<LastOperation>;
}

/// Per-instance administrative operations
#[async_trait]
pub trait ManagementSurface: Send + Sync {
    /// Re-deploy an instance onto its plan's declared revision
    async fn trigger_upgrade(&self, instance: &Instance) -> BrokerResult<TriggerOutcome>;

    async fn trigger_recreate(&self, instance: &Instance) -> BrokerResult<TriggerOutcome>;

    async fn operation_status(
        &self,
        instance_id: &str,
        token: &OperationToken,
    ) -> BrokerResult<LastOperation>;
}
