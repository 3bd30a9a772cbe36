//! # Collaborator Gateways
//!
//! Interfaces the orchestration layer consumes but does not implement:
//!
//! - [`DeploymentGateway`]: task submission and polling on the deployment backend
//! - [`CredentialStoreGateway`]: secret-store writes for binding credentials
//! - [`InventoryClient`]: platform enumeration of an offering's instances
//!
//! Wire clients for these live outside this crate. Tests provide in-memory mocks.

pub mod credential_store;
pub mod deployment;
pub mod inventory;

pub use credential_store::{CredentialStoreError, CredentialStoreGateway, CredentialValue};
pub use deployment::{
    DeploymentGateway, DeploymentManifest, DeploymentRecord, GatewayError, TaskState, TaskStatus,
};
pub use inventory::{Instance, InventoryClient, InventoryError};
