//! In-memory collaborators for integration tests.
//!
//! Every mock keeps its state behind `Arc<Mutex<_>>` so a test can hand a clone to
//! the code under test and inspect what happened afterwards via `get_state()`.

#![allow(dead_code)]

pub mod credential_store;
pub mod deployment_gateway;
pub mod inventory;
pub mod management;

pub use credential_store::MockCredentialStore;
pub use deployment_gateway::MockDeploymentGateway;
pub use inventory::MockInventory;
pub use management::{InstanceBehavior, MockManagement};
