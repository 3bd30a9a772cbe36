#![allow(clippy::doc_markdown)] // Allow technical terms like LastOperation, MaintenanceInfo in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Service Broker Orchestration Core
//!
//! The decision layer of an on-demand service broker: it turns marketplace
//! lifecycle requests into deployment-system tasks and rolls administrative
//! operations out across whole fleets of instances.
//!
//! ## Overview
//!
//! - **Asynchronous lifecycle**: provision, update and deprovision start backend
//!   tasks and hand back an opaque [`OperationToken`]; LastOperation polls resolve
//!   the token from any broker process, with no server-side operation map.
//! - **Maintenance-info reconciliation**: requests carrying version metadata are
//!   checked against the catalog before any deployment is attempted, and updates are
//!   classified as plain updates or upgrades.
//! - **Fleet rollouts**: canary-first, concurrency-bounded, retrying upgrade or
//!   recreate across every instance of an offering, with one aggregate report.
//! - **Credential persistence**: a decorator that writes binding credentials to an
//!   external secret store.
//!
//! ## Module Organization
//!
//! - [`broker`] - Marketplace contract, management surface and [`BrokerCore`]
//! - [`maintenance_info`] - Maintenance metadata and the reconciler
//! - [`operation`] - Operation tokens and the operation state machine
//! - [`fleet`] - Bulk rollouts
//! - [`credentials`] - Credential-store decorator
//! - [`gateway`] - Collaborator interfaces (deployment backend, secret store, inventory)
//! - [`resilience`] - Predicate-gated retry with exponential delay
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use service_broker::broker::{BrokerCore, ServiceBroker};
//! use service_broker::catalog::Catalog;
//! use service_broker::config::ConfigManager;
//! use service_broker::gateway::DeploymentGateway;
//! use std::sync::Arc;
//!
//! # async fn example(gateway: Arc<dyn DeploymentGateway>) -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load_from_file("config/broker.yaml")?;
//! service_broker::logging::init_structured_logging(&manager.config().logging);
//!
//! let broker = BrokerCore::new(
//!     Arc::new(Catalog::default()),
//!     gateway,
//!     manager.config().broker.clone(),
//! );
//! let status = broker.last_operation("instance-id", "opaque-operation").await?;
//! println!("{}: {}", status.state, status.description);
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod catalog;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fleet;
pub mod gateway;
pub mod logging;
pub mod maintenance_info;
pub mod operation;
pub mod resilience;

pub use broker::{BrokerCore, ManagementSurface, ServiceBroker, TriggerOutcome};
pub use catalog::{Catalog, Plan, ServiceOffering};
pub use config::{BrokerConfig, ConfigManager, ConfigurationError};
pub use credentials::CredentialAugmentingDecorator;
pub use error::{BrokerError, BrokerResult, ClientError};
pub use fleet::{FleetConfig, FleetError, FleetIterator, FleetOperationKind, FleetReport};
pub use maintenance_info::{MaintenanceInfo, MaintenanceInfoReconciler, UpdateKind};
pub use operation::{LastOperation, LastOperationState, OperationState, OperationToken, OperationType};
