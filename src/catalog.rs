//! # Catalog Snapshot
//!
//! Read-only view of the broker catalog taken at startup. Only the fields the
//! orchestration layer decides on are modelled: plan identity, the plan's declared
//! [`MaintenanceInfo`] and its lifecycle errands.

use crate::maintenance_info::MaintenanceInfo;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub services: Vec<ServiceOffering>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub plans: Vec<Plan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    /// Deployable revision of this plan, if the operator declared one
    #[serde(default)]
    pub maintenance_info: Option<MaintenanceInfo>,
    #[serde(default)]
    pub lifecycle_errands: LifecycleErrands,
}

/// Errands run by the broker around deployment tasks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleErrands {
    /// Errand submitted once the deploy task of a create/update/upgrade is done
    #[serde(default)]
    pub post_deploy: Option<String>,
}

impl Plan {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            maintenance_info: None,
            lifecycle_errands: LifecycleErrands::default(),
        }
    }

    pub fn with_maintenance_info(mut self, maintenance_info: MaintenanceInfo) -> Self {
        self.maintenance_info = Some(maintenance_info);
        self
    }

    pub fn with_post_deploy_errand(mut self, errand: impl Into<String>) -> Self {
        self.lifecycle_errands.post_deploy = Some(errand.into());
        self
    }
}

impl Catalog {
    pub fn new(services: Vec<ServiceOffering>) -> Self {
        Self { services }
    }

    /// Look up a plan by ID across all service offerings
    pub fn find_plan(&self, plan_id: &str) -> Option<&Plan> {
        self.services
            .iter()
            .flat_map(|service| service.plans.iter())
            .find(|plan| plan.id == plan_id)
    }

    pub fn find_service(&self, service_id: &str) -> Option<&ServiceOffering> {
        self.services.iter().find(|service| service.id == service_id)
    }
}
