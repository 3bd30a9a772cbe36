//! # Maintenance Info Reconciliation
//!
//! Decides whether an incoming provision/update request is consistent with the
//! maintenance metadata the catalog declares for its plan, and whether an update is
//! a plain parameter change or a version-bearing upgrade.
//!
//! Both decisions are pure: they read the catalog snapshot once and never touch the
//! deployment backend, so a rejected request causes no partial mutation.

use crate::catalog::Catalog;
use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Advisory emitted when the catalog declares maintenance info but the client sent none.
/// Older marketplace clients predate the field, so this is never a failure.
pub const MISSING_MAINTENANCE_INFO_WARNING: &str =
    "maintenance info defined in broker catalog but not passed in request";

/// Version metadata identifying a plan's deployable revision.
///
/// Equality compares all three fields; `public` is compared as a set of key/value
/// pairs, independent of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceInfo {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub public: BTreeMap<String, String>,
    #[serde(default)]
    pub private: String,
}

impl MaintenanceInfo {
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn with_public(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.public.insert(key.into(), value.into());
        self
    }

    pub fn with_private(mut self, private: impl Into<String>) -> Self {
        self.private = private.into();
        self
    }
}

/// How an accepted update request is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    /// Parameter or plan change
    Update,
    /// Intentional re-deploy onto the plan's declared revision
    Upgrade,
}

/// Stateless decision functions over request, catalog and plan maintenance info
pub struct MaintenanceInfoReconciler;

impl MaintenanceInfoReconciler {
    /// Check a request's maintenance info against the plan declared in the catalog.
    ///
    /// `warn` receives advisories that must reach the requester without failing
    /// the request.
    pub fn check<F>(
        plan_id: &str,
        requested: Option<&MaintenanceInfo>,
        catalog: &Catalog,
        mut warn: F,
    ) -> Result<(), ClientError>
    where
        F: FnMut(&str),
    {
        let plan = catalog
            .find_plan(plan_id)
            .ok_or_else(|| ClientError::PlanNotFound {
                plan_id: plan_id.to_string(),
            })?;

        match (requested, plan.maintenance_info.as_ref()) {
            (None, None) => Ok(()),
            (None, Some(_)) => {
                warn(MISSING_MAINTENANCE_INFO_WARNING);
                Ok(())
            }
            (Some(_), None) => Err(ClientError::MaintenanceInfoNilConflict {
                plan_id: plan_id.to_string(),
            }),
            (Some(requested), Some(declared)) if requested == declared => Ok(()),
            (Some(_), Some(_)) => Err(ClientError::MaintenanceInfoConflict {
                plan_id: plan_id.to_string(),
            }),
        }
    }

    /// Classify an update request as a plain update or an upgrade.
    ///
    /// A request carrying maintenance info that differs from the plan's is rejected
    /// before any deployment is attempted.
    pub fn classify_update(
        plan_id: &str,
        requested: Option<&MaintenanceInfo>,
        plan_maintenance_info: Option<&MaintenanceInfo>,
    ) -> Result<UpdateKind, ClientError> {
        match requested {
            Some(requested) if Some(requested) != plan_maintenance_info => {
                Err(ClientError::PlanMismatch {
                    plan_id: plan_id.to_string(),
                })
            }
            Some(_) => Ok(UpdateKind::Upgrade),
            None => Ok(UpdateKind::Update),
        }
    }
}
