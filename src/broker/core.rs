//! # Broker Core
//!
//! Maps marketplace lifecycle requests onto deployment-system tasks and resolves
//! operation tokens back into marketplace-visible state.
//!
//! ## Statelessness
//!
//! `BrokerCore` keeps no per-operation state. Everything needed to resume polling
//! travels inside the [`OperationToken`], and the only shared data is the catalog
//! snapshot, read-only after startup. Any number of calls may run concurrently.
//!
//! ## Failure semantics
//!
//! - Reconciliation failures are client errors raised before any backend call.
//! - Submission failures are surfaced immediately and never retried here, since a
//!   repeated deploy submission can start duplicate tasks.
//! - Backend task failures observed while polling become a `Failed` last operation
//!   carrying the backend's error text verbatim.

use crate::broker::requests::{
    BindRequest, BindResponse, DeprovisionRequest, DeprovisionResponse, OperationAccepted,
    ProvisionRequest, TriggerOutcome, UnbindRequest, UpdateRequest,
};
use crate::broker::{ManagementSurface, ServiceBroker};
use crate::catalog::{Catalog, Plan};
use crate::config::BrokerSettings;
use crate::error::{BrokerResult, ClientError};
use crate::gateway::{DeploymentGateway, DeploymentManifest, GatewayError, Instance, TaskStatus};
use crate::logging::log_broker_operation;
use crate::maintenance_info::{MaintenanceInfoReconciler, UpdateKind};
use crate::operation::{LastOperation, OperationState, OperationToken, OperationType};
use async_trait::async_trait;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct BrokerCore {
    catalog: Arc<Catalog>,
    gateway: Arc<dyn DeploymentGateway>,
    settings: BrokerSettings,
}

impl std::fmt::Debug for BrokerCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerCore")
            .field("services", &self.catalog.services.len())
            .field("deployment_name_prefix", &self.settings.deployment_name_prefix)
            .field("require_async", &self.settings.require_async)
            .finish()
    }
}

impl BrokerCore {
    pub fn new(
        catalog: Arc<Catalog>,
        gateway: Arc<dyn DeploymentGateway>,
        settings: BrokerSettings,
    ) -> Self {
        info!(
            services = catalog.services.len(),
            deployment_name_prefix = %settings.deployment_name_prefix,
            require_async = settings.require_async,
            "🚀 BROKER: Core initialized"
        );

        Self {
            catalog,
            gateway,
            settings,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Backend deployment name owned by an instance
    pub fn deployment_name(&self, instance_id: &str) -> String {
        format!("{}{}", self.settings.deployment_name_prefix, instance_id)
    }

    /// Deterministic credentials for a binding: the same identifiers always
    /// produce the same payload.
    pub fn binding_credentials(&self, instance_id: &str, binding_id: &str) -> Value {
        let mut hasher = Sha256::new();
        hasher.update(self.settings.credential_salt.as_bytes());
        hasher.update(b":");
        hasher.update(instance_id.as_bytes());
        hasher.update(b":");
        hasher.update(binding_id.as_bytes());
        let password = hex::encode(hasher.finalize());

        json!({
            "deployment": self.deployment_name(instance_id),
            "username": binding_id,
            "password": password,
        })
    }

    /// Resolve a decoded token into the marketplace-visible state.
    ///
    /// Never retries: a transport error while polling is returned so the caller
    /// polls again on its own cadence.
    pub async fn resolve_operation(
        &self,
        instance_id: &str,
        token: &OperationToken,
    ) -> BrokerResult<LastOperation> {
        let status = self.gateway.poll_task(token.backend_task_id).await?;

        debug!(
            instance_id = %instance_id,
            task_id = status.id,
            context_id = %token.context_id,
            task_state = %status.state,
            "🔍 BROKER: Polled backend task"
        );

        let last_operation = match OperationState::from(status.state) {
            OperationState::Succeeded => match token.post_deploy_errand.as_deref() {
                Some(errand) if token.operation_type.deploys_manifest() => {
                    self.resolve_post_deploy_errand(instance_id, token, errand)
                        .await?
                }
                _ => LastOperation::succeeded(describe(token.operation_type, &status)),
            },
            OperationState::Failed => LastOperation::failed(status.description.clone()),
            _ => LastOperation::in_progress(describe(token.operation_type, &status)),
        };

        if last_operation.state.is_terminal() {
            log_broker_operation(
                &token.operation_type.to_string(),
                instance_id,
                Some(token.backend_task_id),
                &last_operation.state.to_string(),
                Some(&last_operation.description),
            );
        }

        Ok(last_operation)
    }

    /// The deploy task is done; the operation finishes with the errand sharing its context.
    async fn resolve_post_deploy_errand(
        &self,
        instance_id: &str,
        token: &OperationToken,
        errand: &str,
    ) -> BrokerResult<LastOperation> {
        let deployment_name = self.deployment_name(instance_id);
        let errand_task = self
            .gateway
            .tasks_for_context(&deployment_name, &token.context_id)
            .await?
            .into_iter()
            .filter(|task| task.id != token.backend_task_id)
            .last();

        let Some(task) = errand_task else {
            return match self
                .gateway
                .submit_errand(&deployment_name, errand, &token.context_id)
                .await
            {
                Ok(task_id) => {
                    info!(
                        instance_id = %instance_id,
                        errand = %errand,
                        task_id = task_id,
                        context_id = %token.context_id,
                        "🧪 BROKER: Submitted post-deploy errand"
                    );
                    Ok(LastOperation::in_progress(format!(
                        "Running post-deploy errand {errand}"
                    )))
                }
                Err(GatewayError::TaskInProgress { .. }) => Ok(LastOperation::in_progress(
                    format!("Waiting to run post-deploy errand {errand}"),
                )),
                Err(err) => Err(err.into()),
            };
        };

        Ok(match OperationState::from(task.state) {
            OperationState::Succeeded => LastOperation::succeeded(format!(
                "Instance {} completed: post-deploy errand {errand} succeeded",
                token.operation_type
            )),
            OperationState::Failed => LastOperation::failed(task.description),
            _ => LastOperation::in_progress(format!("Running post-deploy errand {errand}")),
        })
    }

    fn require_async(&self, accepts_incomplete: bool) -> Result<(), ClientError> {
        if self.settings.require_async && !accepts_incomplete {
            return Err(ClientError::AsyncRequired);
        }
        Ok(())
    }

    fn plan(&self, plan_id: &str) -> Result<&Plan, ClientError> {
        self.catalog
            .find_plan(plan_id)
            .ok_or_else(|| ClientError::PlanNotFound {
                plan_id: plan_id.to_string(),
            })
    }

    fn reconcile(
        &self,
        instance_id: &str,
        plan_id: &str,
        request: Option<&crate::maintenance_info::MaintenanceInfo>,
    ) -> Result<Vec<String>, ClientError> {
        let mut warnings = Vec::new();
        MaintenanceInfoReconciler::check(plan_id, request, &self.catalog, |warning| {
            warn!(instance_id = %instance_id, plan_id = %plan_id, "⚠️ BROKER: {}", warning);
            warnings.push(warning.to_string());
        })?;
        Ok(warnings)
    }

    async fn submit_deploy(
        &self,
        instance_id: &str,
        manifest: &DeploymentManifest,
        context_id: &str,
    ) -> BrokerResult<u64> {
        self.gateway
            .submit_deploy(manifest, context_id)
            .await
            .map_err(|err| submission_error(instance_id, err))
    }
}

/// A busy deployment is a client-visible conflict; anything else stays a backend error.
fn submission_error(instance_id: &str, err: GatewayError) -> crate::error::BrokerError {
    match err {
        GatewayError::TaskInProgress { .. } => ClientError::OperationInProgress {
            instance_id: instance_id.to_string(),
        }
        .into(),
        other => other.into(),
    }
}

fn describe(operation_type: OperationType, status: &TaskStatus) -> String {
    if status.description.is_empty() {
        format!("Instance {operation_type}: task {} {}", status.id, status.state)
    } else {
        format!("Instance {operation_type}: {}", status.description)
    }
}

#[async_trait]
impl ServiceBroker for BrokerCore {
    async fn provision(&self, request: ProvisionRequest) -> BrokerResult<OperationAccepted> {
        self.require_async(request.accepts_incomplete)?;
        let warnings = self.reconcile(
            &request.instance_id,
            &request.plan_id,
            request.maintenance_info.as_ref(),
        )?;
        let plan = self.plan(&request.plan_id)?;

        let deployment_name = self.deployment_name(&request.instance_id);
        if self.gateway.deployment(&deployment_name).await?.is_some() {
            return Err(ClientError::InstanceAlreadyExists {
                instance_id: request.instance_id,
            }
            .into());
        }

        let context_id = Uuid::new_v4().to_string();
        let manifest = DeploymentManifest {
            deployment_name,
            plan_id: plan.id.clone(),
            parameters: request.parameters,
            maintenance_info: plan.maintenance_info.clone(),
        };
        let task_id = self
            .submit_deploy(&request.instance_id, &manifest, &context_id)
            .await?;

        log_broker_operation(
            "create",
            &request.instance_id,
            Some(task_id),
            "submitted",
            Some(&context_id),
        );

        let token = OperationToken::new(OperationType::Create, task_id, context_id, &plan.id)
            .with_post_deploy_errand(plan.lifecycle_errands.post_deploy.clone());
        Ok(OperationAccepted::new(token).with_warnings(warnings))
    }

    async fn update(&self, request: UpdateRequest) -> BrokerResult<OperationAccepted> {
        self.require_async(request.accepts_incomplete)?;
        let warnings = self.reconcile(
            &request.instance_id,
            &request.plan_id,
            request.maintenance_info.as_ref(),
        )?;
        let plan = self.plan(&request.plan_id)?;
        let kind = MaintenanceInfoReconciler::classify_update(
            &plan.id,
            request.maintenance_info.as_ref(),
            plan.maintenance_info.as_ref(),
        )?;

        let deployment_name = self.deployment_name(&request.instance_id);
        let existing = self
            .gateway
            .deployment(&deployment_name)
            .await?
            .ok_or_else(|| ClientError::InstanceNotFound {
                instance_id: request.instance_id.clone(),
            })?;

        let parameters = if request.parameters.is_null() {
            existing.parameters
        } else {
            request.parameters
        };
        let operation_type = match kind {
            UpdateKind::Update => OperationType::Update,
            UpdateKind::Upgrade => OperationType::Upgrade,
        };

        let context_id = Uuid::new_v4().to_string();
        let manifest = DeploymentManifest {
            deployment_name,
            plan_id: plan.id.clone(),
            parameters,
            maintenance_info: plan.maintenance_info.clone(),
        };
        let task_id = self
            .submit_deploy(&request.instance_id, &manifest, &context_id)
            .await?;

        log_broker_operation(
            &operation_type.to_string(),
            &request.instance_id,
            Some(task_id),
            "submitted",
            request.previous_plan_id.as_deref(),
        );

        let token = OperationToken::new(operation_type, task_id, context_id, &plan.id)
            .with_post_deploy_errand(plan.lifecycle_errands.post_deploy.clone());
        Ok(OperationAccepted::new(token).with_warnings(warnings))
    }

    async fn deprovision(&self, request: DeprovisionRequest) -> BrokerResult<DeprovisionResponse> {
        self.require_async(request.accepts_incomplete)?;

        let deployment_name = self.deployment_name(&request.instance_id);
        let context_id = Uuid::new_v4().to_string();

        match self
            .gateway
            .submit_delete(&deployment_name, &context_id)
            .await
        {
            Ok(task_id) => {
                log_broker_operation(
                    "delete",
                    &request.instance_id,
                    Some(task_id),
                    "submitted",
                    None,
                );
                Ok(DeprovisionResponse::Accepted(OperationToken::new(
                    OperationType::Delete,
                    task_id,
                    context_id,
                    request.plan_id,
                )))
            }
            Err(GatewayError::NotFound { .. }) => {
                log_broker_operation(
                    "delete",
                    &request.instance_id,
                    None,
                    &OperationState::Gone.to_string(),
                    Some("deployment does not exist"),
                );
                Ok(DeprovisionResponse::Completed)
            }
            Err(err) => Err(submission_error(&request.instance_id, err)),
        }
    }

    async fn bind(&self, request: BindRequest) -> BrokerResult<BindResponse> {
        let deployment_name = self.deployment_name(&request.instance_id);
        if self.gateway.deployment(&deployment_name).await?.is_none() {
            return Err(ClientError::InstanceNotFound {
                instance_id: request.instance_id,
            }
            .into());
        }

        log_broker_operation(
            "bind",
            &request.instance_id,
            None,
            "succeeded",
            Some(&request.binding_id),
        );

        Ok(BindResponse {
            credentials: self.binding_credentials(&request.instance_id, &request.binding_id),
        })
    }

    async fn unbind(&self, request: UnbindRequest) -> BrokerResult<()> {
        let deployment_name = self.deployment_name(&request.instance_id);
        if self.gateway.deployment(&deployment_name).await?.is_none() {
            return Err(ClientError::BindingNotFound {
                instance_id: request.instance_id,
                binding_id: request.binding_id,
            }
            .into());
        }

        log_broker_operation(
            "unbind",
            &request.instance_id,
            None,
            "succeeded",
            Some(&request.binding_id),
        );
        Ok(())
    }

    async fn last_operation(
        &self,
        instance_id: &str,
        operation_data: &str,
    ) -> BrokerResult<LastOperation> {
        let token = OperationToken::decode(operation_data)?;
        self.resolve_operation(instance_id, &token).await
    }
}

#[async_trait]
impl ManagementSurface for BrokerCore {
    async fn trigger_upgrade(&self, instance: &Instance) -> BrokerResult<TriggerOutcome> {
        let plan = self.plan(&instance.plan_id)?;
        let deployment_name = self.deployment_name(&instance.guid);

        let Some(record) = self.gateway.deployment(&deployment_name).await? else {
            return Ok(TriggerOutcome::InstanceGone);
        };
        // The record reflects the submitted manifest, not a finished deploy
        if let Some(task) = self.gateway.active_task(&deployment_name).await? {
            debug!(
                instance_id = %instance.guid,
                task_id = task.id,
                "⏳ BROKER: Deployment busy, upgrade not triggered"
            );
            return Err(ClientError::OperationInProgress {
                instance_id: instance.guid.clone(),
            }
            .into());
        }
        if plan.maintenance_info.is_some() && record.maintenance_info == plan.maintenance_info {
            debug!(instance_id = %instance.guid, "⏭️ BROKER: Instance already on plan revision");
            return Ok(TriggerOutcome::AlreadyCurrent);
        }

        let context_id = Uuid::new_v4().to_string();
        let manifest = DeploymentManifest {
            deployment_name,
            plan_id: plan.id.clone(),
            parameters: record.parameters,
            maintenance_info: plan.maintenance_info.clone(),
        };
        let task_id = self
            .submit_deploy(&instance.guid, &manifest, &context_id)
            .await?;

        log_broker_operation("upgrade", &instance.guid, Some(task_id), "submitted", None);

        let token = OperationToken::new(OperationType::Upgrade, task_id, context_id, &plan.id)
            .with_post_deploy_errand(plan.lifecycle_errands.post_deploy.clone());
        Ok(TriggerOutcome::Accepted(token))
    }

    async fn trigger_recreate(&self, instance: &Instance) -> BrokerResult<TriggerOutcome> {
        let deployment_name = self.deployment_name(&instance.guid);
        if self.gateway.deployment(&deployment_name).await?.is_none() {
            return Ok(TriggerOutcome::InstanceGone);
        }

        let context_id = Uuid::new_v4().to_string();
        let task_id = self
            .gateway
            .submit_recreate(&deployment_name, &context_id)
            .await
            .map_err(|err| submission_error(&instance.guid, err))?;

        log_broker_operation("recreate", &instance.guid, Some(task_id), "submitted", None);

        Ok(TriggerOutcome::Accepted(OperationToken::new(
            OperationType::Recreate,
            task_id,
            context_id,
            &instance.plan_id,
        )))
    }

    async fn operation_status(
        &self,
        instance_id: &str,
        token: &OperationToken,
    ) -> BrokerResult<LastOperation> {
        self.resolve_operation(instance_id, token).await
    }
}
