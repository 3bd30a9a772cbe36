//! # Credential Augmenting Decorator
//!
//! Wraps any [`ServiceBroker`] and persists binding credentials into an external
//! secret store under a deterministic key. Every other call is delegated unchanged.
//!
//! ## Startup
//!
//! [`CredentialAugmentingDecorator::connect`] authenticates against the store,
//! retrying with doubling delays only while the store's network name does not
//! resolve yet. Any other connection error aborts construction.
//!
//! ## Write modes
//!
//! - `BestEffort`: the write is spawned; the bind response does not wait for it
//!   and failures are logged.
//! - `Blocking`: the write completes before the bind response is returned and a
//!   failure fails the bind.

use crate::broker::{
    BindRequest, BindResponse, DeprovisionRequest, DeprovisionResponse, ManagementSurface,
    OperationAccepted, ProvisionRequest, ServiceBroker, TriggerOutcome, UnbindRequest,
    UpdateRequest,
};
use crate::config::{CredentialStoreConfig, CredentialWriteMode};
use crate::error::BrokerResult;
use crate::gateway::{CredentialStoreError, CredentialStoreGateway, CredentialValue, Instance};
use crate::operation::{LastOperation, OperationToken};
use crate::resilience::{retry_while, RetryPolicy};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Storage key for one binding's credentials
pub fn credential_key(service_id: &str, instance_id: &str, binding_id: &str) -> String {
    format!("/c/{service_id}/{instance_id}/{binding_id}/credentials")
}

pub struct CredentialAugmentingDecorator<B> {
    inner: B,
    store: Arc<dyn CredentialStoreGateway>,
    service_id: String,
    write_mode: CredentialWriteMode,
}

impl<B> std::fmt::Debug for CredentialAugmentingDecorator<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialAugmentingDecorator")
            .field("service_id", &self.service_id)
            .field("write_mode", &self.write_mode)
            .finish()
    }
}

impl<B> CredentialAugmentingDecorator<B>
where
    B: ServiceBroker,
{
    /// Authenticate against the store, then wrap `inner`.
    ///
    /// Blocks only the caller while the store's DNS name is unresolvable.
    pub async fn connect(
        inner: B,
        store: Arc<dyn CredentialStoreGateway>,
        service_id: impl Into<String>,
        config: &CredentialStoreConfig,
    ) -> Result<Self, CredentialStoreError> {
        Self::connect_with_policy(
            inner,
            store,
            service_id,
            config.write_mode,
            &config.retry_policy(),
        )
        .await
    }

    pub async fn connect_with_policy(
        inner: B,
        store: Arc<dyn CredentialStoreGateway>,
        service_id: impl Into<String>,
        write_mode: CredentialWriteMode,
        policy: &RetryPolicy,
    ) -> Result<Self, CredentialStoreError> {
        let service_id = service_id.into();

        retry_while(
            policy,
            "credential_store_authenticate",
            |err: &CredentialStoreError| matches!(err, CredentialStoreError::DnsUnresolvable { .. }),
            || store.authenticate(),
        )
        .await
        .map_err(|err| {
            error!(service_id = %service_id, error = %err, "❌ CREDENTIALS: Credential store unavailable");
            err
        })?;

        info!(
            service_id = %service_id,
            write_mode = ?write_mode,
            "🔐 CREDENTIALS: Connected to credential store"
        );

        Ok(Self {
            inner,
            store,
            service_id,
            write_mode,
        })
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    async fn store_credentials(
        &self,
        key: String,
        credentials: serde_json::Value,
    ) -> Result<(), CredentialStoreError> {
        CredentialValue::from_json(&credentials)?;

        match self.write_mode {
            CredentialWriteMode::Blocking => {
                self.store.set(&key, &credentials).await?;
                debug!(key = %key, "🔐 CREDENTIALS: Stored binding credentials");
                Ok(())
            }
            CredentialWriteMode::BestEffort => {
                let store = self.store.clone();
                tokio::spawn(async move {
                    match store.set(&key, &credentials).await {
                        Ok(()) => debug!(key = %key, "🔐 CREDENTIALS: Stored binding credentials"),
                        Err(err) => {
                            warn!(key = %key, error = %err, "⚠️ CREDENTIALS: Failed to store binding credentials")
                        }
                    }
                });
                Ok(())
            }
        }
    }
}

#[async_trait]
impl<B> ServiceBroker for CredentialAugmentingDecorator<B>
where
    B: ServiceBroker,
{
    async fn provision(&self, request: ProvisionRequest) -> BrokerResult<OperationAccepted> {
        self.inner.provision(request).await
    }

    async fn update(&self, request: UpdateRequest) -> BrokerResult<OperationAccepted> {
        self.inner.update(request).await
    }

    async fn deprovision(&self, request: DeprovisionRequest) -> BrokerResult<DeprovisionResponse> {
        self.inner.deprovision(request).await
    }

    async fn bind(&self, request: BindRequest) -> BrokerResult<BindResponse> {
        let key = credential_key(&self.service_id, &request.instance_id, &request.binding_id);
        let response = self.inner.bind(request).await?;

        match self.store_credentials(key.clone(), response.credentials.clone()).await {
            Ok(()) => Ok(response),
            Err(err) if self.write_mode == CredentialWriteMode::Blocking => Err(err.into()),
            Err(err) => {
                warn!(key = %key, error = %err, "⚠️ CREDENTIALS: Binding credentials not stored");
                Ok(response)
            }
        }
    }

    async fn unbind(&self, request: UnbindRequest) -> BrokerResult<()> {
        let key = credential_key(&self.service_id, &request.instance_id, &request.binding_id);
        self.inner.unbind(request).await?;

        if let Err(err) = self.store.delete(&key).await {
            warn!(key = %key, error = %err, "⚠️ CREDENTIALS: Failed to delete binding credentials");
        }
        Ok(())
    }

    async fn last_operation(
        &self,
        instance_id: &str,
        operation_data: &str,
    ) -> BrokerResult<LastOperation> {
        self.inner.last_operation(instance_id, operation_data).await
    }
}

#[async_trait]
impl<B> ManagementSurface for CredentialAugmentingDecorator<B>
where
    B: ServiceBroker + ManagementSurface,
{
    async fn trigger_upgrade(&self, instance: &Instance) -> BrokerResult<TriggerOutcome> {
        self.inner.trigger_upgrade(instance).await
    }

    async fn trigger_recreate(&self, instance: &Instance) -> BrokerResult<TriggerOutcome> {
        self.inner.trigger_recreate(instance).await
    }

    async fn operation_status(
        &self,
        instance_id: &str,
        token: &OperationToken,
    ) -> BrokerResult<LastOperation> {
        self.inner.operation_status(instance_id, token).await
    }
}
