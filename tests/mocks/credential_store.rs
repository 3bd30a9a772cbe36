use async_trait::async_trait;
use serde_json::Value;
use service_broker::gateway::{CredentialStoreError, CredentialStoreGateway};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
pub struct MockCredentialStoreState {
    pub stored: HashMap<String, Value>,
    pub deleted: Vec<String>,
    pub auth_attempts: u32,
    /// Authentication reports an unresolvable host this many more times
    pub dns_failures_remaining: u32,
    pub auth_error: Option<CredentialStoreError>,
    pub set_error: Option<CredentialStoreError>,
    pub delete_error: Option<CredentialStoreError>,
}

#[derive(Debug, Clone, Default)]
pub struct MockCredentialStore {
    state: Arc<Mutex<MockCredentialStoreState>>,
}

impl MockCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dns_failures(self, count: u32) -> Self {
        self.state.lock().unwrap().dns_failures_remaining = count;
        self
    }

    pub fn with_auth_error(self, error: CredentialStoreError) -> Self {
        self.state.lock().unwrap().auth_error = Some(error);
        self
    }

    pub fn with_set_error(self, error: CredentialStoreError) -> Self {
        self.state.lock().unwrap().set_error = Some(error);
        self
    }

    pub fn with_delete_error(self, error: CredentialStoreError) -> Self {
        self.state.lock().unwrap().delete_error = Some(error);
        self
    }

    pub fn stored(&self, key: &str) -> Option<Value> {
        self.state.lock().unwrap().stored.get(key).cloned()
    }

    pub fn auth_attempts(&self) -> u32 {
        self.state.lock().unwrap().auth_attempts
    }

    pub fn get_state(&self) -> Arc<Mutex<MockCredentialStoreState>> {
        self.state.clone()
    }
}

#[async_trait]
impl CredentialStoreGateway for MockCredentialStore {
    async fn set(&self, key: &str, value: &Value) -> Result<(), CredentialStoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.set_error.clone() {
            return Err(err);
        }
        state.stored.insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CredentialStoreError> {
        let mut state = self.state.lock().unwrap();
        state.deleted.push(key.to_string());
        if let Some(err) = state.delete_error.clone() {
            return Err(err);
        }
        state.stored.remove(key);
        Ok(())
    }

    async fn authenticate(&self) -> Result<(), CredentialStoreError> {
        let mut state = self.state.lock().unwrap();
        state.auth_attempts += 1;
        if state.dns_failures_remaining > 0 {
            state.dns_failures_remaining -= 1;
            return Err(CredentialStoreError::DnsUnresolvable {
                host: "credhub.service.internal".to_string(),
            });
        }
        match state.auth_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
