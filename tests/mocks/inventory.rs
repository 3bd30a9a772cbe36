use async_trait::async_trait;
use service_broker::gateway::{Instance, InventoryClient, InventoryError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
pub struct MockInventoryState {
    pub offerings: HashMap<String, Vec<Instance>>,
    pub error: Option<InventoryError>,
    pub list_calls: u32,
}

#[derive(Debug, Clone, Default)]
pub struct MockInventory {
    state: Arc<Mutex<MockInventoryState>>,
}

impl MockInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// `count` instances of `offering_id` on `plan_id`, named `i-0`, `i-1`, ...
    pub fn with_instances(offering_id: &str, plan_id: &str, count: usize) -> Self {
        let inventory = Self::new();
        inventory.set_instances(
            offering_id,
            (0..count)
                .map(|n| Instance::new(format!("i-{n}"), plan_id))
                .collect(),
        );
        inventory
    }

    pub fn set_instances(&self, offering_id: &str, instances: Vec<Instance>) {
        self.state
            .lock()
            .unwrap()
            .offerings
            .insert(offering_id.to_string(), instances);
    }

    pub fn fail_with(&self, error: InventoryError) {
        self.state.lock().unwrap().error = Some(error);
    }

    pub fn get_state(&self) -> Arc<Mutex<MockInventoryState>> {
        self.state.clone()
    }
}

#[async_trait]
impl InventoryClient for MockInventory {
    async fn list_instances(&self, offering_id: &str) -> Result<Vec<Instance>, InventoryError> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        if let Some(err) = state.error.clone() {
            return Err(err);
        }
        state
            .offerings
            .get(offering_id)
            .cloned()
            .ok_or_else(|| InventoryError::OfferingNotFound {
                offering_id: offering_id.to_string(),
            })
    }
}
