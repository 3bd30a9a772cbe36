use async_trait::async_trait;
use service_broker::broker::{ManagementSurface, TriggerOutcome};
use service_broker::error::{BrokerError, BrokerResult};
use service_broker::fleet::FleetOperationKind;
use service_broker::gateway::{GatewayError, Instance};
use service_broker::operation::{LastOperation, OperationToken, OperationType};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Scripted reaction of one instance to one trigger
#[derive(Debug, Clone)]
pub enum InstanceBehavior {
    /// Task reports success on the given poll
    Succeed { polls: u32 },
    /// Task ends failed with this backend text
    FailTask(String),
    /// The trigger itself fails
    TriggerError(BrokerError),
    /// Every poll fails
    PollError(BrokerError),
    AlreadyCurrent,
    Gone,
    /// Task never reaches a terminal state
    NeverFinishes,
    /// The trigger call never returns
    TriggerHangs,
    /// The trigger is accepted but every poll call never returns
    PollHangs,
}

#[derive(Debug, Clone)]
pub struct MockTask {
    pub instance_guid: String,
    pub behavior: InstanceBehavior,
    pub polls: u32,
    pub finished: bool,
}

#[derive(Debug)]
pub struct MockManagementState {
    /// Per-instance behaviors consumed one per trigger; the last one repeats
    pub scripts: HashMap<String, VecDeque<InstanceBehavior>>,
    pub default_behavior: InstanceBehavior,
    pub triggers: Vec<(String, FleetOperationKind)>,
    pub tasks: HashMap<u64, MockTask>,
    pub in_flight: usize,
    pub max_in_flight: usize,
    pub next_task_id: u64,
}

impl Default for MockManagementState {
    fn default() -> Self {
        Self {
            scripts: HashMap::new(),
            default_behavior: InstanceBehavior::Succeed { polls: 2 },
            triggers: Vec::new(),
            tasks: HashMap::new(),
            in_flight: 0,
            max_in_flight: 0,
            next_task_id: 1,
        }
    }
}

/// Management surface that records triggers and tracks concurrent in-flight tasks
#[derive(Debug, Clone, Default)]
pub struct MockManagement {
    state: Arc<Mutex<MockManagementState>>,
}

impl MockManagement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(self, behavior: InstanceBehavior) -> Self {
        self.state.lock().unwrap().default_behavior = behavior;
        self
    }

    pub fn script(self, instance_guid: &str, behaviors: Vec<InstanceBehavior>) -> Self {
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(instance_guid.to_string(), behaviors.into());
        self
    }

    pub fn triggered_guids(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .triggers
            .iter()
            .map(|(guid, _)| guid.clone())
            .collect()
    }

    pub fn trigger_count(&self, instance_guid: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .triggers
            .iter()
            .filter(|(guid, _)| guid == instance_guid)
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    pub fn get_state(&self) -> Arc<Mutex<MockManagementState>> {
        self.state.clone()
    }

    /// `None` means the call should never return
    fn trigger(
        &self,
        instance: &Instance,
        kind: FleetOperationKind,
    ) -> Option<BrokerResult<TriggerOutcome>> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        state.triggers.push((instance.guid.clone(), kind));

        let scripted = match state.scripts.get_mut(&instance.guid) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        let behavior = scripted.unwrap_or_else(|| state.default_behavior.clone());

        match behavior {
            InstanceBehavior::TriggerHangs => None,
            InstanceBehavior::TriggerError(err) => Some(Err(err)),
            InstanceBehavior::AlreadyCurrent => Some(Ok(TriggerOutcome::AlreadyCurrent)),
            InstanceBehavior::Gone => Some(Ok(TriggerOutcome::InstanceGone)),
            behavior => {
                let task_id = state.next_task_id;
                state.next_task_id += 1;
                state.in_flight += 1;
                state.max_in_flight = state.max_in_flight.max(state.in_flight);
                state.tasks.insert(
                    task_id,
                    MockTask {
                        instance_guid: instance.guid.clone(),
                        behavior,
                        polls: 0,
                        finished: false,
                    },
                );

                let operation_type = match kind {
                    FleetOperationKind::Upgrade => OperationType::Upgrade,
                    FleetOperationKind::Recreate => OperationType::Recreate,
                };
                Some(Ok(TriggerOutcome::Accepted(OperationToken::new(
                    operation_type,
                    task_id,
                    format!("context-{task_id}"),
                    &instance.plan_id,
                ))))
            }
        }
    }
}

#[async_trait]
impl ManagementSurface for MockManagement {
    async fn trigger_upgrade(&self, instance: &Instance) -> BrokerResult<TriggerOutcome> {
        match self.trigger(instance, FleetOperationKind::Upgrade) {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    async fn trigger_recreate(&self, instance: &Instance) -> BrokerResult<TriggerOutcome> {
        match self.trigger(instance, FleetOperationKind::Recreate) {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    async fn operation_status(
        &self,
        _instance_id: &str,
        token: &OperationToken,
    ) -> BrokerResult<LastOperation> {
        match self.poll(token) {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}

impl MockManagement {
    /// `None` means the poll call should never return
    fn poll(&self, token: &OperationToken) -> Option<BrokerResult<LastOperation>> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        let Some(task) = state.tasks.get_mut(&token.backend_task_id) else {
            return Some(Err(
                GatewayError::not_found(format!("task {}", token.backend_task_id)).into(),
            ));
        };
        task.polls += 1;
        if matches!(task.behavior, InstanceBehavior::PollHangs) {
            return None;
        }

        let (result, terminal) = match &task.behavior {
            InstanceBehavior::Succeed { polls } if task.polls >= *polls => {
                (Ok(LastOperation::succeeded("done")), true)
            }
            InstanceBehavior::FailTask(detail) => (Ok(LastOperation::failed(detail.clone())), true),
            InstanceBehavior::PollError(err) => (Err(err.clone()), false),
            _ => (Ok(LastOperation::in_progress("running")), false),
        };

        if terminal && !task.finished {
            task.finished = true;
            state.in_flight -= 1;
        }
        Some(result)
    }
}
