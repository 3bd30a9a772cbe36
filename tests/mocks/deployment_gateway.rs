use async_trait::async_trait;
use service_broker::gateway::{
    DeploymentGateway, DeploymentManifest, DeploymentRecord, GatewayError, TaskState, TaskStatus,
};
use service_broker::maintenance_info::MaintenanceInfo;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// What one submitted task was for
#[derive(Debug, Clone, PartialEq)]
pub enum SubmittedTask {
    Deploy(DeploymentManifest),
    Delete(String),
    Errand { deployment: String, errand: String },
    Recreate(String),
}

#[derive(Debug, Clone)]
pub struct MockTask {
    pub status: TaskStatus,
    pub deployment: String,
    pub kind: SubmittedTask,
    pub polls: u32,
}

#[derive(Debug, Default)]
pub struct MockDeploymentState {
    pub deployments: HashMap<String, DeploymentRecord>,
    pub tasks: HashMap<u64, MockTask>,
    /// Every submission attempt in call order, including rejected ones
    pub submissions: Vec<SubmittedTask>,
    pub next_task_id: u64,
    pub submit_error: Option<GatewayError>,
    pub poll_error: Option<GatewayError>,
    /// Tasks become `Done` once polled this many times
    pub auto_complete_after: Option<u32>,
}

/// Deployment backend backed by in-memory maps
#[derive(Debug, Clone, Default)]
pub struct MockDeploymentGateway {
    state: Arc<Mutex<MockDeploymentState>>,
}

impl MockDeploymentGateway {
    pub fn new() -> Self {
        let gateway = Self::default();
        gateway.state.lock().unwrap().next_task_id = 1000;
        gateway
    }

    pub fn with_auto_complete(self, polls: u32) -> Self {
        self.state.lock().unwrap().auto_complete_after = Some(polls);
        self
    }

    pub fn add_deployment(
        &self,
        name: &str,
        plan_id: &str,
        maintenance_info: Option<MaintenanceInfo>,
    ) {
        self.state.lock().unwrap().deployments.insert(
            name.to_string(),
            DeploymentRecord {
                name: name.to_string(),
                plan_id: plan_id.to_string(),
                parameters: serde_json::json!({"size": "small"}),
                maintenance_info,
            },
        );
    }

    pub fn set_task_state(&self, task_id: u64, state: TaskState, description: &str) {
        let mut guard = self.state.lock().unwrap();
        let task = guard
            .tasks
            .get_mut(&task_id)
            .unwrap_or_else(|| panic!("unknown task {task_id}"));
        task.status.state = state;
        task.status.description = description.to_string();
    }

    pub fn fail_submissions(&self, error: Option<GatewayError>) {
        self.state.lock().unwrap().submit_error = error;
    }

    pub fn fail_polls(&self, error: Option<GatewayError>) {
        self.state.lock().unwrap().poll_error = error;
    }

    /// Task IDs started for a deployment, oldest first
    pub fn task_ids_for(&self, deployment: &str) -> Vec<u64> {
        let guard = self.state.lock().unwrap();
        let mut ids: Vec<u64> = guard
            .tasks
            .values()
            .filter(|task| task.deployment == deployment)
            .map(|task| task.status.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn task(&self, task_id: u64) -> Option<MockTask> {
        self.state.lock().unwrap().tasks.get(&task_id).cloned()
    }

    pub fn submissions(&self) -> Vec<SubmittedTask> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn get_state(&self) -> Arc<Mutex<MockDeploymentState>> {
        self.state.clone()
    }

    fn start_task(
        state: &mut MockDeploymentState,
        deployment: &str,
        context_id: &str,
        kind: SubmittedTask,
    ) -> u64 {
        let id = state.next_task_id;
        state.next_task_id += 1;
        state.tasks.insert(
            id,
            MockTask {
                status: TaskStatus {
                    id,
                    state: TaskState::Queued,
                    description: String::new(),
                    context_id: context_id.to_string(),
                },
                deployment: deployment.to_string(),
                kind,
                polls: 0,
            },
        );
        id
    }
}

#[async_trait]
impl DeploymentGateway for MockDeploymentGateway {
    async fn submit_deploy(
        &self,
        manifest: &DeploymentManifest,
        context_id: &str,
    ) -> Result<u64, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.submissions.push(SubmittedTask::Deploy(manifest.clone()));
        if let Some(err) = state.submit_error.clone() {
            return Err(err);
        }

        state.deployments.insert(
            manifest.deployment_name.clone(),
            DeploymentRecord {
                name: manifest.deployment_name.clone(),
                plan_id: manifest.plan_id.clone(),
                parameters: manifest.parameters.clone(),
                maintenance_info: manifest.maintenance_info.clone(),
            },
        );
        Ok(Self::start_task(
            &mut state,
            &manifest.deployment_name,
            context_id,
            SubmittedTask::Deploy(manifest.clone()),
        ))
    }

    async fn submit_delete(
        &self,
        deployment_name: &str,
        context_id: &str,
    ) -> Result<u64, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state
            .submissions
            .push(SubmittedTask::Delete(deployment_name.to_string()));
        if let Some(err) = state.submit_error.clone() {
            return Err(err);
        }
        if state.deployments.remove(deployment_name).is_none() {
            return Err(GatewayError::not_found(format!("deployment {deployment_name}")));
        }

        Ok(Self::start_task(
            &mut state,
            deployment_name,
            context_id,
            SubmittedTask::Delete(deployment_name.to_string()),
        ))
    }

    async fn submit_errand(
        &self,
        deployment_name: &str,
        errand: &str,
        context_id: &str,
    ) -> Result<u64, GatewayError> {
        let kind = SubmittedTask::Errand {
            deployment: deployment_name.to_string(),
            errand: errand.to_string(),
        };
        let mut state = self.state.lock().unwrap();
        state.submissions.push(kind.clone());
        if let Some(err) = state.submit_error.clone() {
            return Err(err);
        }

        Ok(Self::start_task(&mut state, deployment_name, context_id, kind))
    }

    async fn submit_recreate(
        &self,
        deployment_name: &str,
        context_id: &str,
    ) -> Result<u64, GatewayError> {
        let kind = SubmittedTask::Recreate(deployment_name.to_string());
        let mut state = self.state.lock().unwrap();
        state.submissions.push(kind.clone());
        if let Some(err) = state.submit_error.clone() {
            return Err(err);
        }
        if !state.deployments.contains_key(deployment_name) {
            return Err(GatewayError::not_found(format!("deployment {deployment_name}")));
        }

        Ok(Self::start_task(&mut state, deployment_name, context_id, kind))
    }

    async fn poll_task(&self, task_id: u64) -> Result<TaskStatus, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.poll_error.clone() {
            return Err(err);
        }

        let auto_complete_after = state.auto_complete_after;
        let task = state
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| GatewayError::not_found(format!("task {task_id}")))?;
        task.polls += 1;
        if let Some(polls) = auto_complete_after {
            if task.polls >= polls && !task.status.state.is_terminal() {
                task.status.state = TaskState::Done;
            }
        }
        Ok(task.status.clone())
    }

    async fn tasks_for_context(
        &self,
        deployment_name: &str,
        context_id: &str,
    ) -> Result<Vec<TaskStatus>, GatewayError> {
        let state = self.state.lock().unwrap();
        let mut tasks: Vec<TaskStatus> = state
            .tasks
            .values()
            .filter(|task| {
                task.deployment == deployment_name && task.status.context_id == context_id
            })
            .map(|task| task.status.clone())
            .collect();
        tasks.sort_by_key(|task| task.id);
        Ok(tasks)
    }

    async fn deployment(
        &self,
        deployment_name: &str,
    ) -> Result<Option<DeploymentRecord>, GatewayError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .deployments
            .get(deployment_name)
            .cloned())
    }

    async fn active_task(&self, deployment_name: &str) -> Result<Option<TaskStatus>, GatewayError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tasks
            .values()
            .filter(|task| task.deployment == deployment_name && !task.status.state.is_terminal())
            .map(|task| task.status.clone())
            .min_by_key(|status| status.id))
    }
}
