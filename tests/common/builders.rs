use serde_json::json;
use service_broker::broker::{
    BindRequest, BrokerCore, DeprovisionRequest, ProvisionRequest, UnbindRequest, UpdateRequest,
};
use service_broker::catalog::{Catalog, Plan, ServiceOffering};
use service_broker::config::BrokerSettings;
use service_broker::maintenance_info::MaintenanceInfo;
use std::sync::Arc;

use crate::mocks::MockDeploymentGateway;

pub const SERVICE_ID: &str = "redis-offering";
pub const DEPLOYMENT_PREFIX: &str = "service-instance_";

/// Plan without maintenance info
pub const PLAIN_PLAN: &str = "small";
/// Plan declaring [`gold_maintenance_info`]
pub const VERSIONED_PLAN: &str = "gold";
/// Versioned plan with a post-deploy errand
pub const ERRAND_PLAN: &str = "gold-with-smoke-tests";
pub const SMOKE_TESTS: &str = "smoke-tests";

pub fn gold_maintenance_info() -> MaintenanceInfo {
    MaintenanceInfo::with_version("1.2.3")
        .with_public("stemcell", "621.1")
        .with_private("digest-abc")
}

pub fn test_catalog() -> Catalog {
    Catalog::new(vec![ServiceOffering {
        id: SERVICE_ID.to_string(),
        name: "redis".to_string(),
        plans: vec![
            Plan::new(PLAIN_PLAN, "small"),
            Plan::new(VERSIONED_PLAN, "gold").with_maintenance_info(gold_maintenance_info()),
            Plan::new(ERRAND_PLAN, "gold-smoke")
                .with_maintenance_info(gold_maintenance_info())
                .with_post_deploy_errand(SMOKE_TESTS),
        ],
    }])
}

pub fn test_settings() -> BrokerSettings {
    BrokerSettings {
        service_id: SERVICE_ID.to_string(),
        deployment_name_prefix: DEPLOYMENT_PREFIX.to_string(),
        credential_salt: "pepper".to_string(),
        require_async: true,
    }
}

pub fn deployment_name(instance_id: &str) -> String {
    format!("{DEPLOYMENT_PREFIX}{instance_id}")
}

pub fn broker_with(gateway: &MockDeploymentGateway) -> BrokerCore {
    BrokerCore::new(
        Arc::new(test_catalog()),
        Arc::new(gateway.clone()),
        test_settings(),
    )
}

pub fn provision_request(instance_id: &str, plan_id: &str) -> ProvisionRequest {
    ProvisionRequest {
        instance_id: instance_id.to_string(),
        service_id: SERVICE_ID.to_string(),
        plan_id: plan_id.to_string(),
        parameters: json!({"size": "large"}),
        maintenance_info: None,
        accepts_incomplete: true,
    }
}

pub fn update_request(instance_id: &str, plan_id: &str) -> UpdateRequest {
    UpdateRequest {
        instance_id: instance_id.to_string(),
        service_id: SERVICE_ID.to_string(),
        plan_id: plan_id.to_string(),
        previous_plan_id: Some(plan_id.to_string()),
        parameters: serde_json::Value::Null,
        maintenance_info: None,
        accepts_incomplete: true,
    }
}

pub fn deprovision_request(instance_id: &str) -> DeprovisionRequest {
    DeprovisionRequest {
        instance_id: instance_id.to_string(),
        service_id: SERVICE_ID.to_string(),
        plan_id: PLAIN_PLAN.to_string(),
        accepts_incomplete: true,
    }
}

pub fn bind_request(instance_id: &str, binding_id: &str) -> BindRequest {
    BindRequest {
        instance_id: instance_id.to_string(),
        binding_id: binding_id.to_string(),
        service_id: SERVICE_ID.to_string(),
        plan_id: PLAIN_PLAN.to_string(),
        parameters: serde_json::Value::Null,
    }
}

pub fn unbind_request(instance_id: &str, binding_id: &str) -> UnbindRequest {
    UnbindRequest {
        instance_id: instance_id.to_string(),
        binding_id: binding_id.to_string(),
        service_id: SERVICE_ID.to_string(),
        plan_id: PLAIN_PLAN.to_string(),
    }
}
