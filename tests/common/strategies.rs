use proptest::collection::btree_map;
use proptest::prelude::*;
use service_broker::maintenance_info::MaintenanceInfo;
use service_broker::operation::{OperationToken, OperationType};

/// Strategy for generating semantic version strings
pub fn version_strategy() -> impl Strategy<Value = String> {
    "[0-9]{1,2}\\.[0-9]{1,2}\\.[0-9]{1,2}"
}

/// Strategy for generating MaintenanceInfo with arbitrary public metadata
pub fn maintenance_info_strategy() -> impl Strategy<Value = MaintenanceInfo> {
    (
        version_strategy(),
        btree_map("[a-z]{1,8}", "[a-z0-9.]{1,8}", 0..4),
        "[a-f0-9]{0,12}",
    )
        .prop_map(|(version, public, private)| MaintenanceInfo {
            version,
            public,
            private,
        })
}

/// Strategy for generating optional request maintenance info
pub fn requested_maintenance_info_strategy() -> impl Strategy<Value = Option<MaintenanceInfo>> {
    prop::option::of(maintenance_info_strategy())
}

pub fn operation_type_strategy() -> impl Strategy<Value = OperationType> {
    prop_oneof![
        Just(OperationType::Create),
        Just(OperationType::Update),
        Just(OperationType::Delete),
        Just(OperationType::Upgrade),
        Just(OperationType::Recreate),
        Just(OperationType::Bind),
        Just(OperationType::Unbind),
    ]
}

/// Strategy for generating decodable operation tokens
pub fn operation_token_strategy() -> impl Strategy<Value = OperationToken> {
    (
        operation_type_strategy(),
        any::<u64>(),
        "[a-f0-9-]{1,36}",
        "[a-z][a-z0-9-]{0,15}",
        prop::option::of("[a-z][a-z-]{0,15}"),
    )
        .prop_map(|(operation_type, task_id, context_id, plan_id, errand)| {
            OperationToken::new(operation_type, task_id, context_id, plan_id)
                .with_post_deploy_errand(errand)
        })
}
