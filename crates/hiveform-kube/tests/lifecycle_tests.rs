//! Lifecycle tests against the in-memory object API
//!
//! Time is paused so poll loops advance deterministically.

use std::time::Duration;

use hiveform_core::{
    DeletionPropagation, DesiredState, HiveKind, ObjectMetadata, ResourceConfig, ResourceIdentity,
    ResourceSettings, ResourceState, WaitForDelete, WaitForUpsert,
};
use hiveform_kube::{
    DeleteBehavior, DeleteState, DiagnosticKind, Diagnostics, KubeError, LifecycleEngine,
    MockObjectApi, ObjectApi, Provider, ProviderContext,
};
use serde_json::json;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn claim() -> ResourceIdentity {
    ResourceIdentity::new(HiveKind::ClusterClaim, Some("ns1"), "claim1").unwrap()
}

fn claim_state() -> DesiredState {
    let mut metadata = ObjectMetadata::new(Some("ns1"), "claim1");
    metadata
        .annotations
        .insert("owner".to_string(), "platform".to_string());
    DesiredState::new(metadata, json!({"clusterPoolName": "pool1"}))
}

fn engine(api: MockObjectApi, force: bool) -> LifecycleEngine<MockObjectApi> {
    LifecycleEngine::new(api, ProviderContext::new("hiveform", force))
}

fn delete_settings(timeout: u64, poll: u64) -> ResourceSettings {
    ResourceSettings {
        wait_for_delete: Some(WaitForDelete::new(
            Duration::from_secs(timeout),
            Duration::from_secs(poll),
        )),
        ..Default::default()
    }
}

// ========== Apply ==========

#[tokio::test]
async fn test_apply_is_idempotent() {
    let api = MockObjectApi::new().with_default_labels([("hive.openshift.io/managed", "true")]);
    let engine = engine(api.clone(), false);
    let desired = claim_state();
    let cancel = CancellationToken::new();

    let first = engine
        .apply(&claim(), &desired, &ResourceSettings::default(), &cancel)
        .await
        .unwrap();
    let second = engine
        .apply(&claim(), &desired, &ResourceSettings::default(), &cancel)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.metadata.labels["hive.openshift.io/managed"], "true");
    assert_eq!(first.metadata.annotations["owner"], "platform");
    assert_eq!(first.spec["clusterPoolName"], "pool1");
    assert_eq!(api.object_count(), 1);
    assert_eq!(api.operation_counts().applies, 2);
}

#[tokio::test]
async fn test_apply_manifest_uses_kind_constants() {
    let api = MockObjectApi::new();
    let engine = engine(api.clone(), false);

    engine
        .apply(
            &claim(),
            &claim_state(),
            &ResourceSettings::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let stored = api.object(&claim()).unwrap();
    assert_eq!(stored["apiVersion"], "hive.openshift.io/v1");
    assert_eq!(stored["kind"], "ClusterClaim");
    assert_eq!(stored["metadata"]["namespace"], "ns1");
}

#[tokio::test]
async fn test_resource_force_conflicts_overrides_provider_default() {
    let api = MockObjectApi::new();
    api.insert(&claim(), json!({"spec": {"clusterPoolName": "other"}}), "kubectl");
    let engine = engine(api.clone(), false);
    let cancel = CancellationToken::new();

    let err = engine
        .apply(&claim(), &claim_state(), &ResourceSettings::default(), &cancel)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert!(!api.last_apply().unwrap().force);

    let settings = ResourceSettings {
        force_conflicts: Some(true),
        ..Default::default()
    };
    let observed = engine
        .apply(&claim(), &claim_state(), &settings, &cancel)
        .await
        .unwrap();

    let params = api.last_apply().unwrap();
    assert!(params.force);
    assert_eq!(params.field_manager, "hiveform");
    assert_eq!(observed.spec["clusterPoolName"], "pool1");
}

#[tokio::test(start_paused = true)]
async fn test_apply_waits_for_upsert_condition() {
    let api = MockObjectApi::new();
    api.insert(&claim(), json!({}), "hiveform");
    api.set_status_after(&claim(), 2, json!({"conditions": [{"type": "Ready", "status": "True"}]}));
    let engine = engine(api.clone(), false);

    let settings = ResourceSettings {
        wait_for_upsert: vec![
            WaitForUpsert::new("{.status.conditions[0].status}")
                .with_value("True")
                .with_timing(Duration::from_secs(60), Duration::from_secs(10)),
        ],
        ..Default::default()
    };

    let started = Instant::now();
    let observed = engine
        .apply(&claim(), &claim_state(), &settings, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        observed.status.unwrap()["conditions"][0]["status"],
        "True"
    );
    assert_eq!(api.operation_counts().gets, 3);
    assert_eq!(started.elapsed(), Duration::from_secs(20));
}

// ========== Delete ==========

#[tokio::test(start_paused = true)]
async fn test_zero_timeout_issues_single_get() {
    let api = MockObjectApi::new().with_delete_behavior(DeleteBehavior::Never);
    api.insert(&claim(), json!({}), "hiveform");
    let engine = engine(api.clone(), false);

    let started = Instant::now();
    let outcome = engine
        .delete(&claim(), &delete_settings(0, 5), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, DeleteState::Requested);
    assert_eq!(outcome.polls, 1);
    assert_eq!(api.operation_counts().gets, 1);
    assert_eq!(api.operation_counts().deletes, 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_zero_timeout_reports_absent_object() {
    let api = MockObjectApi::new();
    api.insert(&claim(), json!({}), "hiveform");
    let engine = engine(api.clone(), false);

    let outcome = engine
        .delete(&claim(), &delete_settings(0, 5), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, DeleteState::ConfirmedAbsent);
    assert_eq!(api.operation_counts().gets, 1);
}

#[tokio::test(start_paused = true)]
async fn test_delete_timeout_boundary() {
    let api = MockObjectApi::new().with_delete_behavior(DeleteBehavior::Never);
    api.insert(&claim(), json!({}), "hiveform");
    let engine = engine(api.clone(), false);

    let outcome = engine
        .delete(&claim(), &delete_settings(3, 1), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, DeleteState::TimedOut);
    assert_eq!(outcome.elapsed, Duration::from_secs(3));
    assert_eq!(outcome.polls, 3);
    assert_eq!(api.operation_counts().gets, 3);
    assert_eq!(api.operation_counts().deletes, 1);
}

#[tokio::test(start_paused = true)]
async fn test_delete_defaults_without_wait_settings() {
    let api = MockObjectApi::new().with_delete_behavior(DeleteBehavior::Never);
    api.insert(&claim(), json!({}), "hiveform");
    let engine = engine(api.clone(), false);

    let outcome = engine
        .delete(&claim(), &ResourceSettings::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, DeleteState::TimedOut);
    assert_eq!(outcome.elapsed, Duration::from_secs(30));
    assert_eq!(outcome.polls, 6);
}

#[tokio::test(start_paused = true)]
async fn test_delete_sends_propagation_policy() {
    let api = MockObjectApi::new();
    api.insert(&claim(), json!({}), "hiveform");
    let engine = engine(api.clone(), false);

    let settings = ResourceSettings {
        deletion_propagation: Some(DeletionPropagation::Foreground),
        ..delete_settings(10, 1)
    };
    let outcome = engine
        .delete(&claim(), &settings, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, DeleteState::ConfirmedAbsent);
    assert_eq!(
        api.last_propagation(),
        Some(Some(DeletionPropagation::Foreground))
    );
}

#[tokio::test(start_paused = true)]
async fn test_delete_of_missing_object_is_absent() {
    let api = MockObjectApi::new();
    let engine = engine(api.clone(), false);

    let outcome = engine
        .delete(&claim(), &delete_settings(10, 1), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.state, DeleteState::ConfirmedAbsent);
    assert_eq!(outcome.polls, 0);
    assert_eq!(api.operation_counts().gets, 0);
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_aborts_delete_wait() {
    let api = MockObjectApi::new().with_delete_behavior(DeleteBehavior::Never);
    api.insert(&claim(), json!({}), "hiveform");
    api.fail_gets_with(Some(503));
    let engine = engine(api.clone(), false);

    let err = engine
        .delete(&claim(), &delete_settings(30, 5), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(!err.is_not_found());
    assert!(matches!(err, KubeError::Api(_)));
    assert_eq!(api.operation_counts().gets, 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_interrupts_delete_wait() {
    let api = MockObjectApi::new().with_delete_behavior(DeleteBehavior::Never);
    api.insert(&claim(), json!({}), "hiveform");
    let engine = engine(api.clone(), false);
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(7)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let err = engine
        .delete(&claim(), &delete_settings(60, 5), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, KubeError::Cancelled { .. }));
    assert_eq!(started.elapsed(), Duration::from_secs(7));
    assert_eq!(api.operation_counts().gets, 2);
}

// ========== Not found ==========

#[tokio::test(start_paused = true)]
async fn test_not_found_is_success_for_delete_and_diagnostic_for_read() {
    let api = MockObjectApi::new();
    api.insert(&claim(), json!({}), "hiveform");
    let provider = Provider::with_api(api.clone(), ProviderContext::default());
    let state = ResourceState::imported(&claim());

    let mut diags = Diagnostics::new();
    let outcome = provider
        .delete(&state, &CancellationToken::new(), &mut diags)
        .await
        .unwrap();
    assert_eq!(outcome.state, DeleteState::ConfirmedAbsent);
    assert!(!diags.has_errors());

    let read = provider.read(&state, &mut diags).await;
    assert!(read.is_none());
    assert!(diags.has_error_kind(DiagnosticKind::NotFound));

    let mut diags = Diagnostics::new();
    assert!(provider.read_data_source(&claim(), &mut diags).await.is_none());
    assert!(diags.has_error_kind(DiagnosticKind::NotFound));
}

#[tokio::test(start_paused = true)]
async fn test_provider_reports_delete_timeout() {
    let api = MockObjectApi::new().with_delete_behavior(DeleteBehavior::Never);
    api.insert(&claim(), json!({}), "hiveform");
    let provider = Provider::with_api(api.clone(), ProviderContext::default());

    let mut state = ResourceState::imported(&claim());
    state.settings = delete_settings(3, 1);

    let mut diags = Diagnostics::new();
    let outcome = provider
        .delete(&state, &CancellationToken::new(), &mut diags)
        .await
        .unwrap();

    assert_eq!(outcome.state, DeleteState::TimedOut);
    assert!(diags.has_error_kind(DiagnosticKind::Timeout));
}

// ========== Import ==========

#[tokio::test]
async fn test_import_then_read_round_trip() {
    let api = MockObjectApi::new();
    api.insert(
        &claim(),
        json!({"spec": {"clusterPoolName": "pool1"}}),
        "kubectl",
    );
    let provider = Provider::with_api(api.clone(), ProviderContext::default());

    let mut diags = Diagnostics::new();
    let seeded = provider
        .import_state(HiveKind::ClusterClaim, "ns1/claim1", &mut diags)
        .unwrap();
    assert_eq!(seeded.metadata.namespace.as_deref(), Some("ns1"));
    assert_eq!(seeded.metadata.name, "claim1");
    assert_eq!(api.operation_counts().gets, 0);

    let state = provider.read(&seeded, &mut diags).await.unwrap();
    assert!(diags.is_empty());
    assert_eq!(state.id, "ns1/claim1");
    assert_eq!(state.spec["clusterPoolName"], "pool1");
}

#[tokio::test]
async fn test_malformed_import_ids_produce_no_state() {
    let api = MockObjectApi::new();
    let provider = Provider::with_api(api.clone(), ProviderContext::default());

    for id in ["claim1", "ns1/", "/claim1", "a/b/c", ""] {
        let mut diags = Diagnostics::new();
        let state = provider.import_state(HiveKind::ClusterClaim, id, &mut diags);
        assert!(state.is_none(), "id {id:?} should be rejected");
        assert!(diags.has_error_kind(DiagnosticKind::Validation));
    }

    let mut diags = Diagnostics::new();
    assert!(
        provider
            .import_state(HiveKind::ClusterImageSet, "ns1/img", &mut diags)
            .is_none()
    );
    assert!(
        provider
            .import_state(HiveKind::ClusterImageSet, "img", &mut diags)
            .is_some()
    );
    assert_eq!(api.operation_counts(), Default::default());
}

// ========== Provider round trip ==========

#[tokio::test]
async fn test_create_plan_update_cycle() {
    let api = MockObjectApi::new().with_default_labels([("hive.openshift.io/managed", "true")]);
    let provider = Provider::with_api(api.clone(), ProviderContext::default());
    let cancel = CancellationToken::new();
    let mut diags = Diagnostics::new();

    let mut config = ResourceConfig::new(
        HiveKind::ClusterClaim,
        ObjectMetadata::new(Some("ns1"), "claim1"),
        json!({"clusterPoolName": "pool1"}),
    );

    let state = provider.create(&config, &cancel, &mut diags).await.unwrap();
    assert_eq!(
        provider.plan(Some(&state), &config, &mut diags),
        Some(hiveform_kube::PlanAction::Noop)
    );

    config.spec = json!({"clusterPoolName": "pool2"});
    assert_eq!(
        provider.plan(Some(&state), &config, &mut diags),
        Some(hiveform_kube::PlanAction::Update)
    );

    let updated = provider
        .update(&state, &config, &cancel, &mut diags)
        .await
        .unwrap();
    assert!(diags.is_empty());
    assert_eq!(updated.spec["clusterPoolName"], "pool2");
    assert_eq!(api.get(&claim()).await.unwrap()["metadata"]["generation"], 2);
}

#[tokio::test]
async fn test_dropped_fields_are_planned_and_removed() {
    let api = MockObjectApi::new().with_default_labels([("hive.openshift.io/managed", "true")]);
    let provider = Provider::with_api(api.clone(), ProviderContext::default());
    let cancel = CancellationToken::new();
    let mut diags = Diagnostics::new();

    let mut metadata = ObjectMetadata::new(Some("ns1"), "claim1");
    metadata.labels.insert("team".to_string(), "a".to_string());
    let mut config = ResourceConfig::new(
        HiveKind::ClusterClaim,
        metadata,
        json!({"clusterPoolName": "pool1", "lifetime": "8h"}),
    );
    let state = provider.create(&config, &cancel, &mut diags).await.unwrap();

    config.metadata.labels.clear();
    config.spec = json!({"clusterPoolName": "pool1"});
    assert_eq!(
        provider.plan(Some(&state), &config, &mut diags),
        Some(hiveform_kube::PlanAction::Update)
    );

    let updated = provider
        .update(&state, &config, &cancel, &mut diags)
        .await
        .unwrap();
    assert!(diags.is_empty());
    assert!(!updated.metadata.labels.contains_key("team"));
    assert!(updated.spec.get("lifetime").is_none());

    let live = api.get(&claim()).await.unwrap();
    assert!(live["metadata"]["labels"].get("team").is_none());
    assert_eq!(live["metadata"]["labels"]["hive.openshift.io/managed"], "true");
    assert!(live["spec"].get("lifetime").is_none());

    assert_eq!(
        provider.plan(Some(&updated), &config, &mut diags),
        Some(hiveform_kube::PlanAction::Noop)
    );
}
