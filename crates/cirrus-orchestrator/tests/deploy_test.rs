mod common;

use cirrus_bus::{Command, Phase};
use cirrus_cloud::{MockFailure, MockProvider};
use cirrus_core::{ResourceKind, ResourceStatus, Slot};
use common::*;

#[tokio::test]
async fn test_deploy_minimal_blueprint() {
    // Scenario: network + compute, no database, no storage. The optional
    // steps report skipped and the deployment completes.
    let harness = Harness::new().await;
    let blueprint = minimal_blueprint("Demo App");
    harness.ctx.store.save(&blueprint).await.unwrap();

    let (_, events) = harness
        .run_command(Command::Deploy {
            project_slug: "demo-app".into(),
        })
        .await;

    assert_eq!(events.first().unwrap().phase, Phase::Started);
    assert_eq!(events.last().unwrap().phase, Phase::Completed);
    assert_contiguous_steps(&events);

    // All eight steps reported progress.
    let progress: Vec<&str> = events
        .iter()
        .filter(|e| e.phase == Phase::Progress)
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(progress.len(), 8);
    assert!(progress[2].contains("skipped"), "key pair: {}", progress[2]);
    assert!(progress[3].contains("skipped"), "role: {}", progress[3]);
    assert!(progress[5].contains("skipped"), "database: {}", progress[5]);
    assert!(progress[6].contains("skipped"), "storage: {}", progress[6]);

    // Tracker holds the created resources.
    let entries = harness.ctx.tracker.list("demo-app").await;
    let slots: Vec<Slot> = entries.iter().map(|e| e.slot).collect();
    assert_eq!(
        slots,
        vec![Slot::Vpc, Slot::Subnet, Slot::SecurityGroup, Slot::Instance]
    );

    // Blueprint reflects the created state.
    let saved = harness.ctx.store.load("demo-app").await.unwrap();
    assert_eq!(saved.compute.status, ResourceStatus::Created);
    assert!(saved.compute.instance_id.is_some());
    assert_eq!(saved.network.status, ResourceStatus::Created);
    assert!(saved.network.vpc_id.is_some());
}

#[tokio::test]
async fn test_deploy_full_blueprint() {
    let harness = Harness::new().await;
    harness
        .ctx
        .store
        .save(&full_blueprint("Everything"))
        .await
        .unwrap();

    let (_, events) = harness
        .run_command(Command::Deploy {
            project_slug: "everything".into(),
        })
        .await;

    assert_eq!(events.last().unwrap().phase, Phase::Completed);
    assert_contiguous_steps(&events);

    let entries = harness.ctx.tracker.list("everything").await;
    assert_eq!(entries.len(), 9);

    let saved = harness.ctx.store.load("everything").await.unwrap();
    assert_eq!(saved.data.database.unwrap().status, ResourceStatus::Created);
    assert_eq!(saved.data.storage.unwrap().status, ResourceStatus::Created);
    assert_eq!(
        saved.security.key_pair.unwrap().status,
        ResourceStatus::Created
    );
    let role = saved.security.role.unwrap();
    assert_eq!(role.status, ResourceStatus::Created);
    assert!(role.instance_profile_id.is_some());
}

#[tokio::test]
async fn test_deploy_permanent_failure_keeps_partial_state() {
    // Scenario: compute launch fails with a permanent provider error after
    // network and security group succeeded.
    let provider = MockProvider::new("us-east-1");
    provider.fail_create(
        ResourceKind::Instance,
        MockFailure::PermissionDenied("not authorized to run instances".into()),
    );
    let harness = Harness::with_provider(provider).await;
    harness
        .ctx
        .store
        .save(&minimal_blueprint("Doomed"))
        .await
        .unwrap();

    let (_, events) = harness
        .run_command(Command::Deploy {
            project_slug: "doomed".into(),
        })
        .await;

    let failed = events.last().unwrap();
    assert_eq!(failed.phase, Phase::Failed);
    assert!(failed.message.contains("compute instance"), "{}", failed.message);
    assert_eq!(failed.step, Some(5));
    assert_contiguous_steps(&events);

    // Prior resources stay tracked; no rollback.
    let slots: Vec<Slot> = harness
        .ctx
        .tracker
        .list("doomed")
        .await
        .iter()
        .map(|e| e.slot)
        .collect();
    assert_eq!(slots, vec![Slot::Vpc, Slot::Subnet, Slot::SecurityGroup]);

    let saved = harness.ctx.store.load("doomed").await.unwrap();
    assert_eq!(saved.network.status, ResourceStatus::Created);
    assert_eq!(saved.network.security_group_status, ResourceStatus::Created);
    assert_eq!(saved.compute.status, ResourceStatus::Failed);
    assert!(saved.compute.instance_id.is_none());
}

#[tokio::test]
async fn test_redeploy_creates_no_duplicates() {
    let harness = Harness::new().await;
    harness
        .ctx
        .store
        .save(&minimal_blueprint("Stable"))
        .await
        .unwrap();

    let (_, first) = harness
        .run_command(Command::Deploy {
            project_slug: "stable".into(),
        })
        .await;
    assert_eq!(first.last().unwrap().phase, Phase::Completed);

    let (_, second) = harness
        .run_command(Command::Deploy {
            project_slug: "stable".into(),
        })
        .await;
    assert_eq!(second.last().unwrap().phase, Phase::Completed);

    // Every step short-circuited on the tracker: one creation each.
    assert_eq!(harness.provider.create_calls(ResourceKind::Vpc), 1);
    assert_eq!(harness.provider.create_calls(ResourceKind::SecurityGroup), 1);
    assert_eq!(harness.provider.create_calls(ResourceKind::Instance), 1);
    assert_eq!(
        harness.provider.resource_ids(ResourceKind::Instance).len(),
        1
    );
}

#[tokio::test]
async fn test_resume_after_mid_sequence_failure() {
    // First run dies at the compute step; the re-run skips the steps the
    // tracker proves done and finishes the rest.
    let provider = MockProvider::new("us-east-1");
    provider.fail_create_times(
        ResourceKind::Instance,
        MockFailure::CommandFailed("insufficient capacity".into()),
        1,
    );
    let harness = Harness::with_provider(provider).await;
    harness
        .ctx
        .store
        .save(&minimal_blueprint("Retry Me"))
        .await
        .unwrap();

    let (_, first) = harness
        .run_command(Command::Deploy {
            project_slug: "retry-me".into(),
        })
        .await;
    assert_eq!(first.last().unwrap().phase, Phase::Failed);

    let (_, second) = harness
        .run_command(Command::Deploy {
            project_slug: "retry-me".into(),
        })
        .await;
    assert_eq!(second.last().unwrap().phase, Phase::Completed);

    // Network and security group were created exactly once across both runs.
    assert_eq!(harness.provider.create_calls(ResourceKind::Vpc), 1);
    assert_eq!(harness.provider.create_calls(ResourceKind::SecurityGroup), 1);
    assert_eq!(
        harness.provider.resource_ids(ResourceKind::Instance).len(),
        1
    );
}

#[tokio::test]
async fn test_transient_errors_retried_within_step() {
    let provider = MockProvider::new("us-east-1");
    provider.fail_create_times(
        ResourceKind::Instance,
        MockFailure::Throttled("rate exceeded".into()),
        2,
    );
    let harness = Harness::with_provider(provider).await;
    harness
        .ctx
        .store
        .save(&minimal_blueprint("Throttled"))
        .await
        .unwrap();

    let (_, events) = harness
        .run_command(Command::Deploy {
            project_slug: "throttled".into(),
        })
        .await;

    // Retried inside the step, not across steps: one command, three attempts.
    assert_eq!(events.last().unwrap().phase, Phase::Completed);
    assert_eq!(harness.provider.create_calls(ResourceKind::Instance), 3);
}

#[tokio::test]
async fn test_deploy_unknown_project_fails_validation() {
    let harness = Harness::new().await;
    let (_, events) = harness
        .run_command(Command::Deploy {
            project_slug: "ghost".into(),
        })
        .await;

    let failed = events.last().unwrap();
    assert_eq!(failed.phase, Phase::Failed);
    assert!(failed.message.contains("validation"), "{}", failed.message);
    // Rejected before any provider call.
    assert_eq!(harness.provider.create_calls(ResourceKind::Vpc), 0);
}

#[tokio::test]
async fn test_deploy_reuses_default_network() {
    let harness = Harness::with_provider(MockProvider::with_default_network("us-east-1")).await;
    let mut blueprint = minimal_blueprint("On Default");
    blueprint.network.use_default = true;
    harness.ctx.store.save(&blueprint).await.unwrap();

    let (_, events) = harness
        .run_command(Command::Deploy {
            project_slug: "on-default".into(),
        })
        .await;
    assert_eq!(events.last().unwrap().phase, Phase::Completed);

    let saved = harness.ctx.store.load("on-default").await.unwrap();
    assert_eq!(saved.network.vpc_id.as_deref(), Some("vpc-default"));

    // A reused network is not ours to delete, so it is not tracked.
    let slots: Vec<Slot> = harness
        .ctx
        .tracker
        .list("on-default")
        .await
        .iter()
        .map(|e| e.slot)
        .collect();
    assert_eq!(slots, vec![Slot::SecurityGroup, Slot::Instance]);
}
