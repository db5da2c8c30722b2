mod common;

use cirrus_bus::{Command, Phase};
use cirrus_cloud::ScannedResource;
use cirrus_core::{PowerAction, ResourceKind};
use common::*;

async fn deploy(harness: &Harness, name: &str, slug: &str) {
    harness
        .ctx
        .store
        .save(&full_blueprint(name))
        .await
        .unwrap();
    let (_, events) = harness
        .run_command(Command::Deploy {
            project_slug: slug.into(),
        })
        .await;
    assert_eq!(events.last().unwrap().phase, Phase::Completed);
}

#[tokio::test]
async fn test_power_stop_and_start() {
    let harness = Harness::new().await;
    deploy(&harness, "Powered", "powered").await;

    let saved = harness.ctx.store.load("powered").await.unwrap();
    let instance_id = saved.compute.instance_id.clone().unwrap();
    let db_id = saved.data.database.unwrap().identifier.unwrap();

    let (_, events) = harness
        .run_command(Command::Power {
            project_slug: "powered".into(),
            action: PowerAction::Stop,
        })
        .await;
    assert_eq!(events.last().unwrap().phase, Phase::Completed);
    assert_eq!(harness.provider.is_running(&instance_id), Some(false));
    assert_eq!(harness.provider.is_running(&db_id), Some(false));

    let (_, events) = harness
        .run_command(Command::Power {
            project_slug: "powered".into(),
            action: PowerAction::Start,
        })
        .await;
    assert_eq!(events.last().unwrap().phase, Phase::Completed);
    assert_eq!(harness.provider.is_running(&instance_id), Some(true));
}

#[tokio::test]
async fn test_power_without_resources_completes() {
    let harness = Harness::new().await;
    let (_, events) = harness
        .run_command(Command::Power {
            project_slug: "empty".into(),
            action: PowerAction::Start,
        })
        .await;

    let terminal = events.last().unwrap();
    assert_eq!(terminal.phase, Phase::Completed);
    assert!(terminal.message.contains("no resources"));
}

#[tokio::test]
async fn test_scan_writes_region_cache() {
    let harness = Harness::new().await;
    deploy(&harness, "Scannable", "scannable").await;

    let (_, events) = harness
        .run_command(Command::Scan {
            regions: vec!["us-east-1".into()],
        })
        .await;
    assert_eq!(events.last().unwrap().phase, Phase::Completed);

    let cache = harness.ctx.cache_dir.join("us-east-1.json");
    assert!(cache.exists());

    let content = tokio::fs::read_to_string(&cache).await.unwrap();
    let resources: Vec<ScannedResource> = serde_json::from_str(&content).unwrap();
    assert!(resources.iter().any(|r| r.kind == ResourceKind::Instance));
    assert!(resources
        .iter()
        .all(|r| r.project.as_deref() == Some("scannable")));
}

#[tokio::test]
async fn test_scan_empty_region() {
    let harness = Harness::new().await;
    let (_, events) = harness
        .run_command(Command::Scan {
            regions: vec!["us-east-1".into()],
        })
        .await;

    let terminal = events.last().unwrap();
    assert_eq!(terminal.phase, Phase::Completed);
    assert!(terminal.message.contains("0 resource(s)"));
}
