//! Crash recovery.
//!
//! On process start, any project left with a `creating` or `deleting` leaf
//! was interrupted mid-command. The tracker plus the fixed step order make
//! re-issuing the command safe: deploy steps whose resources are already
//! tracked are no-op successes, and deletions treat "already gone" as
//! success.

use crate::error::Result;
use cirrus_bus::{Command, CommandEnvelope};
use cirrus_cloud::ResourceTracker;
use cirrus_core::{BlueprintStore, ResourceStatus};

/// Commands that resume interrupted work. The caller publishes them once a
/// listener pool is subscribed.
pub async fn pending_commands(
    store: &BlueprintStore,
    tracker: &ResourceTracker,
) -> Result<Vec<CommandEnvelope>> {
    let mut commands = Vec::new();

    for slug in store.list().await? {
        let blueprint = match store.load(&slug).await {
            Ok(blueprint) => blueprint,
            Err(err) => {
                tracing::warn!(project = %slug, "skipping unreadable blueprint: {}", err);
                continue;
            }
        };

        let statuses = blueprint.leaf_statuses();
        let deleting = statuses
            .iter()
            .any(|(_, status)| *status == ResourceStatus::Deleting);
        let creating = statuses
            .iter()
            .any(|(_, status)| *status == ResourceStatus::Creating);

        if deleting {
            let tracked = tracker.list(&slug).await.len();
            tracing::info!(project = %slug, tracked, "resuming interrupted teardown");
            commands.push(CommandEnvelope::new(Command::Terminate {
                project_slug: slug,
                resources: Vec::new(),
            }));
        } else if creating {
            let tracked = tracker.list(&slug).await.len();
            tracing::info!(project = %slug, tracked, "resuming interrupted deployment");
            commands.push(CommandEnvelope::new(Command::Deploy { project_slug: slug }));
        }
    }

    Ok(commands)
}
