//! Dependency-aware deleter.
//!
//! Deletes a resource set in reverse-topological order: children before
//! parents, one resource at a time, in the graph's stable declaration
//! order. A "not found" from the provider is success: the resource is
//! already gone and the deletion is safe to retry. When a deletion fails,
//! every kind that depends on that resource having been removed first is
//! skipped and reported as failed naming the blocking resource; independent
//! branches continue.

use crate::cancel::CancelFlag;
use crate::error::{OrchestratorError, Result};
use crate::{provider_call, OrchestratorContext};
use cirrus_bus::{ResourceDelta, ResourceRef, StatusEvent};
use cirrus_cloud::TrackerEntry;
use cirrus_core::{CoreError, ResourceKind, ResourceStatus, Slot};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub(crate) async fn handle_terminate(
    ctx: &OrchestratorContext,
    request_id: Uuid,
    slug: &str,
    resources: &[ResourceRef],
    cancel: &CancelFlag,
) -> Result<String> {
    let targets = resolve_targets(ctx, slug, resources).await;
    if targets.is_empty() {
        return Ok(format!("no tracked resources to terminate for {}", slug));
    }

    let present = present_kinds(&targets);
    let order = ctx.graph.deletion_order(&present);
    let total = targets.len() as u32;

    let mut step = 0u32;
    let mut deleted = 0usize;
    let mut failures: Vec<String> = Vec::new();
    // kind -> provider id of the resource whose failed deletion blocks it
    let mut blocked_by: HashMap<ResourceKind, String> = HashMap::new();

    'kinds: for kind in order {
        for entry in targets.iter().filter(|e| e.kind == kind) {
            step += 1;

            if cancel.is_cancelled() {
                tracing::warn!(%request_id, "terminate cancelled, {} deletion(s) left", total - step + 1);
                failures.push(format!("cancelled before {}", entry.provider_id));
                break 'kinds;
            }

            if let Some(blocking) = blocked_by.get(&kind) {
                let message = format!(
                    "skipped {} {}: deletion blocked by {}",
                    entry.kind, entry.provider_id, blocking
                );
                tracing::warn!(%request_id, "{}", message);
                failures.push(message.clone());
                ctx.bus.publish_status(
                    StatusEvent::failed(request_id, message).with_step(step, total),
                );
                continue;
            }

            mark_status(ctx, entry, ResourceStatus::Deleting).await;

            let outcome =
                provider_call(ctx, || ctx.provider.delete(entry.kind, &entry.provider_id)).await;
            let already_gone = match outcome {
                Ok(()) => false,
                Err(err) if err.is_not_found() => true,
                Err(err) => {
                    let message =
                        format!("failed to delete {} {}: {}", entry.kind, entry.provider_id, err);
                    tracing::error!(%request_id, "{}", message);
                    failures.push(message.clone());
                    for ancestor in ctx.graph.ancestors_of(kind, &present) {
                        blocked_by
                            .entry(ancestor)
                            .or_insert_with(|| entry.provider_id.clone());
                    }
                    ctx.bus.publish_status(
                        StatusEvent::failed(request_id, message).with_step(step, total),
                    );
                    continue;
                }
            };

            // Deletion confirmed (or confirmed absent): only now does the
            // entry leave the tracker.
            ctx.tracker.remove(&entry.project_slug, entry.slot).await?;
            mark_status(ctx, entry, ResourceStatus::Deleted).await;
            deleted += 1;

            let message = if already_gone {
                format!("{} {} already gone", entry.kind, entry.provider_id)
            } else {
                format!("deleted {} {}", entry.kind, entry.provider_id)
            };
            ctx.bus.publish_status(
                StatusEvent::progress(request_id, message)
                    .with_step(step, total)
                    .with_delta(ResourceDelta {
                        slot: entry.slot,
                        provider_id: Some(entry.provider_id.clone()),
                        status: ResourceStatus::Deleted,
                    }),
            );
        }
    }

    if failures.is_empty() {
        Ok(format!("terminated {} resource(s)", deleted))
    } else {
        Err(OrchestratorError::TerminateFailed {
            failed: failures.len(),
            total: total as usize,
            details: failures.join("; "),
        })
    }
}

/// Explicit resource refs are matched against the tracker so bookkeeping
/// follows them; unmatched refs are still deleted at the provider.
async fn resolve_targets(
    ctx: &OrchestratorContext,
    slug: &str,
    resources: &[ResourceRef],
) -> Vec<TrackerEntry> {
    if resources.is_empty() {
        return ctx.tracker.list(slug).await;
    }
    let all = ctx.tracker.list_all().await;
    resources
        .iter()
        .map(|r| {
            all.iter()
                .find(|e| e.provider_id == r.id)
                .cloned()
                .unwrap_or_else(|| TrackerEntry::new(slug, Slot::for_kind(r.kind), &r.id, ""))
        })
        .collect()
}

fn present_kinds(targets: &[TrackerEntry]) -> Vec<ResourceKind> {
    let kinds: HashSet<ResourceKind> = targets.iter().map(|e| e.kind).collect();
    ResourceKind::ALL
        .iter()
        .copied()
        .filter(|k| kinds.contains(k))
        .collect()
}

/// Reflect a teardown transition in the owning blueprint, when there is
/// one. The deleter writes only `deleting`/`deleted`; a failed deletion
/// leaves the previous status in place.
async fn mark_status(ctx: &OrchestratorContext, entry: &TrackerEntry, status: ResourceStatus) {
    let mut blueprint = match ctx.store.load(&entry.project_slug).await {
        Ok(blueprint) => blueprint,
        Err(CoreError::ProjectNotFound(_)) => return,
        Err(err) => {
            tracing::warn!(project = %entry.project_slug, "cannot load blueprint: {}", err);
            return;
        }
    };

    let cleared = status == ResourceStatus::Deleted;
    match entry.slot {
        Slot::Vpc | Slot::Subnet => {
            blueprint.network.status = status;
            if cleared {
                match entry.slot {
                    Slot::Vpc => blueprint.network.vpc_id = None,
                    _ => blueprint.network.subnet_id = None,
                }
            }
        }
        Slot::SecurityGroup => {
            blueprint.network.security_group_status = status;
            if cleared {
                blueprint.network.security_group_id = None;
            }
        }
        Slot::KeyPair => {
            if let Some(section) = blueprint.security.key_pair.as_mut() {
                section.status = status;
                if cleared {
                    section.key_id = None;
                }
            }
        }
        Slot::Role | Slot::InstanceProfile => {
            if let Some(section) = blueprint.security.role.as_mut() {
                section.status = status;
                if cleared {
                    match entry.slot {
                        Slot::Role => section.role_id = None,
                        _ => section.instance_profile_id = None,
                    }
                }
            }
        }
        Slot::Instance => {
            blueprint.compute.status = status;
            if cleared {
                blueprint.compute.instance_id = None;
                blueprint.compute.public_ip = None;
                blueprint.compute.private_ip = None;
            }
        }
        Slot::Database => {
            if let Some(section) = blueprint.data.database.as_mut() {
                section.status = status;
                if cleared {
                    section.identifier = None;
                    section.endpoint = None;
                }
            }
        }
        Slot::Bucket => {
            if let Some(section) = blueprint.data.storage.as_mut() {
                section.status = status;
            }
        }
    }
    blueprint.project.touch();
    if let Err(err) = ctx.store.save(&blueprint).await {
        tracing::warn!(project = %entry.project_slug, "cannot save blueprint: {}", err);
    }
}
