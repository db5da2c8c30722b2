//! Start/stop handler for a project's instances and databases.

use crate::error::{OrchestratorError, Result};
use crate::{provider_call, OrchestratorContext};
use cirrus_bus::StatusEvent;
use cirrus_core::{PowerAction, ResourceKind};
use uuid::Uuid;

pub(crate) async fn handle_power(
    ctx: &OrchestratorContext,
    request_id: Uuid,
    slug: &str,
    action: PowerAction,
) -> Result<String> {
    let targets: Vec<_> = ctx
        .tracker
        .list(slug)
        .await
        .into_iter()
        .filter(|e| matches!(e.kind, ResourceKind::Instance | ResourceKind::Database))
        .collect();

    if targets.is_empty() {
        return Ok(format!("no resources found to {} for {}", action, slug));
    }

    let total = targets.len() as u32;
    let mut errors: Vec<String> = Vec::new();

    for (index, entry) in targets.iter().enumerate() {
        let step = index as u32 + 1;
        match provider_call(ctx, || {
            ctx.provider.set_power(entry.kind, &entry.provider_id, action)
        })
        .await
        {
            Ok(()) => {
                tracing::info!(%request_id, id = %entry.provider_id, %action, "power action applied");
                ctx.bus.publish_status(
                    StatusEvent::progress(
                        request_id,
                        format!("{} {} {}", action, entry.kind, entry.provider_id),
                    )
                    .with_step(step, total),
                );
            }
            Err(err) => {
                let message = format!(
                    "failed to {} {} {}: {}",
                    action, entry.kind, entry.provider_id, err
                );
                tracing::error!(%request_id, "{}", message);
                errors.push(message.clone());
                ctx.bus
                    .publish_status(StatusEvent::failed(request_id, message).with_step(step, total));
            }
        }
    }

    if errors.is_empty() {
        Ok(format!(
            "{} command sent to {} resource(s)",
            action,
            targets.len()
        ))
    } else {
        Err(OrchestratorError::PowerFailed {
            action: action.to_string(),
            failed: errors.len(),
            total: targets.len(),
            details: errors.join("; "),
        })
    }
}
