//! Region scan handler.
//!
//! Sweeps each region for managed resources and caches the results as one
//! JSON document per region. A region that fails is reported and the sweep
//! continues; the request only fails when every region errored.

use crate::error::{OrchestratorError, Result};
use crate::{provider_call, OrchestratorContext};
use cirrus_bus::StatusEvent;
use tokio::fs;
use uuid::Uuid;

pub(crate) async fn handle_scan(
    ctx: &OrchestratorContext,
    request_id: Uuid,
    regions: &[String],
) -> Result<String> {
    let regions: Vec<String> = if regions.is_empty() {
        ctx.scan_regions.clone()
    } else {
        regions.to_vec()
    };

    fs::create_dir_all(&ctx.cache_dir)
        .await
        .map_err(cirrus_cloud::ProviderError::Io)?;
    clear_stale_cache(ctx).await;

    let total = regions.len() as u32;
    let mut found_total = 0usize;
    let mut errors: Vec<String> = Vec::new();

    for (index, region) in regions.iter().enumerate() {
        let step = index as u32 + 1;
        match provider_call(ctx, || ctx.provider.scan(region)).await {
            Ok(resources) => {
                let path = ctx.cache_dir.join(format!("{}.json", region));
                let content = serde_json::to_string_pretty(&resources)
                    .map_err(cirrus_cloud::ProviderError::Json)?;
                fs::write(&path, content)
                    .await
                    .map_err(cirrus_cloud::ProviderError::Io)?;

                tracing::info!(%request_id, region = %region, count = resources.len(), "region scanned");
                ctx.bus.publish_status(
                    StatusEvent::progress(
                        request_id,
                        format!("{}: {} resource(s)", region, resources.len()),
                    )
                    .with_step(step, total),
                );
                found_total += resources.len();
            }
            Err(err) => {
                let message = format!("scan of {} failed: {}", region, err);
                tracing::error!(%request_id, "{}", message);
                errors.push(message.clone());
                ctx.bus
                    .publish_status(StatusEvent::failed(request_id, message).with_step(step, total));
            }
        }
    }

    if errors.len() == regions.len() {
        return Err(OrchestratorError::ScanFailed(errors.join("; ")));
    }
    Ok(format!(
        "scan complete: {} resource(s) across {} region(s)",
        found_total,
        regions.len() - errors.len()
    ))
}

async fn clear_stale_cache(ctx: &OrchestratorContext) {
    let Ok(mut entries) = fs::read_dir(&ctx.cache_dir).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            let _ = fs::remove_file(&path).await;
        }
    }
}
