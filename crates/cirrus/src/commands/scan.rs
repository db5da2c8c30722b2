use crate::stack;
use cirrus_bus::Command;
use colored::Colorize;

pub async fn handle(regions: &[String]) -> anyhow::Result<()> {
    let stack = stack::build().await?;
    stack.require_auth().await?;

    let scanned = if regions.is_empty() {
        stack.ctx.scan_regions.clone()
    } else {
        regions.to_vec()
    };
    println!("{} scanning {} region(s)", "▶".blue(), scanned.len());

    stack
        .run_to_completion(Command::Scan {
            regions: regions.to_vec(),
        })
        .await?;

    println!(
        "Results cached under {}",
        stack.ctx.cache_dir.display().to_string().dimmed()
    );
    Ok(())
}
