use crate::stack;
use cirrus_orchestrator::recovery;
use colored::Colorize;

pub async fn handle() -> anyhow::Result<()> {
    let stack = stack::build().await?;

    let pending = recovery::pending_commands(&stack.ctx.store, &stack.ctx.tracker).await?;
    if pending.is_empty() {
        println!("{} nothing to resume", "✓".green());
        return Ok(());
    }

    stack.require_auth().await?;
    println!(
        "{} resuming {} interrupted command(s)",
        "▶".blue(),
        pending.len()
    );

    let mut failures = 0usize;
    for envelope in pending {
        if let Err(err) = stack.run_envelope(envelope).await {
            eprintln!("{} {}", "✗".red(), err);
            failures += 1;
        }
    }
    if failures > 0 {
        anyhow::bail!("{} resumed command(s) failed", failures);
    }
    Ok(())
}
