use crate::stack;
use cirrus_bus::Command;
use colored::Colorize;

pub async fn handle(project: &str) -> anyhow::Result<()> {
    let stack = stack::build().await?;
    stack.require_auth().await?;

    println!(
        "{} deploying {} in {} via {}",
        "▶".blue(),
        project.cyan().bold(),
        stack.settings.default_region.cyan(),
        stack.ctx.provider.display_name()
    );
    stack
        .run_to_completion(Command::Deploy {
            project_slug: project.to_string(),
        })
        .await
}
