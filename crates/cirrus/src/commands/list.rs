use cirrus_core::{BlueprintStore, ResourceStatus};
use colored::Colorize;

pub async fn handle() -> anyhow::Result<()> {
    let store = BlueprintStore::new(cirrus_config::blueprints_dir()?);
    let slugs = store.list().await?;
    if slugs.is_empty() {
        println!("No projects. Import a blueprint with {}.", "cirrus import".cyan());
        return Ok(());
    }

    for slug in slugs {
        let blueprint = match store.load(&slug).await {
            Ok(blueprint) => blueprint,
            Err(err) => {
                println!("{}  {}", slug.cyan().bold(), format!("(unreadable: {})", err).red());
                continue;
            }
        };
        println!(
            "{}  {} ({})",
            blueprint.slug().cyan().bold(),
            blueprint.project.name,
            blueprint.project.region.dimmed()
        );
        for (slot, status) in blueprint.leaf_statuses() {
            let rendered = match status {
                ResourceStatus::Created => status.to_string().green(),
                ResourceStatus::Failed => status.to_string().red(),
                ResourceStatus::Creating | ResourceStatus::Deleting => {
                    status.to_string().yellow()
                }
                _ => status.to_string().dimmed(),
            };
            println!("  {:<28} {}", slot.to_string(), rendered);
        }
    }
    Ok(())
}
