use anyhow::Context;
use cirrus_core::{Blueprint, BlueprintStore};
use colored::Colorize;
use std::path::Path;

pub async fn handle(file: &Path) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("cannot read {}", file.display()))?;
    let blueprint: Blueprint =
        serde_yaml::from_str(&content).context("blueprint does not parse")?;
    blueprint.validate().context("blueprint is invalid")?;

    let store = BlueprintStore::new(cirrus_config::blueprints_dir()?);
    let path = store.save(&blueprint).await?;

    println!(
        "{} imported {} as {}",
        "✓".green(),
        blueprint.project.name.cyan(),
        path.display()
    );
    Ok(())
}
