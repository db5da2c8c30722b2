use crate::stack;
use cirrus_bus::Command;
use cirrus_core::PowerAction;

pub async fn handle(action: &str, project: &str) -> anyhow::Result<()> {
    let action = match action {
        "start" => PowerAction::Start,
        "stop" => PowerAction::Stop,
        other => anyhow::bail!("invalid power action '{}' (expected start or stop)", other),
    };

    let stack = stack::build().await?;
    stack.require_auth().await?;
    stack
        .run_to_completion(Command::Power {
            project_slug: project.to_string(),
            action,
        })
        .await
}
