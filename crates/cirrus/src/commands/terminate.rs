use crate::stack;
use cirrus_bus::{Command, ResourceRef};
use cirrus_core::ResourceKind;

pub async fn handle(project: &str, resources: &[String]) -> anyhow::Result<()> {
    let refs = resources
        .iter()
        .map(|raw| parse_ref(raw))
        .collect::<anyhow::Result<Vec<ResourceRef>>>()?;

    let stack = stack::build().await?;
    stack.require_auth().await?;
    stack
        .run_to_completion(Command::Terminate {
            project_slug: project.to_string(),
            resources: refs,
        })
        .await
}

/// Parse a `kind:id` argument, e.g. `instance:i-0abc123`.
fn parse_ref(raw: &str) -> anyhow::Result<ResourceRef> {
    let Some((kind_str, id)) = raw.split_once(':') else {
        anyhow::bail!("expected kind:id, got '{}'", raw);
    };
    let kind = parse_kind(kind_str)
        .ok_or_else(|| anyhow::anyhow!("unknown resource kind '{}'", kind_str))?;
    if id.is_empty() {
        anyhow::bail!("missing resource id in '{}'", raw);
    }
    Ok(ResourceRef {
        kind,
        id: id.to_string(),
    })
}

fn parse_kind(raw: &str) -> Option<ResourceKind> {
    ResourceKind::ALL.into_iter().find(|k| k.as_str() == raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ref() {
        let parsed = parse_ref("instance:i-0abc").unwrap();
        assert_eq!(parsed.kind, ResourceKind::Instance);
        assert_eq!(parsed.id, "i-0abc");
    }

    #[test]
    fn test_parse_ref_rejects_garbage() {
        assert!(parse_ref("no-colon").is_err());
        assert!(parse_ref("tractor:t-1").is_err());
        assert!(parse_ref("vpc:").is_err());
    }
}
