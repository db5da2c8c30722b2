//! Filesystem-safe slug derivation for project names.

/// Convert a project name into a filesystem-safe slug.
///
/// Lowercases, maps whitespace and underscores to hyphens, drops everything
/// outside `[a-z0-9-]`, collapses runs of hyphens and strips them from both
/// ends. An empty result falls back to `unnamed-project`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut prev_hyphen = true; // suppress leading hyphens
    for ch in name.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            prev_hyphen = false;
        } else if ch.is_whitespace() || ch == '_' || ch == '-' {
            if !prev_hyphen {
                slug.push('-');
                prev_hyphen = true;
            }
        }
        // everything else is dropped
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "unnamed-project".to_string()
    } else {
        slug.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_name() {
        assert_eq!(slugify("My Blog"), "my-blog");
    }

    #[test]
    fn test_apostrophes_and_case() {
        assert_eq!(slugify("Brenden's Blog"), "brendens-blog");
    }

    #[test]
    fn test_underscores_and_runs() {
        assert_eq!(slugify("data__pipeline  v2"), "data-pipeline-v2");
    }

    #[test]
    fn test_edge_hyphens() {
        assert_eq!(slugify("--wrapped--"), "wrapped");
    }

    #[test]
    fn test_empty_falls_back() {
        assert_eq!(slugify("!!!"), "unnamed-project");
        assert_eq!(slugify(""), "unnamed-project");
    }
}
