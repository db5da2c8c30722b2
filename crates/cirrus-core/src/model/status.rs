use serde::{Deserialize, Serialize};

/// Lifecycle status of a single blueprint resource.
///
/// Creation moves `pending → creating → created | failed | skipped`;
/// teardown moves `deleting → deleted`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    #[default]
    Pending,
    Creating,
    Created,
    Failed,
    Skipped,
    Deleting,
    Deleted,
}

impl ResourceStatus {
    /// True while the resource is believed to exist at the provider.
    pub fn is_live(self) -> bool {
        matches!(self, ResourceStatus::Created | ResourceStatus::Deleting)
    }

    /// True when no command is mid-flight for this resource.
    pub fn is_settled(self) -> bool {
        !matches!(self, ResourceStatus::Creating | ResourceStatus::Deleting)
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResourceStatus::Pending => "pending",
            ResourceStatus::Creating => "creating",
            ResourceStatus::Created => "created",
            ResourceStatus::Failed => "failed",
            ResourceStatus::Skipped => "skipped",
            ResourceStatus::Deleting => "deleting",
            ResourceStatus::Deleted => "deleted",
        };
        write!(f, "{}", s)
    }
}
