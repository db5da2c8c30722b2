use super::status::ResourceStatus;
use serde::{Deserialize, Serialize};

/// Optional data-layer resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseSection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageSection>,
}

/// Managed database instance descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub engine: String,
    pub instance_class: String,

    #[serde(default = "default_allocated_gb")]
    pub allocated_gb: u32,

    /// Provider-assigned identifier, set once the instance exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub status: ResourceStatus,
}

impl DatabaseSection {
    pub fn new(engine: impl Into<String>, instance_class: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            instance_class: instance_class.into(),
            allocated_gb: default_allocated_gb(),
            identifier: None,
            endpoint: None,
            status: ResourceStatus::Pending,
        }
    }
}

fn default_allocated_gb() -> u32 {
    20
}

/// Object-storage bucket descriptor. The bucket name doubles as the
/// provider identifier once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    pub bucket: String,

    #[serde(default)]
    pub status: ResourceStatus,
}
