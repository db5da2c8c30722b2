use super::status::ResourceStatus;
use serde::{Deserialize, Serialize};

/// The project's compute instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeSection {
    pub instance_type: String,

    /// Machine image. When absent the provider's default image for the
    /// region is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,

    /// Boot script handed to the instance on first start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_ip: Option<String>,

    #[serde(default)]
    pub status: ResourceStatus,
}

impl ComputeSection {
    pub fn new(instance_type: impl Into<String>) -> Self {
        Self {
            instance_type: instance_type.into(),
            image_id: None,
            user_data: None,
            instance_id: None,
            public_ip: None,
            private_ip: None,
            status: ResourceStatus::Pending,
        }
    }
}
