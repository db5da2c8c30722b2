use super::status::ResourceStatus;
use serde::{Deserialize, Serialize};

/// One inbound firewall rule on the project's security group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub protocol: String,
    pub port: u16,
    pub cidr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// VPC, subnet and security group for the project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkSection {
    /// Reuse the account's default network instead of creating a new one.
    #[serde(default)]
    pub use_default: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr_block: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_cidr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_group_id: Option<String>,

    #[serde(default)]
    pub ingress: Vec<IngressRule>,

    /// Status of the VPC + subnet pair.
    #[serde(default)]
    pub status: ResourceStatus,

    #[serde(default)]
    pub security_group_status: ResourceStatus,
}
