use super::status::ResourceStatus;
use serde::{Deserialize, Serialize};

/// Optional security-layer resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecuritySection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_pair: Option<KeyPairSection>,

    /// TLS certificate descriptor. Carried for the author's benefit; there
    /// is no creation step for it in the deployment sequence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<CertificateSection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleSection>,
}

/// SSH key pair imported into the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyPairSection {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,

    #[serde(default)]
    pub status: ResourceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateSection {
    pub domain: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,

    #[serde(default)]
    pub status: ResourceStatus,
}

/// Identity role plus the instance profile that attaches it to compute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleSection {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_profile_id: Option<String>,

    #[serde(default)]
    pub status: ResourceStatus,
}
