//! Cloud provider trait definition.

use crate::error::Result;
use async_trait::async_trait;
use cirrus_core::{IngressRule, PowerAction, ResourceKind};
use serde::{Deserialize, Serialize};

/// Tag marking a resource as managed by Cirrus.
pub const MANAGED_TAG_KEY: &str = "cirrus:managed";
pub const MANAGED_TAG_VALUE: &str = "true";
/// Tag carrying the owning project slug.
pub const PROJECT_TAG_KEY: &str = "cirrus:project";
/// Tag carrying the creation timestamp.
pub const CREATED_TAG_KEY: &str = "cirrus:created";

/// Explicit credentials handed to a provider at construction.
///
/// There is no ambient global session: every provider-facing call runs
/// against the credentials the caller chose to pass in.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub profile: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl Credentials {
    pub fn profile(name: impl Into<String>) -> Self {
        Self {
            profile: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn keys(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            profile: None,
            access_key_id: Some(access_key_id.into()),
            secret_access_key: Some(secret_access_key.into()),
        }
    }
}

/// Authentication status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub account_info: Option<String>,
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// Network step input. `use_default` requests reuse of the account's
/// default VPC and subnet instead of creating a dedicated pair.
#[derive(Debug, Clone)]
pub struct NetworkRequest {
    pub project: String,
    pub use_default: bool,
    pub cidr_block: Option<String>,
    pub subnet_cidr: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NetworkIds {
    pub vpc_id: String,
    pub subnet_id: String,
    /// True when an existing network was reused rather than created.
    pub reused_existing: bool,
}

#[derive(Debug, Clone)]
pub struct SecurityGroupRequest {
    pub project: String,
    pub vpc_id: String,
    pub name: String,
    pub description: String,
    pub ingress: Vec<IngressRule>,
}

#[derive(Debug, Clone)]
pub struct KeyPairRequest {
    pub project: String,
    pub name: String,
    /// Public key material to import. When absent the provider generates a
    /// fresh pair.
    pub public_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RoleRequest {
    pub project: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct RoleIds {
    pub role_id: String,
    pub instance_profile_id: String,
}

#[derive(Debug, Clone)]
pub struct InstanceRequest {
    pub project: String,
    pub name: String,
    pub instance_type: String,
    pub image_id: Option<String>,
    pub subnet_id: String,
    pub security_group_id: String,
    pub key_pair: Option<String>,
    pub instance_profile: Option<String>,
    pub user_data: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InstanceInfo {
    pub id: String,
    pub state: String,
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseRequest {
    pub project: String,
    pub identifier: String,
    pub engine: String,
    pub instance_class: String,
    pub allocated_gb: u32,
    pub security_group_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseInfo {
    pub identifier: String,
    pub status: String,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BucketRequest {
    pub project: String,
    pub name: String,
}

/// Result of re-reading a resource from the provider.
#[derive(Debug, Clone)]
pub struct ResourceHealth {
    pub id: String,
    pub kind: ResourceKind,
    pub state: String,
    pub reachable: bool,
}

/// A managed resource discovered by a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannedResource {
    pub id: String,
    pub kind: ResourceKind,
    pub region: String,
    pub name: Option<String>,
    pub project: Option<String>,
}

/// Cloud provider abstraction.
///
/// Every call is blocking I/O from the provider's point of view and must be
/// driven from a worker task, never an event-loop thread. Implementations
/// tag created resources with the `cirrus:*` tag set so scans can find them
/// again.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Provider name (e.g. "aws").
    fn name(&self) -> &str;

    /// Display name for UI surfaces.
    fn display_name(&self) -> &str;

    /// Check that the provider is configured and the credentials work.
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// Ensure the project's VPC + subnet exist, creating them if needed.
    async fn ensure_network(&self, request: &NetworkRequest) -> Result<NetworkIds>;

    /// Create a security group and authorize its ingress rules.
    async fn create_security_group(&self, request: &SecurityGroupRequest) -> Result<String>;

    /// Import (or generate) an SSH key pair. Returns the key pair id.
    async fn import_key_pair(&self, request: &KeyPairRequest) -> Result<String>;

    /// Create an identity role and its instance profile.
    async fn create_instance_role(&self, request: &RoleRequest) -> Result<RoleIds>;

    /// Launch the compute instance.
    async fn launch_instance(&self, request: &InstanceRequest) -> Result<InstanceInfo>;

    /// Create a managed database instance.
    async fn create_database(&self, request: &DatabaseRequest) -> Result<DatabaseInfo>;

    /// Create an object-storage bucket. Returns the bucket name.
    async fn create_bucket(&self, request: &BucketRequest) -> Result<String>;

    /// Re-read one resource to confirm it is reachable.
    async fn describe(&self, kind: ResourceKind, id: &str) -> Result<ResourceHealth>;

    /// Delete one resource. `NotFound` is surfaced as an error here; callers
    /// on deletion paths treat it as success.
    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<()>;

    /// Start or stop an instance or database.
    async fn set_power(&self, kind: ResourceKind, id: &str, action: PowerAction) -> Result<()>;

    /// List managed resources in one region, identified by the Cirrus tags.
    async fn scan(&self, region: &str) -> Result<Vec<ScannedResource>>;
}
