//! In-memory provider for tests and dry runs.
//!
//! Mirrors the contract of a real provider closely enough to exercise the
//! orchestration paths: idempotency, permanent and transient failures,
//! dependency-blocked deletions and not-found-on-delete semantics.

use crate::error::{ProviderError, Result};
use crate::provider::{
    AuthStatus, BucketRequest, CloudProvider, DatabaseInfo, DatabaseRequest, InstanceInfo,
    InstanceRequest, KeyPairRequest, NetworkIds, NetworkRequest, ResourceHealth, RoleIds,
    RoleRequest, ScannedResource, SecurityGroupRequest,
};
use async_trait::async_trait;
use cirrus_core::{PowerAction, ResourceKind};
use std::collections::HashMap;
use std::sync::Mutex;

/// Failure kinds a test can inject.
#[derive(Debug, Clone)]
pub enum MockFailure {
    PermissionDenied(String),
    Throttled(String),
    Timeout(String),
    DependencyViolation(String),
    CommandFailed(String),
}

impl MockFailure {
    fn to_error(&self) -> ProviderError {
        match self {
            MockFailure::PermissionDenied(m) => ProviderError::PermissionDenied(m.clone()),
            MockFailure::Throttled(m) => ProviderError::Throttled(m.clone()),
            MockFailure::Timeout(m) => ProviderError::Timeout(m.clone()),
            MockFailure::DependencyViolation(m) => ProviderError::DependencyViolation(m.clone()),
            MockFailure::CommandFailed(m) => ProviderError::CommandFailed(m.clone()),
        }
    }
}

#[derive(Debug, Clone)]
struct FailureRule {
    failure: MockFailure,
    /// `None` fires on every call; `Some(n)` fires `n` more times.
    remaining: Option<u32>,
}

#[derive(Debug, Clone)]
struct MockResource {
    id: String,
    kind: ResourceKind,
    region: String,
    project: Option<String>,
    name: Option<String>,
    running: bool,
    is_default: bool,
}

#[derive(Default)]
struct MockState {
    counter: u64,
    resources: HashMap<String, MockResource>,
    fail_create: HashMap<ResourceKind, FailureRule>,
    fail_delete: HashMap<ResourceKind, FailureRule>,
    create_calls: HashMap<ResourceKind, usize>,
    delete_calls: HashMap<ResourceKind, usize>,
}

impl MockState {
    fn next_id(&mut self, kind: ResourceKind) -> String {
        self.counter += 1;
        let prefix = match kind {
            ResourceKind::Vpc => "vpc",
            ResourceKind::Subnet => "subnet",
            ResourceKind::SecurityGroup => "sg",
            ResourceKind::KeyPair => "key",
            ResourceKind::Role => "role",
            ResourceKind::InstanceProfile => "profile",
            ResourceKind::Instance => "i",
            ResourceKind::Database => "db",
            ResourceKind::Bucket => "bucket",
        };
        format!("{}-{:06x}", prefix, self.counter)
    }

    fn take_failure(
        rules: &mut HashMap<ResourceKind, FailureRule>,
        kind: ResourceKind,
    ) -> Option<ProviderError> {
        let (error, exhausted) = match rules.get_mut(&kind) {
            None => return None,
            Some(rule) => match rule.remaining {
                None => (Some(rule.failure.to_error()), false),
                Some(0) => (None, true),
                Some(n) => {
                    rule.remaining = Some(n - 1);
                    (Some(rule.failure.to_error()), n == 1)
                }
            },
        };
        if exhausted {
            rules.remove(&kind);
        }
        error
    }

    fn insert(
        &mut self,
        id: String,
        kind: ResourceKind,
        region: &str,
        project: Option<&str>,
        name: Option<&str>,
    ) {
        self.resources.insert(
            id.clone(),
            MockResource {
                id,
                kind,
                region: region.to_string(),
                project: project.map(str::to_string),
                name: name.map(str::to_string),
                running: true,
                is_default: false,
            },
        );
    }

    fn create(&mut self, kind: ResourceKind) -> Result<()> {
        *self.create_calls.entry(kind).or_insert(0) += 1;
        if let Some(err) = Self::take_failure(&mut self.fail_create, kind) {
            return Err(err);
        }
        Ok(())
    }
}

/// In-memory [`CloudProvider`].
pub struct MockProvider {
    region: String,
    state: Mutex<MockState>,
}

impl MockProvider {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Pre-seed a default VPC + subnet for `use_default` network requests.
    pub fn with_default_network(region: impl Into<String>) -> Self {
        let provider = Self::new(region);
        {
            let mut state = provider.state.lock().unwrap();
            for (id, kind) in [
                ("vpc-default", ResourceKind::Vpc),
                ("subnet-default", ResourceKind::Subnet),
            ] {
                state.resources.insert(
                    id.to_string(),
                    MockResource {
                        id: id.to_string(),
                        kind,
                        region: provider.region.clone(),
                        project: None,
                        name: Some("default".to_string()),
                        running: true,
                        is_default: true,
                    },
                );
            }
        }
        provider
    }

    /// Fail every creation of `kind` with `failure`.
    pub fn fail_create(&self, kind: ResourceKind, failure: MockFailure) {
        self.state.lock().unwrap().fail_create.insert(
            kind,
            FailureRule {
                failure,
                remaining: None,
            },
        );
    }

    /// Fail the next `times` creations of `kind`, then succeed.
    pub fn fail_create_times(&self, kind: ResourceKind, failure: MockFailure, times: u32) {
        self.state.lock().unwrap().fail_create.insert(
            kind,
            FailureRule {
                failure,
                remaining: Some(times),
            },
        );
    }

    /// Fail every deletion of `kind` with `failure`.
    pub fn fail_delete(&self, kind: ResourceKind, failure: MockFailure) {
        self.state.lock().unwrap().fail_delete.insert(
            kind,
            FailureRule {
                failure,
                remaining: None,
            },
        );
    }

    /// Number of creation attempts seen for `kind`.
    pub fn create_calls(&self, kind: ResourceKind) -> usize {
        *self
            .state
            .lock()
            .unwrap()
            .create_calls
            .get(&kind)
            .unwrap_or(&0)
    }

    /// Number of deletion attempts seen for `kind`.
    pub fn delete_calls(&self, kind: ResourceKind) -> usize {
        *self
            .state
            .lock()
            .unwrap()
            .delete_calls
            .get(&kind)
            .unwrap_or(&0)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.lock().unwrap().resources.contains_key(id)
    }

    pub fn resource_ids(&self, kind: ResourceKind) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut ids: Vec<String> = state
            .resources
            .values()
            .filter(|r| r.kind == kind)
            .map(|r| r.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn is_running(&self, id: &str) -> Option<bool> {
        self.state.lock().unwrap().resources.get(id).map(|r| r.running)
    }

    /// Drop a resource behind the orchestrator's back, simulating external
    /// deletion.
    pub fn evict(&self, id: &str) {
        self.state.lock().unwrap().resources.remove(id);
    }
}

#[async_trait]
impl CloudProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn display_name(&self) -> &str {
        "In-memory mock"
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        Ok(AuthStatus::ok("mock-account"))
    }

    async fn ensure_network(&self, request: &NetworkRequest) -> Result<NetworkIds> {
        let mut state = self.state.lock().unwrap();
        state.create(ResourceKind::Vpc)?;

        if request.use_default {
            let vpc = state
                .resources
                .values()
                .find(|r| r.kind == ResourceKind::Vpc && r.is_default)
                .map(|r| r.id.clone());
            let subnet = state
                .resources
                .values()
                .find(|r| r.kind == ResourceKind::Subnet && r.is_default)
                .map(|r| r.id.clone());
            if let (Some(vpc_id), Some(subnet_id)) = (vpc, subnet) {
                return Ok(NetworkIds {
                    vpc_id,
                    subnet_id,
                    reused_existing: true,
                });
            }
        }

        let vpc_id = state.next_id(ResourceKind::Vpc);
        state.insert(
            vpc_id.clone(),
            ResourceKind::Vpc,
            &self.region,
            Some(&request.project),
            None,
        );
        let subnet_id = state.next_id(ResourceKind::Subnet);
        state.insert(
            subnet_id.clone(),
            ResourceKind::Subnet,
            &self.region,
            Some(&request.project),
            None,
        );
        Ok(NetworkIds {
            vpc_id,
            subnet_id,
            reused_existing: false,
        })
    }

    async fn create_security_group(&self, request: &SecurityGroupRequest) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.create(ResourceKind::SecurityGroup)?;
        if !state.resources.contains_key(&request.vpc_id) {
            return Err(ProviderError::InvalidParameter(format!(
                "unknown vpc: {}",
                request.vpc_id
            )));
        }
        let id = state.next_id(ResourceKind::SecurityGroup);
        state.insert(
            id.clone(),
            ResourceKind::SecurityGroup,
            &self.region,
            Some(&request.project),
            Some(&request.name),
        );
        Ok(id)
    }

    async fn import_key_pair(&self, request: &KeyPairRequest) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.create(ResourceKind::KeyPair)?;
        let id = state.next_id(ResourceKind::KeyPair);
        state.insert(
            id.clone(),
            ResourceKind::KeyPair,
            &self.region,
            Some(&request.project),
            Some(&request.name),
        );
        Ok(id)
    }

    async fn create_instance_role(&self, request: &RoleRequest) -> Result<RoleIds> {
        let mut state = self.state.lock().unwrap();
        state.create(ResourceKind::Role)?;
        let role_id = state.next_id(ResourceKind::Role);
        state.insert(
            role_id.clone(),
            ResourceKind::Role,
            &self.region,
            Some(&request.project),
            Some(&request.name),
        );
        state.create(ResourceKind::InstanceProfile)?;
        let instance_profile_id = state.next_id(ResourceKind::InstanceProfile);
        state.insert(
            instance_profile_id.clone(),
            ResourceKind::InstanceProfile,
            &self.region,
            Some(&request.project),
            Some(&request.name),
        );
        Ok(RoleIds {
            role_id,
            instance_profile_id,
        })
    }

    async fn launch_instance(&self, request: &InstanceRequest) -> Result<InstanceInfo> {
        let mut state = self.state.lock().unwrap();
        state.create(ResourceKind::Instance)?;
        for dependency in [&request.subnet_id, &request.security_group_id] {
            if !state.resources.contains_key(dependency.as_str()) {
                return Err(ProviderError::InvalidParameter(format!(
                    "unknown dependency: {}",
                    dependency
                )));
            }
        }
        let id = state.next_id(ResourceKind::Instance);
        state.insert(
            id.clone(),
            ResourceKind::Instance,
            &self.region,
            Some(&request.project),
            Some(&request.name),
        );
        Ok(InstanceInfo {
            id,
            state: "running".to_string(),
            public_ip: Some("198.51.100.10".to_string()),
            private_ip: Some("10.0.1.10".to_string()),
        })
    }

    async fn create_database(&self, request: &DatabaseRequest) -> Result<DatabaseInfo> {
        let mut state = self.state.lock().unwrap();
        state.create(ResourceKind::Database)?;
        state.insert(
            request.identifier.clone(),
            ResourceKind::Database,
            &self.region,
            Some(&request.project),
            Some(&request.identifier),
        );
        Ok(DatabaseInfo {
            identifier: request.identifier.clone(),
            status: "available".to_string(),
            endpoint: Some(format!("{}.mock.local:5432", request.identifier)),
        })
    }

    async fn create_bucket(&self, request: &BucketRequest) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.create(ResourceKind::Bucket)?;
        state.insert(
            request.name.clone(),
            ResourceKind::Bucket,
            &self.region,
            Some(&request.project),
            Some(&request.name),
        );
        Ok(request.name.clone())
    }

    async fn describe(&self, kind: ResourceKind, id: &str) -> Result<ResourceHealth> {
        let state = self.state.lock().unwrap();
        match state.resources.get(id) {
            Some(resource) if resource.kind == kind => Ok(ResourceHealth {
                id: resource.id.clone(),
                kind,
                state: if resource.running {
                    "available".to_string()
                } else {
                    "stopped".to_string()
                },
                reachable: true,
            }),
            _ => Err(ProviderError::NotFound(format!("{} {}", kind, id))),
        }
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        *state.delete_calls.entry(kind).or_insert(0) += 1;
        if let Some(err) = MockState::take_failure(&mut state.fail_delete, kind) {
            return Err(err);
        }
        match state.resources.remove(id) {
            Some(_) => Ok(()),
            None => Err(ProviderError::NotFound(format!("{} {}", kind, id))),
        }
    }

    async fn set_power(&self, kind: ResourceKind, id: &str, action: PowerAction) -> Result<()> {
        if !matches!(kind, ResourceKind::Instance | ResourceKind::Database) {
            return Err(ProviderError::Unsupported {
                kind,
                message: "power control applies to instances and databases".to_string(),
            });
        }
        let mut state = self.state.lock().unwrap();
        match state.resources.get_mut(id) {
            Some(resource) => {
                resource.running = matches!(action, PowerAction::Start);
                Ok(())
            }
            None => Err(ProviderError::NotFound(format!("{} {}", kind, id))),
        }
    }

    async fn scan(&self, region: &str) -> Result<Vec<ScannedResource>> {
        let state = self.state.lock().unwrap();
        let mut found: Vec<ScannedResource> = state
            .resources
            .values()
            .filter(|r| r.region == region && !r.is_default)
            .map(|r| ScannedResource {
                id: r.id.clone(),
                kind: r.kind,
                region: r.region.clone(),
                name: r.name.clone(),
                project: r.project.clone(),
            })
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network_request() -> NetworkRequest {
        NetworkRequest {
            project: "demo".into(),
            use_default: false,
            cidr_block: None,
            subnet_cidr: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_describe() {
        let provider = MockProvider::new("us-east-1");
        let ids = provider.ensure_network(&network_request()).await.unwrap();
        assert!(!ids.reused_existing);

        let health = provider.describe(ResourceKind::Vpc, &ids.vpc_id).await.unwrap();
        assert!(health.reachable);
    }

    #[tokio::test]
    async fn test_default_network_reuse() {
        let provider = MockProvider::with_default_network("us-east-1");
        let mut request = network_request();
        request.use_default = true;

        let ids = provider.ensure_network(&request).await.unwrap();
        assert!(ids.reused_existing);
        assert_eq!(ids.vpc_id, "vpc-default");
    }

    #[tokio::test]
    async fn test_injected_failure_fires() {
        let provider = MockProvider::new("us-east-1");
        provider.fail_create(
            ResourceKind::Vpc,
            MockFailure::PermissionDenied("denied".into()),
        );
        let err = provider.ensure_network(&network_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::PermissionDenied(_)));
        assert_eq!(provider.create_calls(ResourceKind::Vpc), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let provider = MockProvider::new("us-east-1");
        let err = provider
            .delete(ResourceKind::Instance, "i-gone")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_power_toggles_state() {
        let provider = MockProvider::new("us-east-1");
        let ids = provider.ensure_network(&network_request()).await.unwrap();
        let sg = provider
            .create_security_group(&SecurityGroupRequest {
                project: "demo".into(),
                vpc_id: ids.vpc_id.clone(),
                name: "demo-sg".into(),
                description: "demo".into(),
                ingress: vec![],
            })
            .await
            .unwrap();
        let instance = provider
            .launch_instance(&InstanceRequest {
                project: "demo".into(),
                name: "demo".into(),
                instance_type: "t3.micro".into(),
                image_id: None,
                subnet_id: ids.subnet_id.clone(),
                security_group_id: sg,
                key_pair: None,
                instance_profile: None,
                user_data: None,
            })
            .await
            .unwrap();

        provider
            .set_power(ResourceKind::Instance, &instance.id, PowerAction::Stop)
            .await
            .unwrap();
        assert_eq!(provider.is_running(&instance.id), Some(false));
    }
}
