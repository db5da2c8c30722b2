//! AWS provider implementation.

use crate::aws_cli::{AwsCli, RunInstancesParams};
use crate::error::AwsError;
use async_trait::async_trait;
use cirrus_cloud::{
    AuthStatus, BucketRequest, CloudProvider, Credentials, DatabaseInfo, DatabaseRequest,
    InstanceInfo, InstanceRequest, KeyPairRequest, NetworkIds, NetworkRequest, ProviderError,
    ResourceHealth, RoleIds, RoleRequest, ScannedResource, SecurityGroupRequest, MANAGED_TAG_KEY,
    PROJECT_TAG_KEY,
};
use cirrus_core::{PowerAction, ResourceKind};

const DEFAULT_VPC_CIDR: &str = "10.0.0.0/16";
const DEFAULT_SUBNET_CIDR: &str = "10.0.1.0/24";

/// Region-current Amazon Linux image, resolved by EC2 at launch time.
const DEFAULT_IMAGE: &str =
    "resolve:ssm:/aws/service/ami-amazon-linux-latest/al2023-ami-kernel-default-x86_64";

/// AWS provider backed by the aws CLI.
pub struct AwsProvider {
    region: String,
    credentials: Credentials,
    cli: AwsCli,
}

impl AwsProvider {
    pub fn new(region: impl Into<String>, credentials: Credentials) -> Self {
        let region = region.into();
        let cli = AwsCli::new(region.clone(), credentials.clone());
        Self {
            region,
            credentials,
            cli,
        }
    }

    /// Credentials resolved from the conventional environment variables,
    /// falling back to the default profile chain of the CLI itself.
    pub fn credentials_from_env() -> Credentials {
        let profile = std::env::var("AWS_PROFILE").ok().filter(|p| !p.is_empty());
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID").ok().filter(|k| !k.is_empty());
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .ok()
            .filter(|k| !k.is_empty());
        Credentials {
            profile,
            access_key_id,
            secret_access_key,
        }
    }
}

#[async_trait]
impl CloudProvider for AwsProvider {
    fn name(&self) -> &str {
        "aws"
    }

    fn display_name(&self) -> &str {
        "Amazon Web Services"
    }

    async fn check_auth(&self) -> cirrus_cloud::Result<AuthStatus> {
        match self.cli.caller_identity().await {
            Ok(identity) => Ok(AuthStatus::ok(format!(
                "{} ({})",
                identity.arn, identity.account
            ))),
            Err(AwsError::AuthenticationFailed(message)) => Ok(AuthStatus::failed(message)),
            Err(err) => Err(err.into()),
        }
    }

    async fn ensure_network(&self, request: &NetworkRequest) -> cirrus_cloud::Result<NetworkIds> {
        if request.use_default {
            if let Some(vpc) = self.cli.find_default_vpc().await? {
                if let Some(subnet) = self.cli.first_subnet_of(&vpc.vpc_id).await? {
                    tracing::info!(vpc = %vpc.vpc_id, "reusing default network");
                    return Ok(NetworkIds {
                        vpc_id: vpc.vpc_id,
                        subnet_id: subnet.subnet_id,
                        reused_existing: true,
                    });
                }
            }
            tracing::info!("no usable default network, creating a dedicated one");
        }

        let cidr = request.cidr_block.as_deref().unwrap_or(DEFAULT_VPC_CIDR);
        let vpc = self.cli.create_vpc(cidr, &request.project).await?;
        let subnet_cidr = request.subnet_cidr.as_deref().unwrap_or(DEFAULT_SUBNET_CIDR);
        let subnet = self
            .cli
            .create_subnet(&vpc.vpc_id, subnet_cidr, &request.project)
            .await?;
        Ok(NetworkIds {
            vpc_id: vpc.vpc_id,
            subnet_id: subnet.subnet_id,
            reused_existing: false,
        })
    }

    async fn create_security_group(
        &self,
        request: &SecurityGroupRequest,
    ) -> cirrus_cloud::Result<String> {
        let group_id = self
            .cli
            .create_security_group(
                &request.vpc_id,
                &request.name,
                &request.description,
                &request.project,
            )
            .await?;
        for rule in &request.ingress {
            self.cli.authorize_ingress(&group_id, rule).await?;
        }
        Ok(group_id)
    }

    async fn import_key_pair(&self, request: &KeyPairRequest) -> cirrus_cloud::Result<String> {
        let key_id = match &request.public_key {
            Some(material) => {
                self.cli
                    .import_key_pair(&request.name, material, &request.project)
                    .await?
            }
            None => self.cli.create_key_pair(&request.name, &request.project).await?,
        };
        Ok(key_id)
    }

    async fn create_instance_role(&self, request: &RoleRequest) -> cirrus_cloud::Result<RoleIds> {
        let role_name = self.cli.create_role(&request.name, &request.project).await?;
        let profile_name = format!("{}-profile", request.name);
        let instance_profile_id = self
            .cli
            .create_instance_profile(&profile_name, &role_name)
            .await?;
        Ok(RoleIds {
            role_id: role_name,
            instance_profile_id,
        })
    }

    async fn launch_instance(&self, request: &InstanceRequest) -> cirrus_cloud::Result<InstanceInfo> {
        let image_id = request.image_id.as_deref().unwrap_or(DEFAULT_IMAGE);
        let launched = self
            .cli
            .run_instances(&RunInstancesParams {
                project: &request.project,
                image_id,
                instance_type: &request.instance_type,
                subnet_id: &request.subnet_id,
                security_group_id: &request.security_group_id,
                key_name: request.key_pair.as_deref(),
                instance_profile: request.instance_profile.as_deref(),
                user_data: request.user_data.as_deref(),
            })
            .await?;
        Ok(InstanceInfo {
            id: launched.instance_id,
            state: launched.state.name,
            public_ip: launched.public_ip,
            private_ip: launched.private_ip,
        })
    }

    async fn create_database(
        &self,
        request: &DatabaseRequest,
    ) -> cirrus_cloud::Result<DatabaseInfo> {
        let db = self
            .cli
            .create_db_instance(
                &request.identifier,
                &request.engine,
                &request.instance_class,
                request.allocated_gb,
                request.security_group_id.as_deref(),
                &request.project,
            )
            .await?;
        Ok(DatabaseInfo {
            identifier: db.identifier,
            status: db.status.unwrap_or_else(|| "creating".to_string()),
            endpoint: db.endpoint.map(|e| format!("{}:{}", e.address, e.port)),
        })
    }

    async fn create_bucket(&self, request: &BucketRequest) -> cirrus_cloud::Result<String> {
        self.cli.create_bucket(&request.name, &request.project).await?;
        Ok(request.name.clone())
    }

    async fn describe(&self, kind: ResourceKind, id: &str) -> cirrus_cloud::Result<ResourceHealth> {
        let state = self.cli.resource_state(kind, id).await?;
        let reachable = !matches!(state.as_str(), "terminated" | "shutting-down" | "deleting");
        Ok(ResourceHealth {
            id: id.to_string(),
            kind,
            state,
            reachable,
        })
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> cirrus_cloud::Result<()> {
        let result = match kind {
            ResourceKind::Instance => self.cli.terminate_instance(id).await,
            ResourceKind::Database => self.cli.delete_db_instance(id).await,
            ResourceKind::Bucket => self.cli.delete_bucket(id).await,
            ResourceKind::SecurityGroup => self.cli.delete_security_group(id).await,
            ResourceKind::Subnet => self.cli.delete_subnet(id).await,
            ResourceKind::KeyPair => self.cli.delete_key_pair(id).await,
            ResourceKind::InstanceProfile => self.cli.delete_instance_profile(id).await,
            ResourceKind::Role => self.cli.delete_role(id).await,
            ResourceKind::Vpc => self.cli.delete_vpc(id).await,
        };
        result.map_err(Into::into)
    }

    async fn set_power(
        &self,
        kind: ResourceKind,
        id: &str,
        action: PowerAction,
    ) -> cirrus_cloud::Result<()> {
        let result = match (kind, action) {
            (ResourceKind::Instance, PowerAction::Start) => self.cli.start_instance(id).await,
            (ResourceKind::Instance, PowerAction::Stop) => self.cli.stop_instance(id).await,
            (ResourceKind::Database, PowerAction::Start) => self.cli.start_db_instance(id).await,
            (ResourceKind::Database, PowerAction::Stop) => self.cli.stop_db_instance(id).await,
            (kind, _) => {
                return Err(ProviderError::Unsupported {
                    kind,
                    message: "power control applies to instances and databases".to_string(),
                })
            }
        };
        result.map_err(Into::into)
    }

    async fn scan(&self, region: &str) -> cirrus_cloud::Result<Vec<ScannedResource>> {
        let cli = if region == self.region {
            None
        } else {
            Some(AwsCli::new(region, self.credentials.clone()))
        };
        let cli = cli.as_ref().unwrap_or(&self.cli);

        let mut found = Vec::new();

        let instances = cli.describe_managed("describe-instances").await?;
        for reservation in array_of(&instances, "Reservations") {
            for instance in array_of(reservation, "Instances") {
                let state = instance
                    .pointer("/State/Name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown");
                if matches!(state, "terminated" | "shutting-down") {
                    continue;
                }
                push_scanned(&mut found, instance, "InstanceId", ResourceKind::Instance, region);
            }
        }

        let vpcs = cli.describe_managed("describe-vpcs").await?;
        for vpc in array_of(&vpcs, "Vpcs") {
            push_scanned(&mut found, vpc, "VpcId", ResourceKind::Vpc, region);
        }

        let subnets = cli.describe_managed("describe-subnets").await?;
        for subnet in array_of(&subnets, "Subnets") {
            push_scanned(&mut found, subnet, "SubnetId", ResourceKind::Subnet, region);
        }

        let groups = cli.describe_managed("describe-security-groups").await?;
        for group in array_of(&groups, "SecurityGroups") {
            push_scanned(&mut found, group, "GroupId", ResourceKind::SecurityGroup, region);
        }

        for db in cli.describe_all_db_instances().await? {
            let managed = db.tags.iter().any(|t| t.key == MANAGED_TAG_KEY)
                || db.tags.iter().any(|t| t.key == PROJECT_TAG_KEY);
            if !managed {
                continue;
            }
            let project = db
                .tags
                .iter()
                .find(|t| t.key == PROJECT_TAG_KEY)
                .map(|t| t.value.clone());
            found.push(ScannedResource {
                id: db.identifier.clone(),
                kind: ResourceKind::Database,
                region: region.to_string(),
                name: Some(db.identifier),
                project,
            });
        }

        Ok(found)
    }
}

fn array_of<'a>(value: &'a serde_json::Value, key: &str) -> impl Iterator<Item = &'a serde_json::Value> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|v| v.iter())
        .unwrap_or_default()
}

fn tag_value(resource: &serde_json::Value, key: &str) -> Option<String> {
    resource.get("Tags")?.as_array()?.iter().find_map(|tag| {
        if tag.get("Key")?.as_str()? == key {
            Some(tag.get("Value")?.as_str()?.to_string())
        } else {
            None
        }
    })
}

fn push_scanned(
    found: &mut Vec<ScannedResource>,
    resource: &serde_json::Value,
    id_key: &str,
    kind: ResourceKind,
    region: &str,
) {
    let Some(id) = resource.get(id_key).and_then(|v| v.as_str()) else {
        return;
    };
    found.push(ScannedResource {
        id: id.to_string(),
        kind,
        region: region.to_string(),
        name: tag_value(resource, "Name"),
        project: tag_value(resource, PROJECT_TAG_KEY),
    });
}
