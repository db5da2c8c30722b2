//! aws CLI wrapper.
//!
//! Wraps `aws <service> <operation> --output json` invocations. Credentials
//! are passed explicitly per invocation (profile flag or environment on the
//! child process). There is no ambient session.

use crate::error::{AwsError, Result};
use base64::Engine;
use chrono::Utc;
use cirrus_cloud::{
    Credentials, CREATED_TAG_KEY, MANAGED_TAG_KEY, MANAGED_TAG_VALUE, PROJECT_TAG_KEY,
};
use cirrus_core::IngressRule;
use serde::Deserialize;
use std::process::Stdio;
use tokio::process::Command;

/// Trust policy letting EC2 assume the instance role.
const EC2_ASSUME_ROLE_POLICY: &str = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Principal":{"Service":"ec2.amazonaws.com"},"Action":"sts:AssumeRole"}]}"#;

pub struct AwsCli {
    region: String,
    credentials: Credentials,
}

impl AwsCli {
    pub fn new(region: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            region: region.into(),
            credentials,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Run an aws CLI command and return stdout.
    async fn run(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("aws");
        cmd.arg("--region").arg(&self.region);
        cmd.arg("--output").arg("json");
        if let Some(profile) = &self.credentials.profile {
            cmd.arg("--profile").arg(profile);
        }
        if let Some(key) = &self.credentials.access_key_id {
            cmd.env("AWS_ACCESS_KEY_ID", key);
        }
        if let Some(secret) = &self.credentials.secret_access_key {
            cmd.env("AWS_SECRET_ACCESS_KEY", secret);
        }
        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: aws --region {} {}", self.region, args.join(" "));

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AwsError::CliNotFound
            } else {
                AwsError::Io(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_error(&stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn tag_spec(&self, resource_type: &str, project: &str) -> String {
        format!(
            "ResourceType={},Tags=[{{Key={},Value={}}},{{Key={},Value={}}},{{Key={},Value={}}}]",
            resource_type,
            MANAGED_TAG_KEY,
            MANAGED_TAG_VALUE,
            PROJECT_TAG_KEY,
            project,
            CREATED_TAG_KEY,
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
        )
    }

    /// Check authentication by resolving the caller identity.
    pub async fn caller_identity(&self) -> Result<CallerIdentity> {
        let output = self.run(&["sts", "get-caller-identity"]).await?;
        Ok(serde_json::from_str(&output)?)
    }

    /// The account's default VPC, if one exists.
    pub async fn find_default_vpc(&self) -> Result<Option<Vpc>> {
        let output = self
            .run(&[
                "ec2",
                "describe-vpcs",
                "--filters",
                "Name=is-default,Values=true",
            ])
            .await?;
        let list: VpcList = serde_json::from_str(&output)?;
        Ok(list.vpcs.into_iter().next())
    }

    /// First subnet of a VPC, if any.
    pub async fn first_subnet_of(&self, vpc_id: &str) -> Result<Option<Subnet>> {
        let filter = format!("Name=vpc-id,Values={}", vpc_id);
        let output = self
            .run(&["ec2", "describe-subnets", "--filters", filter.as_str()])
            .await?;
        let list: SubnetList = serde_json::from_str(&output)?;
        Ok(list.subnets.into_iter().next())
    }

    pub async fn create_vpc(&self, cidr: &str, project: &str) -> Result<Vpc> {
        let tags = self.tag_spec("vpc", project);
        let output = self
            .run(&[
                "ec2",
                "create-vpc",
                "--cidr-block",
                cidr,
                "--tag-specifications",
                tags.as_str(),
            ])
            .await?;
        let created: CreatedVpc = serde_json::from_str(&output)?;
        Ok(created.vpc)
    }

    pub async fn create_subnet(&self, vpc_id: &str, cidr: &str, project: &str) -> Result<Subnet> {
        let tags = self.tag_spec("subnet", project);
        let output = self
            .run(&[
                "ec2",
                "create-subnet",
                "--vpc-id",
                vpc_id,
                "--cidr-block",
                cidr,
                "--tag-specifications",
                tags.as_str(),
            ])
            .await?;
        let created: CreatedSubnet = serde_json::from_str(&output)?;
        Ok(created.subnet)
    }

    pub async fn create_security_group(
        &self,
        vpc_id: &str,
        name: &str,
        description: &str,
        project: &str,
    ) -> Result<String> {
        let tags = self.tag_spec("security-group", project);
        let output = self
            .run(&[
                "ec2",
                "create-security-group",
                "--vpc-id",
                vpc_id,
                "--group-name",
                name,
                "--description",
                description,
                "--tag-specifications",
                tags.as_str(),
            ])
            .await?;
        let created: CreatedSecurityGroup = serde_json::from_str(&output)?;
        Ok(created.group_id)
    }

    pub async fn authorize_ingress(&self, group_id: &str, rule: &IngressRule) -> Result<()> {
        let port = rule.port.to_string();
        self.run(&[
            "ec2",
            "authorize-security-group-ingress",
            "--group-id",
            group_id,
            "--protocol",
            rule.protocol.as_str(),
            "--port",
            port.as_str(),
            "--cidr",
            rule.cidr.as_str(),
        ])
        .await?;
        Ok(())
    }

    /// Import public key material, returning the key pair id.
    pub async fn import_key_pair(
        &self,
        name: &str,
        public_key: &str,
        project: &str,
    ) -> Result<String> {
        let material = base64::engine::general_purpose::STANDARD.encode(public_key);
        let tags = self.tag_spec("key-pair", project);
        let output = self
            .run(&[
                "ec2",
                "import-key-pair",
                "--key-name",
                name,
                "--public-key-material",
                material.as_str(),
                "--tag-specifications",
                tags.as_str(),
            ])
            .await?;
        let key: KeyPair = serde_json::from_str(&output)?;
        Ok(key.key_pair_id)
    }

    /// Generate a fresh key pair at the provider, returning its id.
    pub async fn create_key_pair(&self, name: &str, project: &str) -> Result<String> {
        let tags = self.tag_spec("key-pair", project);
        let output = self
            .run(&[
                "ec2",
                "create-key-pair",
                "--key-name",
                name,
                "--tag-specifications",
                tags.as_str(),
            ])
            .await?;
        let key: KeyPair = serde_json::from_str(&output)?;
        Ok(key.key_pair_id)
    }

    /// Create an identity role EC2 can assume. Returns the role name, which
    /// is the identifier every other IAM call wants.
    pub async fn create_role(&self, name: &str, project: &str) -> Result<String> {
        let managed_tag = format!("Key={},Value={}", MANAGED_TAG_KEY, MANAGED_TAG_VALUE);
        let project_tag = format!("Key={},Value={}", PROJECT_TAG_KEY, project);
        self.run(&[
            "iam",
            "create-role",
            "--role-name",
            name,
            "--assume-role-policy-document",
            EC2_ASSUME_ROLE_POLICY,
            "--tags",
            managed_tag.as_str(),
            project_tag.as_str(),
        ])
        .await?;
        Ok(name.to_string())
    }

    pub async fn create_instance_profile(&self, name: &str, role_name: &str) -> Result<String> {
        self.run(&["iam", "create-instance-profile", "--instance-profile-name", name])
            .await?;
        self.run(&[
            "iam",
            "add-role-to-instance-profile",
            "--instance-profile-name",
            name,
            "--role-name",
            role_name,
        ])
        .await?;
        Ok(name.to_string())
    }

    pub async fn run_instances(&self, params: &RunInstancesParams<'_>) -> Result<Instance> {
        let tags = self.tag_spec("instance", params.project);
        let mut args = vec![
            "ec2",
            "run-instances",
            "--image-id",
            params.image_id,
            "--instance-type",
            params.instance_type,
            "--subnet-id",
            params.subnet_id,
            "--security-group-ids",
            params.security_group_id,
            "--count",
            "1",
            "--tag-specifications",
            tags.as_str(),
        ];
        if let Some(key_name) = params.key_name {
            args.push("--key-name");
            args.push(key_name);
        }
        let profile_spec = params
            .instance_profile
            .map(|p| format!("Name={}", p));
        if let Some(spec) = &profile_spec {
            args.push("--iam-instance-profile");
            args.push(spec.as_str());
        }
        if let Some(user_data) = params.user_data {
            args.push("--user-data");
            args.push(user_data);
        }
        let output = self.run(&args).await?;
        let launched: RunInstancesOutput = serde_json::from_str(&output)?;
        launched
            .instances
            .into_iter()
            .next()
            .ok_or_else(|| AwsError::CommandFailed("run-instances returned no instances".into()))
    }

    pub async fn describe_instance(&self, id: &str) -> Result<Instance> {
        let output = self
            .run(&["ec2", "describe-instances", "--instance-ids", id])
            .await?;
        let described: DescribeInstancesOutput = serde_json::from_str(&output)?;
        described
            .reservations
            .into_iter()
            .flat_map(|r| r.instances)
            .next()
            .ok_or_else(|| AwsError::NotFound(format!("instance {}", id)))
    }

    pub async fn create_db_instance(
        &self,
        identifier: &str,
        engine: &str,
        instance_class: &str,
        allocated_gb: u32,
        security_group_id: Option<&str>,
        project: &str,
    ) -> Result<DbInstance> {
        let storage = allocated_gb.to_string();
        let tags = format!(
            "Key={},Value={}",
            PROJECT_TAG_KEY, project
        );
        let mut args = vec![
            "rds",
            "create-db-instance",
            "--db-instance-identifier",
            identifier,
            "--engine",
            engine,
            "--db-instance-class",
            instance_class,
            "--allocated-storage",
            storage.as_str(),
            "--master-username",
            "cirrus",
            "--manage-master-user-password",
            "--no-publicly-accessible",
            "--tags",
            tags.as_str(),
        ];
        if let Some(sg) = security_group_id {
            args.push("--vpc-security-group-ids");
            args.push(sg);
        }
        let output = self.run(&args).await?;
        let created: CreatedDbInstance = serde_json::from_str(&output)?;
        Ok(created.db_instance)
    }

    pub async fn describe_db_instance(&self, identifier: &str) -> Result<DbInstance> {
        let output = self
            .run(&["rds", "describe-db-instances", "--db-instance-identifier", identifier])
            .await?;
        let described: DescribeDbInstancesOutput = serde_json::from_str(&output)?;
        described
            .db_instances
            .into_iter()
            .next()
            .ok_or_else(|| AwsError::NotFound(format!("database {}", identifier)))
    }

    pub async fn create_bucket(&self, name: &str, project: &str) -> Result<()> {
        let mut args = vec!["s3api", "create-bucket", "--bucket", name];
        let location = format!("LocationConstraint={}", self.region);
        if self.region != "us-east-1" {
            args.push("--create-bucket-configuration");
            args.push(location.as_str());
        }
        self.run(&args).await?;

        let tag_set = format!(
            "TagSet=[{{Key={},Value={}}},{{Key={},Value={}}}]",
            MANAGED_TAG_KEY, MANAGED_TAG_VALUE, PROJECT_TAG_KEY, project
        );
        self.run(&[
            "s3api",
            "put-bucket-tagging",
            "--bucket",
            name,
            "--tagging",
            tag_set.as_str(),
        ])
        .await?;
        Ok(())
    }

    pub async fn terminate_instance(&self, id: &str) -> Result<()> {
        self.run(&["ec2", "terminate-instances", "--instance-ids", id])
            .await?;
        self.run(&["ec2", "wait", "instance-terminated", "--instance-ids", id])
            .await?;
        Ok(())
    }

    pub async fn delete_security_group(&self, id: &str) -> Result<()> {
        self.run(&["ec2", "delete-security-group", "--group-id", id])
            .await?;
        Ok(())
    }

    pub async fn delete_subnet(&self, id: &str) -> Result<()> {
        self.run(&["ec2", "delete-subnet", "--subnet-id", id]).await?;
        Ok(())
    }

    pub async fn delete_vpc(&self, id: &str) -> Result<()> {
        self.run(&["ec2", "delete-vpc", "--vpc-id", id]).await?;
        Ok(())
    }

    pub async fn delete_key_pair(&self, id: &str) -> Result<()> {
        self.run(&["ec2", "delete-key-pair", "--key-pair-id", id])
            .await?;
        Ok(())
    }

    pub async fn delete_role(&self, name: &str) -> Result<()> {
        self.run(&["iam", "delete-role", "--role-name", name]).await?;
        Ok(())
    }

    /// Delete an instance profile, detaching any roles first.
    pub async fn delete_instance_profile(&self, name: &str) -> Result<()> {
        let output = self
            .run(&["iam", "get-instance-profile", "--instance-profile-name", name])
            .await?;
        let described: GetInstanceProfileOutput = serde_json::from_str(&output)?;
        for role in described.instance_profile.roles {
            self.run(&[
                "iam",
                "remove-role-from-instance-profile",
                "--instance-profile-name",
                name,
                "--role-name",
                &role.role_name,
            ])
            .await?;
        }
        self.run(&["iam", "delete-instance-profile", "--instance-profile-name", name])
            .await?;
        Ok(())
    }

    pub async fn delete_db_instance(&self, identifier: &str) -> Result<()> {
        self.run(&[
            "rds",
            "delete-db-instance",
            "--db-instance-identifier",
            identifier,
            "--skip-final-snapshot",
        ])
        .await?;
        Ok(())
    }

    /// Delete a bucket including its contents.
    pub async fn delete_bucket(&self, name: &str) -> Result<()> {
        let uri = format!("s3://{}", name);
        self.run(&["s3", "rb", uri.as_str(), "--force"]).await?;
        Ok(())
    }

    pub async fn start_instance(&self, id: &str) -> Result<()> {
        self.run(&["ec2", "start-instances", "--instance-ids", id])
            .await?;
        Ok(())
    }

    pub async fn stop_instance(&self, id: &str) -> Result<()> {
        self.run(&["ec2", "stop-instances", "--instance-ids", id])
            .await?;
        Ok(())
    }

    pub async fn start_db_instance(&self, identifier: &str) -> Result<()> {
        self.run(&["rds", "start-db-instance", "--db-instance-identifier", identifier])
            .await?;
        Ok(())
    }

    pub async fn stop_db_instance(&self, identifier: &str) -> Result<()> {
        self.run(&["rds", "stop-db-instance", "--db-instance-identifier", identifier])
            .await?;
        Ok(())
    }

    /// Current state string of one resource, for the verification pass.
    /// Kinds without a meaningful state report "available" when the
    /// describe call succeeds.
    pub async fn resource_state(
        &self,
        kind: cirrus_core::ResourceKind,
        id: &str,
    ) -> Result<String> {
        use cirrus_core::ResourceKind::*;
        match kind {
            Instance => Ok(self.describe_instance(id).await?.state.name),
            Database => Ok(self
                .describe_db_instance(id)
                .await?
                .status
                .unwrap_or_else(|| "unknown".to_string())),
            Vpc => {
                self.run(&["ec2", "describe-vpcs", "--vpc-ids", id]).await?;
                Ok("available".to_string())
            }
            Subnet => {
                self.run(&["ec2", "describe-subnets", "--subnet-ids", id])
                    .await?;
                Ok("available".to_string())
            }
            SecurityGroup => {
                self.run(&["ec2", "describe-security-groups", "--group-ids", id])
                    .await?;
                Ok("available".to_string())
            }
            KeyPair => {
                self.run(&["ec2", "describe-key-pairs", "--key-pair-ids", id])
                    .await?;
                Ok("available".to_string())
            }
            Role => {
                self.run(&["iam", "get-role", "--role-name", id]).await?;
                Ok("available".to_string())
            }
            InstanceProfile => {
                self.run(&["iam", "get-instance-profile", "--instance-profile-name", id])
                    .await?;
                Ok("available".to_string())
            }
            Bucket => {
                self.run(&["s3api", "head-bucket", "--bucket", id]).await?;
                Ok("available".to_string())
            }
        }
    }

    /// Describe EC2-family resources carrying the managed tag.
    pub async fn describe_managed(&self, what: &str) -> Result<serde_json::Value> {
        let filter = format!("Name=tag:{},Values={}", MANAGED_TAG_KEY, MANAGED_TAG_VALUE);
        let output = self.run(&["ec2", what, "--filters", filter.as_str()]).await?;
        Ok(serde_json::from_str(&output)?)
    }

    /// All database instances in the region. Tag filtering happens client
    /// side; RDS has no server-side tag filter on describe.
    pub async fn describe_all_db_instances(&self) -> Result<Vec<DbInstance>> {
        let output = self.run(&["rds", "describe-db-instances"]).await?;
        let described: DescribeDbInstancesOutput = serde_json::from_str(&output)?;
        Ok(described.db_instances)
    }
}

/// Classify aws CLI stderr into the provider error taxonomy.
///
/// The CLI reports API failures as
/// `An error occurred (<Code>) when calling the <Op> operation: <message>`.
pub fn classify_error(stderr: &str) -> AwsError {
    let message = stderr.trim().to_string();
    let has = |needle: &str| stderr.contains(needle);

    if has("Throttling") || has("RequestLimitExceeded") || has("TooManyRequests") {
        AwsError::Throttled(message)
    } else if has("NotFound")
        || has("NoSuchEntity")
        || has("NoSuchBucket")
        || has("DBInstanceNotFound")
        || has("does not exist")
        || has("(404)")
    {
        AwsError::NotFound(message)
    } else if has("DependencyViolation") || has("DeleteConflict") {
        AwsError::DependencyViolation(message)
    } else if has("UnauthorizedOperation") || has("AccessDenied") {
        AwsError::PermissionDenied(message)
    } else if has("AuthFailure") || has("ExpiredToken") || has("InvalidClientTokenId") {
        AwsError::AuthenticationFailed(message)
    } else if has("InvalidParameter") || has("ValidationError") || has("InvalidGroup.Duplicate") {
        AwsError::InvalidParameter(message)
    } else {
        AwsError::CommandFailed(message)
    }
}

/// Parameters for `run-instances`.
pub struct RunInstancesParams<'a> {
    pub project: &'a str,
    pub image_id: &'a str,
    pub instance_type: &'a str,
    pub subnet_id: &'a str,
    pub security_group_id: &'a str,
    pub key_name: Option<&'a str>,
    pub instance_profile: Option<&'a str>,
    pub user_data: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallerIdentity {
    #[serde(rename = "Account")]
    pub account: String,
    #[serde(rename = "Arn")]
    pub arn: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Vpc {
    #[serde(rename = "VpcId")]
    pub vpc_id: String,
    #[serde(rename = "CidrBlock")]
    pub cidr_block: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VpcList {
    #[serde(rename = "Vpcs", default)]
    vpcs: Vec<Vpc>,
}

#[derive(Debug, Deserialize)]
struct CreatedVpc {
    #[serde(rename = "Vpc")]
    vpc: Vpc,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Subnet {
    #[serde(rename = "SubnetId")]
    pub subnet_id: String,
    #[serde(rename = "VpcId")]
    pub vpc_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubnetList {
    #[serde(rename = "Subnets", default)]
    subnets: Vec<Subnet>,
}

#[derive(Debug, Deserialize)]
struct CreatedSubnet {
    #[serde(rename = "Subnet")]
    subnet: Subnet,
}

#[derive(Debug, Deserialize)]
struct CreatedSecurityGroup {
    #[serde(rename = "GroupId")]
    group_id: String,
}

#[derive(Debug, Deserialize)]
struct KeyPair {
    #[serde(rename = "KeyPairId")]
    key_pair_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Instance {
    #[serde(rename = "InstanceId")]
    pub instance_id: String,
    #[serde(rename = "State")]
    pub state: InstanceState,
    #[serde(rename = "PublicIpAddress")]
    pub public_ip: Option<String>,
    #[serde(rename = "PrivateIpAddress")]
    pub private_ip: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceState {
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct RunInstancesOutput {
    #[serde(rename = "Instances", default)]
    instances: Vec<Instance>,
}

#[derive(Debug, Deserialize)]
struct DescribeInstancesOutput {
    #[serde(rename = "Reservations", default)]
    reservations: Vec<Reservation>,
}

#[derive(Debug, Deserialize)]
struct Reservation {
    #[serde(rename = "Instances", default)]
    instances: Vec<Instance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbInstance {
    #[serde(rename = "DBInstanceIdentifier")]
    pub identifier: String,
    #[serde(rename = "DBInstanceStatus")]
    pub status: Option<String>,
    #[serde(rename = "Endpoint")]
    pub endpoint: Option<DbEndpoint>,
    #[serde(rename = "TagList", default)]
    pub tags: Vec<AwsTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbEndpoint {
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AwsTag {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct CreatedDbInstance {
    #[serde(rename = "DBInstance")]
    db_instance: DbInstance,
}

#[derive(Debug, Deserialize)]
struct DescribeDbInstancesOutput {
    #[serde(rename = "DBInstances", default)]
    db_instances: Vec<DbInstance>,
}

#[derive(Debug, Deserialize)]
struct GetInstanceProfileOutput {
    #[serde(rename = "InstanceProfile")]
    instance_profile: InstanceProfile,
}

#[derive(Debug, Deserialize)]
struct InstanceProfile {
    #[serde(rename = "Roles", default)]
    roles: Vec<RoleRef>,
}

#[derive(Debug, Deserialize)]
struct RoleRef {
    #[serde(rename = "RoleName")]
    role_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_throttling() {
        let err = classify_error(
            "An error occurred (RequestLimitExceeded) when calling the RunInstances operation: Request limit exceeded.",
        );
        assert!(matches!(err, AwsError::Throttled(_)));
    }

    #[test]
    fn test_classify_not_found() {
        let err = classify_error(
            "An error occurred (InvalidVpcID.NotFound) when calling the DeleteVpc operation: The vpc ID 'vpc-123' does not exist",
        );
        assert!(matches!(err, AwsError::NotFound(_)));
    }

    #[test]
    fn test_classify_dependency_violation() {
        let err = classify_error(
            "An error occurred (DependencyViolation) when calling the DeleteVpc operation: The vpc 'vpc-123' has dependencies and cannot be deleted.",
        );
        assert!(matches!(err, AwsError::DependencyViolation(_)));
    }

    #[test]
    fn test_classify_permission_denied() {
        let err = classify_error(
            "An error occurred (UnauthorizedOperation) when calling the RunInstances operation: You are not authorized to perform this operation.",
        );
        assert!(matches!(err, AwsError::PermissionDenied(_)));
    }

    #[test]
    fn test_classify_unknown_is_command_failed() {
        let err = classify_error("something unexpected went wrong");
        assert!(matches!(err, AwsError::CommandFailed(_)));
    }

    #[test]
    fn test_parse_run_instances_output() {
        let raw = r#"{
            "Instances": [
                {
                    "InstanceId": "i-0123456789abcdef0",
                    "State": {"Code": 0, "Name": "pending"},
                    "PrivateIpAddress": "10.0.1.20"
                }
            ]
        }"#;
        let parsed: RunInstancesOutput = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.instances[0].instance_id, "i-0123456789abcdef0");
        assert_eq!(parsed.instances[0].state.name, "pending");
        assert_eq!(parsed.instances[0].public_ip, None);
    }

    #[test]
    fn test_parse_db_instance_output() {
        let raw = r#"{
            "DBInstances": [
                {
                    "DBInstanceIdentifier": "demo-db",
                    "DBInstanceStatus": "available",
                    "Endpoint": {"Address": "demo-db.xyz.us-east-1.rds.amazonaws.com", "Port": 5432},
                    "TagList": [{"Key": "cirrus:project", "Value": "demo"}]
                }
            ]
        }"#;
        let parsed: DescribeDbInstancesOutput = serde_json::from_str(raw).unwrap();
        let db = &parsed.db_instances[0];
        assert_eq!(db.identifier, "demo-db");
        assert_eq!(db.endpoint.as_ref().unwrap().port, 5432);
        assert_eq!(db.tags[0].value, "demo");
    }
}
