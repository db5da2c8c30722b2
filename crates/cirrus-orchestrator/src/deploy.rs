//! Deployment orchestrator.
//!
//! Executes the fixed ordered step sequence for a blueprint. Every step is
//! idempotent on retry: the resource tracker is consulted first, and a step
//! whose resource already exists is a no-op success that rehydrates the
//! blueprint from the tracker entry. After each successful provider call
//! the tracker is written *before* the blueprint, the crash-safety
//! invariant that keeps the tracker a superset of the blueprint.
//!
//! There is no automatic rollback: on the first unrecoverable failure the
//! remaining steps are not attempted, and the tracker plus the blueprint's
//! partial state form the recovery record for cleanup.

use crate::cancel::CancelFlag;
use crate::error::{OrchestratorError, Result};
use crate::{provider_call, OrchestratorContext};
use cirrus_bus::{ResourceDelta, StatusEvent};
use cirrus_cloud::{
    BucketRequest, DatabaseRequest, InstanceRequest, KeyPairRequest, NetworkRequest,
    ProviderError, RoleRequest, SecurityGroupRequest, TrackerEntry,
};
use cirrus_core::{Blueprint, ResourceStatus, Slot};
use uuid::Uuid;

/// The fixed deployment sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStep {
    Network,
    SecurityGroup,
    KeyPair,
    Role,
    Instance,
    Database,
    Storage,
    Verify,
}

impl DeployStep {
    pub const ORDER: [DeployStep; 8] = [
        DeployStep::Network,
        DeployStep::SecurityGroup,
        DeployStep::KeyPair,
        DeployStep::Role,
        DeployStep::Instance,
        DeployStep::Database,
        DeployStep::Storage,
        DeployStep::Verify,
    ];

    pub const TOTAL: u32 = Self::ORDER.len() as u32;

    /// 1-based position in the sequence.
    pub fn number(self) -> u32 {
        Self::ORDER
            .iter()
            .position(|&s| s == self)
            .map(|i| i as u32 + 1)
            .unwrap_or(0)
    }

    pub fn name(self) -> &'static str {
        match self {
            DeployStep::Network => "network",
            DeployStep::SecurityGroup => "security group",
            DeployStep::KeyPair => "key pair",
            DeployStep::Role => "identity role",
            DeployStep::Instance => "compute instance",
            DeployStep::Database => "database",
            DeployStep::Storage => "object storage",
            DeployStep::Verify => "verification",
        }
    }
}

impl std::fmt::Display for DeployStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub(crate) async fn handle_deploy(
    ctx: &OrchestratorContext,
    request_id: Uuid,
    slug: &str,
    cancel: &CancelFlag,
) -> Result<String> {
    let mut blueprint = ctx.store.load(slug).await.map_err(|e| {
        OrchestratorError::Validation(format!("cannot load blueprint for {}: {}", slug, e))
    })?;
    blueprint
        .validate()
        .map_err(|e| OrchestratorError::Validation(e.to_string()))?;

    for step in DeployStep::ORDER {
        if cancel.is_cancelled() {
            tracing::warn!(%request_id, project = slug, step = %step, "deploy cancelled");
            return Err(OrchestratorError::Cancelled(step.name().to_string()));
        }
        run_step(ctx, request_id, slug, &mut blueprint, step).await?;
    }

    Ok(format!("deployment of {} completed", slug))
}

async fn run_step(
    ctx: &OrchestratorContext,
    request_id: Uuid,
    slug: &str,
    blueprint: &mut Blueprint,
    step: DeployStep,
) -> Result<()> {
    tracing::info!(%request_id, project = slug, step = %step, "running step");
    match step {
        DeployStep::Network => step_network(ctx, request_id, slug, blueprint).await,
        DeployStep::SecurityGroup => step_security_group(ctx, request_id, slug, blueprint).await,
        DeployStep::KeyPair => step_key_pair(ctx, request_id, slug, blueprint).await,
        DeployStep::Role => step_role(ctx, request_id, slug, blueprint).await,
        DeployStep::Instance => step_instance(ctx, request_id, slug, blueprint).await,
        DeployStep::Database => step_database(ctx, request_id, slug, blueprint).await,
        DeployStep::Storage => step_storage(ctx, request_id, slug, blueprint).await,
        DeployStep::Verify => step_verify(ctx, request_id, slug).await,
    }
}

fn progress(
    ctx: &OrchestratorContext,
    request_id: Uuid,
    step: DeployStep,
    message: impl Into<String>,
    deltas: Vec<ResourceDelta>,
) {
    let mut event =
        StatusEvent::progress(request_id, message).with_step(step.number(), DeployStep::TOTAL);
    event.resource_deltas = deltas;
    ctx.bus.publish_status(event);
}

fn skipped(slot: Slot) -> ResourceDelta {
    ResourceDelta {
        slot,
        provider_id: None,
        status: ResourceStatus::Skipped,
    }
}

fn created(slot: Slot, provider_id: &str) -> ResourceDelta {
    ResourceDelta {
        slot,
        provider_id: Some(provider_id.to_string()),
        status: ResourceStatus::Created,
    }
}

fn step_failed(step: DeployStep, slot: Slot, source: ProviderError) -> OrchestratorError {
    OrchestratorError::StepFailed {
        step,
        slot: Some(slot),
        source,
    }
}

async fn step_network(
    ctx: &OrchestratorContext,
    request_id: Uuid,
    slug: &str,
    blueprint: &mut Blueprint,
) -> Result<()> {
    let step = DeployStep::Network;
    let vpc_entry = ctx.tracker.get(slug, Slot::Vpc).await;
    let subnet_entry = ctx.tracker.get(slug, Slot::Subnet).await;

    if let (Some(vpc), Some(subnet)) = (vpc_entry, subnet_entry) {
        blueprint.network.vpc_id = Some(vpc.provider_id.clone());
        blueprint.network.subnet_id = Some(subnet.provider_id.clone());
        blueprint.network.status = ResourceStatus::Created;
        blueprint.project.touch();
        ctx.store.save(blueprint).await?;
        progress(
            ctx,
            request_id,
            step,
            "network already provisioned",
            vec![
                created(Slot::Vpc, &vpc.provider_id),
                created(Slot::Subnet, &subnet.provider_id),
            ],
        );
        return Ok(());
    }

    blueprint.network.status = ResourceStatus::Creating;
    ctx.store.save(blueprint).await?;

    let request = NetworkRequest {
        project: slug.to_string(),
        use_default: blueprint.network.use_default,
        cidr_block: blueprint.network.cidr_block.clone(),
        subnet_cidr: blueprint.network.subnet_cidr.clone(),
    };
    let ids = match provider_call(ctx, || ctx.provider.ensure_network(&request)).await {
        Ok(ids) => ids,
        Err(source) => {
            blueprint.network.status = ResourceStatus::Failed;
            ctx.store.save(blueprint).await?;
            return Err(step_failed(step, Slot::Vpc, source));
        }
    };

    let region = blueprint.project.region.clone();
    // A reused default network was not created by us and must never be
    // deleted by us, so it is not tracked.
    if !ids.reused_existing {
        ctx.tracker
            .record(TrackerEntry::new(slug, Slot::Vpc, &ids.vpc_id, &region))
            .await?;
        ctx.tracker
            .record(TrackerEntry::new(slug, Slot::Subnet, &ids.subnet_id, &region))
            .await?;
    }

    blueprint.network.vpc_id = Some(ids.vpc_id.clone());
    blueprint.network.subnet_id = Some(ids.subnet_id.clone());
    blueprint.network.status = ResourceStatus::Created;
    blueprint.project.touch();
    ctx.store.save(blueprint).await?;

    let message = if ids.reused_existing {
        format!("reusing existing network {}", ids.vpc_id)
    } else {
        format!("created network {}", ids.vpc_id)
    };
    progress(
        ctx,
        request_id,
        step,
        message,
        vec![
            created(Slot::Vpc, &ids.vpc_id),
            created(Slot::Subnet, &ids.subnet_id),
        ],
    );
    Ok(())
}

async fn step_security_group(
    ctx: &OrchestratorContext,
    request_id: Uuid,
    slug: &str,
    blueprint: &mut Blueprint,
) -> Result<()> {
    let step = DeployStep::SecurityGroup;
    if let Some(entry) = ctx.tracker.get(slug, Slot::SecurityGroup).await {
        blueprint.network.security_group_id = Some(entry.provider_id.clone());
        blueprint.network.security_group_status = ResourceStatus::Created;
        ctx.store.save(blueprint).await?;
        progress(
            ctx,
            request_id,
            step,
            "security group already provisioned",
            vec![created(Slot::SecurityGroup, &entry.provider_id)],
        );
        return Ok(());
    }

    let vpc_id = blueprint.network.vpc_id.clone().ok_or_else(|| {
        OrchestratorError::Validation("network step produced no vpc id".to_string())
    })?;

    blueprint.network.security_group_status = ResourceStatus::Creating;
    ctx.store.save(blueprint).await?;

    let request = SecurityGroupRequest {
        project: slug.to_string(),
        vpc_id,
        name: format!("{}-sg", slug),
        description: format!("Cirrus managed security group for {}", slug),
        ingress: blueprint.network.ingress.clone(),
    };
    let group_id = match provider_call(ctx, || ctx.provider.create_security_group(&request)).await
    {
        Ok(id) => id,
        Err(source) => {
            blueprint.network.security_group_status = ResourceStatus::Failed;
            ctx.store.save(blueprint).await?;
            return Err(step_failed(step, Slot::SecurityGroup, source));
        }
    };

    let region = blueprint.project.region.clone();
    ctx.tracker
        .record(TrackerEntry::new(slug, Slot::SecurityGroup, &group_id, &region))
        .await?;
    blueprint.network.security_group_id = Some(group_id.clone());
    blueprint.network.security_group_status = ResourceStatus::Created;
    blueprint.project.touch();
    ctx.store.save(blueprint).await?;

    progress(
        ctx,
        request_id,
        step,
        format!(
            "created security group {} with {} ingress rule(s)",
            group_id,
            request.ingress.len()
        ),
        vec![created(Slot::SecurityGroup, &group_id)],
    );
    Ok(())
}

async fn step_key_pair(
    ctx: &OrchestratorContext,
    request_id: Uuid,
    slug: &str,
    blueprint: &mut Blueprint,
) -> Result<()> {
    let step = DeployStep::KeyPair;
    let Some(key_pair) = blueprint.security.key_pair.clone() else {
        progress(
            ctx,
            request_id,
            step,
            "key pair not requested, skipped",
            vec![skipped(Slot::KeyPair)],
        );
        return Ok(());
    };

    if let Some(entry) = ctx.tracker.get(slug, Slot::KeyPair).await {
        if let Some(section) = blueprint.security.key_pair.as_mut() {
            section.key_id = Some(entry.provider_id.clone());
            section.status = ResourceStatus::Created;
        }
        ctx.store.save(blueprint).await?;
        progress(
            ctx,
            request_id,
            step,
            "key pair already provisioned",
            vec![created(Slot::KeyPair, &entry.provider_id)],
        );
        return Ok(());
    }

    if let Some(section) = blueprint.security.key_pair.as_mut() {
        section.status = ResourceStatus::Creating;
    }
    ctx.store.save(blueprint).await?;

    let request = KeyPairRequest {
        project: slug.to_string(),
        name: key_pair.name.clone(),
        public_key: key_pair.public_key.clone(),
    };
    let key_id = match provider_call(ctx, || ctx.provider.import_key_pair(&request)).await {
        Ok(id) => id,
        Err(source) => {
            if let Some(section) = blueprint.security.key_pair.as_mut() {
                section.status = ResourceStatus::Failed;
            }
            ctx.store.save(blueprint).await?;
            return Err(step_failed(step, Slot::KeyPair, source));
        }
    };

    let region = blueprint.project.region.clone();
    ctx.tracker
        .record(TrackerEntry::new(slug, Slot::KeyPair, &key_id, &region))
        .await?;
    if let Some(section) = blueprint.security.key_pair.as_mut() {
        section.key_id = Some(key_id.clone());
        section.status = ResourceStatus::Created;
    }
    blueprint.project.touch();
    ctx.store.save(blueprint).await?;

    progress(
        ctx,
        request_id,
        step,
        format!("imported key pair {}", key_pair.name),
        vec![created(Slot::KeyPair, &key_id)],
    );
    Ok(())
}

async fn step_role(
    ctx: &OrchestratorContext,
    request_id: Uuid,
    slug: &str,
    blueprint: &mut Blueprint,
) -> Result<()> {
    let step = DeployStep::Role;
    let Some(role) = blueprint.security.role.clone() else {
        progress(
            ctx,
            request_id,
            step,
            "identity role not requested, skipped",
            vec![skipped(Slot::Role), skipped(Slot::InstanceProfile)],
        );
        return Ok(());
    };

    if let Some(role_entry) = ctx.tracker.get(slug, Slot::Role).await {
        let profile_entry = ctx.tracker.get(slug, Slot::InstanceProfile).await;
        if let Some(section) = blueprint.security.role.as_mut() {
            section.role_id = Some(role_entry.provider_id.clone());
            section.instance_profile_id = profile_entry.as_ref().map(|e| e.provider_id.clone());
            section.status = ResourceStatus::Created;
        }
        ctx.store.save(blueprint).await?;
        let mut deltas = vec![created(Slot::Role, &role_entry.provider_id)];
        if let Some(profile) = &profile_entry {
            deltas.push(created(Slot::InstanceProfile, &profile.provider_id));
        }
        progress(ctx, request_id, step, "identity role already provisioned", deltas);
        return Ok(());
    }

    if let Some(section) = blueprint.security.role.as_mut() {
        section.status = ResourceStatus::Creating;
    }
    ctx.store.save(blueprint).await?;

    let request = RoleRequest {
        project: slug.to_string(),
        name: role.name.clone(),
    };
    let ids = match provider_call(ctx, || ctx.provider.create_instance_role(&request)).await {
        Ok(ids) => ids,
        Err(source) => {
            if let Some(section) = blueprint.security.role.as_mut() {
                section.status = ResourceStatus::Failed;
            }
            ctx.store.save(blueprint).await?;
            return Err(step_failed(step, Slot::Role, source));
        }
    };

    let region = blueprint.project.region.clone();
    ctx.tracker
        .record(TrackerEntry::new(slug, Slot::Role, &ids.role_id, &region))
        .await?;
    ctx.tracker
        .record(TrackerEntry::new(
            slug,
            Slot::InstanceProfile,
            &ids.instance_profile_id,
            &region,
        ))
        .await?;
    if let Some(section) = blueprint.security.role.as_mut() {
        section.role_id = Some(ids.role_id.clone());
        section.instance_profile_id = Some(ids.instance_profile_id.clone());
        section.status = ResourceStatus::Created;
    }
    blueprint.project.touch();
    ctx.store.save(blueprint).await?;

    progress(
        ctx,
        request_id,
        step,
        format!("created role {} and instance profile", ids.role_id),
        vec![
            created(Slot::Role, &ids.role_id),
            created(Slot::InstanceProfile, &ids.instance_profile_id),
        ],
    );
    Ok(())
}

async fn step_instance(
    ctx: &OrchestratorContext,
    request_id: Uuid,
    slug: &str,
    blueprint: &mut Blueprint,
) -> Result<()> {
    let step = DeployStep::Instance;
    if let Some(entry) = ctx.tracker.get(slug, Slot::Instance).await {
        blueprint.compute.instance_id = Some(entry.provider_id.clone());
        blueprint.compute.status = ResourceStatus::Created;
        ctx.store.save(blueprint).await?;
        progress(
            ctx,
            request_id,
            step,
            "compute instance already provisioned",
            vec![created(Slot::Instance, &entry.provider_id)],
        );
        return Ok(());
    }

    let subnet_id = blueprint.network.subnet_id.clone().ok_or_else(|| {
        OrchestratorError::Validation("network step produced no subnet id".to_string())
    })?;
    let security_group_id = blueprint.network.security_group_id.clone().ok_or_else(|| {
        OrchestratorError::Validation("security group step produced no group id".to_string())
    })?;

    blueprint.compute.status = ResourceStatus::Creating;
    ctx.store.save(blueprint).await?;

    let request = InstanceRequest {
        project: slug.to_string(),
        name: format!("{}-instance", slug),
        instance_type: blueprint.compute.instance_type.clone(),
        image_id: blueprint.compute.image_id.clone(),
        subnet_id,
        security_group_id,
        key_pair: blueprint.security.key_pair.as_ref().map(|k| k.name.clone()),
        instance_profile: blueprint
            .security
            .role
            .as_ref()
            .and_then(|r| r.instance_profile_id.clone()),
        user_data: blueprint.compute.user_data.clone(),
    };
    let info = match provider_call(ctx, || ctx.provider.launch_instance(&request)).await {
        Ok(info) => info,
        Err(source) => {
            blueprint.compute.status = ResourceStatus::Failed;
            ctx.store.save(blueprint).await?;
            return Err(step_failed(step, Slot::Instance, source));
        }
    };

    let region = blueprint.project.region.clone();
    ctx.tracker
        .record(TrackerEntry::new(slug, Slot::Instance, &info.id, &region))
        .await?;
    blueprint.compute.instance_id = Some(info.id.clone());
    blueprint.compute.public_ip = info.public_ip.clone();
    blueprint.compute.private_ip = info.private_ip.clone();
    blueprint.compute.status = ResourceStatus::Created;
    blueprint.project.touch();
    ctx.store.save(blueprint).await?;

    progress(
        ctx,
        request_id,
        step,
        format!("launched instance {} ({})", info.id, info.state),
        vec![created(Slot::Instance, &info.id)],
    );
    Ok(())
}

async fn step_database(
    ctx: &OrchestratorContext,
    request_id: Uuid,
    slug: &str,
    blueprint: &mut Blueprint,
) -> Result<()> {
    let step = DeployStep::Database;
    let Some(database) = blueprint.data.database.clone() else {
        progress(
            ctx,
            request_id,
            step,
            "database not requested, skipped",
            vec![skipped(Slot::Database)],
        );
        return Ok(());
    };

    if let Some(entry) = ctx.tracker.get(slug, Slot::Database).await {
        if let Some(section) = blueprint.data.database.as_mut() {
            section.identifier = Some(entry.provider_id.clone());
            section.status = ResourceStatus::Created;
        }
        ctx.store.save(blueprint).await?;
        progress(
            ctx,
            request_id,
            step,
            "database already provisioned",
            vec![created(Slot::Database, &entry.provider_id)],
        );
        return Ok(());
    }

    if let Some(section) = blueprint.data.database.as_mut() {
        section.status = ResourceStatus::Creating;
    }
    ctx.store.save(blueprint).await?;

    let request = DatabaseRequest {
        project: slug.to_string(),
        identifier: database
            .identifier
            .clone()
            .unwrap_or_else(|| format!("{}-db", slug)),
        engine: database.engine.clone(),
        instance_class: database.instance_class.clone(),
        allocated_gb: database.allocated_gb,
        security_group_id: blueprint.network.security_group_id.clone(),
    };
    let info = match provider_call(ctx, || ctx.provider.create_database(&request)).await {
        Ok(info) => info,
        Err(source) => {
            if let Some(section) = blueprint.data.database.as_mut() {
                section.status = ResourceStatus::Failed;
            }
            ctx.store.save(blueprint).await?;
            return Err(step_failed(step, Slot::Database, source));
        }
    };

    let region = blueprint.project.region.clone();
    ctx.tracker
        .record(TrackerEntry::new(slug, Slot::Database, &info.identifier, &region))
        .await?;
    if let Some(section) = blueprint.data.database.as_mut() {
        section.identifier = Some(info.identifier.clone());
        section.endpoint = info.endpoint.clone();
        section.status = ResourceStatus::Created;
    }
    blueprint.project.touch();
    ctx.store.save(blueprint).await?;

    progress(
        ctx,
        request_id,
        step,
        format!("created database {} ({})", info.identifier, info.status),
        vec![created(Slot::Database, &info.identifier)],
    );
    Ok(())
}

async fn step_storage(
    ctx: &OrchestratorContext,
    request_id: Uuid,
    slug: &str,
    blueprint: &mut Blueprint,
) -> Result<()> {
    let step = DeployStep::Storage;
    let Some(storage) = blueprint.data.storage.clone() else {
        progress(
            ctx,
            request_id,
            step,
            "object storage not requested, skipped",
            vec![skipped(Slot::Bucket)],
        );
        return Ok(());
    };

    if let Some(entry) = ctx.tracker.get(slug, Slot::Bucket).await {
        if let Some(section) = blueprint.data.storage.as_mut() {
            section.status = ResourceStatus::Created;
        }
        ctx.store.save(blueprint).await?;
        progress(
            ctx,
            request_id,
            step,
            "bucket already provisioned",
            vec![created(Slot::Bucket, &entry.provider_id)],
        );
        return Ok(());
    }

    if let Some(section) = blueprint.data.storage.as_mut() {
        section.status = ResourceStatus::Creating;
    }
    ctx.store.save(blueprint).await?;

    let request = BucketRequest {
        project: slug.to_string(),
        name: storage.bucket.clone(),
    };
    let bucket = match provider_call(ctx, || ctx.provider.create_bucket(&request)).await {
        Ok(name) => name,
        Err(source) => {
            if let Some(section) = blueprint.data.storage.as_mut() {
                section.status = ResourceStatus::Failed;
            }
            ctx.store.save(blueprint).await?;
            return Err(step_failed(step, Slot::Bucket, source));
        }
    };

    let region = blueprint.project.region.clone();
    ctx.tracker
        .record(TrackerEntry::new(slug, Slot::Bucket, &bucket, &region))
        .await?;
    if let Some(section) = blueprint.data.storage.as_mut() {
        section.status = ResourceStatus::Created;
    }
    blueprint.project.touch();
    ctx.store.save(blueprint).await?;

    progress(
        ctx,
        request_id,
        step,
        format!("created bucket {}", bucket),
        vec![created(Slot::Bucket, &bucket)],
    );
    Ok(())
}

/// Re-read every tracked resource from the provider before declaring the
/// deployment complete.
async fn step_verify(ctx: &OrchestratorContext, request_id: Uuid, slug: &str) -> Result<()> {
    let step = DeployStep::Verify;
    let entries = ctx.tracker.list(slug).await;
    for entry in &entries {
        let health = provider_call(ctx, || ctx.provider.describe(entry.kind, &entry.provider_id))
            .await
            .map_err(|source| step_failed(step, entry.slot, source))?;
        if !health.reachable {
            return Err(step_failed(
                step,
                entry.slot,
                ProviderError::CommandFailed(format!(
                    "{} {} is in state {}",
                    entry.kind, entry.provider_id, health.state
                )),
            ));
        }
    }
    progress(
        ctx,
        request_id,
        step,
        format!("verified {} resource(s) reachable", entries.len()),
        Vec::new(),
    );
    Ok(())
}
