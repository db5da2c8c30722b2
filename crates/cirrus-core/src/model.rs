//! Blueprint data model.
//!
//! One [`Blueprint`] per project, with sections for project metadata,
//! network, compute, data and security. Every leaf resource carries a
//! [`ResourceStatus`]; the invariant is that a provider-id field is
//! populated iff the status is `created` (or `deleting` during teardown).

mod compute;
mod data;
mod network;
mod project;
mod resource;
mod security;
mod status;

pub use compute::ComputeSection;
pub use data::{DataSection, DatabaseSection, StorageSection};
pub use network::{IngressRule, NetworkSection};
pub use project::ProjectMeta;
pub use resource::{PowerAction, ResourceKind, Slot};
pub use security::{CertificateSection, KeyPairSection, RoleSection, SecuritySection};
pub use status::ResourceStatus;

use crate::error::{CoreError, Result};
use crate::slug::slugify;
use serde::{Deserialize, Serialize};

/// Declarative description of one project's cloud topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blueprint {
    pub project: ProjectMeta,
    pub network: NetworkSection,
    pub compute: ComputeSection,
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub security: SecuritySection,
}

impl Blueprint {
    pub fn new(
        name: impl Into<String>,
        region: impl Into<String>,
        instance_type: impl Into<String>,
    ) -> Self {
        Self {
            project: ProjectMeta::new(name, region),
            network: NetworkSection::default(),
            compute: ComputeSection::new(instance_type),
            data: DataSection::default(),
            security: SecuritySection::default(),
        }
    }

    /// Filesystem-safe identifier derived from the project name.
    pub fn slug(&self) -> String {
        slugify(&self.project.name)
    }

    /// Reject malformed blueprints before any provider call is made.
    pub fn validate(&self) -> Result<()> {
        if self.project.name.trim().is_empty() {
            return Err(CoreError::InvalidBlueprint("project.name is empty".into()));
        }
        if self.project.region.trim().is_empty() {
            return Err(CoreError::InvalidBlueprint("project.region is empty".into()));
        }
        if self.compute.instance_type.trim().is_empty() {
            return Err(CoreError::InvalidBlueprint(
                "compute.instance_type is empty".into(),
            ));
        }
        for rule in &self.network.ingress {
            if rule.protocol.trim().is_empty() || rule.cidr.trim().is_empty() {
                return Err(CoreError::InvalidBlueprint(format!(
                    "malformed ingress rule on port {}",
                    rule.port
                )));
            }
        }
        if let Some(db) = &self.data.database {
            if db.engine.trim().is_empty() || db.instance_class.trim().is_empty() {
                return Err(CoreError::InvalidBlueprint(
                    "data.database requires engine and instance_class".into(),
                ));
            }
        }
        if let Some(storage) = &self.data.storage {
            if storage.bucket.trim().is_empty() {
                return Err(CoreError::InvalidBlueprint("data.storage.bucket is empty".into()));
            }
        }
        if let Some(key_pair) = &self.security.key_pair {
            if key_pair.name.trim().is_empty() {
                return Err(CoreError::InvalidBlueprint("security.key_pair.name is empty".into()));
            }
        }
        if let Some(role) = &self.security.role {
            if role.name.trim().is_empty() {
                return Err(CoreError::InvalidBlueprint("security.role.name is empty".into()));
            }
        }
        Ok(())
    }

    /// Status of the resource occupying `slot`, if the blueprint declares it.
    pub fn status_of(&self, slot: Slot) -> Option<ResourceStatus> {
        match slot {
            Slot::Vpc | Slot::Subnet => Some(self.network.status),
            Slot::SecurityGroup => Some(self.network.security_group_status),
            Slot::KeyPair => self.security.key_pair.as_ref().map(|k| k.status),
            Slot::Role | Slot::InstanceProfile => self.security.role.as_ref().map(|r| r.status),
            Slot::Instance => Some(self.compute.status),
            Slot::Database => self.data.database.as_ref().map(|d| d.status),
            Slot::Bucket => self.data.storage.as_ref().map(|s| s.status),
        }
    }

    /// All declared slots with their current status.
    pub fn leaf_statuses(&self) -> Vec<(Slot, ResourceStatus)> {
        Slot::ALL
            .iter()
            .filter_map(|&slot| self.status_of(slot).map(|status| (slot, status)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> Blueprint {
        Blueprint::new("Test Stack", "us-east-1", "t3.micro")
    }

    #[test]
    fn test_slug_derivation() {
        assert_eq!(minimal().slug(), "test-stack");
    }

    #[test]
    fn test_validate_ok() {
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_instance_type() {
        let mut bp = minimal();
        bp.compute.instance_type = String::new();
        assert!(bp.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_ingress() {
        let mut bp = minimal();
        bp.network.ingress.push(IngressRule {
            protocol: String::new(),
            port: 22,
            cidr: "0.0.0.0/0".into(),
            description: None,
        });
        assert!(bp.validate().is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut bp = minimal();
        bp.network.ingress.push(IngressRule {
            protocol: "tcp".into(),
            port: 443,
            cidr: "0.0.0.0/0".into(),
            description: Some("https".into()),
        });
        bp.data.database = Some(DatabaseSection::new("postgres", "db.t3.micro"));

        let yaml = serde_yaml::to_string(&bp).unwrap();
        let parsed: Blueprint = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.project.name, "Test Stack");
        assert_eq!(parsed.network.ingress.len(), 1);
        assert_eq!(parsed.data.database.unwrap().engine, "postgres");
        assert_eq!(parsed.compute.status, ResourceStatus::Pending);
    }

    #[test]
    fn test_leaf_statuses_skips_absent_sections() {
        let bp = minimal();
        let slots: Vec<Slot> = bp.leaf_statuses().into_iter().map(|(s, _)| s).collect();
        assert!(slots.contains(&Slot::Instance));
        assert!(!slots.contains(&Slot::Database));
        assert!(!slots.contains(&Slot::KeyPair));
    }
}
