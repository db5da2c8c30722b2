//! Cirrus core
//!
//! Data model for project blueprints (the declarative description of one
//! project's cloud topology and its last-known resource state) plus the
//! filesystem store that persists one YAML document per project.

pub mod error;
pub mod model;
pub mod slug;
pub mod store;

// Re-exports
pub use error::{CoreError, Result};
pub use model::{
    Blueprint, CertificateSection, ComputeSection, DataSection, DatabaseSection, IngressRule,
    KeyPairSection, NetworkSection, PowerAction, ProjectMeta, ResourceKind, ResourceStatus,
    RoleSection, SecuritySection, Slot, StorageSection,
};
pub use slug::slugify;
pub use store::BlueprintStore;
