//! Cirrus cloud infrastructure
//!
//! Provider abstraction for the resources a blueprint can declare, the
//! fixed dependency graph that orders safe deletion, and the durable
//! resource tracker, the authoritative record of everything believed to
//! exist at the provider.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │             cirrus-orchestrator               │
//! │        (deploy / terminate / power)           │
//! └───────────────┬──────────────────────────────┘
//!                 │
//! ┌───────────────▼──────────────────────────────┐
//! │               cirrus-cloud                    │
//! │  trait CloudProvider        ResourceTracker   │
//! │  DependencyGraph            retry/backoff     │
//! └───────┬──────────────────────────┬───────────┘
//!         │                          │
//! ┌───────▼───────┐          ┌───────▼───────┐
//! │  aws provider │          │ mock provider │
//! │ (cirrus-cloud-aws)       │  (feature)    │
//! └───────────────┘          └───────────────┘
//! ```

pub mod error;
pub mod graph;
#[cfg(feature = "mock")]
pub mod mock;
pub mod provider;
pub mod retry;
pub mod tracker;

// Re-exports
pub use error::{ProviderError, Result};
pub use graph::DependencyGraph;
#[cfg(feature = "mock")]
pub use mock::{MockFailure, MockProvider};
pub use provider::{
    AuthStatus, BucketRequest, CloudProvider, Credentials, DatabaseInfo, DatabaseRequest,
    InstanceInfo, InstanceRequest, KeyPairRequest, NetworkIds, NetworkRequest, ResourceHealth,
    RoleIds, RoleRequest, ScannedResource, SecurityGroupRequest, CREATED_TAG_KEY,
    MANAGED_TAG_KEY, MANAGED_TAG_VALUE, PROJECT_TAG_KEY,
};
pub use retry::{call_with_retry, RetryConfig};
pub use tracker::{ResourceTracker, TrackerEntry};
