//! AWS provider for Cirrus
//!
//! Speaks to AWS through the `aws` CLI with JSON output rather than linking
//! an SDK. Resources are tagged with the `cirrus:*` tag set at creation so
//! scans can find them without consulting local state.

pub mod aws_cli;
pub mod error;
pub mod provider;

pub use aws_cli::AwsCli;
pub use error::{AwsError, Result};
pub use provider::AwsProvider;
