//! Control-plane collaborator boundary: the trait the reconcile engine talks
//! to, transport-error classification, and client configuration.

#![forbid(unsafe_code)]

mod config;
mod errors;
pub mod mock;

pub use config::{ClientConfig, ClientConfigBuilder};
pub use errors::{absorb_not_found, is_not_found, is_retryable};

use anyhow::Result;
use teleplane_core::{Kind, Resource, ResourceStatus, RolloutOptions};

/// Remote control-plane operations the engine depends on. Implementations own
/// transport, authentication, and connection pooling; this crate only defines
/// the seam.
#[async_trait::async_trait]
pub trait ControlPlane: Send + Sync {
    /// Submit desired-state resources in one batch. A successful call returns
    /// one status per submitted resource.
    async fn apply(&self, resources: &[Resource]) -> Result<Vec<ResourceStatus>>;

    /// Fetch a resource by kind and name. Absent resources error with a
    /// "404 Not Found"-shaped message; read paths pass the result through
    /// [`absorb_not_found`].
    async fn get(&self, kind: Kind, name: &str) -> Result<Resource>;

    /// Delete a resource by kind and name. The control plane refuses when a
    /// dependent resource still references the target.
    async fn delete(&self, kind: Kind, name: &str) -> Result<()>;

    /// Begin an asynchronous rollout of a configuration to its agents,
    /// returning the configuration as the rollout handle.
    async fn start_rollout(
        &self,
        name: &str,
        options: Option<&RolloutOptions>,
    ) -> Result<Resource>;
}
