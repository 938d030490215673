//! Teleplane core types and errors.

#![forbid(unsafe_code)]

mod config;
mod id;
mod resource;
mod telemetry;

pub use config::{
    AgentSelector, ConfigurationSpec, Parameter, ParameterizedSpec, ResourceConfiguration,
    RolloutOptions,
};
pub use id::new_resource_id;
pub use resource::{
    ApplyStatus, GenericResource, Kind, Metadata, Resource, ResourceStatus, API_VERSION,
};
pub use telemetry::{Route, Routes, TelemetryType};

/// Errors raised by the reconcile engine itself. Transport failures from the
/// control plane stay opaque `anyhow` chains at the collaborator boundary.
#[derive(Debug, thiserror::Error)]
pub enum PlaneError {
    #[error("validation: {0}")]
    Validation(String),
    #[error("capability: {0}")]
    Capability(String),
    #[error("protocol: {0}")]
    Protocol(String),
    #[error("internal: {0}")]
    Internal(String),
}

pub type PlaneResult<T> = Result<T, PlaneError>;
