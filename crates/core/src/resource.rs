//! Resources as the control plane addresses them: a kind, metadata, and a
//! polymorphic spec.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::PlaneError;

/// API version stamped on every submitted resource.
pub const API_VERSION: &str = "teleplane.io/v1";

/// Resource kinds managed by the control plane. `Agent` exists so callers can
/// name it; the generic accessors reject it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Configuration,
    Source,
    Destination,
    Processor,
    Connector,
    Extension,
    ProcessorBundle,
    Agent,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Configuration => "Configuration",
            Kind::Source => "Source",
            Kind::Destination => "Destination",
            Kind::Processor => "Processor",
            Kind::Connector => "Connector",
            Kind::Extension => "Extension",
            Kind::ProcessorBundle => "ProcessorBundle",
            Kind::Agent => "Agent",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = PlaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Configuration" => Ok(Kind::Configuration),
            "Source" => Ok(Kind::Source),
            "Destination" => Ok(Kind::Destination),
            "Processor" => Ok(Kind::Processor),
            "Connector" => Ok(Kind::Connector),
            "Extension" => Ok(Kind::Extension),
            "ProcessorBundle" => Ok(Kind::ProcessorBundle),
            "Agent" => Ok(Kind::Agent),
            other => Err(PlaneError::Validation(format!(
                "unknown resource kind: {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Assigned by the control plane; empty until the first successful create.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Unique per kind. Immutable after creation.
    pub name: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// A desired-state resource. The spec is a free-form map because the control
/// plane accepts polymorphic specs per type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub api_version: String,
    pub kind: Kind,
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: Json,
}

impl Resource {
    pub fn new(kind: Kind, name: &str) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind,
            metadata: Metadata {
                name: name.to_string(),
                ..Default::default()
            },
            spec: Json::Null,
        }
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.metadata
            .labels
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_spec(mut self, spec: Json) -> Self {
        self.spec = spec;
        self
    }

    /// Pre-allocate a local ID for create paths that need one before the
    /// control plane has assigned its own.
    pub fn with_new_id(mut self) -> Self {
        self.metadata.id = crate::new_resource_id();
        self
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

/// Per-resource outcome of an apply call. Unrecognized server values survive
/// verbatim in `Other` so errors can name them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApplyStatus {
    Unchanged,
    Created,
    Configured,
    Error,
    Other(String),
}

impl ApplyStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ApplyStatus::Unchanged => "unchanged",
            ApplyStatus::Created => "created",
            ApplyStatus::Configured => "configured",
            ApplyStatus::Error => "error",
            ApplyStatus::Other(s) => s,
        }
    }
}

impl From<String> for ApplyStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "unchanged" => ApplyStatus::Unchanged,
            "created" => ApplyStatus::Created,
            "configured" => ApplyStatus::Configured,
            "error" => ApplyStatus::Error,
            _ => ApplyStatus::Other(s),
        }
    }
}

impl From<ApplyStatus> for String {
    fn from(s: ApplyStatus) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for ApplyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One applied resource with the status the control plane reported for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub resource: Resource,
    pub status: ApplyStatus,
    /// Optional human-readable detail, usually set alongside error statuses.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

impl ResourceStatus {
    pub fn new(resource: Resource, status: ApplyStatus) -> Self {
        Self {
            resource,
            status,
            reason: String::new(),
        }
    }
}

/// Kind-erased projection for callers that only need identity and versioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericResource {
    pub id: String,
    pub name: String,
    pub version: i64,
    #[serde(default)]
    pub spec: Json,
}

impl From<Resource> for GenericResource {
    fn from(r: Resource) -> Self {
        Self {
            id: r.metadata.id,
            name: r.metadata.name,
            version: r.metadata.version,
            spec: r.spec,
        }
    }
}
