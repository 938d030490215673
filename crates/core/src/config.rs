//! Nested configuration model: the shape the control plane stores for a
//! Configuration resource's spec.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::telemetry::Routes;

/// Spec of a Configuration resource: routed sources, processor groups,
/// destinations, extensions, the agent selector, and rollout behavior.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigurationSpec {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub measurement_interval: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<ResourceConfiguration>,
    /// Processor groups; each entry nests the processors it fans into.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub processors: Vec<ResourceConfiguration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub destinations: Vec<ResourceConfiguration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<ResourceConfiguration>,
    pub selector: AgentSelector,
    pub rollout: ResourceConfiguration,
    /// Raw passthrough configuration, mutually exclusive with the routed form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// Selects the agents a configuration applies to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSelector {
    pub match_labels: BTreeMap<String, String>,
}

/// One named entry inside a configuration spec. The server may suffix `name`
/// with `:version`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceConfiguration {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub parameterized_spec: ParameterizedSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParameterizedSpec {
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub processors: Vec<ResourceConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routes: Option<Routes>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub value: Json,
}

/// How a configuration change propagates to agents once applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RolloutOptions {
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
}
