//! Bidirectional mapping between the flat declarative representation of a
//! configuration and the control plane's nested spec.
//!
//! The forward direction expands flat blocks into routed entries; the inverse
//! direction reconstructs flat blocks from a served spec, restoring the
//! caller-private fields the server never echoes.

#![forbid(unsafe_code)]

mod validate;

pub use validate::{validate_route_components, validate_route_type};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use teleplane_core::{
    AgentSelector, ConfigurationSpec, Kind, ParameterizedSpec, PlaneError, PlaneResult, Resource,
    ResourceConfiguration, RolloutOptions, Route, Routes, TelemetryType,
};

/// Synthetic label carrying the platform; injected before submission and
/// stripped back out before labels reach the caller.
const PLATFORM_LABEL: &str = "platform";

/// Label key selecting agents for a standard configuration.
const CONFIGURATION_LABEL: &str = "configuration";

/// One route declared on a flat block: a single component-path list for one
/// telemetry type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteBlock {
    pub telemetry_type: TelemetryType,
    pub components: Vec<String>,
}

/// Flat source / processor-group / destination block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceBlock {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub processors: Vec<String>,
    /// Caller-assigned token, opaque to the control plane. Preserved across
    /// read cycles by matching on `name`, never regenerated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<RouteBlock>,
}

impl ResourceBlock {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// Flat view of a whole configuration, as the declarative system stores it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatConfiguration {
    pub name: String,
    pub platform: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub match_labels: BTreeMap<String, String>,
    pub measurement_interval: Option<String>,
    pub sources: Vec<ResourceBlock>,
    pub processor_groups: Vec<ResourceBlock>,
    pub destinations: Vec<ResourceBlock>,
    pub extensions: Vec<String>,
    pub rollout: Option<RolloutOptions>,
}

/// Inputs to the forward mapping.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationOptions {
    pub name: String,
    pub platform: Option<String>,
    pub labels: BTreeMap<String, String>,
    /// `None` selects the deterministic `{"configuration": <name>}` selector
    /// used by standard configurations.
    pub match_labels: Option<BTreeMap<String, String>>,
    pub measurement_interval: Option<String>,
    pub sources: Vec<ResourceBlock>,
    pub processor_groups: Vec<ResourceBlock>,
    pub destinations: Vec<ResourceBlock>,
    pub extensions: Vec<String>,
    pub rollout: Option<RolloutOptions>,
}

/// Build a desired-state Configuration resource from its flat description.
pub fn build_configuration(opts: ConfigurationOptions) -> PlaneResult<Resource> {
    let mut labels = opts.labels.clone();
    if let Some(platform) = &opts.platform {
        labels.insert(PLATFORM_LABEL.to_string(), platform.clone());
    }
    let match_labels = opts.match_labels.clone().unwrap_or_else(|| {
        BTreeMap::from([(CONFIGURATION_LABEL.to_string(), opts.name.clone())])
    });

    let spec = ConfigurationSpec {
        measurement_interval: opts.measurement_interval.clone().unwrap_or_default(),
        sources: routed_entries(&opts.sources)?,
        processors: routed_entries(&opts.processor_groups)?,
        destinations: opts.destinations.iter().map(sink_entry).collect(),
        extensions: opts.extensions.iter().map(|n| named_entry(n)).collect(),
        selector: AgentSelector { match_labels },
        rollout: rollout_entry(opts.rollout.as_ref()),
        ..Default::default()
    };

    let mut resource = Resource::new(Kind::Configuration, &opts.name);
    resource.metadata.labels = labels;
    resource.spec = serde_json::to_value(&spec)
        .map_err(|e| PlaneError::Internal(format!("encoding configuration spec: {e}")))?;
    Ok(resource)
}

/// Reconstruct the flat view of a served Configuration resource. `prior`
/// supplies the caller-private fields (route IDs) the server never returns.
pub fn read_configuration(
    resource: &Resource,
    prior: Option<&FlatConfiguration>,
) -> PlaneResult<FlatConfiguration> {
    let spec: ConfigurationSpec = serde_json::from_value(resource.spec.clone())
        .map_err(|e| PlaneError::Internal(format!("decoding configuration spec: {e}")))?;

    let mut labels = resource.metadata.labels.clone();
    let platform = labels.remove(PLATFORM_LABEL);

    let sources = spec.sources.iter().map(read_entry).collect();
    let mut processor_groups: Vec<ResourceBlock> = spec.processors.iter().map(read_entry).collect();
    let mut destinations: Vec<ResourceBlock> = spec.destinations.iter().map(read_entry).collect();

    if let Some(prior) = prior {
        carry_route_ids(&mut processor_groups, &prior.processor_groups);
        carry_route_ids(&mut destinations, &prior.destinations);
    }

    let extensions = spec
        .extensions
        .iter()
        .map(|e| trim_version(&e.name).to_string())
        .collect();

    let rollout_spec = &spec.rollout.parameterized_spec;
    let rollout = (!rollout_spec.type_name.is_empty()).then(|| RolloutOptions {
        type_name: rollout_spec.type_name.clone(),
        parameters: rollout_spec.parameters.clone(),
    });

    Ok(FlatConfiguration {
        name: resource.metadata.name.clone(),
        platform,
        labels,
        match_labels: spec.selector.match_labels.clone(),
        measurement_interval: (!spec.measurement_interval.is_empty())
            .then(|| spec.measurement_interval.clone()),
        sources,
        processor_groups,
        destinations,
        extensions,
        rollout,
    })
}

fn named_entry(name: &str) -> ResourceConfiguration {
    ResourceConfiguration {
        name: name.to_string(),
        ..Default::default()
    }
}

fn processor_entries(names: &[String]) -> Vec<ResourceConfiguration> {
    names.iter().map(|n| named_entry(n)).collect()
}

fn routed_entries(blocks: &[ResourceBlock]) -> PlaneResult<Vec<ResourceConfiguration>> {
    blocks.iter().map(routed_entry).collect()
}

/// Source / processor-group entry: the processor name list expands to
/// bare-name entries and declared routes group by telemetry type.
fn routed_entry(block: &ResourceBlock) -> PlaneResult<ResourceConfiguration> {
    let mut entry = named_entry(&block.name);
    entry.parameterized_spec.processors = processor_entries(&block.processors);
    entry.parameterized_spec.routes = expand_routes(&block.routes)?;
    Ok(entry)
}

/// Destination entry: destinations are routing sinks, so processors only and
/// no outbound routes.
fn sink_entry(block: &ResourceBlock) -> ResourceConfiguration {
    let mut entry = named_entry(&block.name);
    entry.parameterized_spec.processors = processor_entries(&block.processors);
    entry
}

/// Absent rollout options emit an empty configuration-level rollout block.
fn rollout_entry(options: Option<&RolloutOptions>) -> ResourceConfiguration {
    match options {
        None => ResourceConfiguration::default(),
        Some(options) => ResourceConfiguration {
            parameterized_spec: ParameterizedSpec {
                type_name: options.type_name.clone(),
                parameters: options.parameters.clone(),
                ..Default::default()
            },
            ..Default::default()
        },
    }
}

fn expand_routes(blocks: &[RouteBlock]) -> PlaneResult<Option<Routes>> {
    if blocks.is_empty() {
        return Ok(None);
    }
    let mut routes = Routes::default();
    for block in blocks {
        let mut invalid = validate_route_components(&block.components);
        if !invalid.is_empty() {
            return Err(invalid.remove(0));
        }
        routes.insert(
            block.telemetry_type,
            Route {
                components: block.components.clone(),
            },
        );
    }
    Ok(Some(routes))
}

/// Server names may carry a `:version` suffix; the flat form always stores
/// the bare name.
fn trim_version(name: &str) -> &str {
    name.split(':').next().unwrap_or(name)
}

fn read_entry(entry: &ResourceConfiguration) -> ResourceBlock {
    let processors = entry
        .parameterized_spec
        .processors
        .iter()
        .map(|p| trim_version(&p.name).to_string())
        .collect();
    // Every populated telemetry type is reconstructed, in deterministic enum
    // order; nothing collapses to a single type.
    let mut routes = Vec::new();
    if let Some(declared) = &entry.parameterized_spec.routes {
        for (telemetry_type, list) in declared.iter() {
            for route in list {
                routes.push(RouteBlock {
                    telemetry_type,
                    components: route.components.clone(),
                });
            }
        }
    }
    ResourceBlock {
        name: trim_version(&entry.name).to_string(),
        processors,
        route_id: None,
        routes,
    }
}

/// Route IDs are caller-private and never echoed by the server; correlate by
/// bare name against the previously stored state and copy them forward
/// verbatim. Blocks with no prior counterpart stay unset.
fn carry_route_ids(blocks: &mut [ResourceBlock], prior: &[ResourceBlock]) {
    for block in blocks.iter_mut() {
        block.route_id = prior
            .iter()
            .find(|p| p.name == block.name)
            .and_then(|p| p.route_id.clone());
    }
}
