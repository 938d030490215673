//! Route validation used by the configuration mapper.

use teleplane_core::{PlaneError, PlaneResult, TelemetryType};

/// Component-path categories a route may reference.
const ROUTE_CATEGORIES: [&str; 3] = ["destinations", "processors", "connectors"];

/// Parse a telemetry-type string. Exactly the seven enumerated values are
/// accepted, case-sensitively.
pub fn validate_route_type(value: &str) -> PlaneResult<TelemetryType> {
    value.parse()
}

/// Check every component path. A path is valid when its first `/`-delimited
/// segment names a known category. Returns one error per offending path, not
/// fail-fast, so a caller can report them all in one pass.
pub fn validate_route_components(components: &[String]) -> Vec<PlaneError> {
    components
        .iter()
        .filter_map(|path| {
            let category = path.split('/').next().unwrap_or_default();
            if ROUTE_CATEGORIES.contains(&category) {
                None
            } else {
                Some(PlaneError::Validation(format!(
                    "invalid route component {path:?}: expected destinations/, processors/ or connectors/"
                )))
            }
        })
        .collect()
}
