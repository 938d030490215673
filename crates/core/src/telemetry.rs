//! Telemetry types and routes: which pipeline components each kind of
//! telemetry is sent through.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::PlaneError;

/// The seven telemetry-type combinations a route may apply to. There is no
/// "none" variant; a route always carries at least one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TelemetryType {
    #[serde(rename = "logs")]
    Logs,
    #[serde(rename = "metrics")]
    Metrics,
    #[serde(rename = "traces")]
    Traces,
    #[serde(rename = "logs+metrics")]
    LogsMetrics,
    #[serde(rename = "logs+traces")]
    LogsTraces,
    #[serde(rename = "metrics+traces")]
    MetricsTraces,
    #[serde(rename = "logs+metrics+traces")]
    LogsMetricsTraces,
}

impl TelemetryType {
    pub const ALL: [TelemetryType; 7] = [
        TelemetryType::Logs,
        TelemetryType::Metrics,
        TelemetryType::Traces,
        TelemetryType::LogsMetrics,
        TelemetryType::LogsTraces,
        TelemetryType::MetricsTraces,
        TelemetryType::LogsMetricsTraces,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TelemetryType::Logs => "logs",
            TelemetryType::Metrics => "metrics",
            TelemetryType::Traces => "traces",
            TelemetryType::LogsMetrics => "logs+metrics",
            TelemetryType::LogsTraces => "logs+traces",
            TelemetryType::MetricsTraces => "metrics+traces",
            TelemetryType::LogsMetricsTraces => "logs+metrics+traces",
        }
    }
}

impl fmt::Display for TelemetryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TelemetryType {
    type Err = PlaneError;

    /// Case-sensitive; anything outside the seven enumerated values errors.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TelemetryType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| PlaneError::Validation(format!("invalid route telemetry type: {s:?}")))
    }
}

/// One route: an ordered list of component paths (`<category>/<name>`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
}

impl Route {
    pub fn to(components: &[&str]) -> Self {
        Self {
            components: components.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Route lists keyed by telemetry type. Serializes to the control plane's
/// named-list shape (`{"logs": [...], "logs+metrics": [...]}`); types with no
/// routes are never emitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Routes(pub BTreeMap<TelemetryType, Vec<Route>>);

impl Routes {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, telemetry_type: TelemetryType, route: Route) {
        self.0.entry(telemetry_type).or_default().push(route);
    }

    pub fn get(&self, telemetry_type: TelemetryType) -> &[Route] {
        self.0.get(&telemetry_type).map_or(&[], Vec::as_slice)
    }

    /// Iterate populated telemetry types in deterministic enum order.
    pub fn iter(&self) -> impl Iterator<Item = (TelemetryType, &[Route])> {
        self.0.iter().map(|(t, routes)| (*t, routes.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telemetry_type_parses_all_seven() {
        for t in TelemetryType::ALL {
            assert_eq!(t.as_str().parse::<TelemetryType>().unwrap(), t);
        }
        assert_eq!(
            "logs+metrics+traces".parse::<TelemetryType>().unwrap(),
            TelemetryType::LogsMetricsTraces
        );
    }

    #[test]
    fn telemetry_type_rejects_unknown_and_case_variants() {
        let err = "bogus".parse::<TelemetryType>().unwrap_err().to_string();
        assert!(err.contains("bogus"), "err={err}");
        assert!("Logs".parse::<TelemetryType>().is_err());
        assert!("logs+metrics+traces+events".parse::<TelemetryType>().is_err());
    }

    #[test]
    fn routes_serialize_to_named_lists() {
        let mut routes = Routes::default();
        routes.insert(TelemetryType::Logs, Route::to(&["destinations/logging"]));
        routes.insert(
            TelemetryType::MetricsTraces,
            Route::to(&["processors/batch", "destinations/otlp"]),
        );
        let v = serde_json::to_value(&routes).unwrap();
        assert_eq!(v["logs"][0]["components"][0], "destinations/logging");
        assert_eq!(v["metrics+traces"][0]["components"][1], "destinations/otlp");
        assert!(v.get("traces").is_none());

        let back: Routes = serde_json::from_value(v).unwrap();
        assert_eq!(back, routes);
    }

    #[test]
    fn routes_accumulate_per_type() {
        let mut routes = Routes::default();
        assert!(routes.is_empty());
        routes.insert(TelemetryType::Logs, Route::to(&["destinations/a"]));
        routes.insert(TelemetryType::Logs, Route::to(&["destinations/b"]));
        assert!(!routes.is_empty());
        assert_eq!(routes.get(TelemetryType::Logs).len(), 2);
        assert!(routes.get(TelemetryType::Traces).is_empty());
    }
}
