//! Imperative resource operations: kind-erased get and delete against the
//! control plane, with capability checks and not-found normalization.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use tracing::info;

use teleplane_client::{absorb_not_found, ControlPlane};
use teleplane_core::{GenericResource, Kind, PlaneError, Resource};

/// What the generic accessors may do with a kind. Both `generic_resource`
/// and `delete_resource` consult this one table; only the reconcilable kinds
/// are generically reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KindCaps {
    get: bool,
    delete: bool,
}

fn caps(kind: Kind) -> KindCaps {
    match kind {
        Kind::Source | Kind::Destination | Kind::Processor => KindCaps {
            get: true,
            delete: true,
        },
        Kind::Configuration => KindCaps {
            get: false,
            delete: true,
        },
        _ => KindCaps {
            get: false,
            delete: false,
        },
    }
}

/// Fetch the kind-erased projection of a resource. Absent resources are
/// `Ok(None)`, never an error. Unsupported kinds are rejected before any
/// collaborator call.
pub async fn generic_resource<C: ControlPlane>(
    plane: &C,
    kind: Kind,
    name: &str,
) -> Result<Option<GenericResource>> {
    if !caps(kind).get {
        return Err(PlaneError::Capability(format!(
            "cannot fetch resources of kind {kind}"
        ))
        .into());
    }
    let fetched = get_typed(plane, kind, name).await?;
    Ok(fetched.map(GenericResource::from))
}

/// Delete by kind and name. Collaborator failures (dependency violations
/// included) propagate unchanged so callers can report "still in use".
pub async fn delete_resource<C: ControlPlane>(plane: &C, kind: Kind, name: &str) -> Result<()> {
    if !caps(kind).delete {
        return Err(PlaneError::Capability(format!(
            "cannot delete resources of kind {kind}"
        ))
        .into());
    }
    info!(kind = %kind, name = %name, "ops: delete");
    plane.delete(kind, name).await
}

pub async fn get_source<C: ControlPlane>(plane: &C, name: &str) -> Result<Option<Resource>> {
    get_typed(plane, Kind::Source, name).await
}

pub async fn get_destination<C: ControlPlane>(plane: &C, name: &str) -> Result<Option<Resource>> {
    get_typed(plane, Kind::Destination, name).await
}

pub async fn get_processor<C: ControlPlane>(plane: &C, name: &str) -> Result<Option<Resource>> {
    get_typed(plane, Kind::Processor, name).await
}

pub async fn get_configuration<C: ControlPlane>(plane: &C, name: &str) -> Result<Option<Resource>> {
    get_typed(plane, Kind::Configuration, name).await
}

async fn get_typed<C: ControlPlane>(plane: &C, kind: Kind, name: &str) -> Result<Option<Resource>> {
    absorb_not_found(plane.get(kind, name).await)
        .with_context(|| format!("getting {kind} {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use teleplane_client::mock::MockPlane;

    #[tokio::test]
    async fn unsupported_kind_get_errors_without_a_network_call() {
        let plane = MockPlane::new();
        let err = generic_resource(&plane, Kind::Agent, "node-1")
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("Agent"), "err={err}");
        assert_eq!(plane.calls().get, 0);
    }

    #[tokio::test]
    async fn unsupported_kind_delete_errors_without_a_network_call() {
        let plane = MockPlane::new();
        for kind in [Kind::Agent, Kind::Connector, Kind::Extension] {
            let err = delete_resource(&plane, kind, "x").await.unwrap_err();
            assert!(err.to_string().contains(kind.as_str()));
        }
        assert_eq!(plane.calls().delete, 0);
    }

    #[tokio::test]
    async fn absent_resources_read_as_none() {
        let plane = MockPlane::new();
        assert!(get_source(&plane, "ghost").await.unwrap().is_none());
        assert!(generic_resource(&plane, Kind::Destination, "ghost")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn generic_resource_projects_stored_identity() {
        let plane = MockPlane::new();
        let mut stored = Resource::new(Kind::Processor, "batch")
            .with_new_id()
            .with_spec(serde_json::json!({"type": "batch", "parameters": []}));
        stored.metadata.version = 2;
        let id = stored.metadata.id.clone();
        plane.insert(stored);

        let generic = generic_resource(&plane, Kind::Processor, "batch")
            .await
            .unwrap()
            .expect("stored resource");
        assert_eq!(generic.id, id);
        assert_eq!(generic.name, "batch");
        assert_eq!(generic.version, 2);
        assert_eq!(generic.spec["type"], "batch");
    }

    #[tokio::test]
    async fn delete_conflicts_propagate_unchanged() {
        let plane = MockPlane::new();
        plane.fail_delete("409 Conflict: destination logging is in use by configuration test");
        let err = delete_resource(&plane, Kind::Destination, "logging")
            .await
            .unwrap_err()
            .to_string();
        assert_eq!(
            err,
            "409 Conflict: destination logging is in use by configuration test"
        );
    }

    #[tokio::test]
    async fn configuration_is_deletable_but_not_generically_fetchable() {
        let plane = MockPlane::new();
        plane.insert(Resource::new(Kind::Configuration, "pipeline"));

        assert!(generic_resource(&plane, Kind::Configuration, "pipeline")
            .await
            .is_err());
        assert!(get_configuration(&plane, "pipeline")
            .await
            .unwrap()
            .is_some());
        delete_resource(&plane, Kind::Configuration, "pipeline")
            .await
            .unwrap();
        assert!(get_configuration(&plane, "pipeline")
            .await
            .unwrap()
            .is_none());
    }
}
