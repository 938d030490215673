//! In-memory control plane for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use teleplane_core::{ApplyStatus, Kind, Resource, ResourceStatus, RolloutOptions};

use crate::ControlPlane;

/// Scripted collaborator double. Defaults: every applied resource is stored
/// and reports `Created`, gets serve the stored resource or a 404-shaped
/// error, deletes remove, rollouts succeed and are recorded.
#[derive(Default)]
pub struct MockPlane {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    resources: HashMap<(Kind, String), Resource>,
    statuses: HashMap<String, ApplyStatus>,
    reasons: HashMap<String, String>,
    apply_error: Option<String>,
    rollout_error: Option<String>,
    delete_error: Option<String>,
    status_repeat: usize,
    rollouts: Vec<String>,
    calls: Calls,
}

/// Per-method call counts, for asserting that capability checks short-circuit
/// before any network round trip.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub apply: usize,
    pub get: usize,
    pub delete: usize,
    pub start_rollout: usize,
}

impl MockPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing resource.
    pub fn insert(&self, resource: Resource) {
        let mut inner = self.lock();
        inner
            .resources
            .insert((resource.kind, resource.metadata.name.clone()), resource);
    }

    /// Report `status` for the named resource on apply instead of `Created`.
    pub fn set_status(&self, name: &str, status: ApplyStatus) {
        self.lock().statuses.insert(name.to_string(), status);
    }

    /// Attach a human-readable reason to the named resource's status.
    pub fn set_reason(&self, name: &str, reason: &str) {
        self.lock().reasons.insert(name.to_string(), reason.to_string());
    }

    /// Fail every apply call with `message`.
    pub fn fail_apply(&self, message: &str) {
        self.lock().apply_error = Some(message.to_string());
    }

    /// Fail every rollout trigger with `message`.
    pub fn fail_rollout(&self, message: &str) {
        self.lock().rollout_error = Some(message.to_string());
    }

    /// Fail every delete with `message`.
    pub fn fail_delete(&self, message: &str) {
        self.lock().delete_error = Some(message.to_string());
    }

    /// Return `count` statuses per applied resource, to simulate a
    /// protocol-violating server.
    pub fn repeat_statuses(&self, count: usize) {
        self.lock().status_repeat = count;
    }

    /// Names rollouts were started for, in order.
    pub fn rollouts(&self) -> Vec<String> {
        self.lock().rollouts.clone()
    }

    pub fn calls(&self) -> Calls {
        self.lock().calls
    }

    pub fn resource(&self, kind: Kind, name: &str) -> Option<Resource> {
        self.lock().resources.get(&(kind, name.to_string())).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl ControlPlane for MockPlane {
    async fn apply(&self, resources: &[Resource]) -> Result<Vec<ResourceStatus>> {
        let mut inner = self.lock();
        inner.calls.apply += 1;
        if let Some(message) = &inner.apply_error {
            return Err(anyhow!("{message}"));
        }
        let repeat = inner.status_repeat.max(1);
        let mut statuses = Vec::new();
        for resource in resources {
            let name = resource.metadata.name.clone();
            inner
                .resources
                .insert((resource.kind, name.clone()), resource.clone());
            let status = inner
                .statuses
                .get(&name)
                .cloned()
                .unwrap_or(ApplyStatus::Created);
            let reason = inner.reasons.get(&name).cloned().unwrap_or_default();
            for _ in 0..repeat {
                let mut st = ResourceStatus::new(resource.clone(), status.clone());
                st.reason = reason.clone();
                statuses.push(st);
            }
        }
        Ok(statuses)
    }

    async fn get(&self, kind: Kind, name: &str) -> Result<Resource> {
        let mut inner = self.lock();
        inner.calls.get += 1;
        inner
            .resources
            .get(&(kind, name.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("{kind} {name}: 404 Not Found"))
    }

    async fn delete(&self, kind: Kind, name: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.calls.delete += 1;
        if let Some(message) = &inner.delete_error {
            return Err(anyhow!("{message}"));
        }
        inner
            .resources
            .remove(&(kind, name.to_string()))
            .map(|_| ())
            .ok_or_else(|| anyhow!("{kind} {name}: 404 Not Found"))
    }

    async fn start_rollout(
        &self,
        name: &str,
        _options: Option<&RolloutOptions>,
    ) -> Result<Resource> {
        let mut inner = self.lock();
        inner.calls.start_rollout += 1;
        if let Some(message) = &inner.rollout_error {
            return Err(anyhow!("{message}"));
        }
        inner.rollouts.push(name.to_string());
        let handle = inner
            .resources
            .get(&(Kind::Configuration, name.to_string()))
            .cloned()
            .unwrap_or_else(|| Resource::new(Kind::Configuration, name));
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn apply_stores_and_reports_created_by_default() {
        let plane = MockPlane::new();
        let statuses = plane
            .apply(&[Resource::new(Kind::Source, "my-host")])
            .await
            .unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].status, ApplyStatus::Created);
        assert!(plane.resource(Kind::Source, "my-host").is_some());
    }

    #[tokio::test]
    async fn get_errors_with_a_not_found_shape_when_absent() {
        let plane = MockPlane::new();
        let err = plane.get(Kind::Source, "ghost").await.unwrap_err();
        assert!(crate::is_not_found(&err));
        assert_eq!(plane.calls().get, 1);
    }
}
