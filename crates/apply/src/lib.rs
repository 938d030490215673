//! Apply orchestration: submit desired-state resources, interpret the
//! per-resource statuses the control plane reports, retry transient
//! failures, and trigger rollouts for changed configurations.

#![forbid(unsafe_code)]

use std::fmt;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use metrics::{counter, histogram};
use rand::Rng;
use tracing::{info, warn};

use teleplane_client::{is_retryable, ControlPlane};
use teleplane_core::{ApplyStatus, Kind, PlaneError, Resource, ResourceStatus};

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(10);

/// Per-resource classification of a status from a successful apply call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Already in the desired state; nothing to do downstream.
    Unchanged,
    /// Created or reconfigured; eligible to trigger a rollout.
    Changed,
}

/// Classify one apply status. Unchanged/Created/Configured are the only
/// expected outcomes; anything else fails that resource, named in the error.
/// Retry is the orchestrator's concern, never this function's.
pub fn interpret(status: &ResourceStatus) -> Result<Outcome, PlaneError> {
    let name = status.resource.metadata.name.as_str();
    match &status.status {
        ApplyStatus::Unchanged => Ok(Outcome::Unchanged),
        ApplyStatus::Created | ApplyStatus::Configured => Ok(Outcome::Changed),
        other => {
            let mut message = format!("apply {name}: unexpected status {other}");
            if !status.reason.is_empty() {
                message.push_str(": ");
                message.push_str(&status.reason);
            }
            Err(PlaneError::Protocol(message))
        }
    }
}

/// Aggregate of per-resource apply failures. One bad resource in a batch must
/// not hide errors in the others, so failures are joined, never overwritten.
#[derive(Debug, Default)]
pub struct ApplyError {
    errors: Vec<anyhow::Error>,
}

impl ApplyError {
    fn push(&mut self, err: anyhow::Error) {
        self.errors.push(err);
    }

    pub fn errors(&self) -> &[anyhow::Error] {
        &self.errors
    }

    fn into_result(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow::Error::new(self))
        }
    }
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{err:#}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApplyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let first: &(dyn std::error::Error + 'static) = self.errors.first()?.as_ref();
        Some(first)
    }
}

/// Exponential backoff with full jitter; `attempt` is 1-based.
fn retry_delay(attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(16);
    let exponential = RETRY_BASE_DELAY.saturating_mul(1 << shift);
    let capped = exponential.min(RETRY_MAX_DELAY);
    let jittered = rand::rng().random_range(0..=capped.as_millis() as u64);
    Duration::from_millis(jittered)
}

/// Reconcile engine entry point, generic over the control-plane collaborator.
/// Every call is a synchronous request-response exchange; the engine holds no
/// state of its own beyond the collaborator handle.
pub struct Applier<C> {
    plane: C,
}

impl<C: ControlPlane> Applier<C> {
    pub fn new(plane: C) -> Self {
        Self { plane }
    }

    /// Borrow the underlying collaborator.
    pub fn plane(&self) -> &C {
        &self.plane
    }

    /// Submit a batch of resources and interpret each returned status. A
    /// transport failure aborts immediately; per-resource failures are
    /// collected into one aggregate error. Configurations whose status shows
    /// a material change start a rollout when `trigger_rollout` is set.
    pub async fn apply(&self, resources: &[Resource], trigger_rollout: bool) -> Result<()> {
        let t0 = Instant::now();
        counter!("apply_attempts", 1u64);
        let statuses = match self.plane.apply(resources).await {
            Ok(statuses) => statuses,
            Err(e) => {
                counter!("apply_err", 1u64);
                return Err(e.context("applying resources"));
            }
        };
        let result = self.process_statuses(&statuses, trigger_rollout).await;
        histogram!("apply_latency_ms", t0.elapsed().as_secs_f64() * 1000.0);
        match &result {
            Ok(()) => counter!("apply_ok", 1u64),
            Err(_) => counter!("apply_err", 1u64),
        }
        result
    }

    /// Single-resource path. The collaborator must return exactly one status
    /// for exactly one submitted resource; any other cardinality is a
    /// protocol violation.
    pub async fn apply_one(&self, resource: &Resource, trigger_rollout: bool) -> Result<()> {
        let name = resource.metadata.name.as_str();
        let statuses = self
            .plane
            .apply(std::slice::from_ref(resource))
            .await
            .with_context(|| format!("applying {name}"))?;
        if statuses.len() != 1 {
            return Err(PlaneError::Protocol(format!(
                "apply {name}: expected one status, got {}",
                statuses.len()
            ))
            .into());
        }
        self.process_statuses(&statuses, trigger_rollout).await
    }

    /// Retry `apply_one` on transient failures until `timeout` elapses.
    /// Non-retryable errors abort immediately; deadline exhaustion surfaces a
    /// "retries exhausted" error wrapping the last attempt's failure.
    pub async fn apply_with_retry(
        &self,
        timeout: Duration,
        resource: &Resource,
        trigger_rollout: bool,
    ) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut attempt: u32 = 0;
        loop {
            match self.apply_one(resource, trigger_rollout).await {
                Ok(()) => return Ok(()),
                Err(e) if !is_retryable(&e) => return Err(e),
                Err(e) => {
                    attempt += 1;
                    counter!("apply_retries", 1u64);
                    let delay = retry_delay(attempt);
                    if Instant::now() + delay >= deadline {
                        return Err(e
                            .context(format!("retries exhausted after {attempt} attempt(s)")));
                    }
                    warn!(
                        name = %resource.metadata.name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "apply: transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Manually start a rollout for a configuration.
    pub async fn rollout(&self, name: &str) -> Result<()> {
        self.plane
            .start_rollout(name, None)
            .await
            .map(|_| ())
            .with_context(|| format!("starting rollout for configuration {name}"))
    }

    async fn process_statuses(
        &self,
        statuses: &[ResourceStatus],
        trigger_rollout: bool,
    ) -> Result<()> {
        let mut failed = ApplyError::default();
        for status in statuses {
            let name = status.resource.metadata.name.clone();
            match interpret(status) {
                Ok(Outcome::Unchanged) => {
                    info!(name = %name, "apply: resource unchanged");
                }
                Ok(Outcome::Changed) => {
                    info!(name = %name, status = %status.status, "apply: resource updated");
                    if trigger_rollout && status.resource.kind == Kind::Configuration {
                        match self.plane.start_rollout(&name, None).await {
                            Ok(_) => info!(name = %name, "apply: rollout started"),
                            Err(e) => {
                                // The configuration is already applied; a
                                // failed trigger joins the aggregate without
                                // undoing it.
                                warn!(name = %name, error = %e, "apply: rollout trigger failed");
                                failed.push(
                                    e.context(format!(
                                        "starting rollout for configuration {name}"
                                    )),
                                );
                            }
                        }
                    }
                }
                Err(e) => failed.push(e.into()),
            }
        }
        failed.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teleplane_client::mock::MockPlane;

    fn status(kind: Kind, name: &str, status: ApplyStatus) -> ResourceStatus {
        ResourceStatus::new(Resource::new(kind, name), status)
    }

    #[test]
    fn interpret_classifies_expected_statuses() {
        let unchanged = status(Kind::Source, "s", ApplyStatus::Unchanged);
        let created = status(Kind::Source, "s", ApplyStatus::Created);
        let configured = status(Kind::Source, "s", ApplyStatus::Configured);
        assert_eq!(interpret(&unchanged).unwrap(), Outcome::Unchanged);
        assert_eq!(interpret(&created).unwrap(), Outcome::Changed);
        assert_eq!(interpret(&configured).unwrap(), Outcome::Changed);
    }

    #[test]
    fn interpret_fails_error_and_unknown_statuses_by_name() {
        let err = interpret(&status(Kind::Source, "broken", ApplyStatus::Error))
            .unwrap_err()
            .to_string();
        assert!(err.contains("broken"), "err={err}");
        assert!(err.contains("error"), "err={err}");

        let mut with_reason = status(
            Kind::Source,
            "broken",
            ApplyStatus::Other("forbidden".to_string()),
        );
        with_reason.reason = "insufficient permissions".to_string();
        let err = interpret(&with_reason).unwrap_err().to_string();
        assert!(err.contains("forbidden"), "err={err}");
        assert!(err.contains("insufficient permissions"), "err={err}");
    }

    #[tokio::test]
    async fn batch_failure_mentions_only_the_failing_resource() {
        let plane = MockPlane::new();
        plane.set_status("alpha", ApplyStatus::Unchanged);
        plane.set_status("broken", ApplyStatus::Error);
        plane.set_reason("broken", "spec is missing a required parameter");
        let applier = Applier::new(plane);

        let batch = [
            Resource::new(Kind::Source, "alpha"),
            Resource::new(Kind::Source, "broken"),
        ];
        let err = applier.apply(&batch, false).await.unwrap_err();
        let aggregate = err.downcast_ref::<ApplyError>().expect("aggregate error");
        assert_eq!(aggregate.errors().len(), 1);
        let rendered = err.to_string();
        assert!(rendered.contains("broken"), "err={rendered}");
        assert!(rendered.contains("missing a required parameter"), "err={rendered}");
        assert!(!rendered.contains("alpha"), "err={rendered}");
    }

    #[tokio::test]
    async fn changed_configuration_triggers_rollout() {
        let plane = MockPlane::new();
        plane.set_status("pipeline", ApplyStatus::Configured);
        let applier = Applier::new(plane);

        let config = Resource::new(Kind::Configuration, "pipeline");
        applier.apply_one(&config, true).await.unwrap();
        assert_eq!(applier.plane().rollouts(), vec!["pipeline".to_string()]);
    }

    #[tokio::test]
    async fn unchanged_configuration_skips_rollout() {
        let plane = MockPlane::new();
        plane.set_status("pipeline", ApplyStatus::Unchanged);
        let applier = Applier::new(plane);

        let config = Resource::new(Kind::Configuration, "pipeline");
        applier.apply_one(&config, true).await.unwrap();
        assert!(applier.plane().rollouts().is_empty());
    }

    #[tokio::test]
    async fn non_configuration_kinds_never_trigger_rollout() {
        let plane = MockPlane::new();
        let applier = Applier::new(plane);

        let source = Resource::new(Kind::Source, "my-host");
        applier.apply_one(&source, true).await.unwrap();
        assert!(applier.plane().rollouts().is_empty());
        assert_eq!(applier.plane().calls().start_rollout, 0);
    }

    #[tokio::test]
    async fn rollout_failure_joins_the_aggregate_but_keeps_the_apply() {
        let plane = MockPlane::new();
        plane.fail_rollout("rollout already in progress");
        let applier = Applier::new(plane);

        let config = Resource::new(Kind::Configuration, "pipeline");
        let err = applier.apply_one(&config, true).await.unwrap_err().to_string();
        assert!(err.contains("starting rollout"), "err={err}");
        // The configuration itself was applied and stored.
        assert!(applier
            .plane()
            .resource(Kind::Configuration, "pipeline")
            .is_some());
    }

    #[tokio::test]
    async fn status_cardinality_mismatch_is_a_protocol_error() {
        let plane = MockPlane::new();
        plane.repeat_statuses(2);
        let applier = Applier::new(plane);

        let err = applier
            .apply_one(&Resource::new(Kind::Source, "my-host"), false)
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("expected one status"), "err={err}");
    }

    #[tokio::test]
    async fn retry_exhausts_on_persistent_transient_failure() {
        let plane = MockPlane::new();
        plane.fail_apply("dial tcp 127.0.0.1:3001: connect: connection refused");
        let applier = Applier::new(plane);

        let err = applier
            .apply_with_retry(
                Duration::from_millis(5),
                &Resource::new(Kind::Source, "my-host"),
                false,
            )
            .await
            .unwrap_err();
        let rendered = format!("{err:#}");
        assert!(rendered.contains("retries exhausted"), "err={rendered}");
        assert!(rendered.contains("connection refused"), "err={rendered}");
    }

    #[tokio::test]
    async fn retry_aborts_immediately_on_permanent_failure() {
        let plane = MockPlane::new();
        plane.fail_apply("resource is invalid");
        let applier = Applier::new(plane);

        let err = applier
            .apply_with_retry(
                Duration::from_secs(5),
                &Resource::new(Kind::Source, "my-host"),
                false,
            )
            .await
            .unwrap_err();
        assert!(!format!("{err:#}").contains("retries exhausted"));
        assert_eq!(applier.plane().calls().apply, 1);
    }

    #[tokio::test]
    async fn manual_rollout_wraps_failures_with_the_configuration_name() {
        let plane = MockPlane::new();
        plane.fail_rollout("agents unreachable");
        let applier = Applier::new(plane);

        let err = applier.rollout("pipeline").await.unwrap_err();
        let rendered = format!("{err:#}");
        assert!(rendered.contains("pipeline"), "err={rendered}");
        assert!(rendered.contains("agents unreachable"), "err={rendered}");
    }

    #[test]
    fn retry_delay_respects_the_cap() {
        for attempt in 1..20 {
            assert!(retry_delay(attempt) <= RETRY_MAX_DELAY);
        }
    }
}
