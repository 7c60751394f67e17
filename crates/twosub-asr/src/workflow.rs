//! Named-step workflow engine.
//!
//! A backend's acquisition protocol is an ordered list of [`Step`]s over a
//! backend-owned session value `S`. The engine runs steps strictly in order,
//! checks cancellation before each one, races each step against the
//! cancellation token and wraps the first failure in
//! [`AsrError::Fetch`] tagged with the step name.

use std::time::Instant;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::{AsrError, AsrResult};
use crate::poll::PollPolicy;

/// Boxed future returned by a step.
pub type StepFuture<'a> = BoxFuture<'a, AsrResult<()>>;

/// Step body: mutate the session using the shared context.
pub type StepFn<S> = for<'a> fn(&'a mut S, &'a StepContext) -> StepFuture<'a>;

/// Resources shared by every step of one fetch.
#[derive(Clone, Debug)]
pub struct StepContext {
    /// HTTP client carrying the per-request timeout.
    pub client: reqwest::Client,
    /// Caller's cancellation token.
    pub cancel: CancellationToken,
    /// Policy for steps that poll.
    pub poll: PollPolicy,
}

/// One named unit of a workflow.
pub struct Step<S> {
    /// Identifier reported in [`AsrError::Fetch`].
    pub name: &'static str,
    /// Message reported when the step fails.
    pub description: &'static str,
    /// Step body.
    pub run: StepFn<S>,
}

/// Ordered step sequence for one backend.
pub struct Workflow<S> {
    provider: &'static str,
    steps: Vec<Step<S>>,
}

impl<S: Send> Workflow<S> {
    /// Empty workflow for `provider`.
    pub fn new(provider: &'static str) -> Self {
        Self {
            provider,
            steps: Vec::new(),
        }
    }

    /// Append a step.
    #[must_use]
    pub fn step(mut self, name: &'static str, description: &'static str, run: StepFn<S>) -> Self {
        self.steps.push(Step {
            name,
            description,
            run,
        });
        self
    }

    /// Step names in execution order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name).collect()
    }

    /// Run every step against `session`, stopping at the first failure.
    pub async fn run(&self, session: &mut S, ctx: &StepContext) -> AsrResult<()> {
        for step in &self.steps {
            if ctx.cancel.is_cancelled() {
                debug!(provider = self.provider, step = step.name, "cancelled before step");
                return Err(AsrError::fetch(step.name, step.description, AsrError::Cancelled));
            }

            debug!(provider = self.provider, step = step.name, "step started");
            let started = Instant::now();

            let outcome = tokio::select! {
                biased;
                () = ctx.cancel.cancelled() => Err(AsrError::Cancelled),
                result = (step.run)(session, ctx) => result,
            };

            #[allow(clippy::cast_possible_truncation)]
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match outcome {
                Ok(()) => {
                    debug!(provider = self.provider, step = step.name, elapsed_ms, "step completed");
                }
                Err(e) => {
                    warn!(
                        provider = self.provider,
                        step = step.name,
                        elapsed_ms,
                        category = e.category(),
                        error = %e,
                        "step failed"
                    );
                    return Err(AsrError::fetch(step.name, step.description, e));
                }
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::time::Duration;

    #[derive(Default)]
    struct Trace {
        visited: Vec<&'static str>,
    }

    fn first<'a>(s: &'a mut Trace, _ctx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(async move {
            s.visited.push("first");
            Ok(())
        })
    }

    fn second<'a>(s: &'a mut Trace, _ctx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(async move {
            s.visited.push("second");
            Ok(())
        })
    }

    fn failing<'a>(s: &'a mut Trace, _ctx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(async move {
            s.visited.push("failing");
            Err(AsrError::Api {
                status: 502,
                body: "bad gateway".into(),
            })
        })
    }

    fn cancels<'a>(s: &'a mut Trace, ctx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(async move {
            s.visited.push("cancels");
            ctx.cancel.cancel();
            Ok(())
        })
    }

    fn hangs<'a>(s: &'a mut Trace, _ctx: &'a StepContext) -> StepFuture<'a> {
        Box::pin(async move {
            s.visited.push("hangs");
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        })
    }

    fn ctx() -> StepContext {
        StepContext {
            client: reqwest::Client::new(),
            cancel: CancellationToken::new(),
            poll: PollPolicy::default(),
        }
    }

    #[tokio::test]
    async fn runs_steps_in_order() {
        let wf = Workflow::new("test")
            .step("first", "failed first", first)
            .step("second", "failed second", second);
        assert_eq!(wf.step_names(), vec!["first", "second"]);

        let mut trace = Trace::default();
        wf.run(&mut trace, &ctx()).await.unwrap();
        assert_eq!(trace.visited, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn first_failure_is_tagged_and_stops() {
        let wf = Workflow::new("test")
            .step("first", "failed first", first)
            .step("upload", "failed to upload", failing)
            .step("second", "failed second", second);

        let mut trace = Trace::default();
        let err = wf.run(&mut trace, &ctx()).await.unwrap_err();
        assert_eq!(trace.visited, vec!["first", "failing"]);
        assert_matches!(&err, AsrError::Fetch { step: "upload", message, .. } => {
            assert_eq!(message, "failed to upload");
        });
        assert_eq!(err.status(), Some(502));
    }

    #[tokio::test]
    async fn cancellation_checked_before_each_step() {
        let wf = Workflow::new("test")
            .step("cancels", "failed cancel", cancels)
            .step("second", "failed second", second);

        let mut trace = Trace::default();
        let err = wf.run(&mut trace, &ctx()).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(err.step(), Some("second"));
        assert_eq!(trace.visited, vec!["cancels"]);
    }

    #[tokio::test]
    async fn cancellation_interrupts_running_step() {
        let wf = Workflow::new("test").step("hangs", "failed hang", hangs);
        let ctx = ctx();
        let trigger = ctx.cancel.clone();
        let _ = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let mut trace = Trace::default();
        let err = tokio::time::timeout(Duration::from_secs(5), wf.run(&mut trace, &ctx))
            .await
            .expect("step was not interrupted")
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(err.step(), Some("hangs"));
    }

    #[tokio::test]
    async fn steps_are_logged() {
        let (logs, _guard) = twosub_logging::capture_logs();
        let wf = Workflow::new("test")
            .step("first", "failed first", first)
            .step("upload", "failed to upload", failing);

        let mut trace = Trace::default();
        let _ = wf.run(&mut trace, &ctx()).await;

        assert_eq!(logs.field_values("step started", "step"), vec!["first", "upload"]);
        assert_eq!(logs.field_values("step failed", "category"), vec!["api"]);
    }
}
