//! Chain engines: sequencing steps and threading state between them.
//!
//! Both engines share one contract:
//! - steps run strictly in declaration order
//! - a step sees the props produced by every step before it, and nothing else
//! - the first failure aborts the run and is returned annotated with the
//!   failing step's index and name; a panicking step counts as a failure
//!
//! [`SyncChain`] drives [`Step`]s and returns directly. [`Chain`] drives
//! [`AsyncStep`]s, awaiting each one before starting the next.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;

use crate::error::{ChainError, StepFailure, StepId};
use crate::props::{Context, Props, PropsSource};
use crate::step::{AsyncStep, Step, StepOutcome, StepResult};

/// A boxed synchronous step, as accepted by [`SyncChain::run`].
pub type BoxedStep = Box<dyn Step>;

/// A boxed asynchronous step, as accepted by [`Chain::run`].
pub type BoxedAsyncStep = Box<dyn AsyncStep>;

// ============================================================================
// Run Context (Internal)
// ============================================================================

/// The state of one run at a given point in its step sequence.
///
/// The context never changes during a run. Props are replaced, never edited,
/// each time a step returns an update.
#[derive(Debug, Clone)]
pub(crate) struct RunContext {
    context: Context,
    props: Props,
}

impl RunContext {
    pub(crate) fn new(context: Context, props: Props) -> Self {
        Self { context, props }
    }

    /// Fold a step outcome into the run, checking the update against the
    /// declared props.
    fn advance(self, outcome: StepOutcome, step: &StepId) -> Result<Self, ChainError> {
        match outcome {
            StepOutcome::Continue => Ok(self),
            StepOutcome::Update(update) => {
                let props = self
                    .props
                    .merge(&update)
                    .map_err(|e| ChainError::new(step.clone(), e))?;
                Ok(Self {
                    context: self.context,
                    props,
                })
            }
        }
    }

    fn into_props(self) -> Props {
        self.props
    }
}

/// Flatten a step result caught with `catch_unwind`.
fn caught(result: std::thread::Result<StepResult>) -> Result<StepOutcome, StepFailure> {
    result
        .map_err(StepFailure::from_panic)
        .and_then(|result| result.map_err(StepFailure::from))
}

/// Turn the raw result of a step into the next run state.
fn settle(
    run: RunContext,
    step: StepId,
    result: Result<StepOutcome, StepFailure>,
) -> Result<RunContext, ChainError> {
    match result {
        Ok(outcome) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                step = step.index(),
                name = step.name(),
                outcome = if outcome.is_update() { "update" } else { "continue" },
                "step.end"
            );

            let next = run.advance(outcome, &step);

            #[cfg(feature = "tracing")]
            if let Err(e) = &next {
                tracing::error!(step = step.index(), name = step.name(), error = %e, "step.rejected");
            }

            next
        }
        Err(e) => {
            #[cfg(feature = "tracing")]
            tracing::error!(step = step.index(), name = step.name(), error = %e, "step.failed");

            Err(ChainError::new(step, e))
        }
    }
}

pub(crate) fn run_sync_steps(
    mut run: RunContext,
    steps: &[BoxedStep],
) -> Result<Props, ChainError> {
    #[cfg(feature = "tracing")]
    tracing::debug!(steps = steps.len(), "chain.start");

    for (index, step) in steps.iter().enumerate() {
        let id = StepId::new(index, step.name());

        #[cfg(feature = "tracing")]
        tracing::debug!(step = index, name = id.name(), "step.start");

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            step.run(&run.context, &run.props)
        }));
        run = settle(run, id, caught(result))?;
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(steps = steps.len(), "chain.end");

    Ok(run.into_props())
}

pub(crate) async fn run_async_steps(
    mut run: RunContext,
    steps: &[BoxedAsyncStep],
) -> Result<Props, ChainError> {
    #[cfg(feature = "tracing")]
    tracing::debug!(steps = steps.len(), "chain.start");

    for (index, step) in steps.iter().enumerate() {
        let id = StepId::new(index, step.name());

        #[cfg(feature = "tracing")]
        tracing::debug!(step = index, name = id.name(), "step.start");

        let result = AssertUnwindSafe(step.run(&run.context, &run.props))
            .catch_unwind()
            .await;
        run = settle(run, id, caught(result))?;
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(steps = steps.len(), "chain.end");

    Ok(run.into_props())
}

// ============================================================================
// Synchronous Chain
// ============================================================================

/// A reusable synchronous chain.
///
/// Holds the context and the initial props; every call to [`SyncChain::run`]
/// starts again from those.
#[derive(Debug, Clone, Default)]
pub struct SyncChain {
    context: Context,
    props: PropsSource,
}

impl SyncChain {
    /// Create a chain from a context and initial props (or a props supplier).
    pub fn new(context: impl Into<Context>, props: impl Into<PropsSource>) -> Self {
        Self {
            context: context.into(),
            props: props.into(),
        }
    }

    /// The context shared by every run.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Run `steps` in order and return the final props.
    pub fn run(&self, steps: Vec<BoxedStep>) -> Result<Props, ChainError> {
        let run = RunContext::new(self.context.clone(), self.props.seed());
        run_sync_steps(run, &steps)
    }

    /// Wrap `steps` into a single step that runs them from the enclosing
    /// chain's current context and props.
    ///
    /// The sub-chain keeps no reference to this chain: its own context and
    /// initial props are never read.
    pub fn cached(&self, steps: Vec<BoxedStep>) -> SubChain {
        SubChain {
            steps: steps.into(),
        }
    }

    /// Same as [`SyncChain::cached`].
    pub fn nested(&self, steps: Vec<BoxedStep>) -> SubChain {
        self.cached(steps)
    }
}

/// Create a synchronous chain. See [`SyncChain::new`].
pub fn create_chain_sync(context: impl Into<Context>, props: impl Into<PropsSource>) -> SyncChain {
    SyncChain::new(context, props)
}

/// A list of synchronous steps embedded as one step of another chain.
///
/// Nothing is captured when the sub-chain is built: each time it runs it
/// starts from the live context and props of the chain running it, and hands
/// its final props back as an update.
#[derive(Clone)]
pub struct SubChain {
    steps: Arc<[BoxedStep]>,
}

impl SubChain {
    /// Number of inner steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if there are no inner steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Step for SubChain {
    fn run(&self, ctx: &Context, props: &Props) -> StepResult {
        let run = RunContext::new(ctx.clone(), props.clone());
        let props = run_sync_steps(run, &self.steps)?;
        Ok(props.into())
    }
}

// ============================================================================
// Asynchronous Chain
// ============================================================================

/// A reusable asynchronous chain.
///
/// Holds the context and the initial props; every call to [`Chain::run`]
/// starts again from those.
#[derive(Debug, Clone, Default)]
pub struct Chain {
    context: Context,
    props: PropsSource,
}

impl Chain {
    /// Create a chain from a context and initial props (or a props supplier).
    pub fn new(context: impl Into<Context>, props: impl Into<PropsSource>) -> Self {
        Self {
            context: context.into(),
            props: props.into(),
        }
    }

    /// The context shared by every run.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Run `steps` in order, one at a time, and return the final props.
    pub async fn run(&self, steps: Vec<BoxedAsyncStep>) -> Result<Props, ChainError> {
        let run = RunContext::new(self.context.clone(), self.props.seed());
        run_async_steps(run, &steps).await
    }

    /// Wrap `steps` into a single step that runs them from the enclosing
    /// chain's current context and props.
    ///
    /// The sub-chain keeps no reference to this chain: its own context and
    /// initial props are never read.
    pub fn cached(&self, steps: Vec<BoxedAsyncStep>) -> AsyncSubChain {
        AsyncSubChain {
            steps: steps.into(),
        }
    }

    /// Same as [`Chain::cached`].
    pub fn nested(&self, steps: Vec<BoxedAsyncStep>) -> AsyncSubChain {
        self.cached(steps)
    }
}

/// Create an asynchronous chain. See [`Chain::new`].
pub fn create_chain(context: impl Into<Context>, props: impl Into<PropsSource>) -> Chain {
    Chain::new(context, props)
}

/// A list of asynchronous steps embedded as one step of another chain.
///
/// The inner steps run to completion before the enclosing chain moves on.
#[derive(Clone)]
pub struct AsyncSubChain {
    steps: Arc<[BoxedAsyncStep]>,
}

impl AsyncSubChain {
    /// Number of inner steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if there are no inner steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[async_trait::async_trait]
impl AsyncStep for AsyncSubChain {
    async fn run(&self, ctx: &Context, props: &Props) -> StepResult {
        let run = RunContext::new(ctx.clone(), props.clone());
        let props = run_async_steps(run, &self.steps).await?;
        Ok(props.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn advance_keeps_run_on_continue() {
        let run = RunContext::new(Context::default(), Props::from(json!({"a": 1})));
        let next = run
            .advance(StepOutcome::Continue, &StepId::new(0, None))
            .expect("continue never fails");
        assert_eq!(next.into_props(), Props::from(json!({"a": 1})));
    }

    #[test]
    fn advance_rejects_unknown_key() {
        let run = RunContext::new(Context::default(), Props::from(json!({"a": 1})));
        let err = run
            .advance(json!({"b": 2}).into(), &StepId::new(5, Some("writer")))
            .expect_err("b is not declared");

        assert_eq!(err.step().index(), 5);
        assert_eq!(err.unauthorized_prop_change().map(|e| e.prop()), Some("b"));
    }

    #[test]
    fn default_chains_are_empty() {
        let props = SyncChain::default().run(Vec::new()).expect("no steps");
        assert!(props.is_empty());
        assert!(SyncChain::default().context().is_empty());
    }

    #[test]
    fn sub_chain_reports_its_size() {
        let sub = SyncChain::default().nested(Vec::new());
        assert!(sub.is_empty());
        assert_eq!(sub.len(), 0);
    }
}
