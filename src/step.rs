//! Step traits and the ready-made steps built on them.
//!
//! A step reads the chain context and the current props, and either lets the
//! props through unchanged or returns a partial update for them. [`Step`] is
//! the synchronous flavour, [`AsyncStep`] the asynchronous one.

use std::borrow::Cow;
use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BoxError;
use crate::props::{Context, Props, PropsUpdate};

/// Outcome of a successful step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// Keep the current props.
    Continue,
    /// Merge these values into the current props.
    Update(PropsUpdate),
}

impl StepOutcome {
    /// Returns `true` if the step asked for a props update.
    pub fn is_update(&self) -> bool {
        matches!(self, Self::Update(_))
    }
}

/// Objects become updates. Anything else, `null` included, leaves the props
/// unchanged.
impl From<Value> for StepOutcome {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Update(map),
            Value::Null => Self::Continue,
            #[allow(unused_variables)]
            other => {
                #[cfg(feature = "tracing")]
                tracing::debug!(value = %other, "step.result_ignored");
                Self::Continue
            }
        }
    }
}

impl From<PropsUpdate> for StepOutcome {
    fn from(update: PropsUpdate) -> Self {
        Self::Update(update)
    }
}

impl From<Props> for StepOutcome {
    fn from(props: Props) -> Self {
        Self::Update(props.into_map())
    }
}

impl From<()> for StepOutcome {
    fn from(_: ()) -> Self {
        Self::Continue
    }
}

/// What a step returns: an outcome, or the error that aborts the chain.
pub type StepResult = Result<StepOutcome, BoxError>;

/// A synchronous test step.
pub trait Step: Send + Sync {
    /// Name used to identify the step in error messages.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Run the step against the chain context and the current props.
    fn run(&self, ctx: &Context, props: &Props) -> StepResult;
}

/// An asynchronous test step.
///
/// The chain awaits each step to completion before it starts the next one.
#[async_trait::async_trait]
pub trait AsyncStep: Send + Sync {
    /// Name used to identify the step in error messages.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Run the step against the chain context and the current props.
    async fn run(&self, ctx: &Context, props: &Props) -> StepResult;
}

// ============================================================================
// Closure Steps
// ============================================================================

/// A synchronous step backed by a closure. Built with [`step`].
#[derive(Clone)]
pub struct FnStep<F>(F);

/// Wrap a closure as a synchronous step.
pub fn step<F>(f: F) -> FnStep<F>
where
    F: Fn(&Context, &Props) -> StepResult + Send + Sync,
{
    FnStep(f)
}

impl<F> Step for FnStep<F>
where
    F: Fn(&Context, &Props) -> StepResult + Send + Sync,
{
    fn run(&self, ctx: &Context, props: &Props) -> StepResult {
        (self.0)(ctx, props)
    }
}

/// An asynchronous step backed by a closure returning a future. Built with
/// [`async_step`].
///
/// The closure receives its own handles to the context and props, so the
/// returned future does not borrow from the chain.
#[derive(Clone)]
pub struct AsyncFnStep<F>(F);

/// Wrap a closure returning a future as an asynchronous step.
pub fn async_step<F, Fut>(f: F) -> AsyncFnStep<F>
where
    F: Fn(Context, Props) -> Fut + Send + Sync,
    Fut: Future<Output = StepResult> + Send + 'static,
{
    AsyncFnStep(f)
}

#[async_trait::async_trait]
impl<F, Fut> AsyncStep for AsyncFnStep<F>
where
    F: Fn(Context, Props) -> Fut + Send + Sync,
    Fut: Future<Output = StepResult> + Send + 'static,
{
    async fn run(&self, ctx: &Context, props: &Props) -> StepResult {
        (self.0)(ctx.clone(), props.clone()).await
    }
}

// ============================================================================
// Named Steps
// ============================================================================

/// A step with a name, reported in error messages.
#[derive(Clone)]
pub struct Named<S> {
    name: Cow<'static, str>,
    inner: S,
}

/// Give `step` a name.
pub fn named<S>(name: impl Into<Cow<'static, str>>, step: S) -> Named<S> {
    Named {
        name: name.into(),
        inner: step,
    }
}

impl<S: Step> Step for Named<S> {
    fn name(&self) -> Option<&str> {
        Some(&*self.name)
    }

    fn run(&self, ctx: &Context, props: &Props) -> StepResult {
        self.inner.run(ctx, props)
    }
}

#[async_trait::async_trait]
impl<S: AsyncStep> AsyncStep for Named<S> {
    fn name(&self) -> Option<&str> {
        Some(&*self.name)
    }

    async fn run(&self, ctx: &Context, props: &Props) -> StepResult {
        self.inner.run(ctx, props).await
    }
}

// ============================================================================
// Set Chain Props
// ============================================================================

/// A step that always applies the same update. Built with [`set_chain_props`].
#[derive(Debug, Clone, PartialEq)]
pub struct SetChainProps(PropsUpdate);

/// A step applying `update` to the props when it runs.
///
/// Non-object values give an empty update.
pub fn set_chain_props(update: impl Into<Props>) -> SetChainProps {
    SetChainProps(update.into().into_map())
}

impl Step for SetChainProps {
    fn name(&self) -> Option<&str> {
        Some("setChainProps")
    }

    fn run(&self, _ctx: &Context, _props: &Props) -> StepResult {
        Ok(StepOutcome::Update(self.0.clone()))
    }
}

#[async_trait::async_trait]
impl AsyncStep for SetChainProps {
    fn name(&self) -> Option<&str> {
        Some("setChainProps")
    }

    async fn run(&self, ctx: &Context, props: &Props) -> StepResult {
        Step::run(self, ctx, props)
    }
}
