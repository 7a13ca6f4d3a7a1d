#![deny(missing_docs)]

//! test-scenarii: composable chains of test steps.
//!
//! # Design Goals
//!
//! A chain runs an ordered list of setup, action and assertion steps as one
//! unit:
//!
//! - **Strict ordering**: a step starts only once the previous one finished
//!   and its result was applied
//! - **Guarded props**: steps may only update props declared when the chain
//!   was created
//! - **Annotated failures**: the first failing step aborts the run, and its
//!   error names the step by index and name
//!
//! # Core Concepts
//!
//! - [`SyncChain`] / [`Chain`]: chain handles holding a [`Context`] and the
//!   initial [`Props`] (or a supplier of them)
//! - [`Step`] / [`AsyncStep`]: a unit of work returning a [`StepOutcome`]
//! - [`SubChain`] / [`AsyncSubChain`]: a list of steps embedded as one step
//!   of another chain
//! - [`merge_props`]: the policy rejecting updates to undeclared props
//!
//! ```
//! use serde_json::json;
//! use test_scenarii::{step, steps, SyncChain};
//!
//! let chain = SyncChain::new((), json!({ "count": 0 }));
//! let increment = || {
//!     step(|_ctx, props| {
//!         let count: i64 = props.get_as("count")?;
//!         Ok(json!({ "count": count + 1 }).into())
//!     })
//! };
//!
//! let props = chain
//!     .run(steps![increment(), chain.cached(steps![increment(), increment()])])
//!     .unwrap();
//! assert_eq!(props.get("count"), Some(&json!(3)));
//! ```

// Modules
pub mod error;
pub mod execution;
mod macros;
pub mod props;
pub mod step;

// Re-exports for convenience
pub use error::{BoxError, ChainError, PropError, StepFailure, StepId, UnauthorizedPropChangeError};
pub use execution::{
    create_chain, create_chain_sync, AsyncSubChain, BoxedAsyncStep, BoxedStep, Chain, SubChain,
    SyncChain,
};
pub use props::{merge_props, Context, Props, PropsSource, PropsUpdate};
pub use step::{
    async_step, named, set_chain_props, step, AsyncFnStep, AsyncStep, FnStep, Named,
    SetChainProps, Step, StepOutcome, StepResult,
};

#[cfg(test)]
mod tests;
