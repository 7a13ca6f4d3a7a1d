//! Common step builders for tests.
//!
//! This module contains:
//! - `TestError`: an error type for failing steps
//! - Sync builders: `increment`, `append`, `fail_with`, `sentinel`
//! - Async builders: `increment_async`, `wait_then_increment`, `sentinel_async`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::{async_step, step, AsyncStep, Context, Props, Step, StepOutcome, StepResult};

/// Short delay used by asynchronous steps.
pub const SHORT: Duration = Duration::from_millis(20);

// ============================================================================
// Error Type
// ============================================================================

/// Errors returned on purpose by test steps.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum TestError {
    /// The step decided to fail.
    #[error("something reprehensible happened")]
    Reprehensible,
}

// ============================================================================
// Sync Steps
// ============================================================================

/// Adds one to the `count` prop.
pub fn increment() -> impl Step {
    step(|_ctx, props| {
        let count: i64 = props.get_as("count")?;
        Ok(json!({ "count": count + 1 }).into())
    })
}

/// Appends `fragment` to the `buffer` prop.
pub fn append(fragment: &'static str) -> impl Step {
    step(move |_ctx, props| {
        let buffer: String = props.get_as("buffer")?;
        Ok(json!({ "buffer": buffer + fragment }).into())
    })
}

/// Always fails with [`TestError::Reprehensible`].
pub fn fail_with() -> impl Step {
    step(|_ctx, _props| Err(TestError::Reprehensible.into()))
}

/// Flips `flag` when run.
pub fn sentinel(flag: Arc<AtomicBool>) -> impl Step {
    step(move |_ctx, _props| {
        flag.store(true, Ordering::SeqCst);
        Ok(().into())
    })
}

// ============================================================================
// Async Steps
// ============================================================================

async fn add_one(_ctx: Context, props: Props) -> StepResult {
    let count: i64 = props.get_as("count")?;
    Ok(json!({ "count": count + 1 }).into())
}

async fn wait_and_add_one(ctx: Context, props: Props) -> StepResult {
    tokio::time::sleep(SHORT).await;
    add_one(ctx, props).await
}

/// Adds one to the `count` prop, without waiting.
pub fn increment_async() -> impl AsyncStep {
    async_step(add_one)
}

/// Sleeps for [`SHORT`], then adds one to the `count` prop.
pub fn wait_then_increment() -> impl AsyncStep {
    async_step(wait_and_add_one)
}

/// Flips `flag` when run.
pub fn sentinel_async(flag: Arc<AtomicBool>) -> impl AsyncStep {
    async_step(move |_ctx, _props| {
        let flag = flag.clone();
        async move {
            flag.store(true, Ordering::SeqCst);
            Ok(StepOutcome::Continue)
        }
    })
}

/// Read the `count` prop.
pub fn count_of(props: &Props) -> i64 {
    props.get_as("count").expect("count should be a number")
}
