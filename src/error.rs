//! Error types raised while running a chain.
//!
//! A run fails when a step:
//! - tried to write a prop that was not declared up front
//!   ([`UnauthorizedPropChangeError`])
//! - returned an error of its own
//! - panicked, typically on a failed assertion
//!
//! All of them abort the run and come back wrapped in a [`ChainError`] that names the
//! failing step.

use std::any::Any;
use std::fmt;

use thiserror::Error;

/// Boxed error returned by user-provided steps.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A step attempted to write a prop key that is not part of the initial props.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Attempting to toggle non-existing prop: \"{prop}\"")]
pub struct UnauthorizedPropChangeError {
    prop: String,
}

impl UnauthorizedPropChangeError {
    /// Create the error for the given offending key.
    pub fn new(prop: impl Into<String>) -> Self {
        Self { prop: prop.into() }
    }

    /// The key the step tried to write.
    pub fn prop(&self) -> &str {
        &self.prop
    }
}

/// Failure reading a typed value out of the props.
#[derive(Error, Debug)]
pub enum PropError {
    /// No prop with this key exists.
    #[error("prop \"{0}\" does not exist")]
    Missing(String),

    /// The prop exists but could not be read as the requested type.
    #[error("prop \"{prop}\" has an unexpected type: {source}")]
    Type {
        /// The key that was read.
        prop: String,
        /// The deserialization error.
        source: serde_json::Error,
    },
}

/// Position and optional name of a step inside its chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepId {
    index: usize,
    name: Option<String>,
}

impl StepId {
    /// Identify a step by index, with its name if it has a non-empty one.
    pub fn new(index: usize, name: Option<&str>) -> Self {
        Self {
            index,
            name: name.filter(|n| !n.is_empty()).map(str::to_owned),
        }
    }

    /// Zero-based position of the step in its chain.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Declared name of the step, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "#{} \"{}\"", self.index, name),
            None => write!(f, "#{}", self.index),
        }
    }
}

/// What went wrong inside a failing step.
#[derive(Error, Debug)]
pub enum StepFailure {
    /// The step returned an update for an undeclared prop.
    #[error(transparent)]
    UnauthorizedPropChange(#[from] UnauthorizedPropChangeError),

    /// The step itself returned an error.
    #[error(transparent)]
    Step(BoxError),

    /// The step panicked. Holds the panic message.
    #[error("{0}")]
    Panicked(String),
}

impl StepFailure {
    /// Build the failure for a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast_ref::<&'static str>() {
                Some(message) => (*message).to_owned(),
                None => "Box<dyn Any>".to_owned(),
            },
        };
        Self::Panicked(message)
    }
}

impl From<BoxError> for StepFailure {
    fn from(error: BoxError) -> Self {
        match error.downcast::<UnauthorizedPropChangeError>() {
            Ok(e) => Self::UnauthorizedPropChange(*e),
            Err(other) => Self::Step(other),
        }
    }
}

/// A chain run aborted because one of its steps failed.
///
/// The message prefixes the original one with the identity of the failing
/// step. The original error is kept as the source.
#[derive(Error, Debug)]
#[error("test-scenarii caught an error while attempting to run user-provided test step {step}: {failure}")]
pub struct ChainError {
    step: StepId,
    #[source]
    failure: StepFailure,
}

impl ChainError {
    /// Annotate a failure with the step it happened in.
    pub fn new(step: StepId, failure: impl Into<StepFailure>) -> Self {
        Self {
            step,
            failure: failure.into(),
        }
    }

    /// The failing step.
    pub fn step(&self) -> &StepId {
        &self.step
    }

    /// The failure, without the step annotation.
    pub fn failure(&self) -> &StepFailure {
        &self.failure
    }

    /// Consume the error and return the failure.
    pub fn into_failure(self) -> StepFailure {
        self.failure
    }

    /// Returns `true` if the run failed on an undeclared prop write,
    /// including inside nested chains.
    pub fn is_unauthorized_prop_change(&self) -> bool {
        self.unauthorized_prop_change().is_some()
    }

    /// The undeclared prop write that aborted the run, looking through
    /// nested chain errors.
    pub fn unauthorized_prop_change(&self) -> Option<&UnauthorizedPropChangeError> {
        self.downcast_ref()
    }

    /// The message of the panic that aborted the run, looking through nested
    /// chain errors.
    pub fn panic_message(&self) -> Option<&str> {
        match &self.failure {
            StepFailure::Panicked(message) => Some(message.as_str()),
            StepFailure::Step(e) => e
                .downcast_ref::<ChainError>()
                .and_then(ChainError::panic_message),
            StepFailure::UnauthorizedPropChange(_) => None,
        }
    }

    /// Find the original error of type `E`, looking through nested chain
    /// errors.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match &self.failure {
            StepFailure::UnauthorizedPropChange(e) => {
                (e as &(dyn std::error::Error + 'static)).downcast_ref::<E>()
            }
            StepFailure::Step(e) => {
                if let Some(found) = e.downcast_ref::<E>() {
                    return Some(found);
                }
                e.downcast_ref::<ChainError>()
                    .and_then(|inner| inner.downcast_ref::<E>())
            }
            StepFailure::Panicked(_) => None,
        }
    }
}
