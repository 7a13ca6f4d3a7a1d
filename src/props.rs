//! Context, props, and the merge policy guarding props updates.
//!
//! The context is fixed once a chain is created. Props evolve while a chain
//! runs, but only through [`merge_props`], which refuses to introduce keys
//! that were not present in the initial props.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PropError, UnauthorizedPropChangeError};

/// A partial props mapping returned by a step.
pub type PropsUpdate = Map<String, Value>;

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        #[allow(unused_variables)]
        other => {
            #[cfg(feature = "tracing")]
            tracing::warn!(value = %other, "seed.not_an_object");
            Map::new()
        }
    }
}

// ============================================================================
// Context
// ============================================================================

/// Read-only data shared by every step of every run of a chain.
///
/// Cloning a context is cheap and yields a handle to the same data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(Arc<Map<String, Value>>);

impl Context {
    /// Create a context from a JSON map.
    pub fn new(values: Map<String, Value>) -> Self {
        Self(Arc::new(values))
    }

    /// Get the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Read the value stored under `key` as `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, PropError> {
        read_as(&self.0, key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the context holds no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns `true` if both handles point to the same context.
    pub fn ptr_eq(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Map<String, Value>> for Context {
    fn from(values: Map<String, Value>) -> Self {
        Self::new(values)
    }
}

/// `null` and non-object values give an empty context.
impl From<Value> for Context {
    fn from(value: Value) -> Self {
        Self::new(into_map(value))
    }
}

impl From<()> for Context {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl<T: Into<Context>> From<Option<T>> for Context {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

// ============================================================================
// Props
// ============================================================================

/// The state threaded through a chain's steps.
///
/// Props are never mutated in place: every accepted update produces a new
/// value through [`Props::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Props(Map<String, Value>);

impl Props {
    /// Create props from a JSON map. Its keys become the only valid keys.
    pub fn new(values: Map<String, Value>) -> Self {
        Self(values)
    }

    /// Get the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Read the value stored under `key` as `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, PropError> {
        read_as(&self.0, key)
    }

    /// Returns `true` if `key` is a declared prop.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterate over the declared keys.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Number of declared props.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no props are declared.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume the props and return the underlying map.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Apply `update` on top of these props. See [`merge_props`].
    pub fn merge(&self, update: &PropsUpdate) -> Result<Props, UnauthorizedPropChangeError> {
        merge_props(self, update)
    }
}

impl From<Map<String, Value>> for Props {
    fn from(values: Map<String, Value>) -> Self {
        Self::new(values)
    }
}

/// `null` and non-object values give empty props.
impl From<Value> for Props {
    fn from(value: Value) -> Self {
        Self::new(into_map(value))
    }
}

impl From<()> for Props {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl<T: Into<Props>> From<Option<T>> for Props {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

fn read_as<T: DeserializeOwned>(map: &Map<String, Value>, key: &str) -> Result<T, PropError> {
    let value = map
        .get(key)
        .ok_or_else(|| PropError::Missing(key.to_owned()))?;
    serde_json::from_value(value.clone()).map_err(|source| PropError::Type {
        prop: key.to_owned(),
        source,
    })
}

/// Merge `update` into `current`, returning the new props.
///
/// Every key of `update` must already exist in `current`; the first one that
/// does not, in the update's insertion order, is reported as an [`UnauthorizedPropChangeError`]. `current` is
/// left untouched.
pub fn merge_props(
    current: &Props,
    update: &PropsUpdate,
) -> Result<Props, UnauthorizedPropChangeError> {
    if let Some(unknown) = update.keys().find(|key| !current.contains_key(key)) {
        return Err(UnauthorizedPropChangeError::new(unknown.as_str()));
    }

    let mut next = current.0.clone();
    for (key, value) in update {
        next.insert(key.clone(), value.clone());
    }
    Ok(Props(next))
}

// ============================================================================
// Props Source
// ============================================================================

type Supplier = Arc<dyn Fn() -> Props + Send + Sync>;

/// Where a chain takes its initial props from at the start of each run.
#[derive(Clone)]
pub enum PropsSource {
    /// The same initial props for every run.
    Fixed(Props),
    /// A function called once per run to build fresh initial props.
    Supplier(Supplier),
}

impl PropsSource {
    /// Seed every run with the props returned by `supplier`.
    pub fn supplier<F, P>(supplier: F) -> Self
    where
        F: Fn() -> P + Send + Sync + 'static,
        P: Into<Props>,
    {
        Self::Supplier(Arc::new(move || supplier().into()))
    }

    /// Build the initial props of a new run.
    pub fn seed(&self) -> Props {
        match self {
            Self::Fixed(props) => props.clone(),
            Self::Supplier(supplier) => supplier(),
        }
    }
}

impl Default for PropsSource {
    fn default() -> Self {
        Self::Fixed(Props::default())
    }
}

impl fmt::Debug for PropsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(props) => f.debug_tuple("Fixed").field(props).finish(),
            Self::Supplier(_) => f.write_str("Supplier(..)"),
        }
    }
}

impl From<Props> for PropsSource {
    fn from(props: Props) -> Self {
        Self::Fixed(props)
    }
}

impl From<Map<String, Value>> for PropsSource {
    fn from(values: Map<String, Value>) -> Self {
        Self::Fixed(values.into())
    }
}

impl From<Value> for PropsSource {
    fn from(value: Value) -> Self {
        Self::Fixed(value.into())
    }
}

impl From<()> for PropsSource {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl<T: Into<Props>> From<Option<T>> for PropsSource {
    fn from(props: Option<T>) -> Self {
        Self::Fixed(props.into())
    }
}
