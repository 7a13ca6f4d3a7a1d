//! Tests for sync and async chains.
//!
//! ## Test Organization
//!
//! - `common`: Shared step builders and helpers
//! - `basic`: Ordering, defaults and props updates (success paths)
//! - `errors`: Failure annotation and the props merge policy
//! - `nested`: Cached and nested sub-chains
//! - `supplier`: Props suppliers and repeated runs
//!
//! ## Test Steps
//!
//! Most tests use a counter domain:
//! - `increment`: adds one to the `count` prop
//! - `append`: appends a fragment to the `buffer` prop
//! - `sentinel`: records that it ran, to prove later steps were skipped

mod common;
