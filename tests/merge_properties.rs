//! Property-Based Tests for the props merge policy and chain runs
//!
//! These tests verify:
//! - Updates to declared keys change exactly those keys
//! - Updates naming an undeclared key are always rejected
//! - Runs without updates hand back the initial props

use proptest::prelude::*;
use serde_json::{Map, Value};

use test_scenarii::{merge_props, step, steps, Props, PropsUpdate, StepOutcome, SyncChain};

// =============================================================================
// Strategies
// =============================================================================

/// Strategy for generating JSON scalar values
fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-z]{0,8}".prop_map(Value::from),
    ]
}

/// Strategy for generating a props map with 1..8 keys
fn props_strategy() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-z]{1,6}", scalar_strategy(), 1..8)
        .prop_map(|entries| entries.into_iter().collect::<Map<String, Value>>())
}

// =============================================================================
// Merge Policy
// =============================================================================

proptest! {
    /// Updating a subset of declared keys changes those keys and keeps the rest
    #[test]
    fn declared_updates_apply(
        initial in props_strategy(),
        value in scalar_strategy(),
        pick in any::<prop::sample::Index>(),
    ) {
        let props = Props::new(initial.clone());
        let keys: Vec<&String> = initial.keys().collect();
        let key = keys[pick.index(keys.len())].clone();

        let mut update = PropsUpdate::new();
        update.insert(key.clone(), value.clone());
        let next = merge_props(&props, &update).expect("key is declared");

        prop_assert_eq!(next.get(&key), Some(&value));
        prop_assert_eq!(next.len(), initial.len());
        for (k, v) in initial.iter().filter(|(k, _)| **k != key) {
            prop_assert_eq!(next.get(k), Some(v));
        }
        // the input props are never mutated
        prop_assert_eq!(props.as_map(), &initial);
    }

    /// Any update naming an undeclared key is rejected with that key
    #[test]
    fn undeclared_updates_fail(
        initial in props_strategy(),
        value in scalar_strategy(),
    ) {
        let props = Props::new(initial);
        // keys are lowercase letters only, so this one is never declared
        let mut update = PropsUpdate::new();
        update.insert("UNDECLARED".to_string(), value);

        let err = merge_props(&props, &update).expect_err("key is not declared");
        prop_assert_eq!(err.prop(), "UNDECLARED");
    }

    /// The empty update is the identity
    #[test]
    fn empty_update_is_identity(initial in props_strategy()) {
        let props = Props::new(initial);
        prop_assert_eq!(merge_props(&props, &PropsUpdate::new()), Ok(props.clone()));
    }
}

// =============================================================================
// Chain Runs
// =============================================================================

proptest! {
    /// Steps that never return updates leave the initial props as they were
    #[test]
    fn runs_without_updates_return_initial_props(
        initial in props_strategy(),
        count in 0usize..6,
    ) {
        let chain = SyncChain::new((), initial.clone());
        let noop_steps = (0..count)
            .map(|_| Box::new(step(|_ctx, _props| Ok(StepOutcome::Continue))) as test_scenarii::BoxedStep)
            .collect();

        let props = chain.run(noop_steps).expect("no step fails");
        prop_assert_eq!(props.as_map(), &initial);
    }

    /// A step writing an undeclared key aborts the run at that step
    #[test]
    fn undeclared_write_reports_its_step(
        initial in props_strategy(),
        before in 0usize..4,
    ) {
        let chain = SyncChain::new((), initial);
        let mut all = (0..before)
            .map(|_| Box::new(step(|_ctx, _props| Ok(StepOutcome::Continue))) as test_scenarii::BoxedStep)
            .collect::<Vec<_>>();
        all.extend(steps![step(|_ctx, _props| {
            let mut update = PropsUpdate::new();
            update.insert("UNDECLARED".to_string(), Value::Bool(true));
            Ok(StepOutcome::Update(update))
        })]);

        let err = chain.run(all).expect_err("key is not declared");
        prop_assert_eq!(err.step().index(), before);
        prop_assert!(err.is_unauthorized_prop_change());
    }
}
