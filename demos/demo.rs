//! Scenario demo showing happy and unhappy paths.
//!
//! Run with: cargo run --example demo

use std::time::Duration;

use serde_json::json;
use test_scenarii::{
    async_step, async_steps, named, set_chain_props, step, steps, Chain, Context, Props,
    StepOutcome, StepResult, SyncChain,
};
use thiserror::Error;

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, Clone, Error)]
enum CheckoutError {
    #[error("Payment declined for card ending in {0}")]
    PaymentDeclined(String),
}

// ============================================================================
// Step implementations
// ============================================================================

/// Step: create an order for the customer found in the context
async fn create_order(ctx: Context, _props: Props) -> StepResult {
    let customer: String = ctx.get_as("customer")?;
    println!("  [CreateOrder] Creating order for customer: {}", customer);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let order_id = format!("ORD-{}-001", customer);
    println!("  [CreateOrder] Order created: {}", order_id);
    Ok(json!({ "orderId": order_id }).into())
}

/// Step: reserve the quantity held in the props
async fn reserve_inventory(_ctx: Context, props: Props) -> StepResult {
    let quantity: u32 = props.get_as("quantity")?;
    println!("  [ReserveInventory] Reserving {} items...", quantity);
    tokio::time::sleep(Duration::from_millis(150)).await;

    Ok(json!({ "reserved": true }).into())
}

/// Step: charge the card held in the context
async fn process_payment(ctx: Context, _props: Props) -> StepResult {
    let card: String = ctx.get_as("card")?;
    println!("  [ProcessPayment] Charging card ending in {}...", card);
    tokio::time::sleep(Duration::from_millis(100)).await;

    if card == "0000" {
        println!("  [ProcessPayment] FAILED - Card declined!");
        return Err(CheckoutError::PaymentDeclined(card).into());
    }

    Ok(json!({ "paymentId": format!("PAY-{}", card) }).into())
}

fn checkout_chain(card: &str) -> Chain {
    Chain::new(
        json!({ "customer": "alice", "card": card }),
        json!({ "orderId": null, "quantity": 3, "reserved": false, "paymentId": null }),
    )
}

#[tokio::main]
async fn main() {
    println!("=== Scenario 1: Happy path ===\n");

    let chain = checkout_chain("4242");
    let result = chain
        .run(async_steps![
            async_step(create_order),
            chain.nested(async_steps![async_step(reserve_inventory)]),
            named("payment", async_step(process_payment)),
            async_step(|_ctx, props| async move {
                println!("  [Assert] Final props: {}", json!(props));
                Ok(StepOutcome::Continue)
            }),
        ])
        .await;

    match result {
        Ok(props) => println!("\n  Result: COMPLETED with {} props\n", props.len()),
        Err(e) => println!("\n  Result: FAILED - {}\n", e),
    }

    println!("=== Scenario 2: Declined payment ===\n");

    let result = checkout_chain("0000")
        .run(async_steps![
            async_step(create_order),
            async_step(reserve_inventory),
            named("payment", async_step(process_payment)),
        ])
        .await;

    match result {
        Ok(_) => println!("\n  Result: COMPLETED (unexpected)\n"),
        Err(e) => println!("\n  Result: FAILED - {}\n", e),
    }

    println!("=== Scenario 3: Undeclared prop ===\n");

    let chain = SyncChain::new((), json!({ "count": 0 }));
    let result = chain.run(steps![
        step(|_ctx, props| {
            let count: i64 = props.get_as("count")?;
            Ok(json!({ "count": count + 1 }).into())
        }),
        set_chain_props(json!({ "discount": 10 })),
    ]);

    match result {
        Ok(_) => println!("  Result: COMPLETED (unexpected)\n"),
        Err(e) if e.is_unauthorized_prop_change() => {
            println!("  Result: REJECTED - {}\n", e)
        }
        Err(e) => println!("  Result: FAILED - {}\n", e),
    }
}
