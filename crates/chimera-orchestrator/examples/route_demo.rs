//! Route a payment task through the reference registry
//!
//! Run with:
//! ```bash
//! cargo run --example route_demo -p chimera-orchestrator
//! ```

use std::sync::Arc;

use chimera_judge::Post;
use chimera_ledger::{InMemoryLedger, LedgerStore};
use chimera_orchestrator::{LedgerIntent, Orchestrator, OrchestratorConfig, TaskSubmission};
use chimera_types::TaskManifest;
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    let ledger = Arc::new(InMemoryLedger::new());
    ledger.provision("treasury".into(), 100, 1)?;
    let orchestrator = Orchestrator::from_config(&OrchestratorConfig::default(), ledger.clone())?;

    let manifest = TaskManifest::from_value(json!({
        "skill_required": "wallet_manager",
        "priority": "HIGH",
        "timeout_ms": 15000,
        "idempotency_key": "pay-20260207-demo",
        "trace_id": "trace-demo",
        "policy_version": "finance.v1"
    }))?;
    let input = json!({
        "action": "payment",
        "amount": 25,
        "currency": "USDC",
        "to_address": "0x1234567890abcdef1234567890abcdef12345678"
    });

    let route = orchestrator.gateway().resolve_route(&manifest, &input)?;
    println!("Demo route: {}", serde_json::to_string(&route)?);

    let submission = TaskSubmission::new(manifest, input)
        .with_post(Post::new("Excited to pay our first creator! 🚀", "enthusiastic"))
        .with_ledger_intent(LedgerIntent::new("treasury", -25, 1));
    let outcome = orchestrator.submit(submission)?;
    println!("Outcome: {}", serde_json::to_string_pretty(&outcome)?);
    println!("Treasury: {:?}", ledger.snapshot("treasury")?);

    Ok(())
}
