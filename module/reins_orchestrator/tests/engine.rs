//! Smoke test for the production composition root over SQLite

use reins_config_loader::{ BreakerConfig, EngineConfig };
use reins_ledger::{ BudgetPeriod, CreateBudgetInput };
use reins_orchestrator::{ Engine, LifecycleOutcome };
use reins_proposal::{ NewProposal, ProposalStatus };
use reins_registry::CreateAgentInput;
use reins_types::OwnerId;
use rust_decimal::Decimal;
use std::str::FromStr;

fn config() -> EngineConfig
{
  EngineConfig
  {
    // Shared-cache memory database: one schema visible to every pooled connection
    database_url: "sqlite:file:engine_smoke?mode=memory&cache=shared".into(),
    primary_exec_url: None,
    exec_timeout_secs: 5,
    breaker: BreakerConfig::default(),
    webhook_timeout_secs: 30,
    webhook_max_attempts: 3,
    notify_public_key: String::new(),
    notify_private_key: String::new(),
  }
}

#[ tokio::test ]
async fn engine_assembles_and_executes_end_to_end()
{
  let engine = Engine::from_config( &config() ).await.unwrap();
  let owner = OwnerId::parse( "acct_1" ).unwrap();

  let created = engine.registry.create( CreateAgentInput
  {
    owner: owner.clone(),
    name: "smoke-bot".into(),
    webhook_url: None,
    auto_execute_enabled: true,
    auto_execute_rules: None,
    rate_limit_per_minute: 60,
  } ).await.unwrap();

  engine.ledger.create( CreateBudgetInput
  {
    agent_id: created.agent.id.clone(),
    owner: owner.clone(),
    amount: Decimal::from_str( "1000" ).unwrap(),
    token: "USDC".into(),
    chain_id: None,
    period: BudgetPeriod::Monthly,
  } ).await.unwrap();

  // Key round-trips through the real SQLite store
  let validated = engine.registry.validate_api_key( &created.api_key ).await.unwrap();
  assert_eq!( validated.id, created.agent.id );

  // Rate limiter enforces the agent's per-minute quota
  assert!( engine.rate_limiter.check( &validated.id, validated.rate_limit_per_minute ) );

  // No primary configured: the local backend settles the payment
  let result = engine.orchestrator.process_new( NewProposal
  {
    agent_id: created.agent.id.clone(),
    owner: owner.clone(),
    recipient: "0xAB5801a7D398351b8bE11C439e05C5B3259aeC9B".into(),
    amount: Decimal::from_str( "40" ).unwrap(),
    token: "USDC".into(),
    chain_id: 1,
    reason: None,
  } ).await.unwrap();

  assert_eq!( result.proposal.status, ProposalStatus::Executed );
  assert!( matches!( result.outcome, LifecycleOutcome::Executed { .. } ) );

  // Background worker runs at least one pass without panicking
  let handle = engine.spawn_worker( std::time::Duration::from_millis( 10 ) );
  tokio::time::sleep( std::time::Duration::from_millis( 40 ) ).await;
  handle.abort();
}
