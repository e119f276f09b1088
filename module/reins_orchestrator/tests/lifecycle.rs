//! End-to-end lifecycle tests: registry + rules + ledger + machine +
//! webhooks + execution bridge wired the way production composes them,
//! over in-memory stores.

use chrono::{ TimeZone, Utc };
use reins_audit::{ action, ActivitySink, AuditSink, MemoryAuditStore };
use reins_exec::{
  BreakerConfig, BreakerRegistry, ExecutionBackend, ExecutionReceipt, ExecutionRequest,
  LocalExecutionBackend, ServedBy,
};
use reins_ledger::{ BudgetLedger, BudgetPeriod, CreateBudgetInput, MemoryBudgetStore };
use reins_orchestrator::{
  notification_kind, HoldReason, LifecycleOutcome, Notifier, Orchestrator, WebhookEventSink,
};
use reins_proposal::{ MemoryProposalStore, NewProposal, ProposalMachine, ProposalStatus };
use reins_registry::{ AgentRegistry, AutoExecuteRules, CreateAgentInput, MemoryAgentStore };
use reins_rules::RuleEngine;
use reins_types::{ Error, ManualClock, OwnerId, Result };
use reins_webhook::{
  DeliveryStatus, MemoryDeliveryStore, PipelineConfig, WebhookPipeline, WebhookRequest,
  WebhookTransport,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{ AtomicU32, Ordering };
use tokio::sync::Mutex;

fn dec( s: &str ) -> Decimal
{
  Decimal::from_str( s ).unwrap()
}

/// Transport that accepts everything with 200
#[ derive( Debug, Default ) ]
struct OkTransport
{
  requests: Mutex< Vec< WebhookRequest > >,
}

#[ async_trait::async_trait ]
impl WebhookTransport for OkTransport
{
  async fn deliver( &self, request: &WebhookRequest ) -> Result< u16 >
  {
    self.requests.lock().await.push( request.clone() );
    Ok( 200 )
  }
}

/// Notifier recording (owner, kind, details)
#[ derive( Debug, Default ) ]
struct RecordingNotifier
{
  notes: Mutex< Vec< ( String, String, serde_json::Value ) > >,
}

#[ async_trait::async_trait ]
impl Notifier for RecordingNotifier
{
  async fn notify( &self, owner: &OwnerId, kind: &str, details: serde_json::Value ) -> Result< () >
  {
    self.notes.lock().await
      .push( ( owner.as_str().to_string(), kind.to_string(), details ) );
    Ok( () )
  }
}

/// Primary backend scripted to fail or succeed
#[ derive( Debug ) ]
struct ScriptedPrimary
{
  fail: bool,
  calls: AtomicU32,
}

#[ async_trait::async_trait ]
impl ExecutionBackend for ScriptedPrimary
{
  async fn execute( &self, _request: &ExecutionRequest ) -> Result< ExecutionReceipt >
  {
    let call = self.calls.fetch_add( 1, Ordering::SeqCst );
    if self.fail
    {
      Err( Error::transient( "primary 500", None ) )
    }
    else
    {
      Ok( ExecutionReceipt { tx_hash: format!( "0xprimary{call:04}" ) } )
    }
  }

  fn name( &self ) -> &str
  {
    "primary"
  }
}

struct World
{
  clock: Arc< ManualClock >,
  orchestrator: Orchestrator,
  registry: Arc< AgentRegistry >,
  ledger: Arc< BudgetLedger >,
  pipeline: Arc< WebhookPipeline >,
  audit_store: Arc< MemoryAuditStore >,
  notifier: Arc< RecordingNotifier >,
  primary: Arc< ScriptedPrimary >,
  owner: OwnerId,
}

async fn world( primary_fails: bool ) -> World
{
  let start = Utc.with_ymd_and_hms( 2026, 6, 1, 9, 0, 0 ).unwrap();
  let clock = Arc::new( ManualClock::new( start ) );

  let agents_store = Arc::new( MemoryAgentStore::new() );
  let registry = Arc::new( AgentRegistry::new( agents_store.clone(), clock.clone() ) );

  let ledger = Arc::new( BudgetLedger::new( Arc::new( MemoryBudgetStore::new() ), clock.clone() ) );

  let audit_store = Arc::new( MemoryAuditStore::new( clock.clone() ) );
  let breakers = Arc::new( BreakerRegistry::new( BreakerConfig::default() ) );

  let pipeline = Arc::new( WebhookPipeline::new(
    agents_store.clone(),
    Arc::new( MemoryDeliveryStore::new() ),
    Arc::new( OkTransport::default() ),
    breakers.clone(),
    clock.clone(),
    PipelineConfig::default(),
  ) );

  let proposal_store = Arc::new( MemoryProposalStore::new() );
  let machine = Arc::new( ProposalMachine::new(
    proposal_store.clone(),
    audit_store.clone(),
    audit_store.clone(),
    Arc::new( WebhookEventSink::new( agents_store.clone(), pipeline.clone() ) ),
    clock.clone(),
  ) );

  let rules = Arc::new( RuleEngine::new( proposal_store, clock.clone() ) );

  let primary = Arc::new( ScriptedPrimary { fail: primary_fails, calls: AtomicU32::new( 0 ) } );
  let bridge = Arc::new( reins_exec::ExecutionBridge::new(
    Some( primary.clone() as Arc< dyn ExecutionBackend > ),
    Arc::new( LocalExecutionBackend::new() ),
    breakers,
    audit_store.clone(),
  ) );

  let notifier = Arc::new( RecordingNotifier::default() );

  let orchestrator = Orchestrator::new(
    registry.clone(),
    ledger.clone(),
    rules,
    machine.clone(),
    bridge,
    pipeline.clone(),
    audit_store.clone(),
    notifier.clone(),
  );

  World
  {
    clock,
    orchestrator,
    registry,
    ledger,
    pipeline,
    audit_store,
    notifier,
    primary,
    owner: OwnerId::parse( "acct_owner" ).unwrap(),
  }
}

/// Agent A from the spec scenarios: active, auto-execute on,
/// max_single 1000 USDC, tokens [USDC], monthly budget 5000 USDC
async fn scenario_agent( w: &World ) -> ( reins_registry::Agent, reins_ledger::Budget )
{
  let created = w.registry.create( CreateAgentInput
  {
    owner: w.owner.clone(),
    name: "agent-a".into(),
    webhook_url: Some( "https://hooks.example.com/a".into() ),
    auto_execute_enabled: true,
    auto_execute_rules: Some( AutoExecuteRules
    {
      max_single_amount: Some( dec( "1000" ) ),
      allowed_tokens: Some( vec![ "USDC".into() ] ),
      ..Default::default()
    } ),
    rate_limit_per_minute: 60,
  } ).await.unwrap();

  let budget = w.ledger.create( CreateBudgetInput
  {
    agent_id: created.agent.id.clone(),
    owner: w.owner.clone(),
    amount: dec( "5000" ),
    token: "USDC".into(),
    chain_id: None,
    period: BudgetPeriod::Monthly,
  } ).await.unwrap();

  ( created.agent, budget )
}

fn proposal_for( agent: &reins_registry::Agent, owner: &OwnerId, amount: &str ) -> NewProposal
{
  NewProposal
  {
    agent_id: agent.id.clone(),
    owner: owner.clone(),
    recipient: "0xAB5801a7D398351b8bE11C439e05C5B3259aeC9B".into(),
    amount: dec( amount ),
    token: "USDC".into(),
    chain_id: 1,
    reason: Some( "invoice".into() ),
  }
}

#[ tokio::test ]
async fn happy_auto_execute()
{
  let w = world( false ).await;
  let ( agent, budget ) = scenario_agent( &w ).await;

  let result = w.orchestrator
    .process_new( proposal_for( &agent, &w.owner, "250" ) )
    .await.unwrap();

  // Proposal reached executed with a tx hash
  assert_eq!( result.proposal.status, ProposalStatus::Executed );
  match &result.outcome
  {
    LifecycleOutcome::Executed { tx_hash, served_by } =>
    {
      assert!( tx_hash.starts_with( "0xprimary" ) );
      assert_eq!( *served_by, ServedBy::Primary );
    }
    other => panic!( "expected executed, got {other:?}" ),
  }

  // Budget: used 250, remaining 4750
  let budget = w.ledger.get( &budget.id ).await.unwrap().unwrap();
  assert_eq!( budget.used_amount, dec( "250" ) );
  assert_eq!( budget.remaining_amount, dec( "4750" ) );

  // Webhook events in transition order, created first, executed last
  let deliveries = w.pipeline.get_deliveries( &agent.id, 20 ).await.unwrap();
  let mut events: Vec< String > = deliveries.iter().map( |d| d.event_type.clone() ).collect();
  events.reverse(); // list is newest-first
  assert_eq!( events, vec![
    "proposal.created",
    "proposal.approved",
    "payment.executing",
    "payment.executed",
  ] );

  // Activity feed carries proposal_created and payment_executed
  let activities = w.audit_store.list_for_agent( &agent.id, 20 ).await.unwrap();
  let actions: Vec< &str > = activities.iter().map( |a| a.action.as_str() ).collect();
  assert!( actions.contains( &action::PROPOSAL_CREATED ) );
  assert!( actions.contains( &action::PAYMENT_EXECUTED ) );

  // Audit: approval was performed by the system
  let audits = w.audit_store
    .list_for_resource( "proposal", result.proposal.id.as_str() )
    .await.unwrap();
  let approval = audits.iter().find( |a| a.action == action::PROPOSAL_APPROVED ).unwrap();
  assert_eq!( approval.actor, reins_types::Actor::System );

  // All deliveries drain to delivered
  w.orchestrator.process_due_webhooks( 50 ).await.unwrap();
  for delivery in w.pipeline.get_deliveries( &agent.id, 20 ).await.unwrap()
  {
    assert_eq!( delivery.status, DeliveryStatus::Delivered );
  }
}

#[ tokio::test ]
async fn rule_violation_stays_pending_with_notification()
{
  let w = world( false ).await;
  let ( agent, budget ) = scenario_agent( &w ).await;

  let result = w.orchestrator
    .process_new( proposal_for( &agent, &w.owner, "2000" ) )
    .await.unwrap();

  assert_eq!( result.proposal.status, ProposalStatus::Pending );
  match &result.outcome
  {
    LifecycleOutcome::Held( HoldReason::RuleViolations( violations ) ) =>
    {
      assert_eq!( violations, &vec![ "Amount 2000 exceeds max single amount 1000".to_string() ] );
    }
    other => panic!( "expected rule violations, got {other:?}" ),
  }

  // No budget debit
  let budget = w.ledger.get( &budget.id ).await.unwrap().unwrap();
  assert_eq!( budget.used_amount, Decimal::ZERO );

  // Only proposal.created went out
  let deliveries = w.pipeline.get_deliveries( &agent.id, 20 ).await.unwrap();
  assert_eq!( deliveries.len(), 1 );
  assert_eq!( deliveries[ 0 ].event_type, "proposal.created" );

  // Owner was notified with the violation list
  let notes = w.notifier.notes.lock().await;
  let ( _, kind, details ) = notes.last().unwrap();
  assert_eq!( kind, notification_kind::RULE_VIOLATION );
  assert_eq!(
    details[ "violations" ][ 0 ],
    "Amount 2000 exceeds max single amount 1000"
  );
}

#[ tokio::test ]
async fn budget_contention_exactly_one_executes()
{
  let w = world( false ).await;
  let created = w.registry.create( CreateAgentInput
  {
    owner: w.owner.clone(),
    name: "contender".into(),
    webhook_url: None,
    auto_execute_enabled: true,
    auto_execute_rules: None,
    rate_limit_per_minute: 60,
  } ).await.unwrap();
  let agent = created.agent;

  let budget = w.ledger.create( CreateBudgetInput
  {
    agent_id: agent.id.clone(),
    owner: w.owner.clone(),
    amount: dec( "100" ),
    token: "USDC".into(),
    chain_id: None,
    period: BudgetPeriod::Total,
  } ).await.unwrap();

  let ( a, b ) = tokio::join!(
    w.orchestrator.process_new( proposal_for( &agent, &w.owner, "80" ) ),
    w.orchestrator.process_new( proposal_for( &agent, &w.owner, "80" ) ),
  );
  let a = a.unwrap();
  let b = b.unwrap();

  let executed = [ &a, &b ].iter()
    .filter( |r| matches!( r.outcome, LifecycleOutcome::Executed { .. } ) )
    .count();
  assert_eq!( executed, 1, "exactly one proposal may execute: {:?} {:?}", a.outcome, b.outcome );

  // The loser either compensated to rejected or was held on capacity
  let loser = [ &a, &b ].into_iter()
    .find( |r| !matches!( r.outcome, LifecycleOutcome::Executed { .. } ) )
    .unwrap();
  match &loser.outcome
  {
    LifecycleOutcome::Rejected { reason } => assert_eq!( reason, "budget deduction failed" ),
    LifecycleOutcome::Held( HoldReason::BudgetUnavailable { .. } ) => {}
    other => panic!( "unexpected loser outcome: {other:?}" ),
  }

  let budget = w.ledger.get( &budget.id ).await.unwrap().unwrap();
  assert_eq!( budget.used_amount, dec( "80" ) );
}

#[ tokio::test ]
async fn primary_outage_serves_via_secondary_with_fallback_record()
{
  let w = world( true ).await;
  let ( agent, _budget ) = scenario_agent( &w ).await;

  let result = w.orchestrator
    .process_new( proposal_for( &agent, &w.owner, "100" ) )
    .await.unwrap();

  assert_eq!( result.proposal.status, ProposalStatus::Executed );
  match &result.outcome
  {
    LifecycleOutcome::Executed { served_by, .. } => assert_eq!( *served_by, ServedBy::Secondary ),
    other => panic!( "expected executed, got {other:?}" ),
  }

  let activities = w.audit_store.list_for_agent( &agent.id, 20 ).await.unwrap();
  assert!( activities.iter().any( |a| a.action == action::EXECUTION_FALLBACK ) );
}

#[ tokio::test ]
async fn breaker_opens_after_three_failures_and_skips_primary()
{
  let w = world( true ).await;
  let ( agent, _budget ) = scenario_agent( &w ).await;

  for _ in 0..3
  {
    w.orchestrator.process_new( proposal_for( &agent, &w.owner, "10" ) ).await.unwrap();
  }
  assert_eq!( w.primary.calls.load( Ordering::SeqCst ), 3 );

  // Circuit is open now: the fourth proposal never reaches the primary
  let result = w.orchestrator
    .process_new( proposal_for( &agent, &w.owner, "10" ) )
    .await.unwrap();
  assert!( matches!(
    result.outcome,
    LifecycleOutcome::Executed { served_by: ServedBy::Secondary, .. }
  ) );
  assert_eq!( w.primary.calls.load( Ordering::SeqCst ), 3 );
}

#[ tokio::test ]
async fn paused_agent_holds_new_proposals()
{
  let w = world( false ).await;
  let ( agent, _budget ) = scenario_agent( &w ).await;

  let paused = w.orchestrator.pause_all_agents( &w.owner ).await.unwrap();
  assert_eq!( paused, 1 );

  let result = w.orchestrator
    .process_new( proposal_for( &agent, &w.owner, "100" ) )
    .await.unwrap();
  assert!( matches!( result.outcome, LifecycleOutcome::Held( HoldReason::AgentNotActive ) ) );

  // agent.paused event was enqueued
  let deliveries = w.pipeline.get_deliveries( &agent.id, 20 ).await.unwrap();
  assert!( deliveries.iter().any( |d| d.event_type == "agent.paused" ) );

  // Resume keeps auto-execute off: proposals still held
  w.orchestrator.resume_all_agents( &w.owner ).await.unwrap();
  let result = w.orchestrator
    .process_new( proposal_for( &agent, &w.owner, "100" ) )
    .await.unwrap();
  assert!( matches!( result.outcome, LifecycleOutcome::Held( HoldReason::AutoExecuteDisabled ) ) );
}

#[ tokio::test ]
async fn manual_approval_executes_without_rule_check()
{
  let w = world( false ).await;
  let ( agent, budget ) = scenario_agent( &w ).await;

  // 2000 violates max_single_amount: held for the owner
  let held = w.orchestrator
    .process_new( proposal_for( &agent, &w.owner, "2000" ) )
    .await.unwrap();
  assert_eq!( held.proposal.status, ProposalStatus::Pending );

  // Owner override executes it, still debiting the budget
  let result = w.orchestrator
    .approve_and_execute( &held.proposal.id, &w.owner )
    .await.unwrap();
  assert_eq!( result.proposal.status, ProposalStatus::Executed );

  let budget = w.ledger.get( &budget.id ).await.unwrap().unwrap();
  assert_eq!( budget.used_amount, dec( "2000" ) );

  // Audit records the approval with actor owner
  let audits = w.audit_store
    .list_for_resource( "proposal", result.proposal.id.as_str() )
    .await.unwrap();
  let approval = audits.iter().find( |a| a.action == action::PROPOSAL_APPROVED ).unwrap();
  assert_eq!( approval.actor, reins_types::Actor::Owner );
}

#[ tokio::test ]
async fn manual_approval_with_insufficient_budget_compensates_to_rejected()
{
  let w = world( false ).await;
  let ( agent, _budget ) = scenario_agent( &w ).await;

  let held = w.orchestrator
    .process_new( proposal_for( &agent, &w.owner, "9000" ) )
    .await.unwrap();

  let result = w.orchestrator
    .approve_and_execute( &held.proposal.id, &w.owner )
    .await.unwrap();

  assert_eq!( result.proposal.status, ProposalStatus::Rejected );
  assert_eq!( result.proposal.error_message.as_deref(), Some( "budget deduction failed" ) );
}

#[ tokio::test ]
async fn owner_reject_is_terminal()
{
  let w = world( false ).await;
  let ( agent, _budget ) = scenario_agent( &w ).await;

  let held = w.orchestrator
    .process_new( proposal_for( &agent, &w.owner, "2000" ) )
    .await.unwrap();

  let rejected = w.orchestrator
    .reject( &held.proposal.id, &w.owner, "not this vendor" )
    .await.unwrap();
  assert_eq!( rejected.status, ProposalStatus::Rejected );
  assert_eq!( rejected.error_message.as_deref(), Some( "not this vendor" ) );

  let err = w.orchestrator
    .approve_and_execute( &held.proposal.id, &w.owner )
    .await.unwrap_err();
  assert_eq!( err.code(), "STATE" );
}

#[ tokio::test ]
async fn foreign_owner_cannot_decide()
{
  let w = world( false ).await;
  let ( agent, _budget ) = scenario_agent( &w ).await;

  let held = w.orchestrator
    .process_new( proposal_for( &agent, &w.owner, "2000" ) )
    .await.unwrap();

  let mallory = OwnerId::parse( "acct_mallory" ).unwrap();
  assert_eq!(
    w.orchestrator.approve_and_execute( &held.proposal.id, &mallory ).await.unwrap_err().code(),
    "AUTHORIZATION"
  );
  assert_eq!(
    w.orchestrator.reject( &held.proposal.id, &mallory, "x" ).await.unwrap_err().code(),
    "AUTHORIZATION"
  );
}

#[ tokio::test ]
async fn draining_a_budget_announces_depletion()
{
  let w = world( false ).await;
  let created = w.registry.create( CreateAgentInput
  {
    owner: w.owner.clone(),
    name: "drainer".into(),
    webhook_url: Some( "https://hooks.example.com/d".into() ),
    auto_execute_enabled: true,
    auto_execute_rules: None,
    rate_limit_per_minute: 60,
  } ).await.unwrap();
  let agent = created.agent;

  w.ledger.create( CreateBudgetInput
  {
    agent_id: agent.id.clone(),
    owner: w.owner.clone(),
    amount: dec( "250" ),
    token: "USDC".into(),
    chain_id: None,
    period: BudgetPeriod::Total,
  } ).await.unwrap();

  let result = w.orchestrator
    .process_new( proposal_for( &agent, &w.owner, "250" ) )
    .await.unwrap();
  assert_eq!( result.proposal.status, ProposalStatus::Executed );

  let deliveries = w.pipeline.get_deliveries( &agent.id, 20 ).await.unwrap();
  assert!( deliveries.iter().any( |d| d.event_type == "budget.depleted" ) );

  let activities = w.audit_store.list_for_agent( &agent.id, 20 ).await.unwrap();
  assert!( activities.iter().any( |a| a.action == action::BUDGET_DEPLETED ) );
}

#[ tokio::test ]
async fn budget_sweep_announces_resets()
{
  let w = world( false ).await;
  let ( agent, _budget ) = scenario_agent( &w ).await;

  // Monthly budget from Jun 1 ends Jul 1; jump past it and sweep
  w.clock.set( Utc.with_ymd_and_hms( 2026, 7, 2, 0, 0, 0 ).unwrap() );

  let swept = w.orchestrator.sweep_budgets().await.unwrap();
  assert_eq!( swept, 1 );

  let deliveries = w.pipeline.get_deliveries( &agent.id, 20 ).await.unwrap();
  assert!( deliveries.iter().any( |d| d.event_type == "budget.reset" ) );
}
