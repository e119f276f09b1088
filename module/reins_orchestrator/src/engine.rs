//! Production composition root
//!
//! Builds the whole engine from environment configuration: one SQLite
//! pool, schemas applied, every component wired over its seams, plus the
//! periodic background worker that drives due webhook deliveries and
//! budget rollover sweeps.

use crate::notifier::{ NullNotifier, Notifier };
use crate::orchestrator::Orchestrator;
use crate::webhook_sink::WebhookEventSink;
use reins_audit::SqliteAuditStore;
use reins_config_loader::EngineConfig;
use reins_exec::{
  BreakerConfig, BreakerRegistry, ExecutionBackend, ExecutionBridge, HttpExecutionBackend,
  LocalExecutionBackend,
};
use reins_ledger::{ BudgetLedger, SqliteBudgetStore };
use reins_proposal::{ ProposalMachine, SqliteProposalStore };
use reins_registry::{ AgentRateLimiter, AgentRegistry, SqliteAgentStore };
use reins_rules::RuleEngine;
use reins_types::{ Result, SystemClock };
use reins_webhook::{ PipelineConfig, ReqwestTransport, SqliteDeliveryStore, WebhookPipeline };
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use std::time::Duration;

/// The assembled engine
#[ derive( Debug ) ]
pub struct Engine
{
  /// Proposal lifecycle orchestration
  pub orchestrator: Arc< Orchestrator >,
  /// Agent registry (authentication boundary)
  pub registry: Arc< AgentRegistry >,
  /// Budget ledger
  pub ledger: Arc< BudgetLedger >,
  /// Proposal state machine (reads)
  pub machine: Arc< ProposalMachine >,
  /// Webhook pipeline (delivery queries)
  pub webhooks: Arc< WebhookPipeline >,
  /// Per-agent request rate limiter
  pub rate_limiter: Arc< AgentRateLimiter >,
  /// Process-scoped breaker registry
  pub breakers: Arc< BreakerRegistry >,
}

impl Engine
{
  /// Build the engine from configuration with the default notifier
  ///
  /// # Errors
  ///
  /// Propagates pool connection and schema application failures.
  pub async fn from_config( config: &EngineConfig ) -> Result< Self >
  {
    Self::from_config_with_notifier( config, Arc::new( NullNotifier ) ).await
  }

  /// Build the engine from configuration and a notification provider
  pub async fn from_config_with_notifier(
    config: &EngineConfig,
    notifier: Arc< dyn Notifier >,
  ) -> Result< Self >
  {
    let pool = SqlitePoolOptions::new()
      .max_connections( 5 )
      .connect( &config.database_url )
      .await?;

    SqliteAgentStore::apply_schema( &pool ).await?;
    SqliteBudgetStore::apply_schema( &pool ).await?;
    SqliteProposalStore::apply_schema( &pool ).await?;
    SqliteDeliveryStore::apply_schema( &pool ).await?;
    SqliteAuditStore::apply_schema( &pool ).await?;

    let clock = Arc::new( SystemClock );

    let agents_store = Arc::new( SqliteAgentStore::from_pool( pool.clone() ) );
    let registry = Arc::new( AgentRegistry::new( agents_store.clone(), clock.clone() ) );

    let ledger = Arc::new( BudgetLedger::new(
      Arc::new( SqliteBudgetStore::from_pool( pool.clone() ) ),
      clock.clone(),
    ) );

    let audit_store = Arc::new( SqliteAuditStore::from_pool( pool.clone(), clock.clone() ) );

    let breakers = Arc::new( BreakerRegistry::new( BreakerConfig
    {
      failure_threshold: config.breaker.failure_threshold,
      success_threshold: config.breaker.success_threshold,
      open_timeout: Duration::from_secs( config.breaker.open_timeout_secs ),
      reset_timeout: Duration::from_secs( config.breaker.reset_timeout_secs ),
    } ) );

    let transport = Arc::new( ReqwestTransport::new(
      Duration::from_secs( config.webhook_timeout_secs )
    )? );
    let webhooks = Arc::new( WebhookPipeline::new(
      agents_store.clone(),
      Arc::new( SqliteDeliveryStore::from_pool( pool.clone() ) ),
      transport,
      breakers.clone(),
      clock.clone(),
      PipelineConfig
      {
        max_attempts: config.webhook_max_attempts,
        ..Default::default()
      },
    ) );

    let proposal_store = Arc::new( SqliteProposalStore::from_pool( pool.clone() ) );
    let machine = Arc::new( ProposalMachine::new(
      proposal_store.clone(),
      audit_store.clone(),
      audit_store.clone(),
      Arc::new( WebhookEventSink::new( agents_store.clone(), webhooks.clone() ) ),
      clock.clone(),
    ) );

    let rules = Arc::new( RuleEngine::new( proposal_store, clock.clone() ) );

    let primary: Option< Arc< dyn ExecutionBackend > > = match &config.primary_exec_url
    {
      Some( url ) => Some( Arc::new( HttpExecutionBackend::new(
        url.clone(),
        Duration::from_secs( config.exec_timeout_secs ),
      )? ) ),
      None => None,
    };
    let bridge = Arc::new( ExecutionBridge::new(
      primary,
      Arc::new( LocalExecutionBackend::new() ),
      breakers.clone(),
      audit_store.clone(),
    ) );

    let orchestrator = Arc::new( Orchestrator::new(
      registry.clone(),
      ledger.clone(),
      rules,
      machine.clone(),
      bridge,
      webhooks.clone(),
      audit_store,
      notifier,
    ) );

    Ok( Self
    {
      orchestrator,
      registry,
      ledger,
      machine,
      webhooks,
      rate_limiter: Arc::new( AgentRateLimiter::new() ),
      breakers,
    } )
  }

  /// Spawn the periodic background worker
  ///
  /// Scans for due webhook deliveries and rolls expired budgets on the
  /// given interval. Aborts when the returned handle is dropped or
  /// aborted; errors are logged and the loop continues.
  pub fn spawn_worker( &self, interval: Duration ) -> tokio::task::JoinHandle< () >
  {
    let orchestrator = Arc::clone( &self.orchestrator );

    tokio::spawn( async move
    {
      let mut ticker = tokio::time::interval( interval );
      ticker.set_missed_tick_behavior( tokio::time::MissedTickBehavior::Delay );

      loop
      {
        ticker.tick().await;

        match orchestrator.process_due_webhooks( 100 ).await
        {
          Ok( attempted ) if attempted > 0 =>
          {
            tracing::debug!( attempted, "Webhook scan pass" );
          }
          Ok( _ ) => {}
          Err( error ) =>
          {
            tracing::warn!( %error, "Webhook scan failed" );
          }
        }

        if let Err( error ) = orchestrator.sweep_budgets().await
        {
          tracing::warn!( %error, "Budget sweep failed" );
        }
      }
    } )
  }
}
