//! Integration tests for the webhook delivery pipeline

use chrono::{ Duration, TimeZone, Utc };
use reins_exec::{ BreakerConfig, BreakerRegistry };
use reins_registry::{ AgentRegistry, CreateAgentInput, MemoryAgentStore };
use reins_types::{ Clock, Error, ManualClock, OwnerId, Result };
use reins_webhook::{
  DeliveryStatus, MemoryDeliveryStore, PipelineConfig, WebhookPipeline, WebhookRequest,
  WebhookSigner, WebhookTransport,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Transport with scripted responses that records every request
#[ derive( Debug, Default ) ]
struct MockTransport
{
  responses: Mutex< VecDeque< std::result::Result< u16, String > > >,
  requests: Mutex< Vec< WebhookRequest > >,
}

impl MockTransport
{
  async fn script( &self, responses: Vec< std::result::Result< u16, String > > )
  {
    *self.responses.lock().await = responses.into();
  }

  async fn recorded( &self ) -> Vec< WebhookRequest >
  {
    self.requests.lock().await.clone()
  }
}

#[ async_trait::async_trait ]
impl WebhookTransport for MockTransport
{
  async fn deliver( &self, request: &WebhookRequest ) -> Result< u16 >
  {
    self.requests.lock().await.push( request.clone() );
    match self.responses.lock().await.pop_front()
    {
      Some( Ok( status ) ) => Ok( status ),
      Some( Err( message ) ) => Err( Error::transient( message, None ) ),
      None => Ok( 200 ),
    }
  }
}

struct Harness
{
  pipeline: WebhookPipeline,
  transport: Arc< MockTransport >,
  clock: Arc< ManualClock >,
  breakers: Arc< BreakerRegistry >,
  agent: reins_registry::Agent,
}

async fn harness() -> Harness
{
  let start = Utc.with_ymd_and_hms( 2026, 6, 1, 9, 0, 0 ).unwrap();
  let clock = Arc::new( ManualClock::new( start ) );
  let agents = Arc::new( MemoryAgentStore::new() );

  let registry = AgentRegistry::new( agents.clone(), clock.clone() );
  let created = registry.create( CreateAgentInput
  {
    owner: OwnerId::parse( "acct_1" ).unwrap(),
    name: "bot".into(),
    webhook_url: Some( "https://hooks.example.com/agent".into() ),
    auto_execute_enabled: false,
    auto_execute_rules: None,
    rate_limit_per_minute: 60,
  } ).await.unwrap();

  let transport = Arc::new( MockTransport::default() );
  let breakers = Arc::new( BreakerRegistry::new( BreakerConfig::default() ) );
  let pipeline = WebhookPipeline::new(
    agents,
    Arc::new( MemoryDeliveryStore::new() ),
    transport.clone(),
    breakers.clone(),
    clock.clone(),
    PipelineConfig::default(),
  );

  Harness { pipeline, transport, clock, breakers, agent: created.agent }
}

#[ tokio::test ]
async fn trigger_enqueues_with_immediate_first_attempt()
{
  let h = harness().await;

  let id = h.pipeline
    .trigger( &h.agent, "proposal.created", serde_json::json!( { "amount": "250" } ) )
    .await.unwrap()
    .expect( "agent has an endpoint" );

  let deliveries = h.pipeline.get_deliveries( &h.agent.id, 10 ).await.unwrap();
  assert_eq!( deliveries.len(), 1 );
  assert_eq!( deliveries[ 0 ].id, id );
  assert_eq!( deliveries[ 0 ].status, DeliveryStatus::Pending );
  assert_eq!( deliveries[ 0 ].attempts, 0 );
  assert_eq!( deliveries[ 0 ].next_retry_at, Some( h.clock.now_ms() ) );
}

#[ tokio::test ]
async fn trigger_without_endpoint_is_a_noop()
{
  let h = harness().await;
  let mut bare = h.agent.clone();
  bare.webhook_url = None;
  bare.webhook_secret = None;

  let id = h.pipeline
    .trigger( &bare, "proposal.created", serde_json::json!( {} ) )
    .await.unwrap();
  assert!( id.is_none() );
}

#[ tokio::test ]
async fn successful_delivery_is_signed_and_marked()
{
  let h = harness().await;
  h.transport.script( vec![ Ok( 200 ) ] ).await;

  let id = h.pipeline
    .trigger( &h.agent, "payment.executed", serde_json::json!( { "tx_hash": "0xabc" } ) )
    .await.unwrap().unwrap();

  let attempted = h.pipeline.process_due( 10 ).await.unwrap();
  assert_eq!( attempted, 1 );

  let delivery = h.pipeline.get_deliveries( &h.agent.id, 10 ).await.unwrap().remove( 0 );
  assert_eq!( delivery.status, DeliveryStatus::Delivered );
  assert_eq!( delivery.attempts, 1 );
  assert_eq!( delivery.response_status, Some( 200 ) );

  let requests = h.transport.recorded().await;
  assert_eq!( requests.len(), 1 );
  let request = &requests[ 0 ];

  assert_eq!( request.url, "https://hooks.example.com/agent" );
  assert_eq!( request.delivery_id, id.as_str() );
  assert_eq!( request.event_type, "payment.executed" );

  // Body is the fixed-order envelope
  assert!( request.body.starts_with( "{\"event\":\"payment.executed\",\"data\":" ) );
  assert!( request.body.contains( "\"timestamp\":\"2026-06-01T09:00:00Z\"" ) );

  // Signature verifies over the raw body with the agent's secret
  let signer = WebhookSigner::new();
  let secret = h.agent.webhook_secret.as_deref().unwrap();
  assert!( signer.verify( request.body.as_bytes(), &request.signature, secret ) );
}

#[ tokio::test ]
async fn retry_schedule_matches_contract()
{
  let h = harness().await;
  h.transport.script( vec![ Ok( 500 ), Ok( 500 ), Ok( 200 ) ] ).await;

  h.pipeline
    .trigger( &h.agent, "payment.executed", serde_json::json!( {} ) )
    .await.unwrap().unwrap();
  let t0 = h.clock.now_ms();

  // Attempt 1 at t=0 fails: next due a minute later
  assert_eq!( h.pipeline.process_due( 10 ).await.unwrap(), 1 );
  let delivery = h.pipeline.get_deliveries( &h.agent.id, 10 ).await.unwrap().remove( 0 );
  assert_eq!( delivery.status, DeliveryStatus::Retrying );
  assert_eq!( delivery.attempts, 1 );
  assert_eq!( delivery.next_retry_at, Some( t0 + 60_000 ) );

  // Not due yet: nothing is attempted
  assert_eq!( h.pipeline.process_due( 10 ).await.unwrap(), 0 );

  // Attempt 2 at t=+60 fails: next due five minutes later
  h.clock.advance( Duration::seconds( 60 ) );
  assert_eq!( h.pipeline.process_due( 10 ).await.unwrap(), 1 );
  let delivery = h.pipeline.get_deliveries( &h.agent.id, 10 ).await.unwrap().remove( 0 );
  assert_eq!( delivery.attempts, 2 );
  assert_eq!( delivery.next_retry_at, Some( t0 + 60_000 + 300_000 ) );

  // Attempt 3 at t=+360 succeeds
  h.clock.advance( Duration::seconds( 300 ) );
  assert_eq!( h.pipeline.process_due( 10 ).await.unwrap(), 1 );
  let delivery = h.pipeline.get_deliveries( &h.agent.id, 10 ).await.unwrap().remove( 0 );
  assert_eq!( delivery.status, DeliveryStatus::Delivered );
  assert_eq!( delivery.attempts, 3 );
  assert_eq!( delivery.response_status, Some( 200 ) );

  // Every attempt carried the same delivery id, body and signature
  let requests = h.transport.recorded().await;
  assert_eq!( requests.len(), 3 );
  assert_eq!( requests[ 0 ].body, requests[ 1 ].body );
  assert_eq!( requests[ 1 ].body, requests[ 2 ].body );
  assert_eq!( requests[ 0 ].signature, requests[ 1 ].signature );
  assert_eq!( requests[ 1 ].signature, requests[ 2 ].signature );
  assert_eq!( requests[ 0 ].delivery_id, requests[ 2 ].delivery_id );
}

#[ tokio::test ]
async fn attempts_exhaust_into_terminal_failure()
{
  let h = harness().await;
  h.transport.script( vec![
    Err( "connection refused".into() ),
    Ok( 503 ),
    Err( "timeout".into() ),
  ] ).await;

  h.pipeline.trigger( &h.agent, "payment.failed", serde_json::json!( {} ) ).await.unwrap().unwrap();

  h.pipeline.process_due( 10 ).await.unwrap();
  h.clock.advance( Duration::seconds( 60 ) );
  h.pipeline.process_due( 10 ).await.unwrap();
  h.clock.advance( Duration::seconds( 300 ) );
  h.pipeline.process_due( 10 ).await.unwrap();

  let delivery = h.pipeline.get_deliveries( &h.agent.id, 10 ).await.unwrap().remove( 0 );
  assert_eq!( delivery.status, DeliveryStatus::Failed );
  assert_eq!( delivery.attempts, 3 );
  assert!( delivery.next_retry_at.is_none() );
  assert!( delivery.error_message.is_some() );

  // Terminal: the scan never picks it up again
  h.clock.advance( Duration::seconds( 600 ) );
  assert_eq!( h.pipeline.process_due( 10 ).await.unwrap(), 0 );
}

#[ tokio::test ]
async fn open_breaker_defers_without_burning_attempts()
{
  let h = harness().await;

  // Trip the per-host breaker before any delivery
  let breaker = h.breakers.get( "webhook:hooks.example.com" );
  for _ in 0..3
  {
    breaker.record_failure();
  }

  h.pipeline.trigger( &h.agent, "payment.executed", serde_json::json!( {} ) ).await.unwrap().unwrap();

  let attempted = h.pipeline.process_due( 10 ).await.unwrap();
  assert_eq!( attempted, 0, "no attempt through an open circuit" );

  let delivery = h.pipeline.get_deliveries( &h.agent.id, 10 ).await.unwrap().remove( 0 );
  assert_eq!( delivery.status, DeliveryStatus::Retrying );
  assert_eq!( delivery.attempts, 0 );
  let wait = delivery.next_retry_at.unwrap() - h.clock.now_ms();
  assert!( wait > 0 && wait <= 30_000, "deferred by the breaker's retry window, got {wait}ms" );

  assert!( h.transport.recorded().await.is_empty() );
}

#[ tokio::test ]
async fn concurrent_scanners_never_double_send()
{
  let h = harness().await;
  h.transport.script( vec![ Ok( 200 ), Ok( 200 ) ] ).await;

  h.pipeline.trigger( &h.agent, "payment.executed", serde_json::json!( {} ) ).await.unwrap().unwrap();

  let ( a, b ) = tokio::join!(
    h.pipeline.process_due( 10 ),
    h.pipeline.process_due( 10 ),
  );
  assert_eq!( a.unwrap() + b.unwrap(), 1, "exactly one scanner attempts the delivery" );

  let delivery = h.pipeline.get_deliveries( &h.agent.id, 10 ).await.unwrap().remove( 0 );
  assert_eq!( delivery.attempts, 1 );
  assert_eq!( h.transport.recorded().await.len(), 1 );
}

#[ tokio::test ]
async fn endpoint_removed_mid_retry_fails_the_delivery()
{
  let h = harness().await;
  h.transport.script( vec![ Ok( 500 ) ] ).await;

  let agents = Arc::new( MemoryAgentStore::new() );
  let registry = AgentRegistry::new( agents.clone(), h.clock.clone() );
  let created = registry.create( CreateAgentInput
  {
    owner: OwnerId::parse( "acct_2" ).unwrap(),
    name: "bot2".into(),
    webhook_url: Some( "https://hooks2.example.com/x".into() ),
    auto_execute_enabled: false,
    auto_execute_rules: None,
    rate_limit_per_minute: 60,
  } ).await.unwrap();

  let pipeline = WebhookPipeline::new(
    agents.clone(),
    Arc::new( MemoryDeliveryStore::new() ),
    h.transport.clone(),
    h.breakers.clone(),
    h.clock.clone(),
    PipelineConfig::default(),
  );

  pipeline.trigger( &created.agent, "payment.executed", serde_json::json!( {} ) )
    .await.unwrap().unwrap();
  pipeline.process_due( 10 ).await.unwrap();

  // Owner removes the endpoint before the retry fires
  use reins_registry::AgentStore;
  let mut stripped = created.agent.clone();
  stripped.webhook_url = None;
  stripped.webhook_secret = None;
  agents.update( &stripped ).await.unwrap();

  h.clock.advance( Duration::seconds( 60 ) );
  pipeline.process_due( 10 ).await.unwrap();

  let delivery = pipeline.get_deliveries( &created.agent.id, 10 ).await.unwrap().remove( 0 );
  assert_eq!( delivery.status, DeliveryStatus::Failed );
  assert_eq!( delivery.error_message.as_deref(), Some( "webhook endpoint removed" ) );
}
