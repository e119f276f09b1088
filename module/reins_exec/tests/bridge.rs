//! Integration tests for the execution bridge and breaker interplay

use reins_audit::{ action, ActivitySink, MemoryAuditStore };
use reins_exec::{
  BreakerConfig, BreakerRegistry, CircuitState, ExecutionBackend, ExecutionBridge,
  ExecutionReceipt, ExecutionRequest, LocalExecutionBackend, ServedBy, PRIMARY_EXEC,
};
use reins_types::{ AgentId, Error, OwnerId, Result, SystemClock };
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{ AtomicU32, Ordering };
use std::time::Duration;

/// Backend that fails its first `failures` calls, then succeeds
#[ derive( Debug ) ]
struct FlakyBackend
{
  calls: AtomicU32,
  failures: u32,
}

impl FlakyBackend
{
  fn failing_first( failures: u32 ) -> Self
  {
    Self { calls: AtomicU32::new( 0 ), failures }
  }

  fn calls( &self ) -> u32
  {
    self.calls.load( Ordering::SeqCst )
  }
}

#[ async_trait::async_trait ]
impl ExecutionBackend for FlakyBackend
{
  async fn execute( &self, _request: &ExecutionRequest ) -> Result< ExecutionReceipt >
  {
    let call = self.calls.fetch_add( 1, Ordering::SeqCst );
    if call < self.failures
    {
      Err( Error::transient( "upstream 500", None ) )
    }
    else
    {
      Ok( ExecutionReceipt { tx_hash: format!( "0xprimary{call:02}" ) } )
    }
  }

  fn name( &self ) -> &str
  {
    "primary"
  }
}

fn request() -> ExecutionRequest
{
  ExecutionRequest
  {
    from: AgentId::generate(),
    to: "0xAB".into(),
    amount: Decimal::new( 250, 0 ),
    token: "USDC".into(),
    chain_id: 1,
    memo: None,
    owner: OwnerId::parse( "acct_1" ).unwrap(),
  }
}

fn fast_breakers() -> Arc< BreakerRegistry >
{
  Arc::new( BreakerRegistry::new( BreakerConfig
  {
    failure_threshold: 3,
    success_threshold: 2,
    open_timeout: Duration::from_millis( 60 ),
    reset_timeout: Duration::from_millis( 500 ),
  } ) )
}

fn harness( primary: Arc< dyn ExecutionBackend > )
  -> ( ExecutionBridge, Arc< BreakerRegistry >, Arc< MemoryAuditStore > )
{
  let breakers = fast_breakers();
  let activity = Arc::new( MemoryAuditStore::new( Arc::new( SystemClock ) ) );
  let bridge = ExecutionBridge::new(
    Some( primary ),
    Arc::new( LocalExecutionBackend::new() ),
    breakers.clone(),
    activity.clone(),
  );
  ( bridge, breakers, activity )
}

#[ tokio::test ]
async fn healthy_primary_serves_directly()
{
  let primary = Arc::new( FlakyBackend::failing_first( 0 ) );
  let ( bridge, breakers, activity ) = harness( primary.clone() );

  let req = request();
  let outcome = bridge.execute( &req ).await.unwrap();
  assert_eq!( outcome.served_by, ServedBy::Primary );
  assert_eq!( primary.calls(), 1 );
  assert_eq!( breakers.get( PRIMARY_EXEC ).state(), CircuitState::Closed );

  // No fallback event for a primary-served payment
  let entries = activity.list_for_agent( &req.from, 10 ).await.unwrap();
  assert!( entries.is_empty() );
}

#[ tokio::test ]
async fn primary_failure_falls_back_and_records_event()
{
  let primary = Arc::new( FlakyBackend::failing_first( 100 ) );
  let ( bridge, _breakers, activity ) = harness( primary.clone() );

  let req = request();
  let outcome = bridge.execute( &req ).await.unwrap();
  assert_eq!( outcome.served_by, ServedBy::Secondary );
  assert!( outcome.tx_hash.starts_with( "0x" ) );

  let entries = activity.list_for_agent( &req.from, 10 ).await.unwrap();
  assert_eq!( entries.len(), 1 );
  assert_eq!( entries[ 0 ].action, action::EXECUTION_FALLBACK );
}

#[ tokio::test ]
async fn three_failures_open_the_circuit()
{
  let primary = Arc::new( FlakyBackend::failing_first( 100 ) );
  let ( bridge, breakers, _activity ) = harness( primary.clone() );

  for _ in 0..3
  {
    let outcome = bridge.execute( &request() ).await.unwrap();
    assert_eq!( outcome.served_by, ServedBy::Secondary );
  }
  assert_eq!( breakers.get( PRIMARY_EXEC ).state(), CircuitState::Open );
  assert_eq!( primary.calls(), 3 );

  // While open, the primary is never reached
  let outcome = bridge.execute( &request() ).await.unwrap();
  assert_eq!( outcome.served_by, ServedBy::Secondary );
  assert_eq!( primary.calls(), 3, "short-circuited call must not touch the primary" );
}

#[ tokio::test ]
async fn half_open_probe_recovers_the_primary()
{
  // Fails 3 times (opens the breaker), then succeeds
  let primary = Arc::new( FlakyBackend::failing_first( 3 ) );
  let ( bridge, breakers, _activity ) = harness( primary.clone() );

  for _ in 0..3
  {
    bridge.execute( &request() ).await.unwrap();
  }
  assert_eq!( breakers.get( PRIMARY_EXEC ).state(), CircuitState::Open );

  tokio::time::sleep( Duration::from_millis( 80 ) ).await;

  // Probe succeeds: served by primary again, breaker half-open
  let outcome = bridge.execute( &request() ).await.unwrap();
  assert_eq!( outcome.served_by, ServedBy::Primary );
  assert_eq!( breakers.get( PRIMARY_EXEC ).state(), CircuitState::HalfOpen );

  // Second success closes it
  let outcome = bridge.execute( &request() ).await.unwrap();
  assert_eq!( outcome.served_by, ServedBy::Primary );
  assert_eq!( breakers.get( PRIMARY_EXEC ).state(), CircuitState::Closed );
}

#[ tokio::test ]
async fn no_primary_configured_serves_secondary_without_fallback_event()
{
  let breakers = fast_breakers();
  let activity = Arc::new( MemoryAuditStore::new( Arc::new( SystemClock ) ) );
  let bridge = ExecutionBridge::new(
    None,
    Arc::new( LocalExecutionBackend::new() ),
    breakers,
    activity.clone(),
  );

  let req = request();
  let outcome = bridge.execute( &req ).await.unwrap();
  assert_eq!( outcome.served_by, ServedBy::Secondary );

  let entries = activity.list_for_agent( &req.from, 10 ).await.unwrap();
  assert!( entries.is_empty() );
}
