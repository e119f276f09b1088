//! Three-state circuit breaker

use reins_types::Error;
use std::sync::Mutex;
use std::time::{ Duration, Instant };

/// Breaker states
#[ derive( Debug, Clone, Copy, PartialEq, Eq ) ]
pub enum CircuitState
{
  /// Calls flow; failures are counted
  Closed,
  /// Calls are short-circuited until the open timeout elapses
  Open,
  /// Probe calls flow; one failure reopens, enough successes close
  HalfOpen,
}

impl CircuitState
{
  /// Stable string form for stats and log fields
  pub fn as_str( self ) -> &'static str
  {
    match self
    {
      Self::Closed => "closed",
      Self::Open => "open",
      Self::HalfOpen => "half-open",
    }
  }
}

/// Breaker thresholds and timing
#[ derive( Debug, Clone, PartialEq, Eq ) ]
pub struct BreakerConfig
{
  /// Consecutive failures that open the breaker
  pub failure_threshold: u32,
  /// Consecutive half-open successes that close it
  pub success_threshold: u32,
  /// How long the breaker stays open before probing
  pub open_timeout: Duration,
  /// Idle period in closed state after which the failure count restarts
  pub reset_timeout: Duration,
}

impl Default for BreakerConfig
{
  fn default() -> Self
  {
    Self
    {
      failure_threshold: 3,
      success_threshold: 2,
      open_timeout: Duration::from_secs( 30 ),
      reset_timeout: Duration::from_secs( 60 ),
    }
  }
}

/// Snapshot of a breaker's counters
#[ derive( Debug, Clone ) ]
pub struct BreakerStats
{
  pub state: CircuitState,
  pub failures: u32,
  pub half_open_successes: u32,
  pub time_until_retry: Option< Duration >,
}

#[ derive( Debug ) ]
struct BreakerInner
{
  state: CircuitState,
  failures: u32,
  half_open_successes: u32,
  last_failure_at: Option< Instant >,
  opened_at: Option< Instant >,
}

/// Failure-isolation state machine guarding one outbound dependency
#[ derive( Debug ) ]
pub struct CircuitBreaker
{
  name: String,
  config: BreakerConfig,
  inner: Mutex< BreakerInner >,
}

impl CircuitBreaker
{
  /// Create a closed breaker
  pub fn new( name: impl Into< String >, config: BreakerConfig ) -> Self
  {
    Self
    {
      name: name.into(),
      config,
      inner: Mutex::new( BreakerInner
      {
        state: CircuitState::Closed,
        failures: 0,
        half_open_successes: 0,
        last_failure_at: None,
        opened_at: None,
      } ),
    }
  }

  /// Service name this breaker guards
  pub fn name( &self ) -> &str
  {
    &self.name
  }

  /// Gate a call attempt
  ///
  /// Open breakers reject with a Transient error carrying the retry
  /// delay. An open breaker whose timeout has elapsed moves to half-open
  /// and lets the call through as a probe.
  pub fn check( &self ) -> Result< (), Error >
  {
    let mut inner = self.inner.lock().unwrap();

    if inner.state == CircuitState::Open
    {
      let elapsed = inner.opened_at.map_or( Duration::ZERO, |at| at.elapsed() );
      if elapsed >= self.config.open_timeout
      {
        inner.state = CircuitState::HalfOpen;
        inner.half_open_successes = 0;
        tracing::info!( breaker = %self.name, "Circuit half-open, probing" );
      }
      else
      {
        let retry_after = self.config.open_timeout - elapsed;
        return Err( Error::transient(
          format!( "circuit '{}' open", self.name ),
          Some( retry_after.as_secs().max( 1 ) ),
        ) );
      }
    }

    Ok( () )
  }

  /// Record a successful call
  pub fn record_success( &self )
  {
    let mut inner = self.inner.lock().unwrap();

    match inner.state
    {
      CircuitState::Closed =>
      {
        inner.failures = 0;
      }
      CircuitState::HalfOpen =>
      {
        inner.half_open_successes += 1;
        if inner.half_open_successes >= self.config.success_threshold
        {
          inner.state = CircuitState::Closed;
          inner.failures = 0;
          inner.half_open_successes = 0;
          inner.opened_at = None;
          tracing::info!( breaker = %self.name, "Circuit closed" );
        }
      }
      CircuitState::Open => {}
    }
  }

  /// Record a failed call
  pub fn record_failure( &self )
  {
    let mut inner = self.inner.lock().unwrap();
    let now = Instant::now();

    match inner.state
    {
      CircuitState::Closed =>
      {
        // A long quiet period means earlier failures are stale
        let stale = inner.last_failure_at
          .is_some_and( |at| at.elapsed() >= self.config.reset_timeout );
        if stale
        {
          inner.failures = 0;
        }

        inner.failures += 1;
        inner.last_failure_at = Some( now );

        if inner.failures >= self.config.failure_threshold
        {
          inner.state = CircuitState::Open;
          inner.opened_at = Some( now );
          tracing::warn!( breaker = %self.name, failures = inner.failures, "Circuit opened" );
        }
      }
      CircuitState::HalfOpen =>
      {
        inner.state = CircuitState::Open;
        inner.opened_at = Some( now );
        inner.last_failure_at = Some( now );
        inner.half_open_successes = 0;
        tracing::warn!( breaker = %self.name, "Probe failed, circuit reopened" );
      }
      CircuitState::Open =>
      {
        inner.last_failure_at = Some( now );
      }
    }
  }

  /// Current state without transitioning
  pub fn state( &self ) -> CircuitState
  {
    self.inner.lock().unwrap().state
  }

  /// Time until an open breaker admits a probe; None when not open
  pub fn time_until_retry( &self ) -> Option< Duration >
  {
    let inner = self.inner.lock().unwrap();
    if inner.state != CircuitState::Open
    {
      return None;
    }
    let elapsed = inner.opened_at.map_or( Duration::ZERO, |at| at.elapsed() );
    Some( self.config.open_timeout.saturating_sub( elapsed ) )
  }

  /// Snapshot-consistent counters
  pub fn stats( &self ) -> BreakerStats
  {
    let inner = self.inner.lock().unwrap();
    let time_until_retry = if inner.state == CircuitState::Open
    {
      let elapsed = inner.opened_at.map_or( Duration::ZERO, |at| at.elapsed() );
      Some( self.config.open_timeout.saturating_sub( elapsed ) )
    }
    else
    {
      None
    };

    BreakerStats
    {
      state: inner.state,
      failures: inner.failures,
      half_open_successes: inner.half_open_successes,
      time_until_retry,
    }
  }
}

#[ cfg( test ) ]
mod tests
{
  use super::*;

  fn fast_config() -> BreakerConfig
  {
    BreakerConfig
    {
      failure_threshold: 3,
      success_threshold: 2,
      open_timeout: Duration::from_millis( 40 ),
      reset_timeout: Duration::from_millis( 200 ),
    }
  }

  #[ test ]
  fn opens_at_failure_threshold()
  {
    let breaker = CircuitBreaker::new( "svc", fast_config() );

    breaker.record_failure();
    breaker.record_failure();
    assert_eq!( breaker.state(), CircuitState::Closed );
    assert!( breaker.check().is_ok() );

    breaker.record_failure();
    assert_eq!( breaker.state(), CircuitState::Open );
    let err = breaker.check().unwrap_err();
    assert_eq!( err.code(), "TRANSIENT" );
  }

  #[ test ]
  fn success_resets_closed_failures()
  {
    let breaker = CircuitBreaker::new( "svc", fast_config() );

    breaker.record_failure();
    breaker.record_failure();
    breaker.record_success();
    breaker.record_failure();
    breaker.record_failure();
    assert_eq!( breaker.state(), CircuitState::Closed );
  }

  #[ test ]
  fn half_open_after_timeout_then_closes_on_successes()
  {
    let breaker = CircuitBreaker::new( "svc", fast_config() );

    for _ in 0..3
    {
      breaker.record_failure();
    }
    assert_eq!( breaker.state(), CircuitState::Open );

    std::thread::sleep( Duration::from_millis( 50 ) );

    // Next gate moves to half-open and admits the probe
    assert!( breaker.check().is_ok() );
    assert_eq!( breaker.state(), CircuitState::HalfOpen );

    breaker.record_success();
    assert_eq!( breaker.state(), CircuitState::HalfOpen, "one success is not enough" );
    breaker.record_success();
    assert_eq!( breaker.state(), CircuitState::Closed );
  }

  #[ test ]
  fn half_open_failure_reopens()
  {
    let breaker = CircuitBreaker::new( "svc", fast_config() );

    for _ in 0..3
    {
      breaker.record_failure();
    }
    std::thread::sleep( Duration::from_millis( 50 ) );
    assert!( breaker.check().is_ok() );
    assert_eq!( breaker.state(), CircuitState::HalfOpen );

    breaker.record_failure();
    assert_eq!( breaker.state(), CircuitState::Open );
    assert!( breaker.check().is_err(), "clock restarted" );
  }

  #[ test ]
  fn open_rejection_carries_retry_hint()
  {
    let breaker = CircuitBreaker::new( "svc", BreakerConfig::default() );
    for _ in 0..3
    {
      breaker.record_failure();
    }

    match breaker.check().unwrap_err()
    {
      Error::Transient { retry_after_secs, .. } =>
      {
        assert!( retry_after_secs.is_some() );
        assert!( retry_after_secs.unwrap() <= 30 );
      }
      other => panic!( "expected transient, got {other:?}" ),
    }

    assert!( breaker.time_until_retry().is_some() );
  }
}
