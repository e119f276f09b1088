//! Engine-wide error taxonomy
//!
//! Every fallible engine operation returns this taxonomy. Structured
//! variants carry the machine-readable details callers need: Policy errors
//! list the violations, Capacity errors carry the remaining balance, State
//! errors carry the observed and expected states.
//!
//! Storage failures preserve the underlying `sqlx::Error` instead of
//! discarding it; they surface with code `TRANSIENT` so clients may retry.

/// Engine error taxonomy
#[ derive( Debug, thiserror::Error ) ]
pub enum Error
{
  /// Bad input: missing field, malformed address, non-positive amount
  #[ error( "{0}" ) ]
  Validation( String ),

  /// Invalid, expired or paused credentials; owner mismatch
  #[ error( "{reason}" ) ]
  Authorization
  {
    reason: String,
  },

  /// Illegal state transition or unexpected entity state
  #[ error( "{message}" ) ]
  State
  {
    message: String,
    current_state: String,
    expected_states: Vec< String >,
  },

  /// Auto-execute rule violations
  #[ error( "proposal violates {} auto-execute rule(s)", violations.len() ) ]
  Policy
  {
    violations: Vec< String >,
  },

  /// Insufficient budget
  #[ error( "insufficient budget: {remaining} remaining" ) ]
  Capacity
  {
    remaining: String,
  },

  /// Execution backend failure
  #[ error( "{message}" ) ]
  Upstream
  {
    message: String,
    fallback_used: bool,
  },

  /// Breaker open, timeout, or retryable upstream response
  #[ error( "{message}" ) ]
  Transient
  {
    message: String,
    retry_after_secs: Option< u64 >,
  },

  /// Terminal failure after retry exhaustion
  #[ error( "{0}" ) ]
  Fatal( String ),

  /// Database error preserving sqlx details
  #[ error( "storage error: {0}" ) ]
  Storage( #[ from ] sqlx::Error ),
}

impl Error
{
  /// Stable machine-readable code for API responses
  pub fn code( &self ) -> &'static str
  {
    match self
    {
      Self::Validation( .. ) => "VALIDATION",
      Self::Authorization { .. } => "AUTHORIZATION",
      Self::State { .. } => "STATE",
      Self::Policy { .. } => "POLICY",
      Self::Capacity { .. } => "CAPACITY",
      Self::Upstream { .. } => "UPSTREAM",
      Self::Transient { .. } | Self::Storage( .. ) => "TRANSIENT",
      Self::Fatal( .. ) => "FATAL",
    }
  }

  /// Validation error from any displayable message
  pub fn validation( message: impl Into< String > ) -> Self
  {
    Self::Validation( message.into() )
  }

  /// Authorization error with a reason string
  pub fn authorization( reason: impl Into< String > ) -> Self
  {
    Self::Authorization { reason: reason.into() }
  }

  /// State error describing an illegal transition
  pub fn illegal_state( current: impl Into< String >, expected: Vec< String > ) -> Self
  {
    let current = current.into();
    Self::State
    {
      message: format!( "illegal from state {current}" ),
      current_state: current,
      expected_states: expected,
    }
  }

  /// Transient error with an optional retry hint
  pub fn transient( message: impl Into< String >, retry_after_secs: Option< u64 > ) -> Self
  {
    Self::Transient { message: message.into(), retry_after_secs }
  }

  /// True when the error is worth retrying
  pub fn is_retryable( &self ) -> bool
  {
    matches!( self, Self::Transient { .. } | Self::Storage( .. ) )
  }
}

/// Result alias used across the engine
pub type Result< T > = core::result::Result< T, Error >;

#[ cfg( test ) ]
mod tests
{
  use super::*;

  #[ test ]
  fn codes_are_stable()
  {
    assert_eq!( Error::validation( "bad" ).code(), "VALIDATION" );
    assert_eq!( Error::authorization( "paused" ).code(), "AUTHORIZATION" );
    assert_eq!( Error::illegal_state( "executed", vec![] ).code(), "STATE" );
    assert_eq!( Error::Policy { violations: vec![] }.code(), "POLICY" );
    assert_eq!( Error::Capacity { remaining: "0".into() }.code(), "CAPACITY" );
    assert_eq!( Error::Upstream { message: "x".into(), fallback_used: true }.code(), "UPSTREAM" );
    assert_eq!( Error::transient( "open", Some( 30 ) ).code(), "TRANSIENT" );
    assert_eq!( Error::Fatal( "done".into() ).code(), "FATAL" );
  }

  #[ test ]
  fn state_error_carries_context()
  {
    let err = Error::illegal_state( "executed", vec![ "pending".into() ] );
    match err
    {
      Error::State { current_state, expected_states, .. } =>
      {
        assert_eq!( current_state, "executed" );
        assert_eq!( expected_states, vec![ "pending".to_string() ] );
      }
      other => panic!( "unexpected variant: {other:?}" ),
    }
  }

  #[ test ]
  fn transient_is_retryable()
  {
    assert!( Error::transient( "timeout", None ).is_retryable() );
    assert!( !Error::validation( "bad" ).is_retryable() );
  }
}
