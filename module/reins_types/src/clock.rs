//! Clock seam
//!
//! Components never call `Utc::now()` directly; they take a `Clock` so
//! period rollover and breaker timing can be driven deterministically in
//! tests.

use chrono::{ DateTime, Duration, Utc };
use std::sync::Mutex;

/// Source of the current instant
pub trait Clock: Send + Sync + std::fmt::Debug
{
  /// Current instant in UTC
  fn now( &self ) -> DateTime< Utc >;

  /// Current instant as epoch milliseconds
  fn now_ms( &self ) -> i64
  {
    self.now().timestamp_millis()
  }
}

/// Wall-clock implementation used in production
#[ derive( Debug, Clone, Copy, Default ) ]
pub struct SystemClock;

impl Clock for SystemClock
{
  fn now( &self ) -> DateTime< Utc >
  {
    Utc::now()
  }
}

/// Manually-advanced clock for tests
#[ derive( Debug ) ]
pub struct ManualClock
{
  now: Mutex< DateTime< Utc > >,
}

impl ManualClock
{
  /// Create a manual clock frozen at the given instant
  pub fn new( start: DateTime< Utc > ) -> Self
  {
    Self { now: Mutex::new( start ) }
  }

  /// Move the clock forward
  pub fn advance( &self, by: Duration )
  {
    let mut now = self.now.lock().unwrap();
    *now += by;
  }

  /// Jump the clock to an absolute instant
  pub fn set( &self, to: DateTime< Utc > )
  {
    *self.now.lock().unwrap() = to;
  }
}

impl Clock for ManualClock
{
  fn now( &self ) -> DateTime< Utc >
  {
    *self.now.lock().unwrap()
  }
}

#[ cfg( test ) ]
mod tests
{
  use super::*;
  use chrono::TimeZone;

  #[ test ]
  fn manual_clock_advances()
  {
    let start = Utc.with_ymd_and_hms( 2026, 1, 31, 12, 0, 0 ).unwrap();
    let clock = ManualClock::new( start );
    assert_eq!( clock.now(), start );

    clock.advance( Duration::seconds( 90 ) );
    assert_eq!( clock.now(), start + Duration::seconds( 90 ) );
  }
}
