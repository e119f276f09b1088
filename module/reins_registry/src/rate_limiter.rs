//! Per-agent request rate limiting
//!
//! Token bucket per agent, sized from the agent's `rate_limit_per_minute`.
//! Because the quota differs per agent, each agent gets its own direct
//! limiter, created lazily and cached.

use governor::{ Quota, RateLimiter as GovernorRateLimiter };
use governor::clock::DefaultClock;
use governor::state::{ InMemoryState, NotKeyed };
use core::num::NonZeroU32;
use dashmap::DashMap;
use reins_types::AgentId;
use std::sync::Arc;

type DirectLimiter = GovernorRateLimiter< NotKeyed, InMemoryState, DefaultClock >;

/// Per-agent token-bucket rate limiter
pub struct AgentRateLimiter
{
  limiters: DashMap< AgentId, ( u32, Arc< DirectLimiter > ) >,
}

impl std::fmt::Debug for AgentRateLimiter
{
  fn fmt( &self, f: &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
  {
    f.debug_struct( "AgentRateLimiter" )
      .field( "agents", &self.limiters.len() )
      .finish()
  }
}

impl AgentRateLimiter
{
  /// Create empty limiter registry
  pub fn new() -> Self
  {
    Self { limiters: DashMap::new() }
  }

  /// Check whether a request by this agent is within its per-minute budget
  ///
  /// A zero quota always rejects. Quota changes (owner edits
  /// `rate_limit_per_minute`) replace the cached bucket.
  pub fn check( &self, agent_id: &AgentId, per_minute: u32 ) -> bool
  {
    let Some( quota ) = NonZeroU32::new( per_minute ) else
    {
      return false;
    };

    let entry = self.limiters
      .entry( agent_id.clone() )
      .and_modify( |( cached_quota, limiter )|
      {
        if *cached_quota != per_minute
        {
          *cached_quota = per_minute;
          *limiter = Arc::new( GovernorRateLimiter::direct( Quota::per_minute( quota ) ) );
        }
      } )
      .or_insert_with( ||
      {
        ( per_minute, Arc::new( GovernorRateLimiter::direct( Quota::per_minute( quota ) ) ) )
      } );

    entry.1.check().is_ok()
  }

  /// Drop the cached bucket for an agent (deactivation cleanup)
  pub fn forget( &self, agent_id: &AgentId )
  {
    self.limiters.remove( agent_id );
  }
}

impl Default for AgentRateLimiter
{
  fn default() -> Self
  {
    Self::new()
  }
}

#[ cfg( test ) ]
mod tests
{
  use super::*;

  #[ test ]
  fn zero_quota_always_rejects()
  {
    let limiter = AgentRateLimiter::new();
    let agent = AgentId::generate();
    assert!( !limiter.check( &agent, 0 ) );
  }

  #[ test ]
  fn burst_is_bounded_by_quota()
  {
    let limiter = AgentRateLimiter::new();
    let agent = AgentId::generate();

    let mut allowed = 0;
    for _ in 0..10
    {
      if limiter.check( &agent, 5 )
      {
        allowed += 1;
      }
    }
    assert_eq!( allowed, 5 );
  }

  #[ test ]
  fn agents_do_not_share_buckets()
  {
    let limiter = AgentRateLimiter::new();
    let a = AgentId::generate();
    let b = AgentId::generate();

    for _ in 0..3
    {
      assert!( limiter.check( &a, 3 ) );
    }
    assert!( !limiter.check( &a, 3 ) );
    assert!( limiter.check( &b, 3 ), "second agent has its own bucket" );
  }

  #[ test ]
  fn quota_change_replaces_bucket()
  {
    let limiter = AgentRateLimiter::new();
    let agent = AgentId::generate();

    assert!( limiter.check( &agent, 1 ) );
    assert!( !limiter.check( &agent, 1 ) );
    // Owner raises the limit; fresh bucket applies
    assert!( limiter.check( &agent, 10 ) );
  }
}
