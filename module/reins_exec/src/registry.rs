//! Process-scoped breaker registry

use crate::breaker::{ BreakerConfig, BreakerStats, CircuitBreaker };
use dashmap::DashMap;
use std::sync::Arc;

/// Breaker name guarding the primary execution service
pub const PRIMARY_EXEC: &str = "primary-exec";

/// Registry of circuit breakers keyed by service name
#[ derive( Debug ) ]
pub struct BreakerRegistry
{
  config: BreakerConfig,
  breakers: DashMap< String, Arc< CircuitBreaker > >,
}

impl BreakerRegistry
{
  /// Create registry; every breaker it mints shares `config`
  pub fn new( config: BreakerConfig ) -> Self
  {
    Self
    {
      config,
      breakers: DashMap::new(),
    }
  }

  /// Fetch the breaker for a service, creating it closed on first use
  pub fn get( &self, name: &str ) -> Arc< CircuitBreaker >
  {
    self.breakers
      .entry( name.to_string() )
      .or_insert_with( || Arc::new( CircuitBreaker::new( name, self.config.clone() ) ) )
      .clone()
  }

  /// Stats snapshot per registered breaker
  pub fn stats( &self ) -> Vec< ( String, BreakerStats ) >
  {
    self.breakers.iter()
      .map( |entry| ( entry.key().clone(), entry.value().stats() ) )
      .collect()
  }

  /// Drop every breaker (teardown)
  pub fn clear( &self )
  {
    self.breakers.clear();
  }
}

#[ cfg( test ) ]
mod tests
{
  use super::*;

  #[ test ]
  fn get_returns_same_breaker_per_name()
  {
    let registry = BreakerRegistry::new( BreakerConfig::default() );
    let a = registry.get( "svc" );
    a.record_failure();

    let again = registry.get( "svc" );
    assert_eq!( again.stats().failures, 1 );

    let other = registry.get( "other" );
    assert_eq!( other.stats().failures, 0 );
  }

  #[ test ]
  fn clear_resets_everything()
  {
    let registry = BreakerRegistry::new( BreakerConfig::default() );
    registry.get( "svc" ).record_failure();
    registry.clear();
    assert_eq!( registry.get( "svc" ).stats().failures, 0 );
  }
}
