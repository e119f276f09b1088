//! In-memory budget store for tests

use crate::budget::Budget;
use crate::store::BudgetStore;
use reins_types::{ AgentId, BudgetId, Result };
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// In-memory budget store
///
/// One mutex serializes every mutation, which trivially satisfies the
/// compare-and-swap contract.
#[ derive( Debug, Default ) ]
pub struct MemoryBudgetStore
{
  inner: Mutex< Inner >,
}

#[ derive( Debug, Default ) ]
struct Inner
{
  by_id: HashMap< BudgetId, Budget >,
  insertion_order: Vec< BudgetId >,
}

impl MemoryBudgetStore
{
  /// Create empty store
  pub fn new() -> Self
  {
    Self::default()
  }
}

#[ async_trait::async_trait ]
impl BudgetStore for MemoryBudgetStore
{
  async fn insert( &self, budget: &Budget ) -> Result< () >
  {
    let mut inner = self.inner.lock().await;
    inner.insertion_order.push( budget.id.clone() );
    inner.by_id.insert( budget.id.clone(), budget.clone() );
    Ok( () )
  }

  async fn get( &self, id: &BudgetId ) -> Result< Option< Budget > >
  {
    Ok( self.inner.lock().await.by_id.get( id ).cloned() )
  }

  async fn list_for_agent( &self, agent_id: &AgentId ) -> Result< Vec< Budget > >
  {
    let inner = self.inner.lock().await;
    Ok(
      inner.insertion_order.iter()
        .rev()
        .filter_map( |id| inner.by_id.get( id ) )
        .filter( |budget| &budget.agent_id == agent_id )
        .cloned()
        .collect()
    )
  }

  async fn cas_amounts(
    &self,
    id: &BudgetId,
    expected_used: Decimal,
    expected_remaining: Decimal,
    new_used: Decimal,
    new_remaining: Decimal,
    at_ms: i64,
  ) -> Result< bool >
  {
    let mut inner = self.inner.lock().await;
    let Some( budget ) = inner.by_id.get_mut( id ) else
    {
      return Ok( false );
    };

    if budget.used_amount != expected_used || budget.remaining_amount != expected_remaining
    {
      return Ok( false );
    }

    budget.used_amount = new_used;
    budget.remaining_amount = new_remaining;
    budget.updated_at = at_ms;
    Ok( true )
  }

  async fn cas_allocation(
    &self,
    id: &BudgetId,
    expected_used: Decimal,
    expected_remaining: Decimal,
    new_amount: Decimal,
    new_remaining: Decimal,
    at_ms: i64,
  ) -> Result< bool >
  {
    let mut inner = self.inner.lock().await;
    let Some( budget ) = inner.by_id.get_mut( id ) else
    {
      return Ok( false );
    };

    if budget.used_amount != expected_used || budget.remaining_amount != expected_remaining
    {
      return Ok( false );
    }

    budget.amount = new_amount;
    budget.remaining_amount = new_remaining;
    budget.updated_at = at_ms;
    Ok( true )
  }

  async fn roll(
    &self,
    id: &BudgetId,
    expected_period_end: i64,
    new_start: i64,
    new_end: Option< i64 >,
    at_ms: i64,
  ) -> Result< bool >
  {
    let mut inner = self.inner.lock().await;
    let Some( budget ) = inner.by_id.get_mut( id ) else
    {
      return Ok( false );
    };

    if budget.period_end != Some( expected_period_end )
    {
      return Ok( false );
    }

    budget.used_amount = Decimal::ZERO;
    budget.remaining_amount = budget.amount;
    budget.period_start = new_start;
    budget.period_end = new_end;
    budget.updated_at = at_ms;
    Ok( true )
  }

  async fn list_expired( &self, now_ms: i64 ) -> Result< Vec< Budget > >
  {
    let inner = self.inner.lock().await;
    Ok(
      inner.by_id.values()
        .filter( |budget| budget.is_expired( now_ms ) )
        .cloned()
        .collect()
    )
  }

  async fn delete( &self, id: &BudgetId ) -> Result< () >
  {
    let mut inner = self.inner.lock().await;
    inner.by_id.remove( id );
    inner.insertion_order.retain( |existing| existing != id );
    Ok( () )
  }
}
