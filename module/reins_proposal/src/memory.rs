//! In-memory proposal store for tests

use crate::proposal::{ Proposal, ProposalStatus };
use crate::store::{ ProposalStore, TransitionFields };
use reins_types::{ AgentId, OwnerId, ProposalId, Result };
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// In-memory proposal store
#[ derive( Debug, Default ) ]
pub struct MemoryProposalStore
{
  inner: Mutex< Inner >,
}

#[ derive( Debug, Default ) ]
struct Inner
{
  by_id: HashMap< ProposalId, Proposal >,
  insertion_order: Vec< ProposalId >,
}

impl MemoryProposalStore
{
  /// Create empty store
  pub fn new() -> Self
  {
    Self::default()
  }
}

#[ async_trait::async_trait ]
impl ProposalStore for MemoryProposalStore
{
  async fn insert( &self, proposal: &Proposal ) -> Result< () >
  {
    let mut inner = self.inner.lock().await;
    inner.insertion_order.push( proposal.id.clone() );
    inner.by_id.insert( proposal.id.clone(), proposal.clone() );
    Ok( () )
  }

  async fn get( &self, id: &ProposalId ) -> Result< Option< Proposal > >
  {
    Ok( self.inner.lock().await.by_id.get( id ).cloned() )
  }

  async fn list_for_agent( &self, agent_id: &AgentId, limit: u32 ) -> Result< Vec< Proposal > >
  {
    let inner = self.inner.lock().await;
    Ok(
      inner.insertion_order.iter()
        .rev()
        .filter_map( |id| inner.by_id.get( id ) )
        .filter( |proposal| &proposal.agent_id == agent_id )
        .take( limit as usize )
        .cloned()
        .collect()
    )
  }

  async fn list_for_owner( &self, owner: &OwnerId, limit: u32 ) -> Result< Vec< Proposal > >
  {
    let inner = self.inner.lock().await;
    Ok(
      inner.insertion_order.iter()
        .rev()
        .filter_map( |id| inner.by_id.get( id ) )
        .filter( |proposal| &proposal.owner == owner )
        .take( limit as usize )
        .cloned()
        .collect()
    )
  }

  async fn cas_transition(
    &self,
    id: &ProposalId,
    from: ProposalStatus,
    to: ProposalStatus,
    fields: &TransitionFields,
    at_ms: i64,
  ) -> Result< bool >
  {
    let mut inner = self.inner.lock().await;
    let Some( proposal ) = inner.by_id.get_mut( id ) else
    {
      return Ok( false );
    };

    if proposal.status != from
    {
      return Ok( false );
    }

    proposal.status = to;
    if let Some( budget_id ) = &fields.budget_id
    {
      proposal.budget_id = Some( budget_id.clone() );
    }
    if let Some( tx_hash ) = &fields.tx_hash
    {
      proposal.tx_hash = Some( tx_hash.clone() );
    }
    if let Some( error ) = &fields.error_message
    {
      proposal.error_message = Some( error.clone() );
    }
    if let Some( decided_at ) = fields.decided_at
    {
      proposal.decided_at = Some( decided_at );
    }
    if let Some( executed_at ) = fields.executed_at
    {
      proposal.executed_at = Some( executed_at );
    }
    proposal.updated_at = at_ms;

    Ok( true )
  }

  async fn sum_executed_amount_since( &self, agent_id: &AgentId, since_ms: i64 ) -> Result< Decimal >
  {
    let inner = self.inner.lock().await;
    Ok(
      inner.by_id.values()
        .filter( |p| &p.agent_id == agent_id
          && p.status == ProposalStatus::Executed
          && p.decided_at.is_some_and( |d| d >= since_ms ) )
        .map( |p| p.amount )
        .sum()
    )
  }
}
