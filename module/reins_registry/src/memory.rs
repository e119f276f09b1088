//! In-memory agent store for tests

use crate::agent::{ Agent, AgentStatus };
use crate::store::AgentStore;
use reins_types::{ AgentId, OwnerId, Result };
use std::collections::HashMap;
use tokio::sync::Mutex;

/// In-memory agent store
///
/// A single mutex guards the id map and the hash index together, so status
/// changes and key-hash lookups are atomic with respect to each other.
#[ derive( Debug, Default ) ]
pub struct MemoryAgentStore
{
  inner: Mutex< Inner >,
}

#[ derive( Debug, Default ) ]
struct Inner
{
  by_id: HashMap< AgentId, Agent >,
  by_key_hash: HashMap< String, AgentId >,
  insertion_order: Vec< AgentId >,
}

impl MemoryAgentStore
{
  /// Create empty store
  pub fn new() -> Self
  {
    Self::default()
  }
}

#[ async_trait::async_trait ]
impl AgentStore for MemoryAgentStore
{
  async fn insert( &self, agent: &Agent ) -> Result< () >
  {
    let mut inner = self.inner.lock().await;
    inner.by_key_hash.insert( agent.api_key_hash.clone(), agent.id.clone() );
    inner.insertion_order.push( agent.id.clone() );
    inner.by_id.insert( agent.id.clone(), agent.clone() );
    Ok( () )
  }

  async fn get( &self, id: &AgentId ) -> Result< Option< Agent > >
  {
    Ok( self.inner.lock().await.by_id.get( id ).cloned() )
  }

  async fn get_by_key_hash( &self, key_hash: &str ) -> Result< Option< Agent > >
  {
    let inner = self.inner.lock().await;
    Ok(
      inner.by_key_hash.get( key_hash )
        .and_then( |id| inner.by_id.get( id ) )
        .cloned()
    )
  }

  async fn list( &self, owner: &OwnerId ) -> Result< Vec< Agent > >
  {
    let inner = self.inner.lock().await;
    Ok(
      inner.insertion_order.iter()
        .rev()
        .filter_map( |id| inner.by_id.get( id ) )
        .filter( |agent| &agent.owner == owner )
        .cloned()
        .collect()
    )
  }

  async fn count( &self, owner: &OwnerId ) -> Result< i64 >
  {
    let inner = self.inner.lock().await;
    Ok( inner.by_id.values().filter( |agent| &agent.owner == owner ).count() as i64 )
  }

  async fn update( &self, agent: &Agent ) -> Result< () >
  {
    let mut inner = self.inner.lock().await;
    inner.by_id.insert( agent.id.clone(), agent.clone() );
    Ok( () )
  }

  async fn set_status_all(
    &self,
    owner: &OwnerId,
    from: AgentStatus,
    to: AgentStatus,
    disable_auto_execute: bool,
    at_ms: i64,
  ) -> Result< u64 >
  {
    let mut inner = self.inner.lock().await;
    let mut changed = 0;

    for agent in inner.by_id.values_mut()
    {
      if &agent.owner == owner && agent.status == from
      {
        agent.status = to;
        if disable_auto_execute
        {
          agent.auto_execute_enabled = false;
        }
        agent.updated_at = at_ms;
        changed += 1;
      }
    }

    Ok( changed )
  }

  async fn touch_last_active( &self, id: &AgentId, at_ms: i64 ) -> Result< () >
  {
    let mut inner = self.inner.lock().await;
    if let Some( agent ) = inner.by_id.get_mut( id )
    {
      agent.last_active_at = Some( at_ms );
    }
    Ok( () )
  }
}
