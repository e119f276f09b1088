//! In-memory activity/audit store for tests and composition without a database

use crate::entry::{ ActivityEntry, AuditEntry, NewActivity, NewAudit };
use crate::sink::{ ActivitySink, AuditSink };
use reins_types::{ AgentId, Clock, OwnerId, Result };
use std::sync::Arc;
use tokio::sync::Mutex;

/// Append-only in-memory store
#[ derive( Debug ) ]
pub struct MemoryAuditStore
{
  clock: Arc< dyn Clock >,
  activities: Mutex< Vec< ActivityEntry > >,
  audits: Mutex< Vec< AuditEntry > >,
}

impl MemoryAuditStore
{
  /// Create empty store
  pub fn new( clock: Arc< dyn Clock > ) -> Self
  {
    Self
    {
      clock,
      activities: Mutex::new( Vec::new() ),
      audits: Mutex::new( Vec::new() ),
    }
  }
}

#[ async_trait::async_trait ]
impl ActivitySink for MemoryAuditStore
{
  async fn record_activity( &self, activity: NewActivity ) -> Result< ActivityEntry >
  {
    let mut activities = self.activities.lock().await;
    let entry = ActivityEntry
    {
      id: activities.len() as i64 + 1,
      agent_id: activity.agent_id,
      owner: activity.owner,
      action: activity.action,
      details: activity.details,
      created_at: self.clock.now_ms(),
    };
    activities.push( entry.clone() );
    Ok( entry )
  }

  async fn list_for_agent( &self, agent_id: &AgentId, limit: u32 ) -> Result< Vec< ActivityEntry > >
  {
    let activities = self.activities.lock().await;
    Ok(
      activities.iter()
        .rev()
        .filter( |entry| &entry.agent_id == agent_id )
        .take( limit as usize )
        .cloned()
        .collect()
    )
  }

  async fn list_for_owner( &self, owner: &OwnerId, limit: u32 ) -> Result< Vec< ActivityEntry > >
  {
    let activities = self.activities.lock().await;
    Ok(
      activities.iter()
        .rev()
        .filter( |entry| &entry.owner == owner )
        .take( limit as usize )
        .cloned()
        .collect()
    )
  }

  async fn count_by_action( &self, agent_id: &AgentId ) -> Result< Vec< ( String, i64 ) > >
  {
    let activities = self.activities.lock().await;
    let mut counts = std::collections::BTreeMap::new();
    for entry in activities.iter().filter( |entry| &entry.agent_id == agent_id )
    {
      *counts.entry( entry.action.clone() ).or_insert( 0_i64 ) += 1;
    }
    Ok( counts.into_iter().collect() )
  }
}

#[ async_trait::async_trait ]
impl AuditSink for MemoryAuditStore
{
  async fn record_audit( &self, audit: NewAudit ) -> Result< AuditEntry >
  {
    let mut audits = self.audits.lock().await;
    let entry = AuditEntry
    {
      id: audits.len() as i64 + 1,
      actor: audit.actor,
      actor_id: audit.actor_id,
      resource_type: audit.resource_type,
      resource_id: audit.resource_id,
      action: audit.action,
      details: audit.details,
      created_at: self.clock.now_ms(),
    };
    audits.push( entry.clone() );
    Ok( entry )
  }

  async fn list_for_resource(
    &self,
    resource_type: &str,
    resource_id: &str,
  ) -> Result< Vec< AuditEntry > >
  {
    let audits = self.audits.lock().await;
    Ok(
      audits.iter()
        .filter( |entry| entry.resource_type == resource_type && entry.resource_id == resource_id )
        .cloned()
        .collect()
    )
  }
}
