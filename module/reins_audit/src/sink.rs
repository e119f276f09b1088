//! Sink seams for activity and audit recording

use crate::entry::{ ActivityEntry, AuditEntry, NewActivity, NewAudit };
use reins_types::{ AgentId, OwnerId, Result };

/// Activity feed sink
#[ async_trait::async_trait ]
pub trait ActivitySink: Send + Sync + std::fmt::Debug
{
  /// Append one activity record
  async fn record_activity( &self, activity: NewActivity ) -> Result< ActivityEntry >;

  /// Most recent activities for an agent, newest first
  async fn list_for_agent( &self, agent_id: &AgentId, limit: u32 ) -> Result< Vec< ActivityEntry > >;

  /// Most recent activities across all of an owner's agents, newest first
  async fn list_for_owner( &self, owner: &OwnerId, limit: u32 ) -> Result< Vec< ActivityEntry > >;

  /// Activity counts per action kind for one agent
  async fn count_by_action( &self, agent_id: &AgentId ) -> Result< Vec< ( String, i64 ) > >;
}

/// Audit log sink
#[ async_trait::async_trait ]
pub trait AuditSink: Send + Sync + std::fmt::Debug
{
  /// Append one audit record
  async fn record_audit( &self, audit: NewAudit ) -> Result< AuditEntry >;

  /// Audit records touching one resource, oldest first
  async fn list_for_resource(
    &self,
    resource_type: &str,
    resource_id: &str,
  ) -> Result< Vec< AuditEntry > >;
}
