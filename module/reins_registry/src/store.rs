//! Agent persistence seam

use crate::agent::{ Agent, AgentStatus };
use reins_types::{ AgentId, OwnerId, Result };

/// Agent persistence operations
///
/// `get_by_key_hash` is the authentication path; implementations must keep
/// the hash lookup consistent with status changes (a paused or deactivated
/// agent is returned with its current status in the same read).
#[ async_trait::async_trait ]
pub trait AgentStore: Send + Sync + std::fmt::Debug
{
  /// Insert a freshly created agent
  async fn insert( &self, agent: &Agent ) -> Result< () >;

  /// Fetch by entity id
  async fn get( &self, id: &AgentId ) -> Result< Option< Agent > >;

  /// Fetch by API-key digest
  async fn get_by_key_hash( &self, key_hash: &str ) -> Result< Option< Agent > >;

  /// All agents belonging to an owner, newest first
  async fn list( &self, owner: &OwnerId ) -> Result< Vec< Agent > >;

  /// Number of agents belonging to an owner (any status)
  async fn count( &self, owner: &OwnerId ) -> Result< i64 >;

  /// Persist the mutable fields of an agent (single-row update)
  async fn update( &self, agent: &Agent ) -> Result< () >;

  /// Transition every `from`-status agent of an owner to `to`
  ///
  /// When `disable_auto_execute` is set, `auto_execute_enabled` is cleared
  /// in the same statement. Returns the number of transitioned agents.
  async fn set_status_all(
    &self,
    owner: &OwnerId,
    from: AgentStatus,
    to: AgentStatus,
    disable_auto_execute: bool,
    at_ms: i64,
  ) -> Result< u64 >;

  /// Record the last authenticated request instant
  async fn touch_last_active( &self, id: &AgentId, at_ms: i64 ) -> Result< () >;
}
