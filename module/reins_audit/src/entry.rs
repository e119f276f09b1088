//! Activity and audit record types

use reins_types::{ Actor, AgentId, OwnerId };
use serde::{ Deserialize, Serialize };

/// Action kinds recorded in the activity feed
pub mod action
{
  pub const AGENT_CREATED: &str = "agent_created";
  pub const AGENT_PAUSED: &str = "agent_paused";
  pub const AGENT_RESUMED: &str = "agent_resumed";
  pub const AGENT_DEACTIVATED: &str = "agent_deactivated";
  pub const PROPOSAL_CREATED: &str = "proposal_created";
  pub const PROPOSAL_APPROVED: &str = "proposal_approved";
  pub const PROPOSAL_REJECTED: &str = "proposal_rejected";
  pub const PAYMENT_EXECUTING: &str = "payment_executing";
  pub const PAYMENT_EXECUTED: &str = "payment_executed";
  pub const PAYMENT_FAILED: &str = "payment_failed";
  pub const BUDGET_CREATED: &str = "budget_created";
  pub const BUDGET_DEPLETED: &str = "budget_depleted";
  pub const BUDGET_RESET: &str = "budget_reset";
  pub const EXECUTION_FALLBACK: &str = "execution_fallback";
}

/// One row of the owner-facing activity feed
#[ derive( Debug, Clone, Serialize, Deserialize ) ]
pub struct ActivityEntry
{
  /// Monotonic row id
  pub id: i64,
  /// Agent the activity belongs to
  pub agent_id: AgentId,
  /// Owner of that agent (denormalized for cross-agent owner queries)
  pub owner: OwnerId,
  /// Action kind (see [`action`])
  pub action: String,
  /// Free-form structured details
  pub details: Option< serde_json::Value >,
  /// Epoch milliseconds
  pub created_at: i64,
}

/// Activity record before insertion
#[ derive( Debug, Clone ) ]
pub struct NewActivity
{
  pub agent_id: AgentId,
  pub owner: OwnerId,
  pub action: String,
  pub details: Option< serde_json::Value >,
}

impl NewActivity
{
  /// Convenience constructor without details
  pub fn new( agent_id: AgentId, owner: OwnerId, action: impl Into< String > ) -> Self
  {
    Self { agent_id, owner, action: action.into(), details: None }
  }

  /// Attach structured details
  pub fn with_details( mut self, details: serde_json::Value ) -> Self
  {
    self.details = Some( details );
    self
  }
}

/// One row of the audit log
#[ derive( Debug, Clone, Serialize, Deserialize ) ]
pub struct AuditEntry
{
  /// Monotonic row id
  pub id: i64,
  /// Acting principal kind
  pub actor: Actor,
  /// Identifier of the acting principal, when known
  pub actor_id: Option< String >,
  /// Resource kind, e.g. `proposal`, `budget`, `agent`
  pub resource_type: String,
  /// Resource identifier
  pub resource_id: String,
  /// What was done
  pub action: String,
  /// Free-form structured details
  pub details: Option< serde_json::Value >,
  /// Epoch milliseconds
  pub created_at: i64,
}

/// Audit record before insertion
#[ derive( Debug, Clone ) ]
pub struct NewAudit
{
  pub actor: Actor,
  pub actor_id: Option< String >,
  pub resource_type: String,
  pub resource_id: String,
  pub action: String,
  pub details: Option< serde_json::Value >,
}

impl NewAudit
{
  /// Convenience constructor
  pub fn new(
    actor: Actor,
    resource_type: impl Into< String >,
    resource_id: impl Into< String >,
    action: impl Into< String >,
  ) -> Self
  {
    Self
    {
      actor,
      actor_id: None,
      resource_type: resource_type.into(),
      resource_id: resource_id.into(),
      action: action.into(),
      details: None,
    }
  }

  /// Attach the acting principal's id
  pub fn by( mut self, actor_id: impl Into< String > ) -> Self
  {
    self.actor_id = Some( actor_id.into() );
    self
  }

  /// Attach structured details
  pub fn with_details( mut self, details: serde_json::Value ) -> Self
  {
    self.details = Some( details );
    self
  }
}
