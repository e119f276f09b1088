//! Proposal entity and status

use reins_types::{ AgentId, BudgetId, OwnerId, ProposalId };
use rust_decimal::Decimal;
use serde::{ Deserialize, Serialize };

/// Proposal lifecycle status
#[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
#[ serde( rename_all = "snake_case" ) ]
pub enum ProposalStatus
{
  Pending,
  Approved,
  Rejected,
  Executing,
  Executed,
  Failed,
}

impl ProposalStatus
{
  /// Stable string form used in storage
  pub fn as_str( self ) -> &'static str
  {
    match self
    {
      Self::Pending => "pending",
      Self::Approved => "approved",
      Self::Rejected => "rejected",
      Self::Executing => "executing",
      Self::Executed => "executed",
      Self::Failed => "failed",
    }
  }

  /// Whether this status admits no further transitions
  pub fn is_terminal( self ) -> bool
  {
    matches!( self, Self::Rejected | Self::Executed | Self::Failed )
  }

  /// The only status a transition to `self` may start from
  pub fn legal_from( self ) -> Option< Self >
  {
    match self
    {
      Self::Pending => None,
      Self::Approved | Self::Rejected => Some( Self::Pending ),
      Self::Executing => Some( Self::Approved ),
      Self::Executed | Self::Failed => Some( Self::Executing ),
    }
  }
}

impl std::str::FromStr for ProposalStatus
{
  type Err = String;

  fn from_str( s: &str ) -> Result< Self, Self::Err >
  {
    match s
    {
      "pending" => Ok( Self::Pending ),
      "approved" => Ok( Self::Approved ),
      "rejected" => Ok( Self::Rejected ),
      "executing" => Ok( Self::Executing ),
      "executed" => Ok( Self::Executed ),
      "failed" => Ok( Self::Failed ),
      other => Err( format!( "unknown proposal status: {other}" ) ),
    }
  }
}

impl std::fmt::Display for ProposalStatus
{
  fn fmt( &self, f: &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
  {
    f.write_str( self.as_str() )
  }
}

/// A single payment proposal
#[ derive( Debug, Clone, Serialize, Deserialize ) ]
pub struct Proposal
{
  /// Entity id
  pub id: ProposalId,
  /// Proposing agent
  pub agent_id: AgentId,
  /// Owning account
  pub owner: OwnerId,
  /// Destination address
  pub recipient: String,
  /// Payment amount
  pub amount: Decimal,
  /// Token symbol
  pub token: String,
  /// Target chain
  pub chain_id: u64,
  /// Agent-supplied justification, audit-only
  pub reason: Option< String >,
  /// Budget debited at approval time, when one applied
  pub budget_id: Option< BudgetId >,
  /// Lifecycle status
  pub status: ProposalStatus,
  /// Transaction hash; present iff `executed`
  pub tx_hash: Option< String >,
  /// Failure error or rejection reason
  pub error_message: Option< String >,
  /// Epoch milliseconds
  pub created_at: i64,
  /// Epoch milliseconds
  pub updated_at: i64,
  /// Approval/rejection instant
  pub decided_at: Option< i64 >,
  /// Execution completion instant
  pub executed_at: Option< i64 >,
}

/// Input for proposal creation
#[ derive( Debug, Clone, Deserialize ) ]
pub struct NewProposal
{
  pub agent_id: AgentId,
  pub owner: OwnerId,
  pub recipient: String,
  pub amount: Decimal,
  pub token: String,
  pub chain_id: u64,
  #[ serde( default ) ]
  pub reason: Option< String >,
}

#[ cfg( test ) ]
mod tests
{
  use super::*;

  #[ test ]
  fn terminal_states_admit_nothing()
  {
    assert!( ProposalStatus::Rejected.is_terminal() );
    assert!( ProposalStatus::Executed.is_terminal() );
    assert!( ProposalStatus::Failed.is_terminal() );
    assert!( !ProposalStatus::Pending.is_terminal() );
    assert!( !ProposalStatus::Approved.is_terminal() );
    assert!( !ProposalStatus::Executing.is_terminal() );
  }

  #[ test ]
  fn edge_set_matches_lifecycle()
  {
    assert_eq!( ProposalStatus::Approved.legal_from(), Some( ProposalStatus::Pending ) );
    assert_eq!( ProposalStatus::Rejected.legal_from(), Some( ProposalStatus::Pending ) );
    assert_eq!( ProposalStatus::Executing.legal_from(), Some( ProposalStatus::Approved ) );
    assert_eq!( ProposalStatus::Executed.legal_from(), Some( ProposalStatus::Executing ) );
    assert_eq!( ProposalStatus::Failed.legal_from(), Some( ProposalStatus::Executing ) );
    assert_eq!( ProposalStatus::Pending.legal_from(), None );
  }
}
