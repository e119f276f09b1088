//! Transition event publication seam
//!
//! The state machine publishes at most one event per transition through
//! this seam; the webhook pipeline implements it at composition time.
//! Event publication failures are logged by the machine and never fail
//! the transition.

use crate::proposal::{ Proposal, ProposalStatus };
use reins_types::Result;

/// Webhook event type names
pub mod event_type
{
  pub const PROPOSAL_CREATED: &str = "proposal.created";
  pub const PROPOSAL_APPROVED: &str = "proposal.approved";
  pub const PROPOSAL_REJECTED: &str = "proposal.rejected";
  pub const PAYMENT_EXECUTING: &str = "payment.executing";
  pub const PAYMENT_EXECUTED: &str = "payment.executed";
  pub const PAYMENT_FAILED: &str = "payment.failed";
  pub const BUDGET_DEPLETED: &str = "budget.depleted";
  pub const BUDGET_RESET: &str = "budget.reset";
  pub const AGENT_PAUSED: &str = "agent.paused";
  pub const AGENT_RESUMED: &str = "agent.resumed";
}

/// Event type announced when a proposal reaches `status`
pub fn event_for_status( status: ProposalStatus ) -> Option< &'static str >
{
  match status
  {
    ProposalStatus::Pending => None,
    ProposalStatus::Approved => Some( event_type::PROPOSAL_APPROVED ),
    ProposalStatus::Rejected => Some( event_type::PROPOSAL_REJECTED ),
    ProposalStatus::Executing => Some( event_type::PAYMENT_EXECUTING ),
    ProposalStatus::Executed => Some( event_type::PAYMENT_EXECUTED ),
    ProposalStatus::Failed => Some( event_type::PAYMENT_FAILED ),
  }
}

/// Receives proposal lifecycle events
#[ async_trait::async_trait ]
pub trait ProposalEventSink: Send + Sync + std::fmt::Debug
{
  /// Publish one lifecycle event for a proposal
  async fn publish( &self, proposal: &Proposal, event_type: &str ) -> Result< () >;
}

/// Sink that drops every event; for tests and webhook-less composition
#[ derive( Debug, Default, Clone ) ]
pub struct NullEventSink;

#[ async_trait::async_trait ]
impl ProposalEventSink for NullEventSink
{
  async fn publish( &self, _proposal: &Proposal, _event_type: &str ) -> Result< () >
  {
    Ok( () )
  }
}
