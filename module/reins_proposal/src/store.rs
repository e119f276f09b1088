//! Proposal persistence seam

use crate::proposal::{ Proposal, ProposalStatus };
use reins_types::{ AgentId, BudgetId, OwnerId, ProposalId, Result };
use rust_decimal::Decimal;

/// Fields written together with a status change
///
/// `cas_transition` applies these atomically with the new status, so a
/// proposal can never be observed `executed` without its `tx_hash`.
#[ derive( Debug, Clone, Default ) ]
pub struct TransitionFields
{
  /// Budget chosen at approval time
  pub budget_id: Option< BudgetId >,
  /// Transaction hash (executed)
  pub tx_hash: Option< String >,
  /// Failure error or rejection reason
  pub error_message: Option< String >,
  /// Approval/rejection instant
  pub decided_at: Option< i64 >,
  /// Execution completion instant
  pub executed_at: Option< i64 >,
}

/// Proposal persistence operations
#[ async_trait::async_trait ]
pub trait ProposalStore: Send + Sync + std::fmt::Debug
{
  /// Insert a freshly created proposal
  async fn insert( &self, proposal: &Proposal ) -> Result< () >;

  /// Fetch by id
  async fn get( &self, id: &ProposalId ) -> Result< Option< Proposal > >;

  /// Proposals of an agent, newest first
  async fn list_for_agent( &self, agent_id: &AgentId, limit: u32 ) -> Result< Vec< Proposal > >;

  /// Proposals across an owner's agents, newest first
  async fn list_for_owner( &self, owner: &OwnerId, limit: u32 ) -> Result< Vec< Proposal > >;

  /// Atomically move `id` from `from` to `to`, writing `fields` with it
  ///
  /// Returns `true` when this caller performed the transition; `false`
  /// means the proposal was not in `from` anymore.
  async fn cas_transition(
    &self,
    id: &ProposalId,
    from: ProposalStatus,
    to: ProposalStatus,
    fields: &TransitionFields,
    at_ms: i64,
  ) -> Result< bool >;

  /// Sum of amounts of `executed` proposals decided at or after `since_ms`
  async fn sum_executed_amount_since( &self, agent_id: &AgentId, since_ms: i64 ) -> Result< Decimal >;
}
