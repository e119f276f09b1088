//! Proposal state machine service

use crate::event::{ event_for_status, event_type, ProposalEventSink };
use crate::proposal::{ NewProposal, Proposal, ProposalStatus };
use crate::store::{ ProposalStore, TransitionFields };
use reins_audit::{ action, ActivitySink, AuditSink, NewActivity, NewAudit };
use reins_types::{ Actor, BudgetId, Clock, Error, ProposalId, Result };
use rust_decimal::Decimal;
use std::sync::Arc;

/// Owns the proposal entity and enforces its legal transitions
///
/// Each successful transition persists the status and its companion
/// fields atomically, then emits one activity entry, one audit entry and
/// at most one lifecycle event, in that order. Emission failures are
/// logged and never fail the transition (the state change has already
/// committed).
#[ derive( Debug, Clone ) ]
pub struct ProposalMachine
{
  store: Arc< dyn ProposalStore >,
  activity: Arc< dyn ActivitySink >,
  audit: Arc< dyn AuditSink >,
  events: Arc< dyn ProposalEventSink >,
  clock: Arc< dyn Clock >,
}

impl ProposalMachine
{
  /// Create machine over its seams
  pub fn new(
    store: Arc< dyn ProposalStore >,
    activity: Arc< dyn ActivitySink >,
    audit: Arc< dyn AuditSink >,
    events: Arc< dyn ProposalEventSink >,
    clock: Arc< dyn Clock >,
  ) -> Self
  {
    Self { store, activity, audit, events, clock }
  }

  /// Create a proposal in `pending` and announce it
  ///
  /// # Errors
  ///
  /// `Validation` on non-positive amount, empty recipient or empty token.
  pub async fn create( &self, input: NewProposal ) -> Result< Proposal >
  {
    if input.amount <= Decimal::ZERO
    {
      return Err( Error::validation( "proposal amount must be positive" ) );
    }
    if input.recipient.trim().is_empty()
    {
      return Err( Error::validation( "recipient must not be empty" ) );
    }
    if input.token.trim().is_empty()
    {
      return Err( Error::validation( "token must not be empty" ) );
    }

    let now = self.clock.now_ms();
    let proposal = Proposal
    {
      id: ProposalId::generate(),
      agent_id: input.agent_id,
      owner: input.owner,
      recipient: input.recipient,
      amount: input.amount,
      token: input.token.to_uppercase(),
      chain_id: input.chain_id,
      reason: input.reason,
      budget_id: None,
      status: ProposalStatus::Pending,
      tx_hash: None,
      error_message: None,
      created_at: now,
      updated_at: now,
      decided_at: None,
      executed_at: None,
    };

    self.store.insert( &proposal ).await?;

    self.emit(
      &proposal,
      action::PROPOSAL_CREATED,
      Actor::Agent,
      Some( event_type::PROPOSAL_CREATED ),
    ).await;

    Ok( proposal )
  }

  /// Fetch by id
  pub async fn get( &self, id: &ProposalId ) -> Result< Option< Proposal > >
  {
    self.store.get( id ).await
  }

  /// Proposals of an agent, newest first
  pub async fn list_for_agent(
    &self,
    agent_id: &reins_types::AgentId,
    limit: u32,
  ) -> Result< Vec< Proposal > >
  {
    self.store.list_for_agent( agent_id, limit ).await
  }

  /// Proposals across an owner's agents, newest first
  pub async fn list_for_owner(
    &self,
    owner: &reins_types::OwnerId,
    limit: u32,
  ) -> Result< Vec< Proposal > >
  {
    self.store.list_for_owner( owner, limit ).await
  }

  /// `pending -> approved`
  ///
  /// `budget_id` records the envelope that will be debited, when one
  /// applies; it is written atomically with the approval.
  pub async fn approve(
    &self,
    id: &ProposalId,
    actor: Actor,
    budget_id: Option< BudgetId >,
  ) -> Result< Proposal >
  {
    let fields = TransitionFields
    {
      budget_id,
      decided_at: Some( self.clock.now_ms() ),
      ..Default::default()
    };
    self.transition( id, ProposalStatus::Approved, actor, fields ).await
  }

  /// `pending -> rejected`, carrying the reason
  pub async fn reject( &self, id: &ProposalId, actor: Actor, reason: &str ) -> Result< Proposal >
  {
    let fields = TransitionFields
    {
      error_message: Some( reason.to_string() ),
      decided_at: Some( self.clock.now_ms() ),
      ..Default::default()
    };
    self.transition( id, ProposalStatus::Rejected, actor, fields ).await
  }

  /// `approved -> rejected`: compensation for a failed budget debit
  ///
  /// The approval committed before the debit could fail; rolling the
  /// status forward to rejected (rather than back to pending) keeps the
  /// record truthful about what happened.
  pub async fn revoke_approval( &self, id: &ProposalId, reason: &str ) -> Result< Proposal >
  {
    let fields = TransitionFields
    {
      error_message: Some( reason.to_string() ),
      decided_at: Some( self.clock.now_ms() ),
      ..Default::default()
    };

    let won = self.store
      .cas_transition( id, ProposalStatus::Approved, ProposalStatus::Rejected, &fields, self.clock.now_ms() )
      .await?;

    if !won
    {
      let current = match self.store.get( id ).await?
      {
        Some( proposal ) => proposal.status.as_str().to_string(),
        None => return Err( Error::validation( format!( "proposal not found: {id}" ) ) ),
      };
      return Err( Error::illegal_state( current, vec![ ProposalStatus::Approved.as_str().into() ] ) );
    }

    let Some( proposal ) = self.store.get( id ).await? else
    {
      return Err( Error::Fatal( format!( "proposal vanished mid-transition: {id}" ) ) );
    };

    reins_telemetry::log_transition( id.as_str(), "approved", "rejected", Actor::System.as_str() );
    self.emit(
      &proposal,
      action::PROPOSAL_REJECTED,
      Actor::System,
      event_for_status( ProposalStatus::Rejected ),
    ).await;

    Ok( proposal )
  }

  /// `approved -> executing`; single entry into execution
  pub async fn begin_execution( &self, id: &ProposalId ) -> Result< Proposal >
  {
    self.transition( id, ProposalStatus::Executing, Actor::System, TransitionFields::default() ).await
  }

  /// `executing -> executed`, recording the transaction hash
  pub async fn complete_execution( &self, id: &ProposalId, tx_hash: &str ) -> Result< Proposal >
  {
    if tx_hash.trim().is_empty()
    {
      return Err( Error::validation( "tx_hash must not be empty" ) );
    }

    let fields = TransitionFields
    {
      tx_hash: Some( tx_hash.to_string() ),
      executed_at: Some( self.clock.now_ms() ),
      ..Default::default()
    };
    self.transition( id, ProposalStatus::Executed, Actor::System, fields ).await
  }

  /// `executing -> failed`, recording the error
  pub async fn fail_execution( &self, id: &ProposalId, error: &str ) -> Result< Proposal >
  {
    let fields = TransitionFields
    {
      error_message: Some( error.to_string() ),
      ..Default::default()
    };
    self.transition( id, ProposalStatus::Failed, Actor::System, fields ).await
  }

  async fn transition(
    &self,
    id: &ProposalId,
    to: ProposalStatus,
    actor: Actor,
    fields: TransitionFields,
  ) -> Result< Proposal >
  {
    let from = to.legal_from()
      .ok_or_else( || Error::Fatal( format!( "no legal edge into {to}" ) ) )?;

    let won = self.store
      .cas_transition( id, from, to, &fields, self.clock.now_ms() )
      .await?;

    if !won
    {
      // Lost the race or the edge was illegal; report the observed state
      let current = match self.store.get( id ).await?
      {
        Some( proposal ) => proposal.status.as_str().to_string(),
        None => return Err( Error::validation( format!( "proposal not found: {id}" ) ) ),
      };
      return Err( Error::illegal_state( current, vec![ from.as_str().into() ] ) );
    }

    let Some( proposal ) = self.store.get( id ).await? else
    {
      return Err( Error::Fatal( format!( "proposal vanished mid-transition: {id}" ) ) );
    };

    reins_telemetry::log_transition(
      id.as_str(),
      from.as_str(),
      to.as_str(),
      actor.as_str(),
    );

    self.emit( &proposal, activity_for_status( to ), actor, event_for_status( to ) ).await;

    Ok( proposal )
  }

  /// Record activity + audit + lifecycle event; failures logged only
  async fn emit(
    &self,
    proposal: &Proposal,
    activity_action: &str,
    actor: Actor,
    event: Option< &str >,
  )
  {
    let activity = NewActivity::new(
      proposal.agent_id.clone(),
      proposal.owner.clone(),
      activity_action,
    )
    .with_details( serde_json::json!( {
      "proposal_id": proposal.id.as_str(),
      "amount": proposal.amount.to_string(),
      "token": proposal.token,
      "status": proposal.status.as_str(),
    } ) );

    if let Err( error ) = self.activity.record_activity( activity ).await
    {
      tracing::warn!( proposal_id = %proposal.id, %error, "activity recording failed" );
    }

    let audit = NewAudit::new( actor, "proposal", proposal.id.as_str(), activity_action )
      .with_details( serde_json::json!( { "status": proposal.status.as_str() } ) );
    if let Err( error ) = self.audit.record_audit( audit ).await
    {
      tracing::warn!( proposal_id = %proposal.id, %error, "audit recording failed" );
    }

    if let Some( event_type ) = event
    {
      if let Err( error ) = self.events.publish( proposal, event_type ).await
      {
        tracing::warn!( proposal_id = %proposal.id, event_type, %error, "event publication failed" );
      }
    }
  }
}

fn activity_for_status( status: ProposalStatus ) -> &'static str
{
  match status
  {
    ProposalStatus::Pending => action::PROPOSAL_CREATED,
    ProposalStatus::Approved => action::PROPOSAL_APPROVED,
    ProposalStatus::Rejected => action::PROPOSAL_REJECTED,
    ProposalStatus::Executing => action::PAYMENT_EXECUTING,
    ProposalStatus::Executed => action::PAYMENT_EXECUTED,
    ProposalStatus::Failed => action::PAYMENT_FAILED,
  }
}
