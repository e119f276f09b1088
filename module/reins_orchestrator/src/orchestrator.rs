//! Proposal lifecycle orchestration

use crate::notifier::{ notification_kind, Notifier };
use reins_audit::{ action, ActivitySink, NewActivity };
use reins_exec::{ ExecutionBridge, ExecutionRequest, ServedBy };
use reins_ledger::{ Budget, BudgetLedger };
use reins_proposal::{ event_type, NewProposal, Proposal, ProposalMachine };
use reins_registry::{ Agent, AgentRegistry, AgentStatus };
use reins_rules::RuleEngine;
use reins_types::{ Actor, Error, OwnerId, ProposalId, Result };
use reins_webhook::WebhookPipeline;
use std::sync::Arc;

/// Why a proposal stayed pending
#[ derive( Debug, Clone ) ]
pub enum HoldReason
{
  /// Agent is paused or deactivated
  AgentNotActive,
  /// Owner has not enabled auto-execution
  AutoExecuteDisabled,
  /// One or more auto-execute rules failed
  RuleViolations( Vec< String > ),
  /// No budget envelope can cover the amount
  BudgetUnavailable
  {
    remaining: String,
  },
}

/// Terminal disposition of one lifecycle pass
#[ derive( Debug, Clone ) ]
pub enum LifecycleOutcome
{
  /// Proposal awaits manual approval
  Held( HoldReason ),
  /// Payment went through
  Executed
  {
    tx_hash: String,
    served_by: ServedBy,
  },
  /// Execution was attempted and failed
  ExecutionFailed
  {
    error: String,
  },
  /// Proposal was rejected (owner decision or debit compensation)
  Rejected
  {
    reason: String,
  },
}

/// Result of one lifecycle pass
#[ derive( Debug, Clone ) ]
pub struct LifecycleResult
{
  /// The proposal in its final state for this pass
  pub proposal: Proposal,
  /// What happened
  pub outcome: LifecycleOutcome,
}

/// Composes C1-C4, C6 and C7 into the proposal lifecycle
#[ derive( Debug ) ]
pub struct Orchestrator
{
  registry: Arc< AgentRegistry >,
  ledger: Arc< BudgetLedger >,
  rules: Arc< RuleEngine >,
  machine: Arc< ProposalMachine >,
  bridge: Arc< ExecutionBridge >,
  webhooks: Arc< WebhookPipeline >,
  activity: Arc< dyn ActivitySink >,
  notifier: Arc< dyn Notifier >,
}

impl Orchestrator
{
  /// Wire the orchestrator
  #[ allow( clippy::too_many_arguments ) ]
  pub fn new(
    registry: Arc< AgentRegistry >,
    ledger: Arc< BudgetLedger >,
    rules: Arc< RuleEngine >,
    machine: Arc< ProposalMachine >,
    bridge: Arc< ExecutionBridge >,
    webhooks: Arc< WebhookPipeline >,
    activity: Arc< dyn ActivitySink >,
    notifier: Arc< dyn Notifier >,
  ) -> Self
  {
    Self { registry, ledger, rules, machine, bridge, webhooks, activity, notifier }
  }

  /// Handle a freshly submitted proposal
  ///
  /// Creates it in `pending`, announces it, then either drives it to a
  /// terminal state (auto-execute) or leaves it for the owner with a
  /// notification explaining why.
  pub async fn process_new( &self, input: NewProposal ) -> Result< LifecycleResult >
  {
    let candidate = input.clone();
    let proposal = self.machine.create( input ).await?;

    let Some( agent ) = self.registry.get( &proposal.agent_id ).await? else
    {
      return Err( Error::validation( format!( "agent not found: {}", proposal.agent_id ) ) );
    };

    if agent.status != AgentStatus::Active || !agent.auto_execute_enabled
    {
      let reason = if agent.status == AgentStatus::Active
      {
        HoldReason::AutoExecuteDisabled
      }
      else
      {
        HoldReason::AgentNotActive
      };

      self.notify( &proposal.owner, notification_kind::APPROVAL_NEEDED, serde_json::json!( {
        "proposal_id": proposal.id.as_str(),
        "amount": proposal.amount.to_string(),
        "token": proposal.token,
      } ) ).await;

      return Ok( LifecycleResult { proposal, outcome: LifecycleOutcome::Held( reason ) } );
    }

    let rule_outcome = self.rules.check( &agent, &candidate ).await?;
    if !rule_outcome.passed
    {
      self.notify( &proposal.owner, notification_kind::RULE_VIOLATION, serde_json::json!( {
        "proposal_id": proposal.id.as_str(),
        "violations": rule_outcome.violations,
      } ) ).await;

      return Ok( LifecycleResult
      {
        proposal,
        outcome: LifecycleOutcome::Held( HoldReason::RuleViolations( rule_outcome.violations ) ),
      } );
    }

    let budget = match self.ledger
      .check_availability( &agent.id, proposal.amount, &proposal.token, Some( proposal.chain_id ) )
      .await
    {
      Ok( budget ) => budget,
      Err( Error::Capacity { remaining } ) =>
      {
        self.notify( &proposal.owner, notification_kind::BUDGET_UNAVAILABLE, serde_json::json!( {
          "proposal_id": proposal.id.as_str(),
          "remaining": remaining,
        } ) ).await;

        return Ok( LifecycleResult
        {
          proposal,
          outcome: LifecycleOutcome::Held( HoldReason::BudgetUnavailable { remaining } ),
        } );
      }
      Err( other ) => return Err( other ),
    };

    self.drive_execution( &proposal.id, &agent, Actor::System, Some( budget ) ).await
  }

  /// Owner approves a pending proposal and drives execution
  ///
  /// No rule check (owner override); a matching budget envelope is still
  /// bound and debited when one exists.
  pub async fn approve_and_execute(
    &self,
    proposal_id: &ProposalId,
    owner: &OwnerId,
  ) -> Result< LifecycleResult >
  {
    let proposal = self.owned_proposal( proposal_id, owner ).await?;

    let Some( agent ) = self.registry.get( &proposal.agent_id ).await? else
    {
      return Err( Error::validation( format!( "agent not found: {}", proposal.agent_id ) ) );
    };

    let budget = self.ledger
      .find_match( &agent.id, &proposal.token, Some( proposal.chain_id ) )
      .await?;

    self.drive_execution( proposal_id, &agent, Actor::Owner, budget ).await
  }

  /// Owner rejects a pending proposal
  pub async fn reject(
    &self,
    proposal_id: &ProposalId,
    owner: &OwnerId,
    reason: &str,
  ) -> Result< Proposal >
  {
    self.owned_proposal( proposal_id, owner ).await?;
    self.machine.reject( proposal_id, Actor::Owner, reason ).await
  }

  /// Pause every active agent of an owner; announces per agent
  pub async fn pause_all_agents( &self, owner: &OwnerId ) -> Result< u64 >
  {
    let active: Vec< Agent > = self.registry.list( owner ).await?
      .into_iter()
      .filter( |agent| agent.status == AgentStatus::Active )
      .collect();

    let count = self.registry.pause_all( owner ).await?;

    for agent in active
    {
      self.announce_agent_event( &agent, event_type::AGENT_PAUSED, action::AGENT_PAUSED ).await;
    }

    Ok( count )
  }

  /// Resume every paused agent of an owner; announces per agent
  pub async fn resume_all_agents( &self, owner: &OwnerId ) -> Result< u64 >
  {
    let paused: Vec< Agent > = self.registry.list( owner ).await?
      .into_iter()
      .filter( |agent| agent.status == AgentStatus::Paused )
      .collect();

    let count = self.registry.resume_all( owner ).await?;

    for agent in paused
    {
      self.announce_agent_event( &agent, event_type::AGENT_RESUMED, action::AGENT_RESUMED ).await;
    }

    Ok( count )
  }

  /// Roll expired budgets and announce each reset
  pub async fn sweep_budgets( &self ) -> Result< u64 >
  {
    let rolled = self.ledger.reset_expired().await?;
    let count = rolled.len() as u64;

    for budget in rolled
    {
      if let Some( agent ) = self.registry.get( &budget.agent_id ).await?
      {
        let data = budget_payload( &budget );
        if let Err( error ) = self.webhooks.trigger( &agent, event_type::BUDGET_RESET, data ).await
        {
          tracing::warn!( budget_id = %budget.id, %error, "budget.reset trigger failed" );
        }

        self.record_activity(
          NewActivity::new( budget.agent_id.clone(), budget.owner.clone(), action::BUDGET_RESET )
            .with_details( budget_payload( &budget ) ),
        ).await;
      }
    }

    Ok( count )
  }

  /// Drive one due-delivery pass of the webhook pipeline
  pub async fn process_due_webhooks( &self, limit: u32 ) -> Result< u64 >
  {
    self.webhooks.process_due( limit ).await
  }

  /// Steps 6-10: approve, debit, execute, settle
  async fn drive_execution(
    &self,
    proposal_id: &ProposalId,
    agent: &Agent,
    actor: Actor,
    budget: Option< Budget >,
  ) -> Result< LifecycleResult >
  {
    let budget_id = budget.as_ref().map( |b| b.id.clone() );
    let approved = self.machine.approve( proposal_id, actor, budget_id ).await?;

    if let Some( budget ) = budget
    {
      match self.ledger.debit( &budget.id, approved.amount ).await
      {
        Ok( debited ) =>
        {
          if debited.remaining_amount.is_zero()
          {
            self.announce_budget_depleted( agent, &debited ).await;
          }
        }
        Err( error ) =>
        {
          tracing::warn!( proposal_id = %proposal_id, %error, "budget debit failed, compensating" );
          let rejected = self.machine
            .revoke_approval( proposal_id, "budget deduction failed" )
            .await?;

          return Ok( LifecycleResult
          {
            proposal: rejected,
            outcome: LifecycleOutcome::Rejected { reason: "budget deduction failed".into() },
          } );
        }
      }
    }

    let executing = self.machine.begin_execution( proposal_id ).await?;

    let request = ExecutionRequest
    {
      from: executing.agent_id.clone(),
      to: executing.recipient.clone(),
      amount: executing.amount,
      token: executing.token.clone(),
      chain_id: executing.chain_id,
      memo: executing.reason.clone(),
      owner: executing.owner.clone(),
    };

    match self.bridge.execute( &request ).await
    {
      Ok( outcome ) =>
      {
        let executed = self.machine.complete_execution( proposal_id, &outcome.tx_hash ).await?;
        Ok( LifecycleResult
        {
          proposal: executed,
          outcome: LifecycleOutcome::Executed
          {
            tx_hash: outcome.tx_hash,
            served_by: outcome.served_by,
          },
        } )
      }
      Err( error ) =>
      {
        let message = error.to_string();
        let failed = self.machine.fail_execution( proposal_id, &message ).await?;
        Ok( LifecycleResult
        {
          proposal: failed,
          outcome: LifecycleOutcome::ExecutionFailed { error: message },
        } )
      }
    }
  }

  async fn owned_proposal( &self, id: &ProposalId, owner: &OwnerId ) -> Result< Proposal >
  {
    let Some( proposal ) = self.machine.get( id ).await? else
    {
      return Err( Error::validation( format!( "proposal not found: {id}" ) ) );
    };

    if &proposal.owner != owner
    {
      return Err( Error::authorization( "owner mismatch" ) );
    }

    Ok( proposal )
  }

  async fn announce_budget_depleted( &self, agent: &Agent, budget: &Budget )
  {
    if let Err( error ) = self.webhooks
      .trigger( agent, event_type::BUDGET_DEPLETED, budget_payload( budget ) )
      .await
    {
      tracing::warn!( budget_id = %budget.id, %error, "budget.depleted trigger failed" );
    }

    self.record_activity(
      NewActivity::new( budget.agent_id.clone(), budget.owner.clone(), action::BUDGET_DEPLETED )
        .with_details( budget_payload( budget ) ),
    ).await;
  }

  async fn announce_agent_event( &self, agent: &Agent, event: &str, activity_action: &str )
  {
    let data = serde_json::json!( {
      "agent_id": agent.id.as_str(),
      "name": agent.name,
    } );

    if let Err( error ) = self.webhooks.trigger( agent, event, data.clone() ).await
    {
      tracing::warn!( agent_id = %agent.id, event, %error, "agent event trigger failed" );
    }

    self.record_activity(
      NewActivity::new( agent.id.clone(), agent.owner.clone(), activity_action )
        .with_details( data ),
    ).await;
  }

  async fn record_activity( &self, activity: NewActivity )
  {
    if let Err( error ) = self.activity.record_activity( activity ).await
    {
      tracing::warn!( %error, "activity recording failed" );
    }
  }

  /// Best-effort owner notification
  async fn notify( &self, owner: &OwnerId, kind: &str, details: serde_json::Value )
  {
    if let Err( error ) = self.notifier.notify( owner, kind, details ).await
    {
      tracing::warn!( owner = %owner, kind, %error, "notification failed" );
    }
  }
}

fn budget_payload( budget: &Budget ) -> serde_json::Value
{
  serde_json::json!( {
    "budget_id": budget.id.as_str(),
    "token": budget.token,
    "chain_id": budget.chain_id,
    "period": budget.period.as_str(),
    "amount": budget.amount.to_string(),
    "used_amount": budget.used_amount.to_string(),
    "remaining_amount": budget.remaining_amount.to_string(),
  } )
}
