//! Owner-facing analytics derived from the activity feed

use crate::sink::ActivitySink;
use reins_types::{ AgentId, Result };
use serde::Serialize;

/// Per-agent activity rollup
#[ derive( Debug, Clone, Serialize ) ]
pub struct ActivitySummary
{
  /// Agent the summary covers
  pub agent_id: AgentId,
  /// Total recorded activities
  pub total: i64,
  /// Executed payment count
  pub payments_executed: i64,
  /// Failed payment count
  pub payments_failed: i64,
  /// Proposal count (created)
  pub proposals_created: i64,
  /// (action, count) pairs for everything else
  pub by_action: Vec< ( String, i64 ) >,
}

impl ActivitySummary
{
  /// Build a summary from the activity feed
  ///
  /// # Errors
  ///
  /// Propagates sink query failures
  pub async fn build( sink: &dyn ActivitySink, agent_id: &AgentId ) -> Result< Self >
  {
    let by_action = sink.count_by_action( agent_id ).await?;

    let lookup = |action: &str| -> i64
    {
      by_action.iter()
        .find( |( a, _ )| a == action )
        .map_or( 0, |( _, n )| *n )
    };

    Ok( Self
    {
      agent_id: agent_id.clone(),
      total: by_action.iter().map( |( _, n )| *n ).sum(),
      payments_executed: lookup( crate::entry::action::PAYMENT_EXECUTED ),
      payments_failed: lookup( crate::entry::action::PAYMENT_FAILED ),
      proposals_created: lookup( crate::entry::action::PROPOSAL_CREATED ),
      by_action,
    } )
  }
}
