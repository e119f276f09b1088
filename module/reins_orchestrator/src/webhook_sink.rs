//! Adapter publishing proposal lifecycle events through the webhook pipeline

use reins_proposal::{ Proposal, ProposalEventSink };
use reins_registry::AgentStore;
use reins_types::Result;
use reins_webhook::WebhookPipeline;
use std::sync::Arc;

/// Bridges the state machine's event seam onto webhook deliveries
#[ derive( Debug ) ]
pub struct WebhookEventSink
{
  agents: Arc< dyn AgentStore >,
  pipeline: Arc< WebhookPipeline >,
}

impl WebhookEventSink
{
  /// Create sink
  pub fn new( agents: Arc< dyn AgentStore >, pipeline: Arc< WebhookPipeline > ) -> Self
  {
    Self { agents, pipeline }
  }
}

/// Event-specific payload for proposal lifecycle events
pub fn proposal_payload( proposal: &Proposal ) -> serde_json::Value
{
  serde_json::json!( {
    "proposal_id": proposal.id.as_str(),
    "agent_id": proposal.agent_id.as_str(),
    "recipient": proposal.recipient,
    "amount": proposal.amount.to_string(),
    "token": proposal.token,
    "chain_id": proposal.chain_id,
    "status": proposal.status.as_str(),
    "tx_hash": proposal.tx_hash,
    "error_message": proposal.error_message,
  } )
}

#[ async_trait::async_trait ]
impl ProposalEventSink for WebhookEventSink
{
  async fn publish( &self, proposal: &Proposal, event_type: &str ) -> Result< () >
  {
    let Some( agent ) = self.agents.get( &proposal.agent_id ).await? else
    {
      return Ok( () );
    };

    self.pipeline.trigger( &agent, event_type, proposal_payload( proposal ) ).await?;
    Ok( () )
  }
}
