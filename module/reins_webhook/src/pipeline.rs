//! Webhook delivery pipeline

use crate::delivery::{ DeliveryStatus, WebhookDelivery, MAX_ATTEMPTS, RETRY_DELAYS_SECS };
use crate::signer::{ Envelope, WebhookSigner };
use crate::store::DeliveryStore;
use crate::transport::{ WebhookRequest, WebhookTransport };
use reins_exec::BreakerRegistry;
use reins_registry::{ Agent, AgentStore };
use reins_types::{ AgentId, Clock, DeliveryId, Result };
use std::sync::Arc;

/// Pipeline knobs
#[ derive( Debug, Clone ) ]
pub struct PipelineConfig
{
  /// Attempt cap per delivery
  pub max_attempts: u32,
  /// Delay before attempt N, indexed by attempts already made
  pub retry_delays_secs: Vec< i64 >,
}

impl Default for PipelineConfig
{
  fn default() -> Self
  {
    Self
    {
      max_attempts: MAX_ATTEMPTS,
      retry_delays_secs: RETRY_DELAYS_SECS.to_vec(),
    }
  }
}

/// Signs, dispatches and retries webhook deliveries
///
/// The envelope (and therefore the signature) is frozen at enqueue time;
/// the endpoint URL and secret are resolved fresh on every attempt so a
/// rotation between retries takes effect immediately.
#[ derive( Debug ) ]
pub struct WebhookPipeline
{
  agents: Arc< dyn AgentStore >,
  store: Arc< dyn DeliveryStore >,
  transport: Arc< dyn WebhookTransport >,
  breakers: Arc< BreakerRegistry >,
  signer: WebhookSigner,
  clock: Arc< dyn Clock >,
  config: PipelineConfig,
}

impl WebhookPipeline
{
  /// Create pipeline over its seams
  pub fn new(
    agents: Arc< dyn AgentStore >,
    store: Arc< dyn DeliveryStore >,
    transport: Arc< dyn WebhookTransport >,
    breakers: Arc< BreakerRegistry >,
    clock: Arc< dyn Clock >,
    config: PipelineConfig,
  ) -> Self
  {
    Self
    {
      agents,
      store,
      transport,
      breakers,
      signer: WebhookSigner::new(),
      clock,
      config,
    }
  }

  /// Enqueue one event for an agent
  ///
  /// Returns `None` when the agent has no webhook endpoint configured.
  /// The first attempt is due immediately; dispatch happens in
  /// [`Self::process_due`].
  pub async fn trigger(
    &self,
    agent: &Agent,
    event_type: &str,
    data: serde_json::Value,
  ) -> Result< Option< DeliveryId > >
  {
    if agent.webhook_url.is_none() || agent.webhook_secret.is_none()
    {
      return Ok( None );
    }

    let now = self.clock.now();
    let now_ms = now.timestamp_millis();
    let id = DeliveryId::generate();
    let envelope = Envelope::new( event_type, data, now, &id );

    let delivery = WebhookDelivery
    {
      id: id.clone(),
      agent_id: agent.id.clone(),
      event_type: event_type.to_string(),
      payload: envelope.to_body(),
      status: DeliveryStatus::Pending,
      attempts: 0,
      last_attempt_at: None,
      next_retry_at: Some( now_ms + self.delay_ms( 0 ) ),
      response_status: None,
      error_message: None,
      created_at: now_ms,
      updated_at: now_ms,
    };

    self.store.insert( &delivery ).await?;
    tracing::debug!( delivery_id = %id, event_type, agent_id = %agent.id, "Webhook enqueued" );

    Ok( Some( id ) )
  }

  /// Attempt every due delivery once; returns the number attempted
  ///
  /// Safe to run from multiple instances: a delivery is attempted only by
  /// the scanner whose claim succeeded.
  pub async fn process_due( &self, limit: u32 ) -> Result< u64 >
  {
    let now_ms = self.clock.now_ms();
    let due = self.store.due_ids( now_ms, limit ).await?;

    let mut attempted = 0;
    for id in due
    {
      if self.attempt_one( &id ).await?
      {
        attempted += 1;
      }
    }

    Ok( attempted )
  }

  /// Recent deliveries for an agent
  pub async fn get_deliveries(
    &self,
    agent_id: &AgentId,
    limit: u32,
  ) -> Result< Vec< WebhookDelivery > >
  {
    self.store.list_for_agent( agent_id, limit ).await
  }

  /// One attempt for one delivery; `true` when an attempt was made
  async fn attempt_one( &self, id: &DeliveryId ) -> Result< bool >
  {
    let Some( delivery ) = self.store.get( id ).await? else
    {
      return Ok( false );
    };
    if delivery.status.is_terminal()
    {
      return Ok( false );
    }

    let now_ms = self.clock.now_ms();

    // Endpoint is resolved fresh per attempt
    let target = match self.agents.get( &delivery.agent_id ).await?
    {
      Some( agent ) => match ( agent.webhook_url.clone(), agent.webhook_secret.clone() )
      {
        ( Some( url ), Some( secret ) ) => Some( ( url, secret ) ),
        _ => None,
      },
      None => None,
    };
    let Some( ( url, secret ) ) = target else
    {
      self.store.mark_failed( id, None, "webhook endpoint removed", now_ms ).await?;
      return Ok( true );
    };

    // Per-host breaker gate: an open circuit defers without burning an attempt
    let breaker = self.breakers.get( &format!( "webhook:{}", host_of( &url ) ) );
    if let Err( open ) = breaker.check()
    {
      let wait_ms = breaker.time_until_retry()
        .map_or( 1_000, |d| i64::try_from( d.as_millis() ).unwrap_or( 1_000 ) );
      self.store.defer( id, now_ms + wait_ms, now_ms ).await?;
      tracing::debug!( delivery_id = %id, %open, "Delivery deferred behind open breaker" );
      return Ok( false );
    }

    if !self.store.claim( id, now_ms ).await?
    {
      // Another scanner won the row
      return Ok( false );
    }

    // Re-read after the claim: the attempt counter is authoritative there
    let Some( claimed ) = self.store.get( id ).await? else
    {
      return Ok( false );
    };
    let attempts_now = claimed.attempts;

    let request = WebhookRequest
    {
      url,
      body: claimed.payload.clone(),
      signature: self.signer.sign( claimed.payload.as_bytes(), &secret ),
      timestamp: now_ms / 1_000,
      event_type: claimed.event_type.clone(),
      delivery_id: claimed.id.as_str().to_string(),
    };

    match self.transport.deliver( &request ).await
    {
      Ok( status ) if ( 200..300 ).contains( &status ) =>
      {
        breaker.record_success();
        self.store.mark_delivered( id, status, self.clock.now_ms() ).await?;
        reins_telemetry::log_delivery_attempt( id.as_str(), attempts_now, "delivered" );
      }
      Ok( status ) =>
      {
        breaker.record_failure();
        self.handle_failure(
          id,
          attempts_now,
          Some( status ),
          &format!( "endpoint returned {status}" ),
        ).await?;
      }
      Err( error ) =>
      {
        breaker.record_failure();
        self.handle_failure( id, attempts_now, None, &error.to_string() ).await?;
      }
    }

    Ok( true )
  }

  async fn handle_failure(
    &self,
    id: &DeliveryId,
    attempts_now: u32,
    response_status: Option< u16 >,
    error: &str,
  ) -> Result< () >
  {
    let now_ms = self.clock.now_ms();

    if attempts_now >= self.config.max_attempts
    {
      self.store.mark_failed( id, response_status, error, now_ms ).await?;
      reins_telemetry::log_delivery_attempt( id.as_str(), attempts_now, "failed" );
    }
    else
    {
      let next = now_ms + self.delay_ms( attempts_now );
      self.store.mark_retrying( id, next, response_status, error, now_ms ).await?;
      reins_telemetry::log_delivery_attempt( id.as_str(), attempts_now, "retrying" );
    }

    Ok( () )
  }

  fn delay_ms( &self, attempts_made: u32 ) -> i64
  {
    let index = attempts_made as usize;
    self.config.retry_delays_secs
      .get( index )
      .copied()
      .unwrap_or_else( || *self.config.retry_delays_secs.last().unwrap_or( &300 ) )
      * 1_000
  }
}

/// Host (and port) portion of an URL, for per-host breaker keys
fn host_of( url: &str ) -> &str
{
  let after_scheme = url.find( "//" ).map_or( url, |i| &url[ i + 2.. ] );
  after_scheme.split( '/' ).next().unwrap_or( after_scheme )
}

#[ cfg( test ) ]
mod tests
{
  use super::*;

  #[ test ]
  fn host_extraction()
  {
    assert_eq!( host_of( "https://hooks.example.com/a/b" ), "hooks.example.com" );
    assert_eq!( host_of( "http://localhost:8080/hook" ), "localhost:8080" );
    assert_eq!( host_of( "hooks.example.com/x" ), "hooks.example.com" );
  }
}
