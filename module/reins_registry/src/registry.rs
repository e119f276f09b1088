//! Agent registry service

use crate::agent::{ Agent, AgentStatus, AgentUpdate, CreateAgentInput, CreatedAgent };
use crate::key_generator::{ KeyGenerator, API_KEY_PREFIX };
use crate::store::AgentStore;
use reins_types::{ AgentId, Clock, Error, OwnerId, Result };
use std::sync::Arc;

/// Registry of payment agents
///
/// Owns credential issuance and status enforcement. All mutations are
/// owner-scoped; a mismatched owner is an authorization failure, never a
/// silent no-op.
#[ derive( Debug, Clone ) ]
pub struct AgentRegistry
{
  store: Arc< dyn AgentStore >,
  clock: Arc< dyn Clock >,
  generator: KeyGenerator,
}

impl AgentRegistry
{
  /// Create registry over a store
  pub fn new( store: Arc< dyn AgentStore >, clock: Arc< dyn Clock > ) -> Self
  {
    Self
    {
      store,
      clock,
      generator: KeyGenerator::new(),
    }
  }

  /// Register a new agent
  ///
  /// The returned [`CreatedAgent`] carries the API key cleartext (and the
  /// webhook secret cleartext when a URL was supplied). Neither is ever
  /// returned again.
  ///
  /// # Errors
  ///
  /// `Validation` on empty name or malformed webhook URL.
  pub async fn create( &self, input: CreateAgentInput ) -> Result< CreatedAgent >
  {
    if input.name.trim().is_empty()
    {
      return Err( Error::validation( "agent name must not be empty" ) );
    }
    if let Some( url ) = &input.webhook_url
    {
      validate_webhook_url( url )?;
    }

    let api_key = self.generator.generate_api_key();
    let ( webhook_secret, webhook_secret_hash ) = if input.webhook_url.is_some()
    {
      let secret = self.generator.generate_webhook_secret();
      let hash = self.generator.hash( &secret );
      ( Some( secret ), Some( hash ) )
    }
    else
    {
      ( None, None )
    };

    let now = self.clock.now_ms();
    let agent = Agent
    {
      id: AgentId::generate(),
      owner: input.owner,
      name: input.name,
      status: AgentStatus::Active,
      api_key_hash: self.generator.hash( &api_key ),
      api_key_prefix: self.generator.display_prefix( &api_key ),
      webhook_url: input.webhook_url,
      webhook_secret: webhook_secret.clone(),
      webhook_secret_hash,
      auto_execute_enabled: input.auto_execute_enabled,
      auto_execute_rules: input.auto_execute_rules,
      rate_limit_per_minute: input.rate_limit_per_minute,
      last_active_at: None,
      created_at: now,
      updated_at: now,
    };

    self.store.insert( &agent ).await?;
    reins_telemetry::log_agent_event( agent.id.as_str(), "created" );

    Ok( CreatedAgent { agent, api_key, webhook_secret } )
  }

  /// Fetch an agent by id
  pub async fn get( &self, id: &AgentId ) -> Result< Option< Agent > >
  {
    self.store.get( id ).await
  }

  /// All agents of an owner, newest first
  pub async fn list( &self, owner: &OwnerId ) -> Result< Vec< Agent > >
  {
    self.store.list( owner ).await
  }

  /// Number of agents an owner has registered
  pub async fn count( &self, owner: &OwnerId ) -> Result< i64 >
  {
    self.store.count( owner ).await
  }

  /// Apply a partial update on behalf of the owner
  ///
  /// # Errors
  ///
  /// `Authorization` on owner mismatch; `State` when the agent is
  /// deactivated (terminal).
  pub async fn update( &self, id: &AgentId, owner: &OwnerId, update: AgentUpdate ) -> Result< Agent >
  {
    let mut agent = self.owned_agent( id, owner ).await?;

    if agent.status == AgentStatus::Deactivated
    {
      return Err( Error::illegal_state(
        AgentStatus::Deactivated.as_str(),
        vec![ AgentStatus::Active.as_str().into(), AgentStatus::Paused.as_str().into() ],
      ) );
    }

    if let Some( name ) = update.name
    {
      if name.trim().is_empty()
      {
        return Err( Error::validation( "agent name must not be empty" ) );
      }
      agent.name = name;
    }
    if let Some( enabled ) = update.auto_execute_enabled
    {
      agent.auto_execute_enabled = enabled;
    }
    if let Some( rules ) = update.auto_execute_rules
    {
      agent.auto_execute_rules = rules;
    }
    if let Some( rate ) = update.rate_limit_per_minute
    {
      agent.rate_limit_per_minute = rate;
    }

    agent.updated_at = self.clock.now_ms();
    self.store.update( &agent ).await?;

    Ok( agent )
  }

  /// Soft-delete an agent; its API key stops validating immediately
  pub async fn deactivate( &self, id: &AgentId, owner: &OwnerId ) -> Result< Agent >
  {
    let mut agent = self.owned_agent( id, owner ).await?;

    if agent.status == AgentStatus::Deactivated
    {
      return Err( Error::illegal_state(
        AgentStatus::Deactivated.as_str(),
        vec![ AgentStatus::Active.as_str().into(), AgentStatus::Paused.as_str().into() ],
      ) );
    }

    agent.status = AgentStatus::Deactivated;
    agent.auto_execute_enabled = false;
    agent.updated_at = self.clock.now_ms();
    self.store.update( &agent ).await?;
    reins_telemetry::log_agent_event( agent.id.as_str(), "deactivated" );

    Ok( agent )
  }

  /// Authenticate an agent API key
  ///
  /// Rejects malformed keys before touching storage; rejects paused and
  /// deactivated agents with their status as the reason. On success the
  /// last-active timestamp is updated in a detached task so the request
  /// path never blocks on it.
  ///
  /// # Errors
  ///
  /// `Authorization` with reason `malformed key` / `invalid key` /
  /// `paused` / `deactivated`.
  pub async fn validate_api_key( &self, cleartext: &str ) -> Result< Agent >
  {
    if !cleartext.starts_with( API_KEY_PREFIX )
    {
      return Err( Error::authorization( "malformed key" ) );
    }

    let hash = self.generator.hash( cleartext );
    let Some( agent ) = self.store.get_by_key_hash( &hash ).await? else
    {
      return Err( Error::authorization( "invalid key" ) );
    };

    match agent.status
    {
      AgentStatus::Deactivated => return Err( Error::authorization( "deactivated" ) ),
      AgentStatus::Paused => return Err( Error::authorization( "paused" ) ),
      AgentStatus::Active => {}
    }

    // Best-effort; never blocks or fails the request
    let store = Arc::clone( &self.store );
    let id = agent.id.clone();
    let now = self.clock.now_ms();
    tokio::spawn( async move
    {
      if let Err( error ) = store.touch_last_active( &id, now ).await
      {
        tracing::debug!( agent_id = %id, %error, "touch_last_active failed" );
      }
    } );

    Ok( agent )
  }

  /// Record agent activity timestamp immediately (blocking variant)
  pub async fn touch_last_active( &self, id: &AgentId ) -> Result< () >
  {
    self.store.touch_last_active( id, self.clock.now_ms() ).await
  }

  /// Pause every active agent of an owner and force auto-execute off
  ///
  /// Returns the number of paused agents.
  pub async fn pause_all( &self, owner: &OwnerId ) -> Result< u64 >
  {
    let paused = self.store
      .set_status_all( owner, AgentStatus::Active, AgentStatus::Paused, true, self.clock.now_ms() )
      .await?;

    tracing::info!( owner = %owner, paused, "Paused all agents" );
    Ok( paused )
  }

  /// Resume every paused agent of an owner
  ///
  /// Auto-execute stays disabled; the owner must opt back in per agent.
  pub async fn resume_all( &self, owner: &OwnerId ) -> Result< u64 >
  {
    let resumed = self.store
      .set_status_all( owner, AgentStatus::Paused, AgentStatus::Active, false, self.clock.now_ms() )
      .await?;

    tracing::info!( owner = %owner, resumed, "Resumed all agents" );
    Ok( resumed )
  }

  /// Rotate the webhook endpoint, issuing a fresh secret
  ///
  /// The new secret cleartext is returned exactly once.
  pub async fn rotate_webhook(
    &self,
    id: &AgentId,
    owner: &OwnerId,
    url: String,
  ) -> Result< ( Agent, String ) >
  {
    validate_webhook_url( &url )?;

    let mut agent = self.owned_agent( id, owner ).await?;
    if agent.status == AgentStatus::Deactivated
    {
      return Err( Error::illegal_state(
        AgentStatus::Deactivated.as_str(),
        vec![ AgentStatus::Active.as_str().into(), AgentStatus::Paused.as_str().into() ],
      ) );
    }

    let secret = self.generator.generate_webhook_secret();
    agent.webhook_url = Some( url );
    agent.webhook_secret = Some( secret.clone() );
    agent.webhook_secret_hash = Some( self.generator.hash( &secret ) );
    agent.updated_at = self.clock.now_ms();
    self.store.update( &agent ).await?;

    Ok( ( agent, secret ) )
  }

  async fn owned_agent( &self, id: &AgentId, owner: &OwnerId ) -> Result< Agent >
  {
    let Some( agent ) = self.store.get( id ).await? else
    {
      return Err( Error::validation( format!( "agent not found: {id}" ) ) );
    };

    if &agent.owner != owner
    {
      return Err( Error::authorization( "owner mismatch" ) );
    }

    Ok( agent )
  }
}

fn validate_webhook_url( url: &str ) -> Result< () >
{
  if url.starts_with( "https://" ) || url.starts_with( "http://" )
  {
    Ok( () )
  }
  else
  {
    Err( Error::validation( format!( "webhook URL must be http(s): {url}" ) ) )
  }
}
