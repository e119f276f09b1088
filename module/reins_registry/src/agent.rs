//! Agent entity and auto-execute rules

use reins_types::{ AgentId, OwnerId };
use rust_decimal::Decimal;
use serde::{ Deserialize, Serialize };

/// Agent lifecycle status
#[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
#[ serde( rename_all = "snake_case" ) ]
pub enum AgentStatus
{
  /// Accepting requests and (if enabled) auto-executing
  Active,
  /// Temporarily suspended by the owner; API calls are rejected
  Paused,
  /// Soft-deleted; terminal
  Deactivated,
}

impl AgentStatus
{
  /// Stable string form used in storage
  pub fn as_str( self ) -> &'static str
  {
    match self
    {
      Self::Active => "active",
      Self::Paused => "paused",
      Self::Deactivated => "deactivated",
    }
  }
}

impl std::str::FromStr for AgentStatus
{
  type Err = String;

  fn from_str( s: &str ) -> Result< Self, Self::Err >
  {
    match s
    {
      "active" => Ok( Self::Active ),
      "paused" => Ok( Self::Paused ),
      "deactivated" => Ok( Self::Deactivated ),
      other => Err( format!( "unknown agent status: {other}" ) ),
    }
  }
}

impl std::fmt::Display for AgentStatus
{
  fn fmt( &self, f: &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
  {
    f.write_str( self.as_str() )
  }
}

/// Whitelists and ceilings gating auto-execution
///
/// Every field is optional; absence means the dimension is unconstrained.
/// Token and recipient matching is case-insensitive.
#[ derive( Debug, Clone, Default, PartialEq, Serialize, Deserialize ) ]
pub struct AutoExecuteRules
{
  /// Ceiling for any single proposal amount
  #[ serde( skip_serializing_if = "Option::is_none" ) ]
  pub max_single_amount: Option< Decimal >,
  /// Ceiling for the sum of amounts executed today
  #[ serde( skip_serializing_if = "Option::is_none" ) ]
  pub max_daily_amount: Option< Decimal >,
  /// Allowed token symbols
  #[ serde( skip_serializing_if = "Option::is_none" ) ]
  pub allowed_tokens: Option< Vec< String > >,
  /// Allowed recipient addresses
  #[ serde( skip_serializing_if = "Option::is_none" ) ]
  pub allowed_recipients: Option< Vec< String > >,
  /// Allowed chain ids
  #[ serde( skip_serializing_if = "Option::is_none" ) ]
  pub allowed_chains: Option< Vec< u64 > >,
}

impl AutoExecuteRules
{
  /// Case-insensitive token membership; no list means allowed
  pub fn token_allowed( &self, token: &str ) -> bool
  {
    match &self.allowed_tokens
    {
      None => true,
      Some( tokens ) => tokens.iter().any( |t| t.eq_ignore_ascii_case( token ) ),
    }
  }

  /// Case-insensitive recipient membership; no list means allowed
  pub fn recipient_allowed( &self, recipient: &str ) -> bool
  {
    match &self.allowed_recipients
    {
      None => true,
      Some( recipients ) => recipients.iter().any( |r| r.eq_ignore_ascii_case( recipient ) ),
    }
  }

  /// Chain membership; no list means allowed
  pub fn chain_allowed( &self, chain_id: u64 ) -> bool
  {
    match &self.allowed_chains
    {
      None => true,
      Some( chains ) => chains.contains( &chain_id ),
    }
  }
}

/// A registered payment agent
#[ derive( Debug, Clone, Serialize, Deserialize ) ]
pub struct Agent
{
  /// Entity id
  pub id: AgentId,
  /// Owning account
  pub owner: OwnerId,
  /// Display name
  pub name: String,
  /// Lifecycle status
  pub status: AgentStatus,
  /// SHA-256 hex digest of the API key; lookup path for authentication
  pub api_key_hash: String,
  /// First 12 chars of the cleartext key, for display only
  pub api_key_prefix: String,
  /// Webhook endpoint for lifecycle events
  pub webhook_url: Option< String >,
  /// Webhook signing secret (cleartext; HMAC needs it)
  #[ serde( skip_serializing ) ]
  pub webhook_secret: Option< String >,
  /// SHA-256 fingerprint of the webhook secret, for display
  pub webhook_secret_hash: Option< String >,
  /// Whether passing proposals are executed without owner approval
  pub auto_execute_enabled: bool,
  /// Optional guardrails for auto-execution
  pub auto_execute_rules: Option< AutoExecuteRules >,
  /// Request budget per minute for this agent's API key
  pub rate_limit_per_minute: u32,
  /// Last authenticated request (epoch ms)
  pub last_active_at: Option< i64 >,
  /// Epoch milliseconds
  pub created_at: i64,
  /// Epoch milliseconds
  pub updated_at: i64,
}

/// Input for agent creation
#[ derive( Debug, Clone, Deserialize ) ]
pub struct CreateAgentInput
{
  pub owner: OwnerId,
  pub name: String,
  #[ serde( default ) ]
  pub webhook_url: Option< String >,
  #[ serde( default ) ]
  pub auto_execute_enabled: bool,
  #[ serde( default ) ]
  pub auto_execute_rules: Option< AutoExecuteRules >,
  #[ serde( default = "default_rate_limit" ) ]
  pub rate_limit_per_minute: u32,
}

fn default_rate_limit() -> u32
{
  60
}

/// Partial update applied by the owner; `None` fields are left untouched
#[ derive( Debug, Clone, Default, Deserialize ) ]
pub struct AgentUpdate
{
  pub name: Option< String >,
  pub auto_execute_enabled: Option< bool >,
  pub auto_execute_rules: Option< Option< AutoExecuteRules > >,
  pub rate_limit_per_minute: Option< u32 >,
}

/// Creation result carrying the one-time cleartext secrets
#[ derive( Debug ) ]
pub struct CreatedAgent
{
  /// The persisted agent
  pub agent: Agent,
  /// API key cleartext, shown exactly once
  pub api_key: String,
  /// Webhook secret cleartext, shown exactly once (when a URL was given)
  pub webhook_secret: Option< String >,
}

#[ cfg( test ) ]
mod tests
{
  use super::*;

  #[ test ]
  fn rules_default_to_unconstrained()
  {
    let rules = AutoExecuteRules::default();
    assert!( rules.token_allowed( "USDC" ) );
    assert!( rules.recipient_allowed( "0xAB" ) );
    assert!( rules.chain_allowed( 1 ) );
  }

  #[ test ]
  fn token_match_is_case_insensitive()
  {
    let rules = AutoExecuteRules
    {
      allowed_tokens: Some( vec![ "USDC".into(), "dai".into() ] ),
      ..Default::default()
    };
    assert!( rules.token_allowed( "usdc" ) );
    assert!( rules.token_allowed( "DAI" ) );
    assert!( !rules.token_allowed( "WETH" ) );
  }

  #[ test ]
  fn chain_match_is_numeric()
  {
    let rules = AutoExecuteRules
    {
      allowed_chains: Some( vec![ 1, 8453 ] ),
      ..Default::default()
    };
    assert!( rules.chain_allowed( 8453 ) );
    assert!( !rules.chain_allowed( 10 ) );
  }

  #[ test ]
  fn rules_round_trip_as_json()
  {
    let rules = AutoExecuteRules
    {
      max_single_amount: Some( Decimal::new( 1000, 0 ) ),
      allowed_tokens: Some( vec![ "USDC".into() ] ),
      ..Default::default()
    };
    let json = serde_json::to_string( &rules ).unwrap();
    let back: AutoExecuteRules = serde_json::from_str( &json ).unwrap();
    assert_eq!( rules, back );
  }
}
