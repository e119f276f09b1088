//! # `reins_rules`
//!
//! Evaluates a proposed payment against an agent's auto-execute rules.
//!
//! Every configured dimension is checked and every violation is collected;
//! the outcome never short-circuits on the first failure, so owners see
//! the complete list. An agent without rules passes everything.
//!
//! The daily ceiling sums the amounts of this agent's `executed` proposals
//! decided since UTC midnight, across all chains.

#![cfg_attr(not(feature = "enabled"), allow(unused))]

use chrono::NaiveTime;
use reins_proposal::{ NewProposal, ProposalStore };
use reins_registry::Agent;
use reins_types::{ Clock, Result };
use rust_decimal::Decimal;
use std::sync::Arc;

/// Result of a rule evaluation
#[ derive( Debug, Clone ) ]
pub struct RuleOutcome
{
  /// True when no violation was found
  pub passed: bool,
  /// Every violated rule, human-readable and machine-listable
  pub violations: Vec< String >,
}

impl RuleOutcome
{
  fn pass() -> Self
  {
    Self { passed: true, violations: Vec::new() }
  }
}

/// Rule engine over the proposal history
#[ derive( Debug, Clone ) ]
pub struct RuleEngine
{
  proposals: Arc< dyn ProposalStore >,
  clock: Arc< dyn Clock >,
}

impl RuleEngine
{
  /// Create engine over the proposal store
  pub fn new( proposals: Arc< dyn ProposalStore >, clock: Arc< dyn Clock > ) -> Self
  {
    Self { proposals, clock }
  }

  /// Evaluate a candidate proposal against the agent's rules
  ///
  /// Accumulates all violations; rule order does not affect the outcome.
  ///
  /// # Errors
  ///
  /// Propagates storage failures from the daily-sum query.
  pub async fn check( &self, agent: &Agent, candidate: &NewProposal ) -> Result< RuleOutcome >
  {
    let Some( rules ) = &agent.auto_execute_rules else
    {
      return Ok( RuleOutcome::pass() );
    };

    let mut violations = Vec::new();

    if let Some( max_single ) = rules.max_single_amount
    {
      if candidate.amount > max_single
      {
        violations.push( format!(
          "Amount {} exceeds max single amount {}",
          candidate.amount, max_single
        ) );
      }
    }

    if !rules.token_allowed( &candidate.token )
    {
      violations.push( format!( "Token {} not in allowed tokens", candidate.token ) );
    }

    if !rules.recipient_allowed( &candidate.recipient )
    {
      violations.push( format!( "Recipient {} not in allowed recipients", candidate.recipient ) );
    }

    if !rules.chain_allowed( candidate.chain_id )
    {
      violations.push( format!( "Chain {} not in allowed chains", candidate.chain_id ) );
    }

    if let Some( max_daily ) = rules.max_daily_amount
    {
      let spent_today = self.executed_today( agent ).await?;
      if spent_today + candidate.amount > max_daily
      {
        violations.push( format!(
          "Daily spend {} would exceed max daily amount {}",
          spent_today + candidate.amount, max_daily
        ) );
      }
    }

    if !violations.is_empty()
    {
      tracing::debug!(
        agent_id = %agent.id,
        violations = violations.len(),
        "Auto-execute rules rejected proposal"
      );
    }

    Ok( RuleOutcome
    {
      passed: violations.is_empty(),
      violations,
    } )
  }

  /// Whether the agent still has daily headroom (no candidate amount)
  pub async fn within_daily_limit( &self, agent: &Agent ) -> Result< bool >
  {
    let Some( rules ) = &agent.auto_execute_rules else
    {
      return Ok( true );
    };
    let Some( max_daily ) = rules.max_daily_amount else
    {
      return Ok( true );
    };

    Ok( self.executed_today( agent ).await? < max_daily )
  }

  async fn executed_today( &self, agent: &Agent ) -> Result< Decimal >
  {
    let now = self.clock.now();
    let midnight = now
      .date_naive()
      .and_time( NaiveTime::MIN )
      .and_utc();

    self.proposals
      .sum_executed_amount_since( &agent.id, midnight.timestamp_millis() )
      .await
  }
}

#[ cfg( test ) ]
mod tests
{
  use super::*;
  use chrono::TimeZone;
  use reins_proposal::MemoryProposalStore;
  use reins_registry::{ AgentStatus, AutoExecuteRules };
  use reins_types::{ AgentId, ManualClock, OwnerId };
  use std::str::FromStr;

  fn dec( s: &str ) -> Decimal
  {
    Decimal::from_str( s ).unwrap()
  }

  fn agent_with_rules( rules: Option< AutoExecuteRules > ) -> Agent
  {
    Agent
    {
      id: AgentId::generate(),
      owner: OwnerId::parse( "acct_1" ).unwrap(),
      name: "bot".into(),
      status: AgentStatus::Active,
      api_key_hash: String::new(),
      api_key_prefix: String::new(),
      webhook_url: None,
      webhook_secret: None,
      webhook_secret_hash: None,
      auto_execute_enabled: true,
      auto_execute_rules: rules,
      rate_limit_per_minute: 60,
      last_active_at: None,
      created_at: 0,
      updated_at: 0,
    }
  }

  fn candidate( amount: &str, token: &str, chain: u64, recipient: &str ) -> NewProposal
  {
    NewProposal
    {
      agent_id: AgentId::generate(),
      owner: OwnerId::parse( "acct_1" ).unwrap(),
      recipient: recipient.into(),
      amount: dec( amount ),
      token: token.into(),
      chain_id: chain,
      reason: None,
    }
  }

  fn engine() -> RuleEngine
  {
    let start = chrono::Utc.with_ymd_and_hms( 2026, 3, 1, 12, 0, 0 ).unwrap();
    RuleEngine::new(
      Arc::new( MemoryProposalStore::new() ),
      Arc::new( ManualClock::new( start ) ),
    )
  }

  #[ tokio::test ]
  async fn no_rules_means_all_pass()
  {
    let engine = engine();
    let agent = agent_with_rules( None );
    let outcome = engine.check( &agent, &candidate( "1000000", "ANY", 99, "0x0" ) ).await.unwrap();
    assert!( outcome.passed );
    assert!( outcome.violations.is_empty() );
  }

  #[ tokio::test ]
  async fn single_amount_ceiling_message_is_exact()
  {
    let engine = engine();
    let agent = agent_with_rules( Some( AutoExecuteRules
    {
      max_single_amount: Some( dec( "1000" ) ),
      allowed_tokens: Some( vec![ "USDC".into() ] ),
      ..Default::default()
    } ) );

    let outcome = engine.check( &agent, &candidate( "2000", "USDC", 1, "0x0" ) ).await.unwrap();
    assert!( !outcome.passed );
    assert_eq!( outcome.violations, vec![ "Amount 2000 exceeds max single amount 1000".to_string() ] );
  }

  #[ tokio::test ]
  async fn all_violations_accumulate()
  {
    let engine = engine();
    let agent = agent_with_rules( Some( AutoExecuteRules
    {
      max_single_amount: Some( dec( "100" ) ),
      allowed_tokens: Some( vec![ "USDC".into() ] ),
      allowed_recipients: Some( vec![ "0xAAAA".into() ] ),
      allowed_chains: Some( vec![ 1 ] ),
      ..Default::default()
    } ) );

    let outcome = engine.check( &agent, &candidate( "500", "WETH", 10, "0xBBBB" ) ).await.unwrap();
    assert!( !outcome.passed );
    assert_eq!( outcome.violations.len(), 4 );
  }

  #[ tokio::test ]
  async fn membership_checks_ignore_case()
  {
    let engine = engine();
    let agent = agent_with_rules( Some( AutoExecuteRules
    {
      allowed_tokens: Some( vec![ "USDC".into() ] ),
      allowed_recipients: Some( vec![ "0xAbCd".into() ] ),
      ..Default::default()
    } ) );

    let outcome = engine.check( &agent, &candidate( "10", "usdc", 1, "0xABCD" ) ).await.unwrap();
    assert!( outcome.passed, "{:?}", outcome.violations );
  }

  #[ tokio::test ]
  async fn daily_ceiling_counts_todays_executions()
  {
    let start = chrono::Utc.with_ymd_and_hms( 2026, 3, 1, 12, 0, 0 ).unwrap();
    let store = Arc::new( MemoryProposalStore::new() );
    let clock = Arc::new( ManualClock::new( start ) );
    let engine = RuleEngine::new( store.clone(), clock.clone() );

    let agent = agent_with_rules( Some( AutoExecuteRules
    {
      max_daily_amount: Some( dec( "1000" ) ),
      ..Default::default()
    } ) );

    // 800 executed this morning, 300 executed yesterday (must not count)
    let mut today = reins_proposal::Proposal
    {
      id: reins_types::ProposalId::generate(),
      agent_id: agent.id.clone(),
      owner: agent.owner.clone(),
      recipient: "0x0".into(),
      amount: dec( "800" ),
      token: "USDC".into(),
      chain_id: 1,
      reason: None,
      budget_id: None,
      status: reins_proposal::ProposalStatus::Executed,
      tx_hash: Some( "0x1".into() ),
      error_message: None,
      created_at: 0,
      updated_at: 0,
      decided_at: Some( start.timestamp_millis() - 3_600_000 ),
      executed_at: Some( start.timestamp_millis() - 3_500_000 ),
    };
    store.insert( &today ).await.unwrap();

    today.id = reins_types::ProposalId::generate();
    today.amount = dec( "300" );
    today.decided_at = Some( start.timestamp_millis() - 86_400_000 );
    store.insert( &today ).await.unwrap();

    // 800 + 250 > 1000: violation
    let outcome = engine.check( &agent, &candidate( "250", "USDC", 1, "0x0" ) ).await.unwrap();
    assert!( !outcome.passed );
    assert_eq!( outcome.violations, vec![
      "Daily spend 1050 would exceed max daily amount 1000".to_string()
    ] );

    // 800 + 200 == 1000: at the ceiling, allowed
    let outcome = engine.check( &agent, &candidate( "200", "USDC", 1, "0x0" ) ).await.unwrap();
    assert!( outcome.passed );

    assert!( engine.within_daily_limit( &agent ).await.unwrap() );
  }

  #[ tokio::test ]
  async fn boundary_amount_is_allowed()
  {
    let engine = engine();
    let agent = agent_with_rules( Some( AutoExecuteRules
    {
      max_single_amount: Some( dec( "1000" ) ),
      ..Default::default()
    } ) );

    // Exactly at the ceiling passes; one cent over fails
    assert!( engine.check( &agent, &candidate( "1000", "USDC", 1, "0x0" ) ).await.unwrap().passed );
    assert!( !engine.check( &agent, &candidate( "1000.01", "USDC", 1, "0x0" ) ).await.unwrap().passed );
  }
}
