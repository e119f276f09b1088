//! Budget ledger service

use crate::budget::{ Budget, BudgetUtilization, CreateBudgetInput, period_end_after };
use crate::store::BudgetStore;
use chrono::{ DateTime, Utc };
use reins_types::{ AgentId, BudgetId, Clock, Error, OwnerId, Result };
use rust_decimal::Decimal;
use std::sync::Arc;

/// Period-scoped allocation and atomic debit of spending envelopes
///
/// Reads are rollover points: `get`, `list` and `check_availability` reset
/// any envelope whose period has ended before returning it.
#[ derive( Debug, Clone ) ]
pub struct BudgetLedger
{
  store: Arc< dyn BudgetStore >,
  clock: Arc< dyn Clock >,
}

impl BudgetLedger
{
  /// Create ledger over a store
  pub fn new( store: Arc< dyn BudgetStore >, clock: Arc< dyn Clock > ) -> Self
  {
    Self { store, clock }
  }

  /// Create a budget
  ///
  /// The token is uppercased; the period window starts now.
  ///
  /// # Errors
  ///
  /// `Validation` on non-positive amount or empty token.
  pub async fn create( &self, input: CreateBudgetInput ) -> Result< Budget >
  {
    if input.amount <= Decimal::ZERO
    {
      return Err( Error::validation( "budget amount must be positive" ) );
    }
    if input.token.trim().is_empty()
    {
      return Err( Error::validation( "budget token must not be empty" ) );
    }

    let now = self.clock.now();
    let now_ms = now.timestamp_millis();
    let budget = Budget
    {
      id: BudgetId::generate(),
      agent_id: input.agent_id,
      owner: input.owner,
      amount: input.amount,
      token: input.token.to_uppercase(),
      chain_id: input.chain_id,
      period: input.period,
      used_amount: Decimal::ZERO,
      remaining_amount: input.amount,
      period_start: now_ms,
      period_end: period_end_after( input.period, now ).map( |end| end.timestamp_millis() ),
      created_at: now_ms,
      updated_at: now_ms,
    };

    self.store.insert( &budget ).await?;
    Ok( budget )
  }

  /// Fetch a budget, rolling it first if its period has ended
  pub async fn get( &self, id: &BudgetId ) -> Result< Option< Budget > >
  {
    match self.store.get( id ).await?
    {
      None => Ok( None ),
      Some( budget ) => Ok( Some( self.roll_if_expired( budget ).await? ) ),
    }
  }

  /// All budgets of an agent (rolled), most recently created first
  pub async fn list( &self, agent_id: &AgentId ) -> Result< Vec< Budget > >
  {
    let mut budgets = Vec::new();
    for budget in self.store.list_for_agent( agent_id ).await?
    {
      budgets.push( self.roll_if_expired( budget ).await? );
    }
    Ok( budgets )
  }

  /// Find the envelope covering a (token, chain) request with enough balance
  ///
  /// The most recently created matching budget is selected.
  ///
  /// # Errors
  ///
  /// `Capacity` when no budget matches or the best match cannot cover the
  /// amount; `remaining` carries the matched budget's balance (zero when
  /// nothing matched).
  pub async fn check_availability(
    &self,
    agent_id: &AgentId,
    amount: Decimal,
    token: &str,
    chain_id: Option< u64 >,
  ) -> Result< Budget >
  {
    if amount <= Decimal::ZERO
    {
      return Err( Error::validation( "amount must be positive" ) );
    }

    let budgets = self.list( agent_id ).await?;
    let Some( matched ) = budgets.into_iter().find( |budget| budget.matches( token, chain_id ) ) else
    {
      return Err( Error::Capacity { remaining: Decimal::ZERO.to_string() } );
    };

    if matched.remaining_amount < amount
    {
      return Err( Error::Capacity { remaining: matched.remaining_amount.to_string() } );
    }

    Ok( matched )
  }

  /// The envelope covering a (token, chain) request, balance ignored
  ///
  /// Same selection rule as `check_availability` without the amount
  /// check; used by approval paths that bind a budget before debiting.
  pub async fn find_match(
    &self,
    agent_id: &AgentId,
    token: &str,
    chain_id: Option< u64 >,
  ) -> Result< Option< Budget > >
  {
    let budgets = self.list( agent_id ).await?;
    Ok( budgets.into_iter().find( |budget| budget.matches( token, chain_id ) ) )
  }

  /// Debit an envelope
  ///
  /// Linearizable per budget: the compare-and-swap retries on interleaved
  /// writers, and of two concurrent debits that together exceed the
  /// remaining balance exactly one succeeds.
  ///
  /// # Errors
  ///
  /// `Capacity` with the current remaining balance when it cannot cover
  /// the amount. Nothing is mutated on failure.
  pub async fn debit( &self, id: &BudgetId, amount: Decimal ) -> Result< Budget >
  {
    if amount <= Decimal::ZERO
    {
      return Err( Error::validation( "debit amount must be positive" ) );
    }

    loop
    {
      let Some( budget ) = self.get( id ).await? else
      {
        return Err( Error::validation( format!( "budget not found: {id}" ) ) );
      };

      if budget.remaining_amount < amount
      {
        return Err( Error::Capacity { remaining: budget.remaining_amount.to_string() } );
      }

      let new_used = budget.used_amount + amount;
      let new_remaining = budget.remaining_amount - amount;
      let swapped = self.store.cas_amounts(
        id,
        budget.used_amount,
        budget.remaining_amount,
        new_used,
        new_remaining,
        self.clock.now_ms(),
      ).await?;

      if swapped
      {
        if new_remaining == Decimal::ZERO
        {
          reins_telemetry::log_budget_warning(
            budget.agent_id.as_str(),
            &new_used.to_string(),
            &budget.amount.to_string(),
          );
        }

        return Ok( Budget
        {
          used_amount: new_used,
          remaining_amount: new_remaining,
          ..budget
        } );
      }
      // Lost the race; re-read and retry
    }
  }

  /// Change the allocation, preserving spend
  ///
  /// `remaining` becomes `new_amount - used`.
  ///
  /// # Errors
  ///
  /// `Validation` when the new amount is below what is already spent;
  /// `Authorization` on owner mismatch.
  pub async fn update_amount(
    &self,
    id: &BudgetId,
    owner: &OwnerId,
    new_amount: Decimal,
  ) -> Result< Budget >
  {
    if new_amount <= Decimal::ZERO
    {
      return Err( Error::validation( "budget amount must be positive" ) );
    }

    loop
    {
      let budget = self.owned_budget( id, owner ).await?;

      if new_amount < budget.used_amount
      {
        return Err( Error::validation( format!(
          "new amount {new_amount} is below the {} already spent this period",
          budget.used_amount
        ) ) );
      }

      let new_remaining = new_amount - budget.used_amount;
      let swapped = self.store.cas_allocation(
        id,
        budget.used_amount,
        budget.remaining_amount,
        new_amount,
        new_remaining,
        self.clock.now_ms(),
      ).await?;

      if swapped
      {
        return Ok( Budget
        {
          amount: new_amount,
          remaining_amount: new_remaining,
          ..budget
        } );
      }
    }
  }

  /// Delete an envelope
  pub async fn delete( &self, id: &BudgetId, owner: &OwnerId ) -> Result< () >
  {
    self.owned_budget( id, owner ).await?;
    self.store.delete( id ).await
  }

  /// Roll every expired budget now; returns the rolled envelopes
  ///
  /// Intended for a periodic sweep so `budget.reset` events fire promptly
  /// even without reads. Safe to run concurrently with readers: the roll
  /// is guarded by the old period end.
  pub async fn reset_expired( &self ) -> Result< Vec< Budget > >
  {
    let now = self.clock.now();
    let mut rolled = Vec::new();

    for budget in self.store.list_expired( now.timestamp_millis() ).await?
    {
      let Some( old_end ) = budget.period_end else { continue };
      if self.perform_roll( &budget.id, old_end, budget.period, now ).await?
      {
        if let Some( fresh ) = self.store.get( &budget.id ).await?
        {
          rolled.push( fresh );
        }
      }
    }

    Ok( rolled )
  }

  /// Utilization snapshot for every envelope of an agent
  pub async fn utilization( &self, agent_id: &AgentId ) -> Result< Vec< BudgetUtilization > >
  {
    let budgets = self.list( agent_id ).await?;
    Ok(
      budgets.into_iter().map( |budget|
      {
        let percent_used = if budget.amount.is_zero()
        {
          Decimal::ZERO
        }
        else
        {
          budget.used_amount * Decimal::new( 100, 0 ) / budget.amount
        };

        BudgetUtilization
        {
          budget_id: budget.id,
          token: budget.token,
          chain_id: budget.chain_id,
          period: budget.period,
          amount: budget.amount,
          used_amount: budget.used_amount,
          remaining_amount: budget.remaining_amount,
          percent_used,
        }
      } ).collect()
    )
  }

  async fn roll_if_expired( &self, budget: Budget ) -> Result< Budget >
  {
    let now = self.clock.now();
    if !budget.is_expired( now.timestamp_millis() )
    {
      return Ok( budget );
    }

    let Some( old_end ) = budget.period_end else
    {
      return Ok( budget );
    };

    self.perform_roll( &budget.id, old_end, budget.period, now ).await?;

    // Whether we rolled or lost to a concurrent reader, the row is fresh now
    match self.store.get( &budget.id ).await?
    {
      Some( fresh ) => Ok( fresh ),
      None => Ok( budget ),
    }
  }

  async fn perform_roll(
    &self,
    id: &BudgetId,
    expected_period_end: i64,
    period: crate::budget::BudgetPeriod,
    now: DateTime< Utc >,
  ) -> Result< bool >
  {
    let new_start = now.timestamp_millis();
    let new_end = period_end_after( period, now ).map( |end| end.timestamp_millis() );

    let rolled = self.store
      .roll( id, expected_period_end, new_start, new_end, new_start )
      .await?;

    if rolled
    {
      tracing::info!( budget_id = %id, period = %period, "Budget period rolled over" );
    }

    Ok( rolled )
  }

  async fn owned_budget( &self, id: &BudgetId, owner: &OwnerId ) -> Result< Budget >
  {
    let Some( budget ) = self.get( id ).await? else
    {
      return Err( Error::validation( format!( "budget not found: {id}" ) ) );
    };

    if &budget.owner != owner
    {
      return Err( Error::authorization( "owner mismatch" ) );
    }

    Ok( budget )
  }
}
