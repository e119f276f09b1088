//! Budget entity and period arithmetic

use chrono::{ DateTime, Duration, Months, Utc };
use reins_types::{ AgentId, BudgetId, OwnerId };
use rust_decimal::Decimal;
use serde::{ Deserialize, Serialize };

/// Budget period kinds
#[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
#[ serde( rename_all = "snake_case" ) ]
pub enum BudgetPeriod
{
  Daily,
  Weekly,
  Monthly,
  Yearly,
  /// Lifetime envelope; never rolls over
  Total,
}

impl BudgetPeriod
{
  /// Stable string form used in storage
  pub fn as_str( self ) -> &'static str
  {
    match self
    {
      Self::Daily => "daily",
      Self::Weekly => "weekly",
      Self::Monthly => "monthly",
      Self::Yearly => "yearly",
      Self::Total => "total",
    }
  }
}

impl std::str::FromStr for BudgetPeriod
{
  type Err = String;

  fn from_str( s: &str ) -> Result< Self, Self::Err >
  {
    match s
    {
      "daily" => Ok( Self::Daily ),
      "weekly" => Ok( Self::Weekly ),
      "monthly" => Ok( Self::Monthly ),
      "yearly" => Ok( Self::Yearly ),
      "total" => Ok( Self::Total ),
      other => Err( format!( "unknown budget period: {other}" ) ),
    }
  }
}

impl std::fmt::Display for BudgetPeriod
{
  fn fmt( &self, f: &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
  {
    f.write_str( self.as_str() )
  }
}

/// Compute the end of the period that starts at `start`
///
/// Day and week ends are fixed offsets. Month and year ends use calendar
/// arithmetic clamped to the last valid day of the target month, so a
/// monthly budget created on Jan 31 ends on Feb 28 (29 in leap years),
/// never Mar 3. `Total` has no end.
pub fn period_end_after( period: BudgetPeriod, start: DateTime< Utc > ) -> Option< DateTime< Utc > >
{
  match period
  {
    BudgetPeriod::Daily => Some( start + Duration::hours( 24 ) ),
    BudgetPeriod::Weekly => Some( start + Duration::days( 7 ) ),
    BudgetPeriod::Monthly => start.checked_add_months( Months::new( 1 ) ),
    BudgetPeriod::Yearly => start.checked_add_months( Months::new( 12 ) ),
    BudgetPeriod::Total => None,
  }
}

/// A periodized spending envelope
///
/// Invariant: `used_amount + remaining_amount == amount`, and
/// `period_end` is absent exactly when `period == Total`.
#[ derive( Debug, Clone, PartialEq, Serialize, Deserialize ) ]
pub struct Budget
{
  /// Entity id
  pub id: BudgetId,
  /// Agent the envelope belongs to
  pub agent_id: AgentId,
  /// Owning account
  pub owner: OwnerId,
  /// Allocation for the current period (immutable across rollovers)
  pub amount: Decimal,
  /// Token symbol, uppercased on creation
  pub token: String,
  /// Chain constraint; absent means any chain
  pub chain_id: Option< u64 >,
  /// Rollover cadence
  pub period: BudgetPeriod,
  /// Spent in the current period
  pub used_amount: Decimal,
  /// Left in the current period
  pub remaining_amount: Decimal,
  /// Current period start (epoch ms)
  pub period_start: i64,
  /// Current period end (epoch ms); absent for `Total`
  pub period_end: Option< i64 >,
  /// Epoch milliseconds
  pub created_at: i64,
  /// Epoch milliseconds
  pub updated_at: i64,
}

impl Budget
{
  /// Whether the current period has ended at `now_ms`
  pub fn is_expired( &self, now_ms: i64 ) -> bool
  {
    self.period_end.is_some_and( |end| now_ms >= end )
  }

  /// Whether this envelope applies to a (token, chain) request
  ///
  /// Tokens compare case-insensitively; a budget without a chain
  /// constraint matches any chain.
  pub fn matches( &self, token: &str, chain_id: Option< u64 > ) -> bool
  {
    if !self.token.eq_ignore_ascii_case( token )
    {
      return false;
    }
    match ( self.chain_id, chain_id )
    {
      ( None, _ ) => true,
      ( Some( _ ), None ) => false,
      ( Some( own ), Some( requested ) ) => own == requested,
    }
  }
}

/// Input for budget creation
#[ derive( Debug, Clone, Deserialize ) ]
pub struct CreateBudgetInput
{
  pub agent_id: AgentId,
  pub owner: OwnerId,
  pub amount: Decimal,
  pub token: String,
  #[ serde( default ) ]
  pub chain_id: Option< u64 >,
  pub period: BudgetPeriod,
}

/// Per-budget utilization snapshot for owner analytics
#[ derive( Debug, Clone, Serialize ) ]
pub struct BudgetUtilization
{
  pub budget_id: BudgetId,
  pub token: String,
  pub chain_id: Option< u64 >,
  pub period: BudgetPeriod,
  pub amount: Decimal,
  pub used_amount: Decimal,
  pub remaining_amount: Decimal,
  /// `used / amount` in percent, zero when the allocation is zero
  pub percent_used: Decimal,
}

#[ cfg( test ) ]
mod tests
{
  use super::*;
  use chrono::TimeZone;

  #[ test ]
  fn daily_end_is_24h()
  {
    let start = Utc.with_ymd_and_hms( 2026, 3, 10, 15, 30, 0 ).unwrap();
    let end = period_end_after( BudgetPeriod::Daily, start ).unwrap();
    assert_eq!( end - start, Duration::hours( 24 ) );
  }

  #[ test ]
  fn monthly_end_clamps_to_short_month()
  {
    let jan31 = Utc.with_ymd_and_hms( 2026, 1, 31, 0, 0, 0 ).unwrap();
    let end = period_end_after( BudgetPeriod::Monthly, jan31 ).unwrap();
    assert_eq!( end, Utc.with_ymd_and_hms( 2026, 2, 28, 0, 0, 0 ).unwrap() );
  }

  #[ test ]
  fn monthly_end_is_leap_aware()
  {
    let jan31 = Utc.with_ymd_and_hms( 2028, 1, 31, 0, 0, 0 ).unwrap();
    let end = period_end_after( BudgetPeriod::Monthly, jan31 ).unwrap();
    assert_eq!( end, Utc.with_ymd_and_hms( 2028, 2, 29, 0, 0, 0 ).unwrap() );
  }

  #[ test ]
  fn yearly_end_clamps_leap_day()
  {
    let feb29 = Utc.with_ymd_and_hms( 2028, 2, 29, 12, 0, 0 ).unwrap();
    let end = period_end_after( BudgetPeriod::Yearly, feb29 ).unwrap();
    assert_eq!( end, Utc.with_ymd_and_hms( 2029, 2, 28, 12, 0, 0 ).unwrap() );
  }

  #[ test ]
  fn total_never_ends()
  {
    let start = Utc.with_ymd_and_hms( 2026, 1, 1, 0, 0, 0 ).unwrap();
    assert_eq!( period_end_after( BudgetPeriod::Total, start ), None );
  }

  #[ test ]
  fn matching_is_token_case_insensitive_and_chain_aware()
  {
    let budget = Budget
    {
      id: BudgetId::generate(),
      agent_id: AgentId::generate(),
      owner: OwnerId::parse( "acct_1" ).unwrap(),
      amount: Decimal::new( 100, 0 ),
      token: "USDC".into(),
      chain_id: Some( 1 ),
      period: BudgetPeriod::Monthly,
      used_amount: Decimal::ZERO,
      remaining_amount: Decimal::new( 100, 0 ),
      period_start: 0,
      period_end: Some( 1 ),
      created_at: 0,
      updated_at: 0,
    };

    assert!( budget.matches( "usdc", Some( 1 ) ) );
    assert!( !budget.matches( "usdc", Some( 8453 ) ) );
    assert!( !budget.matches( "usdc", None ) );
    assert!( !budget.matches( "dai", Some( 1 ) ) );

    let wildcard = Budget { chain_id: None, ..budget };
    assert!( wildcard.matches( "USDC", Some( 8453 ) ) );
    assert!( wildcard.matches( "USDC", None ) );
  }
}
