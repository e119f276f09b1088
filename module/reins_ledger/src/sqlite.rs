//! SQLite-backed budget store
//!
//! Decimal amounts are stored as canonical strings; balance mutations are
//! compare-and-swap updates whose WHERE clause pins the previous string
//! values, so the affected-row count tells the caller whether it won.

use crate::budget::{ Budget, BudgetPeriod };
use crate::store::BudgetStore;
use reins_types::{ AgentId, BudgetId, Error, OwnerId, Result };
use rust_decimal::Decimal;
use sqlx::{ Row, SqlitePool };
use std::str::FromStr;

/// Budget persistence over a shared pool
#[ derive( Debug, Clone ) ]
pub struct SqliteBudgetStore
{
  pool: SqlitePool,
}

const BUDGET_COLUMNS: &str =
  "id, agent_id, owner, amount, token, chain_id, period, used_amount, \
   remaining_amount, period_start, period_end, created_at, updated_at";

impl SqliteBudgetStore
{
  /// Create store from an existing pool
  pub fn from_pool( pool: SqlitePool ) -> Self
  {
    Self { pool }
  }

  /// Apply the budgets schema to a pool
  ///
  /// # Errors
  ///
  /// Returns error if schema execution fails
  pub async fn apply_schema( pool: &SqlitePool ) -> Result< () >
  {
    sqlx::raw_sql( crate::SCHEMA_SQL ).execute( pool ).await?;
    Ok( () )
  }

  fn row_to_budget( row: &sqlx::sqlite::SqliteRow ) -> Result< Budget >
  {
    let id: String = row.get( "id" );
    let agent_id: String = row.get( "agent_id" );
    let owner: String = row.get( "owner" );
    let period: String = row.get( "period" );
    let chain_id: Option< i64 > = row.get( "chain_id" );

    Ok( Budget
    {
      id: BudgetId::parse( &id )
        .map_err( |e| Error::Fatal( format!( "corrupt budget id: {e}" ) ) )?,
      agent_id: AgentId::parse( &agent_id )
        .map_err( |e| Error::Fatal( format!( "corrupt agent id: {e}" ) ) )?,
      owner: OwnerId::parse( owner )
        .map_err( |e| Error::Fatal( format!( "corrupt owner: {e}" ) ) )?,
      amount: parse_amount( &row.get::< String, _ >( "amount" ) )?,
      token: row.get( "token" ),
      chain_id: chain_id.map( |c| c as u64 ),
      period: BudgetPeriod::from_str( &period ).map_err( Error::Fatal )?,
      used_amount: parse_amount( &row.get::< String, _ >( "used_amount" ) )?,
      remaining_amount: parse_amount( &row.get::< String, _ >( "remaining_amount" ) )?,
      period_start: row.get( "period_start" ),
      period_end: row.get( "period_end" ),
      created_at: row.get( "created_at" ),
      updated_at: row.get( "updated_at" ),
    } )
  }
}

fn parse_amount( raw: &str ) -> Result< Decimal >
{
  Decimal::from_str( raw )
    .map_err( |e| Error::Fatal( format!( "corrupt amount '{raw}': {e}" ) ) )
}

#[ async_trait::async_trait ]
impl BudgetStore for SqliteBudgetStore
{
  async fn insert( &self, budget: &Budget ) -> Result< () >
  {
    sqlx::query(
      "INSERT INTO agent_budgets
       (id, agent_id, owner, amount, token, chain_id, period, used_amount,
        remaining_amount, period_start, period_end, created_at, updated_at)
       VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind( budget.id.as_str() )
    .bind( budget.agent_id.as_str() )
    .bind( budget.owner.as_str() )
    .bind( budget.amount.to_string() )
    .bind( &budget.token )
    .bind( budget.chain_id.map( |c| c as i64 ) )
    .bind( budget.period.as_str() )
    .bind( budget.used_amount.to_string() )
    .bind( budget.remaining_amount.to_string() )
    .bind( budget.period_start )
    .bind( budget.period_end )
    .bind( budget.created_at )
    .bind( budget.updated_at )
    .execute( &self.pool )
    .await?;

    Ok( () )
  }

  async fn get( &self, id: &BudgetId ) -> Result< Option< Budget > >
  {
    let row = sqlx::query( &format!( "SELECT {BUDGET_COLUMNS} FROM agent_budgets WHERE id = ?" ) )
      .bind( id.as_str() )
      .fetch_optional( &self.pool )
      .await?;

    row.as_ref().map( Self::row_to_budget ).transpose()
  }

  async fn list_for_agent( &self, agent_id: &AgentId ) -> Result< Vec< Budget > >
  {
    let rows = sqlx::query(
      &format!(
        "SELECT {BUDGET_COLUMNS} FROM agent_budgets
         WHERE agent_id = ? ORDER BY created_at DESC, rowid DESC"
      )
    )
    .bind( agent_id.as_str() )
    .fetch_all( &self.pool )
    .await?;

    rows.iter().map( Self::row_to_budget ).collect()
  }

  async fn cas_amounts(
    &self,
    id: &BudgetId,
    expected_used: Decimal,
    expected_remaining: Decimal,
    new_used: Decimal,
    new_remaining: Decimal,
    at_ms: i64,
  ) -> Result< bool >
  {
    let result = sqlx::query(
      "UPDATE agent_budgets
       SET used_amount = ?, remaining_amount = ?, updated_at = ?
       WHERE id = ? AND used_amount = ? AND remaining_amount = ?"
    )
    .bind( new_used.to_string() )
    .bind( new_remaining.to_string() )
    .bind( at_ms )
    .bind( id.as_str() )
    .bind( expected_used.to_string() )
    .bind( expected_remaining.to_string() )
    .execute( &self.pool )
    .await?;

    Ok( result.rows_affected() == 1 )
  }

  async fn cas_allocation(
    &self,
    id: &BudgetId,
    expected_used: Decimal,
    expected_remaining: Decimal,
    new_amount: Decimal,
    new_remaining: Decimal,
    at_ms: i64,
  ) -> Result< bool >
  {
    let result = sqlx::query(
      "UPDATE agent_budgets
       SET amount = ?, remaining_amount = ?, updated_at = ?
       WHERE id = ? AND used_amount = ? AND remaining_amount = ?"
    )
    .bind( new_amount.to_string() )
    .bind( new_remaining.to_string() )
    .bind( at_ms )
    .bind( id.as_str() )
    .bind( expected_used.to_string() )
    .bind( expected_remaining.to_string() )
    .execute( &self.pool )
    .await?;

    Ok( result.rows_affected() == 1 )
  }

  async fn roll(
    &self,
    id: &BudgetId,
    expected_period_end: i64,
    new_start: i64,
    new_end: Option< i64 >,
    at_ms: i64,
  ) -> Result< bool >
  {
    let result = sqlx::query(
      "UPDATE agent_budgets
       SET used_amount = '0', remaining_amount = amount,
           period_start = ?, period_end = ?, updated_at = ?
       WHERE id = ? AND period_end = ?"
    )
    .bind( new_start )
    .bind( new_end )
    .bind( at_ms )
    .bind( id.as_str() )
    .bind( expected_period_end )
    .execute( &self.pool )
    .await?;

    Ok( result.rows_affected() == 1 )
  }

  async fn list_expired( &self, now_ms: i64 ) -> Result< Vec< Budget > >
  {
    let rows = sqlx::query(
      &format!(
        "SELECT {BUDGET_COLUMNS} FROM agent_budgets
         WHERE period_end IS NOT NULL AND period_end <= ?"
      )
    )
    .bind( now_ms )
    .fetch_all( &self.pool )
    .await?;

    rows.iter().map( Self::row_to_budget ).collect()
  }

  async fn delete( &self, id: &BudgetId ) -> Result< () >
  {
    sqlx::query( "DELETE FROM agent_budgets WHERE id = ?" )
      .bind( id.as_str() )
      .execute( &self.pool )
      .await?;

    Ok( () )
  }
}
