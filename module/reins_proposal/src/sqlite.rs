//! SQLite-backed proposal store

use crate::proposal::{ Proposal, ProposalStatus };
use crate::store::{ ProposalStore, TransitionFields };
use reins_types::{ AgentId, BudgetId, Error, OwnerId, ProposalId, Result };
use rust_decimal::Decimal;
use sqlx::{ Row, SqlitePool };
use std::str::FromStr;

/// Proposal persistence over a shared pool
#[ derive( Debug, Clone ) ]
pub struct SqliteProposalStore
{
  pool: SqlitePool,
}

const PROPOSAL_COLUMNS: &str =
  "id, agent_id, owner, recipient, amount, token, chain_id, reason, budget_id, \
   status, tx_hash, error_message, created_at, updated_at, decided_at, executed_at";

impl SqliteProposalStore
{
  /// Create store from an existing pool
  pub fn from_pool( pool: SqlitePool ) -> Self
  {
    Self { pool }
  }

  /// Apply the proposals schema to a pool
  ///
  /// # Errors
  ///
  /// Returns error if schema execution fails
  pub async fn apply_schema( pool: &SqlitePool ) -> Result< () >
  {
    sqlx::raw_sql( crate::SCHEMA_SQL ).execute( pool ).await?;
    Ok( () )
  }

  fn row_to_proposal( row: &sqlx::sqlite::SqliteRow ) -> Result< Proposal >
  {
    let id: String = row.get( "id" );
    let agent_id: String = row.get( "agent_id" );
    let owner: String = row.get( "owner" );
    let status: String = row.get( "status" );
    let chain_id: i64 = row.get( "chain_id" );
    let budget_id: Option< String > = row.get( "budget_id" );
    let amount: String = row.get( "amount" );

    Ok( Proposal
    {
      id: ProposalId::parse( &id )
        .map_err( |e| Error::Fatal( format!( "corrupt proposal id: {e}" ) ) )?,
      agent_id: AgentId::parse( &agent_id )
        .map_err( |e| Error::Fatal( format!( "corrupt agent id: {e}" ) ) )?,
      owner: OwnerId::parse( owner )
        .map_err( |e| Error::Fatal( format!( "corrupt owner: {e}" ) ) )?,
      recipient: row.get( "recipient" ),
      amount: Decimal::from_str( &amount )
        .map_err( |e| Error::Fatal( format!( "corrupt amount '{amount}': {e}" ) ) )?,
      token: row.get( "token" ),
      chain_id: chain_id as u64,
      reason: row.get( "reason" ),
      budget_id: budget_id
        .map( |b| BudgetId::parse( &b ) )
        .transpose()
        .map_err( |e| Error::Fatal( format!( "corrupt budget id: {e}" ) ) )?,
      status: ProposalStatus::from_str( &status ).map_err( Error::Fatal )?,
      tx_hash: row.get( "tx_hash" ),
      error_message: row.get( "error_message" ),
      created_at: row.get( "created_at" ),
      updated_at: row.get( "updated_at" ),
      decided_at: row.get( "decided_at" ),
      executed_at: row.get( "executed_at" ),
    } )
  }
}

#[ async_trait::async_trait ]
impl ProposalStore for SqliteProposalStore
{
  async fn insert( &self, proposal: &Proposal ) -> Result< () >
  {
    sqlx::query(
      "INSERT INTO payment_proposals
       (id, agent_id, owner, recipient, amount, token, chain_id, reason, budget_id,
        status, tx_hash, error_message, created_at, updated_at, decided_at, executed_at)
       VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind( proposal.id.as_str() )
    .bind( proposal.agent_id.as_str() )
    .bind( proposal.owner.as_str() )
    .bind( &proposal.recipient )
    .bind( proposal.amount.to_string() )
    .bind( &proposal.token )
    .bind( proposal.chain_id as i64 )
    .bind( &proposal.reason )
    .bind( proposal.budget_id.as_ref().map( reins_types::BudgetId::as_str ) )
    .bind( proposal.status.as_str() )
    .bind( &proposal.tx_hash )
    .bind( &proposal.error_message )
    .bind( proposal.created_at )
    .bind( proposal.updated_at )
    .bind( proposal.decided_at )
    .bind( proposal.executed_at )
    .execute( &self.pool )
    .await?;

    Ok( () )
  }

  async fn get( &self, id: &ProposalId ) -> Result< Option< Proposal > >
  {
    let row = sqlx::query(
      &format!( "SELECT {PROPOSAL_COLUMNS} FROM payment_proposals WHERE id = ?" )
    )
    .bind( id.as_str() )
    .fetch_optional( &self.pool )
    .await?;

    row.as_ref().map( Self::row_to_proposal ).transpose()
  }

  async fn list_for_agent( &self, agent_id: &AgentId, limit: u32 ) -> Result< Vec< Proposal > >
  {
    let rows = sqlx::query(
      &format!(
        "SELECT {PROPOSAL_COLUMNS} FROM payment_proposals
         WHERE agent_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?"
      )
    )
    .bind( agent_id.as_str() )
    .bind( i64::from( limit ) )
    .fetch_all( &self.pool )
    .await?;

    rows.iter().map( Self::row_to_proposal ).collect()
  }

  async fn list_for_owner( &self, owner: &OwnerId, limit: u32 ) -> Result< Vec< Proposal > >
  {
    let rows = sqlx::query(
      &format!(
        "SELECT {PROPOSAL_COLUMNS} FROM payment_proposals
         WHERE owner = ? ORDER BY created_at DESC, rowid DESC LIMIT ?"
      )
    )
    .bind( owner.as_str() )
    .bind( i64::from( limit ) )
    .fetch_all( &self.pool )
    .await?;

    rows.iter().map( Self::row_to_proposal ).collect()
  }

  async fn cas_transition(
    &self,
    id: &ProposalId,
    from: ProposalStatus,
    to: ProposalStatus,
    fields: &TransitionFields,
    at_ms: i64,
  ) -> Result< bool >
  {
    let result = sqlx::query(
      "UPDATE payment_proposals SET
         status = ?,
         budget_id = COALESCE(?, budget_id),
         tx_hash = COALESCE(?, tx_hash),
         error_message = COALESCE(?, error_message),
         decided_at = COALESCE(?, decided_at),
         executed_at = COALESCE(?, executed_at),
         updated_at = ?
       WHERE id = ? AND status = ?"
    )
    .bind( to.as_str() )
    .bind( fields.budget_id.as_ref().map( reins_types::BudgetId::as_str ) )
    .bind( &fields.tx_hash )
    .bind( &fields.error_message )
    .bind( fields.decided_at )
    .bind( fields.executed_at )
    .bind( at_ms )
    .bind( id.as_str() )
    .bind( from.as_str() )
    .execute( &self.pool )
    .await?;

    Ok( result.rows_affected() == 1 )
  }

  async fn sum_executed_amount_since( &self, agent_id: &AgentId, since_ms: i64 ) -> Result< Decimal >
  {
    let amounts: Vec< String > = sqlx::query_scalar(
      "SELECT amount FROM payment_proposals
       WHERE agent_id = ? AND status = 'executed' AND decided_at >= ?"
    )
    .bind( agent_id.as_str() )
    .bind( since_ms )
    .fetch_all( &self.pool )
    .await?;

    let mut sum = Decimal::ZERO;
    for raw in amounts
    {
      sum += Decimal::from_str( &raw )
        .map_err( |e| Error::Fatal( format!( "corrupt amount '{raw}': {e}" ) ) )?;
    }

    Ok( sum )
  }
}
