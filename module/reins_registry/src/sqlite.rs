//! SQLite-backed agent store

use crate::agent::{ Agent, AgentStatus, AutoExecuteRules };
use crate::store::AgentStore;
use reins_types::{ AgentId, Error, OwnerId, Result };
use sqlx::{ Row, SqlitePool };

/// Agent persistence over a shared pool
#[ derive( Debug, Clone ) ]
pub struct SqliteAgentStore
{
  pool: SqlitePool,
}

const AGENT_COLUMNS: &str =
  "id, owner, name, status, api_key_hash, api_key_prefix, webhook_url, \
   webhook_secret, webhook_secret_hash, auto_execute_enabled, auto_execute_rules, \
   rate_limit_per_minute, last_active_at, created_at, updated_at";

impl SqliteAgentStore
{
  /// Create store from an existing pool
  pub fn from_pool( pool: SqlitePool ) -> Self
  {
    Self { pool }
  }

  /// Apply the agents schema to a pool
  ///
  /// # Errors
  ///
  /// Returns error if schema execution fails
  pub async fn apply_schema( pool: &SqlitePool ) -> Result< () >
  {
    sqlx::raw_sql( crate::SCHEMA_SQL ).execute( pool ).await?;
    Ok( () )
  }

  fn row_to_agent( row: &sqlx::sqlite::SqliteRow ) -> Result< Agent >
  {
    let id: String = row.get( "id" );
    let owner: String = row.get( "owner" );
    let status: String = row.get( "status" );
    let rules: Option< String > = row.get( "auto_execute_rules" );
    let rate_limit: i64 = row.get( "rate_limit_per_minute" );

    let rules: Option< AutoExecuteRules > = match rules
    {
      None => None,
      Some( raw ) => Some(
        serde_json::from_str( &raw )
          .map_err( |e| Error::Fatal( format!( "corrupt auto_execute_rules: {e}" ) ) )?
      ),
    };

    Ok( Agent
    {
      id: AgentId::parse( &id )
        .map_err( |e| Error::Fatal( format!( "corrupt agent id: {e}" ) ) )?,
      owner: OwnerId::parse( owner )
        .map_err( |e| Error::Fatal( format!( "corrupt owner: {e}" ) ) )?,
      name: row.get( "name" ),
      status: status.parse().map_err( Error::Fatal )?,
      api_key_hash: row.get( "api_key_hash" ),
      api_key_prefix: row.get( "api_key_prefix" ),
      webhook_url: row.get( "webhook_url" ),
      webhook_secret: row.get( "webhook_secret" ),
      webhook_secret_hash: row.get( "webhook_secret_hash" ),
      auto_execute_enabled: row.get::< i64, _ >( "auto_execute_enabled" ) != 0,
      auto_execute_rules: rules,
      rate_limit_per_minute: u32::try_from( rate_limit ).unwrap_or( 0 ),
      last_active_at: row.get( "last_active_at" ),
      created_at: row.get( "created_at" ),
      updated_at: row.get( "updated_at" ),
    } )
  }

  fn rules_to_json( rules: &Option< AutoExecuteRules > ) -> Result< Option< String > >
  {
    match rules
    {
      None => Ok( None ),
      Some( r ) => Ok( Some(
        serde_json::to_string( r )
          .map_err( |e| Error::Fatal( format!( "unserializable rules: {e}" ) ) )?
      ) ),
    }
  }
}

#[ async_trait::async_trait ]
impl AgentStore for SqliteAgentStore
{
  async fn insert( &self, agent: &Agent ) -> Result< () >
  {
    let rules = Self::rules_to_json( &agent.auto_execute_rules )?;

    sqlx::query(
      "INSERT INTO agents
       (id, owner, name, status, api_key_hash, api_key_prefix, webhook_url,
        webhook_secret, webhook_secret_hash, auto_execute_enabled, auto_execute_rules,
        rate_limit_per_minute, last_active_at, created_at, updated_at)
       VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind( agent.id.as_str() )
    .bind( agent.owner.as_str() )
    .bind( &agent.name )
    .bind( agent.status.as_str() )
    .bind( &agent.api_key_hash )
    .bind( &agent.api_key_prefix )
    .bind( &agent.webhook_url )
    .bind( &agent.webhook_secret )
    .bind( &agent.webhook_secret_hash )
    .bind( i64::from( agent.auto_execute_enabled ) )
    .bind( &rules )
    .bind( i64::from( agent.rate_limit_per_minute ) )
    .bind( agent.last_active_at )
    .bind( agent.created_at )
    .bind( agent.updated_at )
    .execute( &self.pool )
    .await?;

    Ok( () )
  }

  async fn get( &self, id: &AgentId ) -> Result< Option< Agent > >
  {
    let row = sqlx::query( &format!( "SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?" ) )
      .bind( id.as_str() )
      .fetch_optional( &self.pool )
      .await?;

    row.as_ref().map( Self::row_to_agent ).transpose()
  }

  async fn get_by_key_hash( &self, key_hash: &str ) -> Result< Option< Agent > >
  {
    let row = sqlx::query( &format!( "SELECT {AGENT_COLUMNS} FROM agents WHERE api_key_hash = ?" ) )
      .bind( key_hash )
      .fetch_optional( &self.pool )
      .await?;

    row.as_ref().map( Self::row_to_agent ).transpose()
  }

  async fn list( &self, owner: &OwnerId ) -> Result< Vec< Agent > >
  {
    let rows = sqlx::query(
      &format!( "SELECT {AGENT_COLUMNS} FROM agents WHERE owner = ? ORDER BY created_at DESC, id DESC" )
    )
    .bind( owner.as_str() )
    .fetch_all( &self.pool )
    .await?;

    rows.iter().map( Self::row_to_agent ).collect()
  }

  async fn count( &self, owner: &OwnerId ) -> Result< i64 >
  {
    let count: i64 = sqlx::query_scalar( "SELECT COUNT(*) FROM agents WHERE owner = ?" )
      .bind( owner.as_str() )
      .fetch_one( &self.pool )
      .await?;

    Ok( count )
  }

  async fn update( &self, agent: &Agent ) -> Result< () >
  {
    let rules = Self::rules_to_json( &agent.auto_execute_rules )?;

    sqlx::query(
      "UPDATE agents SET
         name = ?, status = ?, webhook_url = ?, webhook_secret = ?,
         webhook_secret_hash = ?, auto_execute_enabled = ?, auto_execute_rules = ?,
         rate_limit_per_minute = ?, updated_at = ?
       WHERE id = ?"
    )
    .bind( &agent.name )
    .bind( agent.status.as_str() )
    .bind( &agent.webhook_url )
    .bind( &agent.webhook_secret )
    .bind( &agent.webhook_secret_hash )
    .bind( i64::from( agent.auto_execute_enabled ) )
    .bind( &rules )
    .bind( i64::from( agent.rate_limit_per_minute ) )
    .bind( agent.updated_at )
    .bind( agent.id.as_str() )
    .execute( &self.pool )
    .await?;

    Ok( () )
  }

  async fn set_status_all(
    &self,
    owner: &OwnerId,
    from: AgentStatus,
    to: AgentStatus,
    disable_auto_execute: bool,
    at_ms: i64,
  ) -> Result< u64 >
  {
    let result = if disable_auto_execute
    {
      sqlx::query(
        "UPDATE agents SET status = ?, auto_execute_enabled = 0, updated_at = ?
         WHERE owner = ? AND status = ?"
      )
      .bind( to.as_str() )
      .bind( at_ms )
      .bind( owner.as_str() )
      .bind( from.as_str() )
      .execute( &self.pool )
      .await?
    }
    else
    {
      sqlx::query(
        "UPDATE agents SET status = ?, updated_at = ?
         WHERE owner = ? AND status = ?"
      )
      .bind( to.as_str() )
      .bind( at_ms )
      .bind( owner.as_str() )
      .bind( from.as_str() )
      .execute( &self.pool )
      .await?
    };

    Ok( result.rows_affected() )
  }

  async fn touch_last_active( &self, id: &AgentId, at_ms: i64 ) -> Result< () >
  {
    sqlx::query( "UPDATE agents SET last_active_at = ? WHERE id = ?" )
      .bind( at_ms )
      .bind( id.as_str() )
      .execute( &self.pool )
      .await?;

    Ok( () )
  }
}
