//! SQLite-backed delivery store

use crate::delivery::{ DeliveryStatus, WebhookDelivery };
use crate::store::DeliveryStore;
use reins_types::{ AgentId, DeliveryId, Error, Result };
use sqlx::{ Row, SqlitePool };
use std::str::FromStr;

/// Delivery persistence over a shared pool
#[ derive( Debug, Clone ) ]
pub struct SqliteDeliveryStore
{
  pool: SqlitePool,
}

const DELIVERY_COLUMNS: &str =
  "id, agent_id, event_type, payload, status, attempts, last_attempt_at, \
   next_retry_at, response_status, error_message, created_at, updated_at";

impl SqliteDeliveryStore
{
  /// Create store from an existing pool
  pub fn from_pool( pool: SqlitePool ) -> Self
  {
    Self { pool }
  }

  /// Apply the deliveries schema to a pool
  ///
  /// # Errors
  ///
  /// Returns error if schema execution fails
  pub async fn apply_schema( pool: &SqlitePool ) -> Result< () >
  {
    sqlx::raw_sql( crate::SCHEMA_SQL ).execute( pool ).await?;
    Ok( () )
  }

  fn row_to_delivery( row: &sqlx::sqlite::SqliteRow ) -> Result< WebhookDelivery >
  {
    let id: String = row.get( "id" );
    let agent_id: String = row.get( "agent_id" );
    let status: String = row.get( "status" );
    let attempts: i64 = row.get( "attempts" );
    let response_status: Option< i64 > = row.get( "response_status" );

    Ok( WebhookDelivery
    {
      id: DeliveryId::parse( &id )
        .map_err( |e| Error::Fatal( format!( "corrupt delivery id: {e}" ) ) )?,
      agent_id: AgentId::parse( &agent_id )
        .map_err( |e| Error::Fatal( format!( "corrupt agent id: {e}" ) ) )?,
      event_type: row.get( "event_type" ),
      payload: row.get( "payload" ),
      status: DeliveryStatus::from_str( &status ).map_err( Error::Fatal )?,
      attempts: u32::try_from( attempts ).unwrap_or( 0 ),
      last_attempt_at: row.get( "last_attempt_at" ),
      next_retry_at: row.get( "next_retry_at" ),
      response_status: response_status.and_then( |s| u16::try_from( s ).ok() ),
      error_message: row.get( "error_message" ),
      created_at: row.get( "created_at" ),
      updated_at: row.get( "updated_at" ),
    } )
  }
}

#[ async_trait::async_trait ]
impl DeliveryStore for SqliteDeliveryStore
{
  async fn insert( &self, delivery: &WebhookDelivery ) -> Result< () >
  {
    sqlx::query(
      "INSERT INTO webhook_deliveries
       (id, agent_id, event_type, payload, status, attempts, last_attempt_at,
        next_retry_at, response_status, error_message, created_at, updated_at)
       VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    )
    .bind( delivery.id.as_str() )
    .bind( delivery.agent_id.as_str() )
    .bind( &delivery.event_type )
    .bind( &delivery.payload )
    .bind( delivery.status.as_str() )
    .bind( i64::from( delivery.attempts ) )
    .bind( delivery.last_attempt_at )
    .bind( delivery.next_retry_at )
    .bind( delivery.response_status.map( i64::from ) )
    .bind( &delivery.error_message )
    .bind( delivery.created_at )
    .bind( delivery.updated_at )
    .execute( &self.pool )
    .await?;

    Ok( () )
  }

  async fn get( &self, id: &DeliveryId ) -> Result< Option< WebhookDelivery > >
  {
    let row = sqlx::query(
      &format!( "SELECT {DELIVERY_COLUMNS} FROM webhook_deliveries WHERE id = ?" )
    )
    .bind( id.as_str() )
    .fetch_optional( &self.pool )
    .await?;

    row.as_ref().map( Self::row_to_delivery ).transpose()
  }

  async fn list_for_agent( &self, agent_id: &AgentId, limit: u32 ) -> Result< Vec< WebhookDelivery > >
  {
    let rows = sqlx::query(
      &format!(
        "SELECT {DELIVERY_COLUMNS} FROM webhook_deliveries
         WHERE agent_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?"
      )
    )
    .bind( agent_id.as_str() )
    .bind( i64::from( limit ) )
    .fetch_all( &self.pool )
    .await?;

    rows.iter().map( Self::row_to_delivery ).collect()
  }

  async fn due_ids( &self, now_ms: i64, limit: u32 ) -> Result< Vec< DeliveryId > >
  {
    let ids: Vec< String > = sqlx::query_scalar(
      "SELECT id FROM webhook_deliveries
       WHERE status IN ('pending', 'retrying') AND next_retry_at <= ?
       ORDER BY next_retry_at ASC LIMIT ?"
    )
    .bind( now_ms )
    .bind( i64::from( limit ) )
    .fetch_all( &self.pool )
    .await?;

    ids.iter()
      .map( |raw| DeliveryId::parse( raw )
        .map_err( |e| Error::Fatal( format!( "corrupt delivery id: {e}" ) ) ) )
      .collect()
  }

  async fn claim( &self, id: &DeliveryId, now_ms: i64 ) -> Result< bool >
  {
    let result = sqlx::query(
      "UPDATE webhook_deliveries
       SET status = 'delivering', attempts = attempts + 1, last_attempt_at = ?, updated_at = ?
       WHERE id = ? AND status IN ('pending', 'retrying') AND next_retry_at <= ?"
    )
    .bind( now_ms )
    .bind( now_ms )
    .bind( id.as_str() )
    .bind( now_ms )
    .execute( &self.pool )
    .await?;

    Ok( result.rows_affected() == 1 )
  }

  async fn mark_delivered( &self, id: &DeliveryId, response_status: u16, at_ms: i64 ) -> Result< () >
  {
    sqlx::query(
      "UPDATE webhook_deliveries
       SET status = 'delivered', response_status = ?, next_retry_at = NULL,
           error_message = NULL, updated_at = ?
       WHERE id = ?"
    )
    .bind( i64::from( response_status ) )
    .bind( at_ms )
    .bind( id.as_str() )
    .execute( &self.pool )
    .await?;

    Ok( () )
  }

  async fn mark_retrying(
    &self,
    id: &DeliveryId,
    next_retry_at: i64,
    response_status: Option< u16 >,
    error: &str,
    at_ms: i64,
  ) -> Result< () >
  {
    sqlx::query(
      "UPDATE webhook_deliveries
       SET status = 'retrying', next_retry_at = ?, response_status = ?,
           error_message = ?, updated_at = ?
       WHERE id = ?"
    )
    .bind( next_retry_at )
    .bind( response_status.map( i64::from ) )
    .bind( error )
    .bind( at_ms )
    .bind( id.as_str() )
    .execute( &self.pool )
    .await?;

    Ok( () )
  }

  async fn mark_failed(
    &self,
    id: &DeliveryId,
    response_status: Option< u16 >,
    error: &str,
    at_ms: i64,
  ) -> Result< () >
  {
    sqlx::query(
      "UPDATE webhook_deliveries
       SET status = 'failed', next_retry_at = NULL, response_status = ?,
           error_message = ?, updated_at = ?
       WHERE id = ?"
    )
    .bind( response_status.map( i64::from ) )
    .bind( error )
    .bind( at_ms )
    .bind( id.as_str() )
    .execute( &self.pool )
    .await?;

    Ok( () )
  }

  async fn defer( &self, id: &DeliveryId, next_retry_at: i64, at_ms: i64 ) -> Result< () >
  {
    sqlx::query(
      "UPDATE webhook_deliveries
       SET status = 'retrying', next_retry_at = ?, updated_at = ?
       WHERE id = ? AND status IN ('pending', 'retrying')"
    )
    .bind( next_retry_at )
    .bind( at_ms )
    .bind( id.as_str() )
    .execute( &self.pool )
    .await?;

    Ok( () )
  }
}
