//! SQLite-backed activity/audit store

use crate::entry::{ ActivityEntry, AuditEntry, NewActivity, NewAudit };
use crate::sink::{ ActivitySink, AuditSink };
use reins_types::{ AgentId, Clock, OwnerId, Result };
use sqlx::{ Row, SqlitePool };
use std::sync::Arc;

/// Activity and audit persistence over a shared pool
#[ derive( Debug, Clone ) ]
pub struct SqliteAuditStore
{
  pool: SqlitePool,
  clock: Arc< dyn Clock >,
}

impl SqliteAuditStore
{
  /// Create store from an existing pool
  ///
  /// Does NOT apply the schema; call [`Self::apply_schema`] or use a
  /// migration registry.
  pub fn from_pool( pool: SqlitePool, clock: Arc< dyn Clock > ) -> Self
  {
    Self { pool, clock }
  }

  /// Apply the activity/audit schema to a pool
  ///
  /// # Errors
  ///
  /// Returns error if schema execution fails
  pub async fn apply_schema( pool: &SqlitePool ) -> Result< () >
  {
    sqlx::raw_sql( crate::SCHEMA_SQL ).execute( pool ).await?;
    Ok( () )
  }

  fn row_to_activity( row: &sqlx::sqlite::SqliteRow ) -> Result< ActivityEntry >
  {
    let agent_id: String = row.get( "agent_id" );
    let owner: String = row.get( "owner" );
    let details: Option< String > = row.get( "details" );

    Ok( ActivityEntry
    {
      id: row.get( "id" ),
      agent_id: AgentId::parse( &agent_id )
        .map_err( |e| reins_types::Error::Fatal( format!( "corrupt agent id in activity row: {e}" ) ) )?,
      owner: OwnerId::parse( owner )
        .map_err( |e| reins_types::Error::Fatal( format!( "corrupt owner in activity row: {e}" ) ) )?,
      action: row.get( "action" ),
      details: details.and_then( |d| serde_json::from_str( &d ).ok() ),
      created_at: row.get( "created_at" ),
    } )
  }

  fn row_to_audit( row: &sqlx::sqlite::SqliteRow ) -> Result< AuditEntry >
  {
    let actor: String = row.get( "actor" );
    let details: Option< String > = row.get( "details" );

    Ok( AuditEntry
    {
      id: row.get( "id" ),
      actor: actor.parse()
        .map_err( reins_types::Error::Fatal )?,
      actor_id: row.get( "actor_id" ),
      resource_type: row.get( "resource_type" ),
      resource_id: row.get( "resource_id" ),
      action: row.get( "action" ),
      details: details.and_then( |d| serde_json::from_str( &d ).ok() ),
      created_at: row.get( "created_at" ),
    } )
  }
}

#[ async_trait::async_trait ]
impl ActivitySink for SqliteAuditStore
{
  async fn record_activity( &self, activity: NewActivity ) -> Result< ActivityEntry >
  {
    let now = self.clock.now_ms();
    let details = activity.details.as_ref().map( std::string::ToString::to_string );

    let result = sqlx::query(
      "INSERT INTO agent_activities (agent_id, owner, action, details, created_at)
       VALUES (?, ?, ?, ?, ?)"
    )
    .bind( activity.agent_id.as_str() )
    .bind( activity.owner.as_str() )
    .bind( &activity.action )
    .bind( &details )
    .bind( now )
    .execute( &self.pool )
    .await?;

    Ok( ActivityEntry
    {
      id: result.last_insert_rowid(),
      agent_id: activity.agent_id,
      owner: activity.owner,
      action: activity.action,
      details: activity.details,
      created_at: now,
    } )
  }

  async fn list_for_agent( &self, agent_id: &AgentId, limit: u32 ) -> Result< Vec< ActivityEntry > >
  {
    let rows = sqlx::query(
      "SELECT id, agent_id, owner, action, details, created_at
       FROM agent_activities WHERE agent_id = ?
       ORDER BY id DESC LIMIT ?"
    )
    .bind( agent_id.as_str() )
    .bind( i64::from( limit ) )
    .fetch_all( &self.pool )
    .await?;

    rows.iter().map( Self::row_to_activity ).collect()
  }

  async fn list_for_owner( &self, owner: &OwnerId, limit: u32 ) -> Result< Vec< ActivityEntry > >
  {
    let rows = sqlx::query(
      "SELECT id, agent_id, owner, action, details, created_at
       FROM agent_activities WHERE owner = ?
       ORDER BY id DESC LIMIT ?"
    )
    .bind( owner.as_str() )
    .bind( i64::from( limit ) )
    .fetch_all( &self.pool )
    .await?;

    rows.iter().map( Self::row_to_activity ).collect()
  }

  async fn count_by_action( &self, agent_id: &AgentId ) -> Result< Vec< ( String, i64 ) > >
  {
    let rows = sqlx::query(
      "SELECT action, COUNT(*) AS n
       FROM agent_activities WHERE agent_id = ?
       GROUP BY action ORDER BY action"
    )
    .bind( agent_id.as_str() )
    .fetch_all( &self.pool )
    .await?;

    Ok( rows.iter().map( |row| ( row.get( "action" ), row.get( "n" ) ) ).collect() )
  }
}

#[ async_trait::async_trait ]
impl AuditSink for SqliteAuditStore
{
  async fn record_audit( &self, audit: NewAudit ) -> Result< AuditEntry >
  {
    let now = self.clock.now_ms();
    let details = audit.details.as_ref().map( std::string::ToString::to_string );

    let result = sqlx::query(
      "INSERT INTO audit_log (actor, actor_id, resource_type, resource_id, action, details, created_at)
       VALUES (?, ?, ?, ?, ?, ?, ?)"
    )
    .bind( audit.actor.as_str() )
    .bind( &audit.actor_id )
    .bind( &audit.resource_type )
    .bind( &audit.resource_id )
    .bind( &audit.action )
    .bind( &details )
    .bind( now )
    .execute( &self.pool )
    .await?;

    Ok( AuditEntry
    {
      id: result.last_insert_rowid(),
      actor: audit.actor,
      actor_id: audit.actor_id,
      resource_type: audit.resource_type,
      resource_id: audit.resource_id,
      action: audit.action,
      details: audit.details,
      created_at: now,
    } )
  }

  async fn list_for_resource(
    &self,
    resource_type: &str,
    resource_id: &str,
  ) -> Result< Vec< AuditEntry > >
  {
    let rows = sqlx::query(
      "SELECT id, actor, actor_id, resource_type, resource_id, action, details, created_at
       FROM audit_log WHERE resource_type = ? AND resource_id = ?
       ORDER BY id ASC"
    )
    .bind( resource_type )
    .bind( resource_id )
    .fetch_all( &self.pool )
    .await?;

    rows.iter().map( Self::row_to_audit ).collect()
  }
}
