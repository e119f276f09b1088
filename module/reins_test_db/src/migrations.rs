//! Migration registry with version tracking

use crate::error::{ Result, TestDbError };
use sqlx::SqlitePool;
use std::collections::BTreeMap;

/// Migration definition
#[ derive( Debug, Clone ) ]
pub struct Migration
{
  /// Migration version number
  pub version: u32,
  /// Human-readable migration name
  pub name: String,
  /// SQL to execute
  pub sql: &'static str,
}

/// Central registry for database migrations
///
/// Tracks applied versions in a `_schema_version` table so a registry can
/// be applied repeatedly without re-running migrations.
#[ derive( Debug, Default ) ]
pub struct MigrationRegistry
{
  migrations: BTreeMap< u32, Migration >,
}

impl MigrationRegistry
{
  /// Create new empty registry
  pub fn new() -> Self
  {
    Self {
      migrations: BTreeMap::new(),
    }
  }

  /// Register a migration (builder pattern)
  pub fn register( mut self, migration: Migration ) -> Self
  {
    self.migrations.insert( migration.version, migration );
    self
  }

  /// Apply all registered migrations in version order
  pub async fn apply_all( &self, pool: &SqlitePool ) -> Result< () >
  {
    self.init_schema_version_table( pool ).await?;

    for ( version, migration ) in &self.migrations
    {
      if self.is_applied( pool, *version ).await?
      {
        continue;
      }

      sqlx::raw_sql( migration.sql )
        .execute( pool )
        .await
        .map_err( |e| TestDbError::Migration(
          format!( "Failed to apply migration {}: {}", version, e )
        ) )?;

      self.mark_applied( pool, *version, &migration.name ).await?;
    }

    Ok( () )
  }

  async fn init_schema_version_table( &self, pool: &SqlitePool ) -> Result< () >
  {
    sqlx::query(
      "CREATE TABLE IF NOT EXISTS _schema_version (
        version INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        applied_at INTEGER NOT NULL
      )"
    )
    .execute( pool )
    .await?;

    Ok( () )
  }

  async fn is_applied( &self, pool: &SqlitePool, version: u32 ) -> Result< bool >
  {
    let count: i64 = sqlx::query_scalar(
      "SELECT COUNT(*) FROM _schema_version WHERE version = ?"
    )
    .bind( i64::from( version ) )
    .fetch_one( pool )
    .await?;

    Ok( count > 0 )
  }

  async fn mark_applied( &self, pool: &SqlitePool, version: u32, name: &str ) -> Result< () >
  {
    let now = std::time::SystemTime::now()
      .duration_since( std::time::UNIX_EPOCH )
      .map_err( |e| TestDbError::Migration( e.to_string() ) )?
      .as_millis() as i64;

    sqlx::query(
      "INSERT INTO _schema_version (version, name, applied_at) VALUES (?, ?, ?)"
    )
    .bind( i64::from( version ) )
    .bind( name )
    .bind( now )
    .execute( pool )
    .await?;

    Ok( () )
  }
}

#[ cfg( test ) ]
mod tests
{
  use super::*;
  use crate::TestDatabaseBuilder;

  #[ tokio::test ]
  async fn apply_all_is_idempotent()
  {
    let db = TestDatabaseBuilder::new().in_memory().build().await.unwrap();

    let registry = MigrationRegistry::new()
      .register( Migration {
        version: 1,
        name: "widgets".into(),
        sql: "CREATE TABLE widgets (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
      } );

    registry.apply_all( db.pool() ).await.unwrap();
    // Second apply must skip the already-applied version
    registry.apply_all( db.pool() ).await.unwrap();

    let count: i64 = sqlx::query_scalar( "SELECT COUNT(*) FROM _schema_version" )
      .fetch_one( db.pool() )
      .await
      .unwrap();
    assert_eq!( count, 1 );
  }
}
