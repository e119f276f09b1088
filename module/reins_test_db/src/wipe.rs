//! Table wiping between test cases

use crate::error::Result;
use sqlx::SqlitePool;

/// Wipe all data from all non-system tables
///
/// Foreign key checks are deferred for the duration of the transaction so
/// deletion order does not matter.
pub async fn wipe_all_tables( pool: &SqlitePool ) -> Result< () >
{
  let tables: Vec< String > = sqlx::query_scalar(
    "SELECT name FROM sqlite_master
     WHERE type = 'table'
     AND substr( name, 1, 1 ) != '_'
     AND name != 'sqlite_sequence'"
  )
  .fetch_all( pool )
  .await?;

  let mut tx = pool.begin().await?;

  sqlx::query( "PRAGMA defer_foreign_keys = ON" )
    .execute( &mut *tx )
    .await?;

  for table in tables
  {
    sqlx::query( &format!( "DELETE FROM {}", table ) )
      .execute( &mut *tx )
      .await?;
  }

  tx.commit().await?;

  Ok( () )
}

#[ cfg( test ) ]
mod tests
{
  use super::*;
  use crate::TestDatabaseBuilder;

  #[ tokio::test ]
  async fn wipe_clears_dependent_tables()
  {
    let db = TestDatabaseBuilder::new().in_memory().build().await.unwrap();

    sqlx::raw_sql(
      "CREATE TABLE parents (id INTEGER PRIMARY KEY);
       CREATE TABLE children (
         id INTEGER PRIMARY KEY,
         parent_id INTEGER NOT NULL REFERENCES parents(id)
       );
       INSERT INTO parents (id) VALUES (1);
       INSERT INTO children (id, parent_id) VALUES (1, 1);"
    )
    .execute( db.pool() )
    .await
    .unwrap();

    wipe_all_tables( db.pool() ).await.unwrap();

    let parents: i64 = sqlx::query_scalar( "SELECT COUNT(*) FROM parents" )
      .fetch_one( db.pool() )
      .await
      .unwrap();
    let children: i64 = sqlx::query_scalar( "SELECT COUNT(*) FROM children" )
      .fetch_one( db.pool() )
      .await
      .unwrap();

    assert_eq!( parents, 0 );
    assert_eq!( children, 0 );
  }
}
