//! Error types for test database operations

use thiserror::Error;

/// Result type for test database operations
pub type Result< T > = std::result::Result< T, TestDbError >;

/// Errors that can occur during test database operations
#[ derive( Debug, Error ) ]
pub enum TestDbError
{
  /// SQLx database error
  #[ error( "Database error: {0}" ) ]
  Database( #[ from ] sqlx::Error ),

  /// IO error (TempDir creation)
  #[ error( "IO error: {0}" ) ]
  Io( #[ from ] std::io::Error ),

  /// Migration error
  #[ error( "Migration error: {0}" ) ]
  Migration( String ),
}
