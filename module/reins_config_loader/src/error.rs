//! Error types for configuration loading

use thiserror::Error;

/// Result type for configuration operations
pub type Result< T > = std::result::Result< T, ConfigError >;

/// Errors that can occur while loading configuration
#[ derive( Debug, Error ) ]
pub enum ConfigError
{
  /// A variable was present but failed to parse
  #[ error( "Invalid value for {key}: {message}" ) ]
  Invalid
  {
    key: String,
    message: String,
  },

  /// A required variable was absent
  #[ error( "Missing required variable: {0}" ) ]
  Missing( String ),
}
