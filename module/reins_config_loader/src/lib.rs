//! Environment-driven configuration for the reins engine
//!
//! All knobs are read once at startup from `REINS_*` environment variables
//! (a `.env` file is honored when present). Hot reload is not supported.
//!
//! | Variable | Default | Purpose |
//! |----------|---------|---------|
//! | `REINS_DATABASE_URL` | `sqlite://reins.db?mode=rwc` | Engine database |
//! | `REINS_PRIMARY_EXEC_URL` | unset (disables the HTTP backend) | Primary execution service |
//! | `REINS_EXEC_TIMEOUT_SECS` | `5` | Per-call execution timeout |
//! | `REINS_BREAKER_FAILURE_THRESHOLD` | `3` | Failures before a breaker opens |
//! | `REINS_BREAKER_SUCCESS_THRESHOLD` | `2` | Half-open successes before close |
//! | `REINS_BREAKER_OPEN_TIMEOUT_SECS` | `30` | Open period before half-open |
//! | `REINS_BREAKER_RESET_TIMEOUT_SECS` | `60` | Idle period before counter reset |
//! | `REINS_WEBHOOK_TIMEOUT_SECS` | `30` | Per-attempt webhook timeout |
//! | `REINS_WEBHOOK_MAX_ATTEMPTS` | `3` | Delivery attempt cap |
//! | `REINS_NOTIFY_PUBLIC_KEY` | empty | Notification provider public key |
//! | `REINS_NOTIFY_PRIVATE_KEY` | empty | Notification provider private key |

#![cfg_attr(not(feature = "enabled"), allow(unused))]

#[cfg(feature = "enabled")]
pub mod error;

#[cfg(feature = "enabled")]
pub use error::{ ConfigError, Result };

#[cfg(feature = "enabled")]
mod implementation
{
  use crate::error::{ ConfigError, Result };

  /// Environment variable prefix for every engine knob
  pub const ENV_PREFIX: &str = "REINS_";

  /// Circuit breaker knobs shared by the execution bridge and webhook pipeline
  #[ derive( Debug, Clone, PartialEq, Eq ) ]
  pub struct BreakerConfig
  {
    /// Consecutive failures before the breaker opens
    pub failure_threshold: u32,
    /// Consecutive half-open successes before the breaker closes
    pub success_threshold: u32,
    /// Seconds a breaker stays open before probing
    pub open_timeout_secs: u64,
    /// Idle seconds in closed state before the failure counter resets
    pub reset_timeout_secs: u64,
  }

  impl Default for BreakerConfig
  {
    fn default() -> Self
    {
      Self
      {
        failure_threshold: 3,
        success_threshold: 2,
        open_timeout_secs: 30,
        reset_timeout_secs: 60,
      }
    }
  }

  /// Full engine configuration read from the environment at startup
  #[ derive( Debug, Clone ) ]
  pub struct EngineConfig
  {
    /// Database connection string
    pub database_url: String,
    /// Primary execution backend base URL (None disables the HTTP backend)
    pub primary_exec_url: Option< String >,
    /// Per-call execution timeout in seconds
    pub exec_timeout_secs: u64,
    /// Circuit breaker thresholds
    pub breaker: BreakerConfig,
    /// Per-attempt webhook timeout in seconds
    pub webhook_timeout_secs: u64,
    /// Webhook delivery attempt cap
    pub webhook_max_attempts: u32,
    /// Notification provider public key (VAPID-style)
    pub notify_public_key: String,
    /// Notification provider private key (VAPID-style)
    pub notify_private_key: String,
  }

  impl EngineConfig
  {
    /// Load configuration from the process environment
    ///
    /// A `.env` file in the working directory is loaded first when present;
    /// real environment variables win over `.env` entries.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when a numeric knob fails to parse.
    pub fn from_env() -> Result< Self >
    {
      // Missing .env is the normal production case
      let _ = dotenvy::dotenv();

      let config = Self
      {
        database_url: var_or( "DATABASE_URL", "sqlite://reins.db?mode=rwc" ),
        primary_exec_url: var_opt( "PRIMARY_EXEC_URL" ),
        exec_timeout_secs: var_parsed( "EXEC_TIMEOUT_SECS", 5 )?,
        breaker: BreakerConfig
        {
          failure_threshold: var_parsed( "BREAKER_FAILURE_THRESHOLD", 3 )?,
          success_threshold: var_parsed( "BREAKER_SUCCESS_THRESHOLD", 2 )?,
          open_timeout_secs: var_parsed( "BREAKER_OPEN_TIMEOUT_SECS", 30 )?,
          reset_timeout_secs: var_parsed( "BREAKER_RESET_TIMEOUT_SECS", 60 )?,
        },
        webhook_timeout_secs: var_parsed( "WEBHOOK_TIMEOUT_SECS", 30 )?,
        webhook_max_attempts: var_parsed( "WEBHOOK_MAX_ATTEMPTS", 3 )?,
        notify_public_key: var_or( "NOTIFY_PUBLIC_KEY", "" ),
        notify_private_key: var_or( "NOTIFY_PRIVATE_KEY", "" ),
      };

      tracing::debug!(
        database_url = %config.database_url,
        primary_exec = config.primary_exec_url.is_some(),
        "Engine configuration loaded"
      );

      Ok( config )
    }
  }

  fn var_opt( key: &str ) -> Option< String >
  {
    std::env::var( format!( "{ENV_PREFIX}{key}" ) )
      .ok()
      .filter( |v| !v.is_empty() )
  }

  fn var_or( key: &str, default: &str ) -> String
  {
    var_opt( key ).unwrap_or_else( || default.to_string() )
  }

  fn var_parsed< T >( key: &str, default: T ) -> Result< T >
  where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
  {
    match var_opt( key )
    {
      None => Ok( default ),
      Some( raw ) => raw.parse().map_err( |e| ConfigError::Invalid
      {
        key: format!( "{ENV_PREFIX}{key}" ),
        message: format!( "{e}" ),
      } ),
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;

    // Env-var tests mutate process state; keep them in one test to avoid
    // interleaving with parallel test threads.
    #[ test ]
    fn from_env_defaults_and_overrides()
    {
      std::env::remove_var( "REINS_DATABASE_URL" );
      std::env::remove_var( "REINS_PRIMARY_EXEC_URL" );
      std::env::remove_var( "REINS_BREAKER_FAILURE_THRESHOLD" );

      let config = EngineConfig::from_env().unwrap();
      assert_eq!( config.database_url, "sqlite://reins.db?mode=rwc" );
      assert_eq!( config.primary_exec_url, None );
      assert_eq!( config.breaker, BreakerConfig::default() );
      assert_eq!( config.exec_timeout_secs, 5 );
      assert_eq!( config.webhook_max_attempts, 3 );

      std::env::set_var( "REINS_BREAKER_FAILURE_THRESHOLD", "5" );
      std::env::set_var( "REINS_PRIMARY_EXEC_URL", "http://exec.internal:9000" );
      let config = EngineConfig::from_env().unwrap();
      assert_eq!( config.breaker.failure_threshold, 5 );
      assert_eq!( config.primary_exec_url.as_deref(), Some( "http://exec.internal:9000" ) );

      std::env::set_var( "REINS_BREAKER_FAILURE_THRESHOLD", "not-a-number" );
      assert!( EngineConfig::from_env().is_err() );

      std::env::remove_var( "REINS_BREAKER_FAILURE_THRESHOLD" );
      std::env::remove_var( "REINS_PRIMARY_EXEC_URL" );
    }
  }
}

#[cfg(feature = "enabled")]
pub use implementation::*;
