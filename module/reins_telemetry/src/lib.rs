//! Centralized logging and tracing abstraction for the reins engine
//!
//! Provides unified logging infrastructure across all reins crates.
//! Features:
//! - Structured logging with tracing
//! - Log level configuration at startup
//! - Domain helpers that inject agent/proposal context into every record

#![cfg_attr(not(feature = "enabled"), allow(unused_variables, dead_code))]

#[cfg(feature = "enabled")]
mod implementation
{
  use tracing::level_filters::LevelFilter;

  /// Log level configuration
  #[derive(Debug, Clone, Copy)]
  pub enum LogLevel
  {
    Debug,
    Info,
    Warn,
    Error,
  }

  impl From<LogLevel> for LevelFilter
  {
    fn from(level: LogLevel) -> Self
    {
      match level
      {
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Error => LevelFilter::ERROR,
      }
    }
  }

  /// Initialize logging infrastructure
  ///
  /// Sets up tracing subscriber with specified log level.
  /// Call this once at application startup.
  pub fn init_logging(level: LogLevel) -> Result<(), Box<dyn std::error::Error>>
  {
    use tracing_subscriber::FmtSubscriber;

    let subscriber = FmtSubscriber::builder()
      .with_max_level(level)
      .with_target(false)
      .with_thread_ids(true)
      .with_line_number(true)
      .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
  }

  /// Log an agent lifecycle event
  pub fn log_agent_event(agent_id: &str, event: &str)
  {
    tracing::info!(
      agent_id = %agent_id,
      event = %event,
      "Agent event"
    );
  }

  /// Log a proposal state transition
  pub fn log_transition(proposal_id: &str, from: &str, to: &str, actor: &str)
  {
    tracing::info!(
      proposal_id = %proposal_id,
      from = %from,
      to = %to,
      actor = %actor,
      "Proposal transition"
    );
  }

  /// Log a webhook delivery attempt outcome
  pub fn log_delivery_attempt(delivery_id: &str, attempt: u32, status: &str)
  {
    tracing::info!(
      delivery_id = %delivery_id,
      attempt = attempt,
      status = %status,
      "Webhook delivery attempt"
    );
  }

  /// Log a fallback to the secondary execution backend
  pub fn log_fallback(proposal_id: &str, reason: &str)
  {
    tracing::warn!(
      proposal_id = %proposal_id,
      reason = %reason,
      "Execution fell back to secondary backend"
    );
  }

  /// Log a budget nearing depletion
  pub fn log_budget_warning(agent_id: &str, used: &str, amount: &str)
  {
    tracing::warn!(
      agent_id = %agent_id,
      used = %used,
      amount = %amount,
      "Budget threshold reached"
    );
  }
}

#[cfg(feature = "enabled")]
pub use implementation::*;

#[cfg(not(feature = "enabled"))]
mod stub
{
  /// Stub log level for disabled feature
  #[derive(Debug, Clone, Copy)]
  pub enum LogLevel
  {
    Debug,
    Info,
    Warn,
    Error,
  }

  /// Stub init function
  pub fn init_logging(_level: LogLevel) -> Result<(), Box<dyn std::error::Error>>
  {
    Ok(())
  }

  /// Stub log function
  pub fn log_agent_event(_agent_id: &str, _event: &str) {}

  /// Stub log function
  pub fn log_transition(_proposal_id: &str, _from: &str, _to: &str, _actor: &str) {}

  /// Stub log function
  pub fn log_delivery_attempt(_delivery_id: &str, _attempt: u32, _status: &str) {}

  /// Stub log function
  pub fn log_fallback(_proposal_id: &str, _reason: &str) {}

  /// Stub log function
  pub fn log_budget_warning(_agent_id: &str, _used: &str, _amount: &str) {}
}

#[cfg(not(feature = "enabled"))]
pub use stub::*;
