//! Primary/secondary execution routing

use crate::backend::{ ExecutionBackend, ExecutionRequest };
use crate::registry::{ BreakerRegistry, PRIMARY_EXEC };
use reins_audit::{ action, ActivitySink, NewActivity };
use reins_types::{ Error, Result };
use serde::Serialize;
use std::sync::Arc;

/// Which backend served a payment
#[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize ) ]
#[ serde( rename_all = "snake_case" ) ]
pub enum ServedBy
{
  Primary,
  Secondary,
}

/// Execution result with its serving path
#[ derive( Debug, Clone ) ]
pub struct ExecutionOutcome
{
  /// Transaction hash
  pub tx_hash: String,
  /// Observability field; callers must not branch on it
  pub served_by: ServedBy,
}

/// Routes payments to the primary backend behind a breaker, falling back
/// to the in-process secondary on open circuits or failures
#[ derive( Debug ) ]
pub struct ExecutionBridge
{
  primary: Option< Arc< dyn ExecutionBackend > >,
  secondary: Arc< dyn ExecutionBackend >,
  breakers: Arc< BreakerRegistry >,
  activity: Arc< dyn ActivitySink >,
}

impl ExecutionBridge
{
  /// Create bridge
  ///
  /// `primary: None` routes everything to the secondary without breaker
  /// accounting (single-backend deployments).
  pub fn new(
    primary: Option< Arc< dyn ExecutionBackend > >,
    secondary: Arc< dyn ExecutionBackend >,
    breakers: Arc< BreakerRegistry >,
    activity: Arc< dyn ActivitySink >,
  ) -> Self
  {
    Self { primary, secondary, breakers, activity }
  }

  /// Submit one payment
  ///
  /// # Errors
  ///
  /// `Upstream` with `fallback_used: true` when both paths failed.
  pub async fn execute( &self, request: &ExecutionRequest ) -> Result< ExecutionOutcome >
  {
    let fallback_reason = match &self.primary
    {
      None => None,
      Some( primary ) =>
      {
        let breaker = self.breakers.get( PRIMARY_EXEC );
        match breaker.check()
        {
          Err( open ) =>
          {
            // Short-circuited; the primary is not attempted at all
            Some( open.to_string() )
          }
          Ok( () ) =>
          {
            match primary.execute( request ).await
            {
              Ok( receipt ) =>
              {
                breaker.record_success();
                return Ok( ExecutionOutcome
                {
                  tx_hash: receipt.tx_hash,
                  served_by: ServedBy::Primary,
                } );
              }
              Err( error ) =>
              {
                breaker.record_failure();
                Some( error.to_string() )
              }
            }
          }
        }
      }
    };

    if let Some( reason ) = &fallback_reason
    {
      self.record_fallback( request, reason ).await;
    }

    match self.secondary.execute( request ).await
    {
      Ok( receipt ) => Ok( ExecutionOutcome
      {
        tx_hash: receipt.tx_hash,
        served_by: ServedBy::Secondary,
      } ),
      Err( error ) => Err( Error::Upstream
      {
        message: format!( "secondary backend failed: {error}" ),
        fallback_used: fallback_reason.is_some(),
      } ),
    }
  }

  /// Record that the secondary stepped in; failures logged only
  async fn record_fallback( &self, request: &ExecutionRequest, reason: &str )
  {
    reins_telemetry::log_fallback( request.from.as_str(), reason );

    let activity = NewActivity::new(
      request.from.clone(),
      request.owner.clone(),
      action::EXECUTION_FALLBACK,
    )
    .with_details( serde_json::json!( {
      "reason": reason,
      "token": request.token,
      "chain_id": request.chain_id,
    } ) );

    if let Err( error ) = self.activity.record_activity( activity ).await
    {
      tracing::warn!( agent_id = %request.from, %error, "fallback recording failed" );
    }
  }
}
