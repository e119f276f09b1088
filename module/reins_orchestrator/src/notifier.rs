//! Owner notification seam
//!
//! The notification provider (push, e-mail, whatever the platform wires
//! in) lives behind this trait. Calls are best-effort: the orchestrator
//! logs failures and never lets them affect the proposal lifecycle.

use reins_types::{ OwnerId, Result };

/// Notification kinds the orchestrator emits
pub mod notification_kind
{
  pub const APPROVAL_NEEDED: &str = "approval_needed";
  pub const RULE_VIOLATION: &str = "rule_violation";
  pub const BUDGET_UNAVAILABLE: &str = "budget_unavailable";
}

/// Delivers owner-facing notifications
#[ async_trait::async_trait ]
pub trait Notifier: Send + Sync + std::fmt::Debug
{
  /// Send one notification
  async fn notify( &self, owner: &OwnerId, kind: &str, details: serde_json::Value ) -> Result< () >;
}

/// Notifier that drops everything; for tests and headless deployments
#[ derive( Debug, Default, Clone ) ]
pub struct NullNotifier;

#[ async_trait::async_trait ]
impl Notifier for NullNotifier
{
  async fn notify( &self, _owner: &OwnerId, _kind: &str, _details: serde_json::Value ) -> Result< () >
  {
    Ok( () )
  }
}
