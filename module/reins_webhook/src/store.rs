//! Delivery persistence seam

use crate::delivery::WebhookDelivery;
use reins_types::{ AgentId, DeliveryId, Result };

/// Delivery persistence operations
///
/// `claim` is the multi-scanner safety primitive: it conditionally moves
/// a row out of pending/retrying into delivering and increments the
/// attempt counter; only the caller that got `true` may attempt the
/// delivery.
#[ async_trait::async_trait ]
pub trait DeliveryStore: Send + Sync + std::fmt::Debug
{
  /// Insert a freshly enqueued delivery
  async fn insert( &self, delivery: &WebhookDelivery ) -> Result< () >;

  /// Fetch by id
  async fn get( &self, id: &DeliveryId ) -> Result< Option< WebhookDelivery > >;

  /// Deliveries for an agent, newest first
  async fn list_for_agent( &self, agent_id: &AgentId, limit: u32 ) -> Result< Vec< WebhookDelivery > >;

  /// Ids of deliveries whose next attempt is due at `now_ms`
  async fn due_ids( &self, now_ms: i64, limit: u32 ) -> Result< Vec< DeliveryId > >;

  /// Claim a due delivery for an attempt
  ///
  /// Moves pending/retrying -> delivering and increments `attempts` in
  /// one conditional update. Returns `false` when another scanner won or
  /// the delivery is no longer due.
  async fn claim( &self, id: &DeliveryId, now_ms: i64 ) -> Result< bool >;

  /// Record a successful attempt; terminal
  async fn mark_delivered( &self, id: &DeliveryId, response_status: u16, at_ms: i64 ) -> Result< () >;

  /// Schedule the next attempt after a failure
  async fn mark_retrying(
    &self,
    id: &DeliveryId,
    next_retry_at: i64,
    response_status: Option< u16 >,
    error: &str,
    at_ms: i64,
  ) -> Result< () >;

  /// Record attempt exhaustion; terminal
  async fn mark_failed(
    &self,
    id: &DeliveryId,
    response_status: Option< u16 >,
    error: &str,
    at_ms: i64,
  ) -> Result< () >;

  /// Push a waiting delivery's due instant without burning an attempt
  /// (used while the target host's breaker is open)
  async fn defer( &self, id: &DeliveryId, next_retry_at: i64, at_ms: i64 ) -> Result< () >;
}
