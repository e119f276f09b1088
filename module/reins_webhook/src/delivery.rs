//! Webhook delivery entity

use reins_types::{ AgentId, DeliveryId };
use serde::{ Deserialize, Serialize };

/// Delivery attempt cap; reaching it makes the record terminal
pub const MAX_ATTEMPTS: u32 = 3;

/// Delay before attempt N (indexed by attempts already made)
///
/// The first attempt is immediate, the second comes a minute after the
/// first failure, the third five minutes after the second.
pub const RETRY_DELAYS_SECS: [ i64; 3 ] = [ 0, 60, 300 ];

/// Delivery lifecycle status
#[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
#[ serde( rename_all = "snake_case" ) ]
pub enum DeliveryStatus
{
  /// Enqueued, first attempt not yet made
  Pending,
  /// Claimed by a dispatcher; an attempt is in flight
  Delivering,
  /// A 2xx response arrived; terminal
  Delivered,
  /// Waiting for the next scheduled attempt
  Retrying,
  /// Attempts exhausted; terminal
  Failed,
}

impl DeliveryStatus
{
  /// Stable string form used in storage
  pub fn as_str( self ) -> &'static str
  {
    match self
    {
      Self::Pending => "pending",
      Self::Delivering => "delivering",
      Self::Delivered => "delivered",
      Self::Retrying => "retrying",
      Self::Failed => "failed",
    }
  }

  /// Whether this status admits no further attempts
  pub fn is_terminal( self ) -> bool
  {
    matches!( self, Self::Delivered | Self::Failed )
  }
}

impl std::str::FromStr for DeliveryStatus
{
  type Err = String;

  fn from_str( s: &str ) -> Result< Self, Self::Err >
  {
    match s
    {
      "pending" => Ok( Self::Pending ),
      "delivering" => Ok( Self::Delivering ),
      "delivered" => Ok( Self::Delivered ),
      "retrying" => Ok( Self::Retrying ),
      "failed" => Ok( Self::Failed ),
      other => Err( format!( "unknown delivery status: {other}" ) ),
    }
  }
}

impl std::fmt::Display for DeliveryStatus
{
  fn fmt( &self, f: &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
  {
    f.write_str( self.as_str() )
  }
}

/// One enqueued webhook delivery
#[ derive( Debug, Clone, Serialize, Deserialize ) ]
pub struct WebhookDelivery
{
  /// Entity id; also the `delivery_id` inside the signed body
  pub id: DeliveryId,
  /// Receiving agent
  pub agent_id: AgentId,
  /// Event type, e.g. `payment.executed`
  pub event_type: String,
  /// The frozen envelope body (raw JSON string, the exact signed bytes)
  pub payload: String,
  /// Lifecycle status
  pub status: DeliveryStatus,
  /// Attempts made so far
  pub attempts: u32,
  /// Last attempt instant (epoch ms)
  pub last_attempt_at: Option< i64 >,
  /// When the next attempt is due (epoch ms)
  pub next_retry_at: Option< i64 >,
  /// HTTP status of the last attempt
  pub response_status: Option< u16 >,
  /// Last transport or HTTP error
  pub error_message: Option< String >,
  /// Epoch milliseconds
  pub created_at: i64,
  /// Epoch milliseconds
  pub updated_at: i64,
}
