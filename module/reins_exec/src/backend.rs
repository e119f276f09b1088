//! Execution backend seam

use reins_types::{ AgentId, OwnerId, Result };
use rust_decimal::Decimal;
use serde::{ Deserialize, Serialize };

/// One payment to submit
#[ derive( Debug, Clone, Serialize ) ]
pub struct ExecutionRequest
{
  /// Paying agent (the backend resolves its wallet)
  pub from: AgentId,
  /// Destination address
  pub to: String,
  /// Payment amount
  pub amount: Decimal,
  /// Token symbol
  pub token: String,
  /// Target chain
  pub chain_id: u64,
  /// Optional memo carried on-chain where supported
  #[ serde( skip_serializing_if = "Option::is_none" ) ]
  pub memo: Option< String >,
  /// Owning account, for fallback bookkeeping (not sent upstream)
  #[ serde( skip ) ]
  pub owner: OwnerId,
}

/// Successful execution result
#[ derive( Debug, Clone, Deserialize ) ]
pub struct ExecutionReceipt
{
  /// Transaction hash
  pub tx_hash: String,
}

/// A service that actually submits a payment transaction
///
/// The engine treats it as a black box: success yields a transaction
/// hash, failure an error from the shared taxonomy (Transient failures
/// are what drive the bridge's fallback).
#[ async_trait::async_trait ]
pub trait ExecutionBackend: Send + Sync + std::fmt::Debug
{
  /// Submit one payment
  async fn execute( &self, request: &ExecutionRequest ) -> Result< ExecutionReceipt >;

  /// Human-readable backend name for logs and fallback records
  fn name( &self ) -> &str;
}
