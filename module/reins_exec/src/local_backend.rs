//! In-process secondary execution backend

use crate::backend::{ ExecutionBackend, ExecutionReceipt, ExecutionRequest };
use rand::RngCore;
use reins_types::Result;

/// Secondary backend that settles payments in-process
///
/// Keeps the platform live while the primary service is down, at reduced
/// throughput. Submission detail is owned by the embedding deployment;
/// this implementation mints the transaction handle and returns
/// immediately.
#[ derive( Debug, Clone, Default ) ]
pub struct LocalExecutionBackend;

impl LocalExecutionBackend
{
  /// Create backend
  pub fn new() -> Self
  {
    Self
  }
}

#[ async_trait::async_trait ]
impl ExecutionBackend for LocalExecutionBackend
{
  async fn execute( &self, request: &ExecutionRequest ) -> Result< ExecutionReceipt >
  {
    let mut bytes = [ 0_u8; 32 ];
    rand::thread_rng().fill_bytes( &mut bytes );
    let tx_hash = format!( "0x{}", hex::encode( bytes ) );

    tracing::info!(
      agent_id = %request.from,
      chain_id = request.chain_id,
      token = %request.token,
      "Payment settled by local backend"
    );

    Ok( ExecutionReceipt { tx_hash } )
  }

  fn name( &self ) -> &str
  {
    "secondary"
  }
}

#[ cfg( test ) ]
mod tests
{
  use super::*;
  use reins_types::{ AgentId, OwnerId };
  use rust_decimal::Decimal;

  #[ tokio::test ]
  async fn mints_unique_tx_hashes()
  {
    let backend = LocalExecutionBackend::new();
    let request = ExecutionRequest
    {
      from: AgentId::generate(),
      to: "0xAB".into(),
      amount: Decimal::new( 10, 0 ),
      token: "USDC".into(),
      chain_id: 1,
      memo: None,
      owner: OwnerId::parse( "acct_1" ).unwrap(),
    };

    let a = backend.execute( &request ).await.unwrap();
    let b = backend.execute( &request ).await.unwrap();
    assert!( a.tx_hash.starts_with( "0x" ) );
    assert_eq!( a.tx_hash.len(), 66 );
    assert_ne!( a.tx_hash, b.tx_hash );
  }
}
