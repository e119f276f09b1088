//! HTTP primary execution backend

use crate::backend::{ ExecutionBackend, ExecutionReceipt, ExecutionRequest };
use reins_types::{ Error, Result };
use std::time::Duration;

/// Primary execution service reached over HTTP
///
/// POSTs `{from, to, amount, token, chain_id, memo?}` to
/// `<base_url>/execute` and expects `{tx_hash}` back. Every call carries
/// an explicit timeout; timeouts and 5xx responses surface as Transient
/// errors so the bridge's breaker counts them.
#[ derive( Debug, Clone ) ]
pub struct HttpExecutionBackend
{
  client: reqwest::Client,
  base_url: String,
  timeout: Duration,
}

impl HttpExecutionBackend
{
  /// Create backend against a base URL with a per-call timeout
  ///
  /// # Errors
  ///
  /// `Validation` when the reqwest client cannot be constructed.
  pub fn new( base_url: impl Into< String >, timeout: Duration ) -> Result< Self >
  {
    let client = reqwest::Client::builder()
      .timeout( timeout )
      .build()
      .map_err( |e| Error::validation( format!( "http client construction failed: {e}" ) ) )?;

    Ok( Self
    {
      client,
      base_url: base_url.into(),
      timeout,
    } )
  }

  /// Configured per-call timeout
  pub fn timeout( &self ) -> Duration
  {
    self.timeout
  }
}

#[ async_trait::async_trait ]
impl ExecutionBackend for HttpExecutionBackend
{
  async fn execute( &self, request: &ExecutionRequest ) -> Result< ExecutionReceipt >
  {
    let url = format!( "{}/execute", self.base_url.trim_end_matches( '/' ) );

    let response = self.client
      .post( &url )
      .json( request )
      .send()
      .await
      .map_err( |e|
      {
        if e.is_timeout()
        {
          Error::transient( format!( "execution call timed out after {:?}", self.timeout ), None )
        }
        else
        {
          Error::transient( format!( "execution call failed: {e}" ), None )
        }
      } )?;

    let status = response.status();
    if status.is_server_error()
    {
      return Err( Error::transient( format!( "execution service returned {status}" ), None ) );
    }
    if !status.is_success()
    {
      return Err( Error::Upstream
      {
        message: format!( "execution service rejected the payment: {status}" ),
        fallback_used: false,
      } );
    }

    let receipt: ExecutionReceipt = response
      .json()
      .await
      .map_err( |e| Error::Upstream
      {
        message: format!( "malformed execution response: {e}" ),
        fallback_used: false,
      } )?;

    if receipt.tx_hash.is_empty()
    {
      return Err( Error::Upstream
      {
        message: "execution service returned an empty tx_hash".into(),
        fallback_used: false,
      } );
    }

    Ok( receipt )
  }

  fn name( &self ) -> &str
  {
    "primary"
  }
}
