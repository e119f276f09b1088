//! Outbound HTTP seam for webhook dispatch

use reins_types::{ Error, Result };
use std::time::Duration;

/// One signed webhook HTTP request
#[ derive( Debug, Clone ) ]
pub struct WebhookRequest
{
  /// Target endpoint
  pub url: String,
  /// Raw body bytes (the signed input)
  pub body: String,
  /// `X-Webhook-Signature` value (HMAC-SHA256 hex)
  pub signature: String,
  /// `X-Webhook-Timestamp` value (unix seconds of this attempt)
  pub timestamp: i64,
  /// `X-Webhook-Event` value
  pub event_type: String,
  /// `X-Webhook-ID` value
  pub delivery_id: String,
}

/// Sends one webhook attempt and reports the HTTP status
#[ async_trait::async_trait ]
pub trait WebhookTransport: Send + Sync + std::fmt::Debug
{
  /// Send the request; `Ok` carries the response status (any code),
  /// `Err` is a transport-level failure (timeout, connection refused)
  async fn deliver( &self, request: &WebhookRequest ) -> Result< u16 >;
}

/// reqwest-based transport with a per-attempt timeout
#[ derive( Debug, Clone ) ]
pub struct ReqwestTransport
{
  client: reqwest::Client,
  timeout: Duration,
}

impl ReqwestTransport
{
  /// Create transport with the given per-attempt timeout
  ///
  /// # Errors
  ///
  /// `Validation` when the reqwest client cannot be constructed.
  pub fn new( timeout: Duration ) -> Result< Self >
  {
    let client = reqwest::Client::builder()
      .timeout( timeout )
      .build()
      .map_err( |e| Error::validation( format!( "http client construction failed: {e}" ) ) )?;

    Ok( Self { client, timeout } )
  }
}

#[ async_trait::async_trait ]
impl WebhookTransport for ReqwestTransport
{
  async fn deliver( &self, request: &WebhookRequest ) -> Result< u16 >
  {
    let response = self.client
      .post( &request.url )
      .header( "Content-Type", "application/json" )
      .header( "X-Webhook-Signature", &request.signature )
      .header( "X-Webhook-Timestamp", request.timestamp.to_string() )
      .header( "X-Webhook-Event", &request.event_type )
      .header( "X-Webhook-ID", &request.delivery_id )
      .body( request.body.clone() )
      .send()
      .await
      .map_err( |e|
      {
        if e.is_timeout()
        {
          Error::transient( format!( "webhook timed out after {:?}", self.timeout ), None )
        }
        else
        {
          Error::transient( format!( "webhook transport error: {e}" ), None )
        }
      } )?;

    Ok( response.status().as_u16() )
  }
}
