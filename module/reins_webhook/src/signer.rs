//! Webhook payload envelope and HMAC signing

use chrono::{ DateTime, SecondsFormat, Utc };
use hmac::{ Hmac, Mac };
use reins_types::DeliveryId;
use serde::{ Deserialize, Serialize };
use sha2::Sha256;

type HmacSha256 = Hmac< Sha256 >;

/// The signed webhook body
///
/// Field order is part of the wire contract: the serialized bytes are
/// what gets signed, and receivers compare against them verbatim.
#[ derive( Debug, Clone, Serialize, Deserialize ) ]
pub struct Envelope
{
  /// Event type, e.g. `proposal.created`
  pub event: String,
  /// Event-specific object
  pub data: serde_json::Value,
  /// RFC3339 UTC enqueue instant
  pub timestamp: String,
  /// Delivery id; identical across every attempt of one delivery
  pub delivery_id: String,
}

impl Envelope
{
  /// Build the envelope for one delivery
  pub fn new(
    event: impl Into< String >,
    data: serde_json::Value,
    at: DateTime< Utc >,
    delivery_id: &DeliveryId,
  ) -> Self
  {
    Self
    {
      event: event.into(),
      data,
      timestamp: at.to_rfc3339_opts( SecondsFormat::Secs, true ),
      delivery_id: delivery_id.as_str().to_string(),
    }
  }

  /// The exact bytes that go on the wire and into the signature
  pub fn to_body( &self ) -> String
  {
    // serde_json preserves struct field order
    serde_json::to_string( self ).expect( "envelope serialization cannot fail" )
  }
}

/// HMAC-SHA256 signer for webhook bodies
#[ derive( Debug, Clone, Default ) ]
pub struct WebhookSigner;

impl WebhookSigner
{
  /// Create signer
  pub fn new() -> Self
  {
    Self
  }

  /// Sign the raw body bytes, returning lowercase hex
  ///
  /// Deterministic: the same (body, secret) pair always produces the
  /// same signature bit-exactly.
  pub fn sign( &self, body: &[ u8 ], secret: &str ) -> String
  {
    let mut mac = HmacSha256::new_from_slice( secret.as_bytes() )
      .expect( "HMAC accepts any key length" );
    mac.update( body );
    hex::encode( mac.finalize().into_bytes() )
  }

  /// Verify a hex signature over the raw body bytes in constant time
  pub fn verify( &self, body: &[ u8 ], signature_hex: &str, secret: &str ) -> bool
  {
    let Ok( signature ) = hex::decode( signature_hex ) else
    {
      return false;
    };

    let mut mac = HmacSha256::new_from_slice( secret.as_bytes() )
      .expect( "HMAC accepts any key length" );
    mac.update( body );
    mac.verify_slice( &signature ).is_ok()
  }
}

#[ cfg( test ) ]
mod tests
{
  use super::*;
  use chrono::TimeZone;

  #[ test ]
  fn signature_is_deterministic()
  {
    let signer = WebhookSigner::new();
    let body = b"{\"event\":\"payment.executed\"}";
    let a = signer.sign( body, "whsec_abc" );
    let b = signer.sign( body, "whsec_abc" );
    assert_eq!( a, b );
    assert_eq!( a.len(), 64 );
  }

  #[ test ]
  fn verify_accepts_valid_and_rejects_bit_flip()
  {
    let signer = WebhookSigner::new();
    let body = b"payload bytes";
    let signature = signer.sign( body, "whsec_abc" );

    assert!( signer.verify( body, &signature, "whsec_abc" ) );

    // Flip one bit of the body
    let mut tampered = body.to_vec();
    tampered[ 0 ] ^= 0x01;
    assert!( !signer.verify( &tampered, &signature, "whsec_abc" ) );

    // Flip one nibble of the signature
    let mut bad_signature = signature.clone().into_bytes();
    bad_signature[ 0 ] = if bad_signature[ 0 ] == b'0' { b'1' } else { b'0' };
    let bad_signature = String::from_utf8( bad_signature ).unwrap();
    assert!( !signer.verify( body, &bad_signature, "whsec_abc" ) );

    // Wrong secret
    assert!( !signer.verify( body, &signature, "whsec_other" ) );
  }

  #[ test ]
  fn envelope_field_order_is_fixed()
  {
    let at = Utc.with_ymd_and_hms( 2026, 6, 1, 12, 0, 0 ).unwrap();
    let delivery_id = DeliveryId::generate();
    let envelope = Envelope::new(
      "payment.executed",
      serde_json::json!( { "tx_hash": "0xabc" } ),
      at,
      &delivery_id,
    );

    let body = envelope.to_body();
    assert!( body.starts_with( "{\"event\":\"payment.executed\",\"data\":" ) );
    assert!( body.contains( "\"timestamp\":\"2026-06-01T12:00:00Z\"" ) );
    assert!( body.ends_with( &format!( "\"delivery_id\":\"{}\"}}", delivery_id ) ) );
  }
}
