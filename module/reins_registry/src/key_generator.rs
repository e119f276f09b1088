//! API key and webhook secret generation
//!
//! Generates cryptographically secure credentials for agent authentication
//! and webhook signing.
//!
//! SHA-256 is used for storage hashing, deliberately: these are
//! 192-bit-entropy random tokens, not passwords. A deterministic fast hash
//! enables `WHERE api_key_hash = ?` lookups; adaptive salted hashes
//! (bcrypt/argon2) would produce a different digest per call and break the
//! lookup while adding nothing against brute force at this entropy.

use rand::RngCore;
use sha2::{ Digest, Sha256 };
use subtle::ConstantTimeEq;

/// Prefix carried by every API key cleartext
pub const API_KEY_PREFIX: &str = "agent_";

/// Prefix carried by every webhook secret cleartext
pub const WEBHOOK_SECRET_PREFIX: &str = "whsec_";

/// Length of the display prefix captured from a fresh key
pub const DISPLAY_PREFIX_LEN: usize = 12;

/// Credential generator for agent API access
#[ derive( Debug, Clone, Default ) ]
pub struct KeyGenerator;

impl KeyGenerator
{
  /// Create new key generator
  pub fn new() -> Self
  {
    Self
  }

  /// Generate an API key: `agent_` followed by 24 random bytes as hex
  pub fn generate_api_key( &self ) -> String
  {
    format!( "{}{}", API_KEY_PREFIX, random_hex() )
  }

  /// Generate a webhook secret: `whsec_` followed by 24 random bytes as hex
  pub fn generate_webhook_secret( &self ) -> String
  {
    format!( "{}{}", WEBHOOK_SECRET_PREFIX, random_hex() )
  }

  /// Hash a credential with SHA-256, hex-encoded (64 chars)
  pub fn hash( &self, cleartext: &str ) -> String
  {
    let mut hasher = Sha256::new();
    hasher.update( cleartext.as_bytes() );
    format!( "{:x}", hasher.finalize() )
  }

  /// Capture the display prefix (first 12 chars) of a fresh key
  pub fn display_prefix( &self, cleartext: &str ) -> String
  {
    cleartext.chars().take( DISPLAY_PREFIX_LEN ).collect()
  }

  /// Verify a cleartext against a stored hash in constant time
  pub fn verify( &self, cleartext: &str, stored_hash: &str ) -> bool
  {
    let computed = self.hash( cleartext );
    computed.as_bytes().ct_eq( stored_hash.as_bytes() ).into()
  }
}

fn random_hex() -> String
{
  let mut bytes = [ 0_u8; 24 ];
  rand::thread_rng().fill_bytes( &mut bytes );
  hex::encode( bytes )
}

#[ cfg( test ) ]
mod tests
{
  use super::*;

  #[ test ]
  fn api_keys_have_prefix_and_length()
  {
    let generator = KeyGenerator::new();
    let key = generator.generate_api_key();
    assert!( key.starts_with( "agent_" ) );
    // "agent_" + 48 hex chars
    assert_eq!( key.len(), 6 + 48 );
  }

  #[ test ]
  fn webhook_secrets_have_prefix()
  {
    let generator = KeyGenerator::new();
    let secret = generator.generate_webhook_secret();
    assert!( secret.starts_with( "whsec_" ) );
    assert_eq!( secret.len(), 6 + 48 );
  }

  #[ test ]
  fn keys_are_unique()
  {
    let generator = KeyGenerator::new();
    let a = generator.generate_api_key();
    let b = generator.generate_api_key();
    assert_ne!( a, b );
  }

  #[ test ]
  fn hash_is_deterministic_and_hex()
  {
    let generator = KeyGenerator::new();
    let key = generator.generate_api_key();
    let h1 = generator.hash( &key );
    let h2 = generator.hash( &key );
    assert_eq!( h1, h2 );
    assert_eq!( h1.len(), 64 );
    assert!( h1.chars().all( |c| c.is_ascii_hexdigit() ) );
  }

  #[ test ]
  fn verify_accepts_only_matching_cleartext()
  {
    let generator = KeyGenerator::new();
    let key = generator.generate_api_key();
    let hash = generator.hash( &key );
    assert!( generator.verify( &key, &hash ) );
    assert!( !generator.verify( "agent_wrong", &hash ) );
  }

  #[ test ]
  fn display_prefix_is_twelve_chars()
  {
    let generator = KeyGenerator::new();
    let key = generator.generate_api_key();
    let prefix = generator.display_prefix( &key );
    assert_eq!( prefix.len(), 12 );
    assert!( key.starts_with( &prefix ) );
  }
}
