//! Type-safe entity identifiers with validation
//!
//! All IDs use underscore-separated format: `prefix_uuid`.
//!
//! | Type | Prefix | Use case |
//! |------|--------|----------|
//! | `AgentId` | `agent_` | Autonomous payment agents |
//! | `BudgetId` | `bud_` | Periodized spending envelopes |
//! | `ProposalId` | `prop_` | Payment proposals |
//! | `DeliveryId` | `whd_` | Webhook deliveries |
//!
//! Owners are opaque account identifiers supplied by the surrounding
//! platform; `OwnerId` validates non-emptiness only.

use serde::{ Deserialize, Serialize };
use std::fmt;

/// Entity ID prefixes
pub mod prefix
{
  pub const AGENT: &str = "agent_";
  pub const BUDGET: &str = "bud_";
  pub const PROPOSAL: &str = "prop_";
  pub const DELIVERY: &str = "whd_";
}

/// Errors that can occur during ID parsing
#[ derive( Debug, Clone, PartialEq, Eq, thiserror::Error ) ]
pub enum IdError
{
  #[ error( "Invalid prefix: expected '{expected}', found '{found}'" ) ]
  InvalidPrefix
  {
    expected: &'static str,
    found: String,
  },

  #[ error( "Missing UUID component" ) ]
  MissingUuid,

  #[ error( "Invalid UUID format: '{0}'" ) ]
  InvalidUuid( String ),

  #[ error( "Empty ID string" ) ]
  EmptyId,
}

impl IdError
{
  /// Get machine-readable error code for API responses
  pub fn code( &self ) -> &'static str
  {
    match self {
      Self::InvalidPrefix { .. } => "INVALID_PREFIX",
      Self::MissingUuid => "MISSING_UUID",
      Self::InvalidUuid( .. ) => "INVALID_UUID",
      Self::EmptyId => "EMPTY_ID",
    }
  }
}

/// Validates that a string is a valid UUID (hyphenated lowercase hex)
fn is_valid_uuid( s: &str ) -> bool
{
  if s.len() != 36
  {
    return false;
  }

  let parts: Vec< &str > = s.split( '-' ).collect();
  if parts.len() != 5
  {
    return false;
  }

  let expected_lens = [ 8, 4, 4, 4, 12 ];
  for ( part, &expected_len ) in parts.iter().zip( expected_lens.iter() )
  {
    if part.len() != expected_len
    {
      return false;
    }
    if !part.chars().all( |c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase() )
    {
      return false;
    }
  }

  true
}

/// Macro to define ID types with validation and generation
macro_rules! define_id
{
  (
    $name:ident,
    $prefix:expr,
    $doc:expr
  ) =>
  {
    #[ doc = $doc ]
    #[ derive( Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize ) ]
    #[ serde( try_from = "String", into = "String" ) ]
    pub struct $name( String );

    impl $name
    {
      /// Parse an ID from a string, validating prefix and UUID format
      pub fn parse( s: impl AsRef< str > ) -> Result< Self, IdError >
      {
        let s = s.as_ref();

        if s.is_empty()
        {
          return Err( IdError::EmptyId );
        }

        if !s.starts_with( $prefix )
        {
          return Err( IdError::InvalidPrefix
          {
            expected: $prefix,
            found: s.chars().take( $prefix.len() + 1 ).collect(),
          } );
        }

        let uuid_part = &s[ $prefix.len().. ];
        if uuid_part.is_empty()
        {
          return Err( IdError::MissingUuid );
        }

        if !is_valid_uuid( uuid_part )
        {
          return Err( IdError::InvalidUuid( uuid_part.to_string() ) );
        }

        Ok( Self( s.to_string() ) )
      }

      /// Generate a new random ID
      pub fn generate() -> Self
      {
        Self( format!( "{}{}", $prefix, uuid::Uuid::new_v4() ) )
      }

      /// Create an ID from a known UUID
      pub fn from_uuid( uuid: uuid::Uuid ) -> Self
      {
        Self( format!( "{}{}", $prefix, uuid ) )
      }

      /// Get the ID as a string slice
      pub fn as_str( &self ) -> &str
      {
        &self.0
      }

      /// Get the prefix for this ID type
      pub fn prefix() -> &'static str
      {
        $prefix
      }
    }

    impl fmt::Display for $name
    {
      fn fmt( &self, f: &mut fmt::Formatter< '_ > ) -> fmt::Result
      {
        write!( f, "{}", self.0 )
      }
    }

    impl TryFrom< String > for $name
    {
      type Error = IdError;

      fn try_from( value: String ) -> Result< Self, Self::Error >
      {
        Self::parse( value )
      }
    }

    impl From< $name > for String
    {
      fn from( id: $name ) -> Self
      {
        id.0
      }
    }

    impl AsRef< str > for $name
    {
      fn as_ref( &self ) -> &str
      {
        &self.0
      }
    }

    impl std::str::FromStr for $name
    {
      type Err = IdError;

      fn from_str( s: &str ) -> Result< Self, Self::Err >
      {
        Self::parse( s )
      }
    }
  };
}

define_id!
(
  AgentId,
  prefix::AGENT,
  "Unique identifier for an autonomous payment agent (format: `agent_<uuid>`)"
);

define_id!
(
  BudgetId,
  prefix::BUDGET,
  "Unique identifier for a spending budget (format: `bud_<uuid>`)"
);

define_id!
(
  ProposalId,
  prefix::PROPOSAL,
  "Unique identifier for a payment proposal (format: `prop_<uuid>`)"
);

define_id!
(
  DeliveryId,
  prefix::DELIVERY,
  "Unique identifier for a webhook delivery (format: `whd_<uuid>`)"
);

/// Opaque owner account identifier
///
/// Owners are minted by the surrounding platform; the engine only requires
/// them to be non-empty and compares them by value.
#[ derive( Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize ) ]
#[ serde( try_from = "String", into = "String" ) ]
pub struct OwnerId( String );

impl OwnerId
{
  /// Wrap an opaque owner identifier, rejecting empty strings
  pub fn parse( s: impl Into< String > ) -> Result< Self, IdError >
  {
    let s = s.into();
    if s.is_empty()
    {
      return Err( IdError::EmptyId );
    }
    Ok( Self( s ) )
  }

  /// Get the owner id as a string slice
  pub fn as_str( &self ) -> &str
  {
    &self.0
  }
}

impl fmt::Display for OwnerId
{
  fn fmt( &self, f: &mut fmt::Formatter< '_ > ) -> fmt::Result
  {
    write!( f, "{}", self.0 )
  }
}

impl TryFrom< String > for OwnerId
{
  type Error = IdError;

  fn try_from( value: String ) -> Result< Self, Self::Error >
  {
    Self::parse( value )
  }
}

impl From< OwnerId > for String
{
  fn from( id: OwnerId ) -> Self
  {
    id.0
  }
}

impl AsRef< str > for OwnerId
{
  fn as_ref( &self ) -> &str
  {
    &self.0
  }
}

#[ cfg( test ) ]
mod tests
{
  use super::*;

  #[ test ]
  fn generate_produces_parseable_ids()
  {
    let id = AgentId::generate();
    assert!( id.as_str().starts_with( "agent_" ) );
    let reparsed = AgentId::parse( id.as_str() ).unwrap();
    assert_eq!( id, reparsed );
  }

  #[ test ]
  fn parse_rejects_wrong_prefix()
  {
    let err = BudgetId::parse( "agent_550e8400-e29b-41d4-a716-446655440000" ).unwrap_err();
    assert_eq!( err.code(), "INVALID_PREFIX" );
  }

  #[ test ]
  fn parse_rejects_injection_attempts()
  {
    assert!( AgentId::parse( "agent_'; DROP TABLE agents; --" ).is_err() );
    assert!( AgentId::parse( "agent_../../etc/passwd" ).is_err() );
  }

  #[ test ]
  fn parse_rejects_uppercase_uuid()
  {
    let err = ProposalId::parse( "prop_550E8400-E29B-41D4-A716-446655440000" ).unwrap_err();
    assert_eq!( err.code(), "INVALID_UUID" );
  }

  #[ test ]
  fn parse_rejects_missing_uuid()
  {
    let err = DeliveryId::parse( "whd_" ).unwrap_err();
    assert_eq!( err.code(), "MISSING_UUID" );
  }

  #[ test ]
  fn serde_round_trip()
  {
    let id = ProposalId::generate();
    let json = serde_json::to_string( &id ).unwrap();
    let back: ProposalId = serde_json::from_str( &json ).unwrap();
    assert_eq!( id, back );
  }

  #[ test ]
  fn serde_rejects_invalid()
  {
    let result: Result< AgentId, _ > = serde_json::from_str( "\"bogus\"" );
    assert!( result.is_err() );
  }

  #[ test ]
  fn owner_rejects_empty()
  {
    assert!( OwnerId::parse( "" ).is_err() );
    assert_eq!( OwnerId::parse( "acct_42" ).unwrap().as_str(), "acct_42" );
  }
}
