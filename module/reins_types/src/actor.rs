//! Actor labels for audit records

use serde::{ Deserialize, Serialize };

/// Who performed an operation, as recorded in the audit trail
#[ derive( Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize ) ]
#[ serde( rename_all = "snake_case" ) ]
pub enum Actor
{
  /// The agent itself (API-key authenticated)
  Agent,
  /// The human owner
  Owner,
  /// The engine (auto-approval, rollover, retries)
  System,
}

impl Actor
{
  /// Stable string form used in storage and log fields
  pub fn as_str( self ) -> &'static str
  {
    match self
    {
      Self::Agent => "agent",
      Self::Owner => "owner",
      Self::System => "system",
    }
  }
}

impl std::fmt::Display for Actor
{
  fn fmt( &self, f: &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
  {
    f.write_str( self.as_str() )
  }
}

impl std::str::FromStr for Actor
{
  type Err = String;

  fn from_str( s: &str ) -> Result< Self, Self::Err >
  {
    match s
    {
      "agent" => Ok( Self::Agent ),
      "owner" => Ok( Self::Owner ),
      "system" => Ok( Self::System ),
      other => Err( format!( "unknown actor: {other}" ) ),
    }
  }
}
