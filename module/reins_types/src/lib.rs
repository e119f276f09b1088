//! # `reins_types`
//!
//! Foundation types shared by every reins engine crate.
//!
//! Provides:
//! - Validated entity identifiers (`agent_`, `bud_`, `prop_`, `whd_` prefixed UUIDs)
//! - The engine-wide error taxonomy with stable machine-readable codes
//! - The `Clock` seam so period rollover and breaker timing are testable
//! - The `Actor` label attached to audit records

#![cfg_attr(not(feature = "enabled"), allow(unused))]

#[cfg(feature = "enabled")]
pub mod ids;

#[cfg(feature = "enabled")]
pub mod error;

#[cfg(feature = "enabled")]
pub mod clock;

#[cfg(feature = "enabled")]
pub mod actor;

#[cfg(feature = "enabled")]
pub use ids::{ AgentId, BudgetId, ProposalId, DeliveryId, OwnerId, IdError };

#[cfg(feature = "enabled")]
pub use error::{ Error, Result };

#[cfg(feature = "enabled")]
pub use clock::{ Clock, SystemClock, ManualClock };

#[cfg(feature = "enabled")]
pub use actor::Actor;
