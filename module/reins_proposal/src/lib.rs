//! # `reins_proposal`
//!
//! Payment proposal entity and its state machine.
//!
//! A proposal moves through
//!
//! ```text
//! pending  -> approved  (owner or auto-approver)
//! pending  -> rejected  (owner; carries reason)
//! approved -> executing (orchestrator, single entry)
//! executing -> executed (sets tx_hash, executed_at)
//! executing -> failed   (sets error_message)
//! ```
//!
//! `executed`, `failed` and `rejected` are terminal. Every transition is a
//! conditional update pinned on the previous status; of N concurrent
//! attempts exactly one wins and the rest fail with a State error naming
//! the observed state. Each successful transition emits exactly one
//! activity entry, one audit entry and at most one webhook event, in
//! transition order per proposal.

#![cfg_attr(not(feature = "enabled"), allow(unused))]

#[cfg(feature = "enabled")]
pub mod proposal;

#[cfg(feature = "enabled")]
pub mod event;

#[cfg(feature = "enabled")]
pub mod store;

#[cfg(feature = "enabled")]
pub mod sqlite;

#[cfg(feature = "enabled")]
pub mod memory;

#[cfg(feature = "enabled")]
pub mod machine;

#[cfg(feature = "enabled")]
pub use proposal::{ Proposal, ProposalStatus, NewProposal };

#[cfg(feature = "enabled")]
pub use event::{ ProposalEventSink, NullEventSink, event_type };

#[cfg(feature = "enabled")]
pub use store::{ ProposalStore, TransitionFields };

#[cfg(feature = "enabled")]
pub use sqlite::SqliteProposalStore;

#[cfg(feature = "enabled")]
pub use memory::MemoryProposalStore;

#[cfg(feature = "enabled")]
pub use machine::ProposalMachine;

/// Schema for the proposals table, applied by `SqliteProposalStore::apply_schema`
#[cfg(feature = "enabled")]
pub const SCHEMA_SQL: &str = include_str!( "../migrations/001_proposals_schema.sql" );
