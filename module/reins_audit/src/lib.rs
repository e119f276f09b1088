//! # `reins_audit`
//!
//! Append-only activity and audit trail.
//!
//! Every component records what happened here: activities are the
//! owner-facing feed (indexed by agent, owner and action kind), the audit
//! log adds the acting principal and the touched resource. Both are
//! monotonic in time and never mutated.
//!
//! Recording failures must never fail the operation being recorded; the
//! orchestration layer logs and continues.

#![cfg_attr(not(feature = "enabled"), allow(unused))]

#[cfg(feature = "enabled")]
pub mod entry;

#[cfg(feature = "enabled")]
pub mod sink;

#[cfg(feature = "enabled")]
pub mod sqlite;

#[cfg(feature = "enabled")]
pub mod memory;

#[cfg(feature = "enabled")]
pub mod analytics;

#[cfg(feature = "enabled")]
pub use entry::{ ActivityEntry, AuditEntry, NewActivity, NewAudit, action };

#[cfg(feature = "enabled")]
pub use sink::{ ActivitySink, AuditSink };

#[cfg(feature = "enabled")]
pub use sqlite::SqliteAuditStore;

#[cfg(feature = "enabled")]
pub use memory::MemoryAuditStore;

#[cfg(feature = "enabled")]
pub use analytics::ActivitySummary;

/// Schema for the activity/audit tables, applied by `SqliteAuditStore::apply_schema`
#[cfg(feature = "enabled")]
pub const SCHEMA_SQL: &str = include_str!( "../migrations/001_audit_schema.sql" );
