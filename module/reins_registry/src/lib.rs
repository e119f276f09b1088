//! # `reins_registry`
//!
//! Agent registry for the reins engine.
//!
//! Manages the full lifecycle of payment agents: creation with one-time
//! API-key issuance, status enforcement (active/paused/deactivated),
//! webhook endpoint rotation, owner-wide pause/resume, and per-agent
//! request rate limiting.
//!
//! ## Key discipline
//!
//! API keys are high-entropy random tokens (`agent_` + 24 random bytes as
//! hex). They are stored as SHA-256 hex digests and looked up by digest,
//! never by cleartext. SHA-256 is the right hash here: the input already
//! carries 192 bits of entropy, so an adaptive slow hash would add cost
//! without security, and its salt-per-call non-determinism would break the
//! digest lookup. The cleartext is returned exactly once from `create` and
//! never persisted or logged.
//!
//! Webhook secrets (`whsec_` + 24 random bytes hex) follow the same
//! issuance discipline, but their cleartext is retained server-side:
//! HMAC signing needs the actual secret, not a fingerprint.

#![cfg_attr(not(feature = "enabled"), allow(unused))]

#[cfg(feature = "enabled")]
pub mod agent;

#[cfg(feature = "enabled")]
pub mod key_generator;

#[cfg(feature = "enabled")]
pub mod store;

#[cfg(feature = "enabled")]
pub mod sqlite;

#[cfg(feature = "enabled")]
pub mod memory;

#[cfg(feature = "enabled")]
pub mod registry;

#[cfg(feature = "enabled")]
pub mod rate_limiter;

#[cfg(feature = "enabled")]
pub use agent::{ Agent, AgentStatus, AutoExecuteRules, CreateAgentInput, AgentUpdate, CreatedAgent };

#[cfg(feature = "enabled")]
pub use key_generator::KeyGenerator;

#[cfg(feature = "enabled")]
pub use store::AgentStore;

#[cfg(feature = "enabled")]
pub use sqlite::SqliteAgentStore;

#[cfg(feature = "enabled")]
pub use memory::MemoryAgentStore;

#[cfg(feature = "enabled")]
pub use registry::AgentRegistry;

#[cfg(feature = "enabled")]
pub use rate_limiter::AgentRateLimiter;

/// Schema for the agents table, applied by `SqliteAgentStore::apply_schema`
#[cfg(feature = "enabled")]
pub const SCHEMA_SQL: &str = include_str!( "../migrations/001_agents_schema.sql" );
