//! # `reins_webhook`
//!
//! Best-effort-but-durable webhook delivery.
//!
//! Lifecycle events are enqueued as delivery rows, signed with the
//! agent's webhook secret (HMAC-SHA256 over the raw body bytes) and
//! dispatched with capped retries: at most 3 attempts with delays
//! `[0s, 60s, 300s]`. The envelope is frozen at enqueue time, so every
//! attempt of one delivery carries the same body and therefore the same
//! signature.
//!
//! Outbound attempts pass through a per-host circuit breaker; while a
//! host's breaker is open no attempt is made (and none is counted), the
//! delivery just waits out the breaker.

#![cfg_attr(not(feature = "enabled"), allow(unused))]

#[cfg(feature = "enabled")]
pub mod delivery;

#[cfg(feature = "enabled")]
pub mod signer;

#[cfg(feature = "enabled")]
pub mod store;

#[cfg(feature = "enabled")]
pub mod sqlite;

#[cfg(feature = "enabled")]
pub mod memory;

#[cfg(feature = "enabled")]
pub mod transport;

#[cfg(feature = "enabled")]
pub mod pipeline;

#[cfg(feature = "enabled")]
pub use delivery::{ WebhookDelivery, DeliveryStatus, RETRY_DELAYS_SECS, MAX_ATTEMPTS };

#[cfg(feature = "enabled")]
pub use signer::{ WebhookSigner, Envelope };

#[cfg(feature = "enabled")]
pub use store::DeliveryStore;

#[cfg(feature = "enabled")]
pub use sqlite::SqliteDeliveryStore;

#[cfg(feature = "enabled")]
pub use memory::MemoryDeliveryStore;

#[cfg(feature = "enabled")]
pub use transport::{ WebhookTransport, WebhookRequest, ReqwestTransport };

#[cfg(feature = "enabled")]
pub use pipeline::{ WebhookPipeline, PipelineConfig };

/// Schema for the deliveries table, applied by `SqliteDeliveryStore::apply_schema`
#[cfg(feature = "enabled")]
pub const SCHEMA_SQL: &str = include_str!( "../migrations/001_deliveries_schema.sql" );
