//! # `reins_exec`
//!
//! Execution bridge and circuit breakers.
//!
//! Payments go to a primary execution service through a per-service
//! circuit breaker; when the breaker is open or the primary fails, the
//! bridge falls back to an in-process secondary backend that keeps the
//! system live at reduced throughput. Which path served a payment is
//! annotated on the result and recorded as a fallback event when the
//! secondary stepped in.
//!
//! Breakers are process-scoped: each one models THIS process's view of a
//! remote service.

#![cfg_attr(not(feature = "enabled"), allow(unused))]

#[cfg(feature = "enabled")]
pub mod breaker;

#[cfg(feature = "enabled")]
pub mod registry;

#[cfg(feature = "enabled")]
pub mod backend;

#[cfg(feature = "enabled")]
pub mod http_backend;

#[cfg(feature = "enabled")]
pub mod local_backend;

#[cfg(feature = "enabled")]
pub mod bridge;

#[cfg(feature = "enabled")]
pub use breaker::{ CircuitBreaker, CircuitState, BreakerConfig, BreakerStats };

#[cfg(feature = "enabled")]
pub use registry::{ BreakerRegistry, PRIMARY_EXEC };

#[cfg(feature = "enabled")]
pub use backend::{ ExecutionBackend, ExecutionRequest, ExecutionReceipt };

#[cfg(feature = "enabled")]
pub use http_backend::HttpExecutionBackend;

#[cfg(feature = "enabled")]
pub use local_backend::LocalExecutionBackend;

#[cfg(feature = "enabled")]
pub use bridge::{ ExecutionBridge, ExecutionOutcome, ServedBy };
