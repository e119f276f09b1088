//! # `reins_orchestrator`
//!
//! The auto-execute orchestrator: composes the agent registry, budget
//! ledger, rule engine, proposal state machine, webhook pipeline and
//! execution bridge into the proposal lifecycle.
//!
//! A new proposal is auto-executed when its agent is active with
//! auto-execute enabled, every configured rule passes and a budget
//! envelope can cover it; otherwise it stays pending and the owner is
//! notified. Manual approval runs the same execution path with the
//! owner as actor and no rule check.

#![cfg_attr(not(feature = "enabled"), allow(unused))]

#[cfg(feature = "enabled")]
pub mod notifier;

#[cfg(feature = "enabled")]
pub mod webhook_sink;

#[cfg(feature = "enabled")]
pub mod orchestrator;

#[cfg(feature = "enabled")]
pub mod engine;

#[cfg(feature = "enabled")]
pub use notifier::{ Notifier, NullNotifier, notification_kind };

#[cfg(feature = "enabled")]
pub use webhook_sink::WebhookEventSink;

#[cfg(feature = "enabled")]
pub use orchestrator::{ Orchestrator, LifecycleResult, LifecycleOutcome, HoldReason };

#[cfg(feature = "enabled")]
pub use engine::Engine;
