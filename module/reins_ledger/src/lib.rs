//! # `reins_ledger`
//!
//! Periodized budget ledger.
//!
//! Each budget is a spending envelope per (agent, token, chain) with the
//! invariant `used + remaining == amount` at all times. Debits are
//! linearizable per budget: two concurrent debits whose sum exceeds the
//! remaining balance cannot both succeed.
//!
//! Period rollover is lazy: any read observing `now >= period_end` resets
//! the envelope (used back to zero, fresh period window) before returning.
//! Unspent balance does not carry over.

#![cfg_attr(not(feature = "enabled"), allow(unused))]

#[cfg(feature = "enabled")]
pub mod budget;

#[cfg(feature = "enabled")]
pub mod store;

#[cfg(feature = "enabled")]
pub mod sqlite;

#[cfg(feature = "enabled")]
pub mod memory;

#[cfg(feature = "enabled")]
pub mod ledger;

#[cfg(feature = "enabled")]
pub use budget::{ Budget, BudgetPeriod, CreateBudgetInput, BudgetUtilization, period_end_after };

#[cfg(feature = "enabled")]
pub use store::BudgetStore;

#[cfg(feature = "enabled")]
pub use sqlite::SqliteBudgetStore;

#[cfg(feature = "enabled")]
pub use memory::MemoryBudgetStore;

#[cfg(feature = "enabled")]
pub use ledger::BudgetLedger;

/// Schema for the budgets table, applied by `SqliteBudgetStore::apply_schema`
#[cfg(feature = "enabled")]
pub const SCHEMA_SQL: &str = include_str!( "../migrations/001_budgets_schema.sql" );
