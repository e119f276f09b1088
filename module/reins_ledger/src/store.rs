//! Budget persistence seam

use crate::budget::Budget;
use reins_types::{ AgentId, BudgetId, Result };
use rust_decimal::Decimal;

/// Budget persistence operations
///
/// Mutating balances goes through `cas_amounts`: a compare-and-swap on the
/// (used, remaining) pair that returns whether the swap happened. This is
/// the primitive both the debit path and the rollover path build on; it is
/// what makes per-budget debits linearizable across processes.
#[ async_trait::async_trait ]
pub trait BudgetStore: Send + Sync + std::fmt::Debug
{
  /// Insert a freshly created budget
  async fn insert( &self, budget: &Budget ) -> Result< () >;

  /// Fetch by id
  async fn get( &self, id: &BudgetId ) -> Result< Option< Budget > >;

  /// All budgets of an agent, most recently created first
  async fn list_for_agent( &self, agent_id: &AgentId ) -> Result< Vec< Budget > >;

  /// Swap (used, remaining) only if they still hold the expected values
  ///
  /// Returns `true` when the row was updated.
  #[ allow( clippy::too_many_arguments ) ]
  async fn cas_amounts(
    &self,
    id: &BudgetId,
    expected_used: Decimal,
    expected_remaining: Decimal,
    new_used: Decimal,
    new_remaining: Decimal,
    at_ms: i64,
  ) -> Result< bool >;

  /// Swap the allocation only if the balances still hold the expected values
  #[ allow( clippy::too_many_arguments ) ]
  async fn cas_allocation(
    &self,
    id: &BudgetId,
    expected_used: Decimal,
    expected_remaining: Decimal,
    new_amount: Decimal,
    new_remaining: Decimal,
    at_ms: i64,
  ) -> Result< bool >;

  /// Reset the envelope for a new period, guarded by the old period end
  ///
  /// Returns `true` when this caller performed the roll; `false` means a
  /// concurrent reader already rolled it.
  async fn roll(
    &self,
    id: &BudgetId,
    expected_period_end: i64,
    new_start: i64,
    new_end: Option< i64 >,
    at_ms: i64,
  ) -> Result< bool >;

  /// Budgets whose period has ended at `now_ms`
  async fn list_expired( &self, now_ms: i64 ) -> Result< Vec< Budget > >;

  /// Delete a budget
  async fn delete( &self, id: &BudgetId ) -> Result< () >;
}
