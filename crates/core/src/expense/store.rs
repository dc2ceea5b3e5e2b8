//! Persistence port for the expense engine.

use hostfund_shared::types::{CollectiveId, ExpenseId};

use crate::expense::error::ExpenseError;
use crate::expense::types::{Collective, Expense, ExpenseItem, StatusTransition};

/// Data access the engine needs.
///
/// This trait is implemented by the db crate to provide actual database operations.
pub trait ExpenseStore: Send + Sync {
    /// Find a collective by ID.
    fn find_collective(
        &self,
        id: CollectiveId,
    ) -> impl std::future::Future<Output = Result<Option<Collective>, ExpenseError>> + Send;

    /// Current balance of a collective, in minor units of its currency.
    fn collective_balance(
        &self,
        collective: &Collective,
    ) -> impl std::future::Future<Output = Result<i64, ExpenseError>> + Send;

    /// Items of an expense.
    fn expense_items(
        &self,
        expense_id: ExpenseId,
    ) -> impl std::future::Future<Output = Result<Vec<ExpenseItem>, ExpenseError>> + Send;

    /// Apply a status change and its activity record in one transaction.
    ///
    /// Fails with `ExpenseError::StaleStatus` when the stored status is not
    /// `transition.from`. When `transition.refund` is set, the refund
    /// bookkeeping is written in the same transaction.
    fn apply_transition(
        &self,
        transition: StatusTransition,
    ) -> impl std::future::Future<Output = Result<Expense, ExpenseError>> + Send;
}
