//! Expense status transitions.
//!
//! Each action checks the requester, applies the status change through the
//! store together with its activity record, and returns the updated expense.
//!
//! | Action               | From               | To                    | No-op when     |
//! |----------------------|--------------------|-----------------------|----------------|
//! | approve              | PENDING, REJECTED  | APPROVED              | APPROVED       |
//! | unapprove            | APPROVED           | PENDING               | PENDING        |
//! | reject               | PENDING, UNVERIFIED| REJECTED              | REJECTED       |
//! | schedule for payment | APPROVED, ERROR    | SCHEDULED_FOR_PAYMENT | never (error)  |
//! | mark as unpaid       | PAID               | APPROVED              | never          |

use hostfund_shared::types::Money;
use tracing::info;

use crate::expense::context::RequestContext;
use crate::expense::error::{ExpenseError, ExpenseResult};
use crate::expense::feature::FeatureGate;
use crate::expense::store::ExpenseStore;
use crate::expense::types::{ActivityType, Expense, ExpenseStatus, Refund, StatusTransition};

/// Stateless service for expense status transitions.
pub struct ExpenseWorkflow;

impl ExpenseWorkflow {
    /// Approve a pending or rejected expense.
    ///
    /// # Returns
    /// * `Ok(expense)` unchanged if already approved
    /// * `Ok(updated)` with status `Approved`
    /// * `Err(ExpenseError::Unauthenticated)` without a requester
    /// * `Err(ExpenseError::Forbidden)` if not allowed
    pub async fn approve<S: ExpenseStore, G: FeatureGate>(
        ctx: &RequestContext<'_, S, G>,
        expense: Expense,
    ) -> ExpenseResult<Expense> {
        ctx.require_user()?;
        if expense.status == ExpenseStatus::Approved {
            return Ok(expense);
        }
        if !ctx.can_approve(&expense).await? {
            return Err(ExpenseError::forbidden(
                "You are authenticated but forbidden to approve this expense",
            ));
        }

        Self::transition(
            ctx,
            &expense,
            ExpenseStatus::Approved,
            ActivityType::CollectiveExpenseApproved,
            None,
        )
        .await
    }

    /// Move an approved expense back to pending.
    ///
    /// # Returns
    /// * `Ok(expense)` unchanged if already pending
    /// * `Ok(updated)` with status `Pending`
    /// * `Err(ExpenseError::Forbidden)` if not allowed
    pub async fn unapprove<S: ExpenseStore, G: FeatureGate>(
        ctx: &RequestContext<'_, S, G>,
        expense: Expense,
    ) -> ExpenseResult<Expense> {
        ctx.require_user()?;
        if expense.status == ExpenseStatus::Pending {
            return Ok(expense);
        }
        if !ctx.can_unapprove(&expense).await? {
            return Err(ExpenseError::forbidden(
                "You are authenticated but forbidden to unapprove this expense",
            ));
        }

        Self::transition(
            ctx,
            &expense,
            ExpenseStatus::Pending,
            ActivityType::CollectiveExpenseUnapproved,
            None,
        )
        .await
    }

    /// Reject a pending or unverified expense.
    ///
    /// # Returns
    /// * `Ok(expense)` unchanged if already rejected
    /// * `Ok(updated)` with status `Rejected`
    /// * `Err(ExpenseError::Forbidden)` if not allowed
    pub async fn reject<S: ExpenseStore, G: FeatureGate>(
        ctx: &RequestContext<'_, S, G>,
        expense: Expense,
    ) -> ExpenseResult<Expense> {
        ctx.require_user()?;
        if expense.status == ExpenseStatus::Rejected {
            return Ok(expense);
        }
        if !ctx.can_reject(&expense).await? {
            return Err(ExpenseError::forbidden(
                "You are authenticated but forbidden to reject this expense",
            ));
        }

        Self::transition(
            ctx,
            &expense,
            ExpenseStatus::Rejected,
            ActivityType::CollectiveExpenseRejected,
            None,
        )
        .await
    }

    /// Queue an approved expense for payment by the host.
    ///
    /// # Returns
    /// * `Ok(updated)` with status `ScheduledForPayment`
    /// * `Err(ExpenseError::BadRequest)` if already scheduled
    /// * `Err(ExpenseError::Forbidden)` if not allowed
    /// * `Err(ExpenseError::InsufficientFunds)` if the balance is below the amount
    pub async fn schedule_for_payment<S: ExpenseStore, G: FeatureGate>(
        ctx: &RequestContext<'_, S, G>,
        expense: Expense,
    ) -> ExpenseResult<Expense> {
        ctx.require_user()?;
        if expense.status == ExpenseStatus::ScheduledForPayment {
            return Err(ExpenseError::BadRequest(
                "Expense is already scheduled for payment".to_string(),
            ));
        }
        if !ctx.can_pay(&expense).await? {
            return Err(ExpenseError::forbidden(
                "You're authenticated but you can't schedule this expense for payment",
            ));
        }

        let collective = ctx
            .collective(expense.collective_id)
            .await?
            .ok_or(ExpenseError::CollectiveNotFound(expense.collective_id))?;
        // Both sides are reported in the collective's currency.
        let balance = ctx.store().collective_balance(&collective).await?;
        if expense.amount > balance {
            return Err(ExpenseError::InsufficientFunds {
                balance: Money::new(balance, collective.currency),
                amount: Money::new(expense.amount, collective.currency),
            });
        }

        Self::transition(
            ctx,
            &expense,
            ExpenseStatus::ScheduledForPayment,
            ActivityType::CollectiveExpenseScheduledForPayment,
            None,
        )
        .await
    }

    /// Revert a paid expense to approved and refund its payment.
    ///
    /// The store books a refund of the payment debit in the same
    /// transaction; the payment processor fee is refunded only when
    /// `processor_fee_refunded` is set.
    ///
    /// # Returns
    /// * `Ok(updated)` with status `Approved`
    /// * `Err(ExpenseError::Forbidden)` if not paid or not a host admin
    pub async fn mark_as_unpaid<S: ExpenseStore, G: FeatureGate>(
        ctx: &RequestContext<'_, S, G>,
        expense: Expense,
        processor_fee_refunded: bool,
    ) -> ExpenseResult<Expense> {
        ctx.require_user()?;
        if !ctx.can_mark_as_unpaid(&expense).await? {
            return Err(ExpenseError::forbidden(
                "You are authenticated but forbidden to mark this expense as unpaid",
            ));
        }

        Self::transition(
            ctx,
            &expense,
            ExpenseStatus::Approved,
            ActivityType::CollectiveExpenseMarkedAsUnpaid,
            Some(Refund {
                processor_fee_refunded,
            }),
        )
        .await
    }

    async fn transition<S: ExpenseStore, G: FeatureGate>(
        ctx: &RequestContext<'_, S, G>,
        expense: &Expense,
        to: ExpenseStatus,
        activity: ActivityType,
        refund: Option<Refund>,
    ) -> ExpenseResult<Expense> {
        let user = ctx.require_user()?;
        let transition = StatusTransition {
            expense_id: expense.id,
            from: expense.status,
            to,
            edited_by: user.id,
            activity,
            refund,
        };

        let updated = ctx.store().apply_transition(transition).await?;
        info!(
            expense_id = %expense.id,
            from = %expense.status,
            to = %updated.status,
            user_id = %user.id,
            activity = %activity,
            "Expense status updated"
        );
        Ok(updated)
    }
}
