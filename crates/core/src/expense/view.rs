//! Expense as returned to a requester, with sensitive fields redacted.

use chrono::{DateTime, Utc};
use hostfund_shared::types::{CollectiveId, Currency, ExpenseId, ExpenseItemId, UserId};
use serde::Serialize;
use uuid::Uuid;

use crate::expense::context::RequestContext;
use crate::expense::error::ExpenseResult;
use crate::expense::feature::FeatureGate;
use crate::expense::store::ExpenseStore;
use crate::expense::types::{Expense, ExpenseItem, ExpenseStatus, PayeeLocation};

/// One item of an [`ExpenseView`]. `url` is `None` unless attachments are visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseItemView {
    /// ID.
    pub id: ExpenseItemId,
    /// Amount in minor units.
    pub amount: i64,
    /// Description.
    pub description: Option<String>,
    /// Receipt URL.
    pub url: Option<String>,
    /// When the cost was incurred.
    pub incurred_at: DateTime<Utc>,
}

/// Expense fields visible to the requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseView {
    /// ID.
    pub id: ExpenseId,
    /// Current status.
    pub status: ExpenseStatus,
    /// Amount in minor units.
    pub amount: i64,
    /// Currency of the amount.
    pub currency: Currency,
    /// Description.
    pub description: String,
    /// Billed collective.
    pub collective_id: CollectiveId,
    /// Payee.
    pub from_collective_id: CollectiveId,
    /// Author.
    pub user_id: UserId,
    /// Payout method, if visible.
    pub payout_method_id: Option<Uuid>,
    /// Invoice information, if visible.
    pub invoice_info: Option<String>,
    /// Payee address, if visible.
    pub payee_location: Option<PayeeLocation>,
    /// Items.
    pub items: Vec<ExpenseItemView>,
    /// Created at timestamp.
    pub created_at: DateTime<Utc>,
    /// Updated at timestamp.
    pub updated_at: DateTime<Utc>,
}

impl ExpenseView {
    /// Builds the view of `expense` for the requester of `ctx`.
    pub async fn build<S: ExpenseStore, G: FeatureGate>(
        ctx: &RequestContext<'_, S, G>,
        expense: Expense,
    ) -> ExpenseResult<Self> {
        let show_attachments = ctx.can_see_attachments(&expense).await?;
        let show_payout_method = ctx.can_see_payout_method(&expense).await?;
        let show_invoice_info = ctx.can_see_invoice_info(&expense).await?;
        let show_location = ctx.can_see_payee_location(&expense).await?;

        let items = ctx
            .expense_items(&expense)
            .await?
            .into_iter()
            .map(|item| ExpenseItemView::new(item, show_attachments))
            .collect();

        Ok(Self {
            id: expense.id,
            status: expense.status,
            amount: expense.amount,
            currency: expense.currency,
            description: expense.description,
            collective_id: expense.collective_id,
            from_collective_id: expense.from_collective_id,
            user_id: expense.user_id,
            payout_method_id: expense.payout_method_id.filter(|_| show_payout_method),
            invoice_info: expense.invoice_info.filter(|_| show_invoice_info),
            payee_location: expense.payee_location.filter(|_| show_location),
            items,
            created_at: expense.created_at,
            updated_at: expense.updated_at,
        })
    }
}

impl ExpenseItemView {
    fn new(item: ExpenseItem, show_url: bool) -> Self {
        Self {
            id: item.id,
            amount: item.amount,
            description: item.description,
            url: item.url.filter(|_| show_url),
            incurred_at: item.incurred_at,
        }
    }
}
