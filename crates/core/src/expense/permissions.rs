//! Who may see and change an expense.
//!
//! Capability predicates answer one question about the requester and an
//! expense. They return `Ok(false)` for a denial and only fail when a lookup
//! fails. Every check denies unauthenticated requesters before touching the
//! store.

use serde::Serialize;

use crate::expense::context::RequestContext;
use crate::expense::error::ExpenseResult;
use crate::expense::feature::{Feature, FeatureGate};
use crate::expense::store::ExpenseStore;
use crate::expense::types::{Expense, ExpenseItem, ExpenseStatus};
use crate::expense::user::MemberRole;

/// A relationship between the requester and an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Author of the expense, or admin of the payee.
    Owner,
    /// Admin of the collective the expense is billed to.
    CollectiveAdmin,
    /// Accountant of the billed collective, its host, or its parent's host.
    CollectiveAccountant,
    /// Admin of the billed collective's host, while the collective is active.
    HostAdmin,
}

/// May read payout details, invoices, receipts and addresses.
const SENSITIVE_DATA_VIEWERS: &[Capability] = &[
    Capability::Owner,
    Capability::CollectiveAdmin,
    Capability::CollectiveAccountant,
    Capability::HostAdmin,
];

/// May approve, unapprove and reject.
const STATUS_MANAGERS: &[Capability] = &[Capability::CollectiveAdmin, Capability::HostAdmin];

/// Every permission of the requester on one expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct ExpensePermissions {
    /// Item URLs and attached files.
    pub can_see_attachments: bool,
    /// Payout method.
    pub can_see_payout_method: bool,
    /// Invoice information.
    pub can_see_invoice_info: bool,
    /// Payee address.
    pub can_see_payee_location: bool,
    /// Verify or resend a draft.
    pub can_verify_draft: bool,
    /// Edit.
    pub can_edit: bool,
    /// Delete.
    pub can_delete: bool,
    /// Pay or schedule for payment.
    pub can_pay: bool,
    /// Approve.
    pub can_approve: bool,
    /// Unapprove.
    pub can_unapprove: bool,
    /// Reject.
    pub can_reject: bool,
    /// Mark as unpaid.
    pub can_mark_as_unpaid: bool,
    /// Comment and read comments.
    pub can_comment: bool,
    /// See which legal documents the payee still owes.
    pub can_view_required_legal_documents: bool,
}

impl<S: ExpenseStore, G: FeatureGate> RequestContext<'_, S, G> {
    /// Author of the expense, or admin of the payee collective.
    pub async fn is_owner(&self, expense: &Expense) -> ExpenseResult<bool> {
        let Some(user) = self.remote_user() else {
            return Ok(false);
        };
        if user.id == expense.user_id || user.is_admin(expense.from_collective_id) {
            return Ok(true);
        }

        let payee = self.collective(expense.from_collective_id).await?;
        Ok(payee.is_some_and(|c| user.is_admin_of_collective(&c)))
    }

    /// Admin of the billed collective.
    pub async fn is_collective_admin(&self, expense: &Expense) -> ExpenseResult<bool> {
        let Some(user) = self.remote_user() else {
            return Ok(false);
        };
        if user.is_admin(expense.collective_id) {
            return Ok(true);
        }

        let collective = self.collective(expense.collective_id).await?;
        Ok(collective.is_some_and(|c| user.is_admin_of_collective(&c)))
    }

    /// Admin of the billed collective's host. Inactive collectives grant nothing.
    pub async fn is_host_admin(&self, expense: &Expense) -> ExpenseResult<bool> {
        let Some(user) = self.remote_user() else {
            return Ok(false);
        };

        let Some(collective) = self.collective(expense.collective_id).await? else {
            return Ok(false);
        };

        Ok(collective.is_active
            && collective
                .host_collective_id
                .is_some_and(|host| user.is_admin(host)))
    }

    /// Accountant of the billed collective, then of its host, then of its
    /// parent's host. The first match wins.
    pub async fn is_collective_accountant(&self, expense: &Expense) -> ExpenseResult<bool> {
        let Some(user) = self.remote_user() else {
            return Ok(false);
        };
        let accountant = [MemberRole::Accountant];

        if user.has_role(&accountant, expense.collective_id) {
            return Ok(true);
        }

        let Some(collective) = self.collective(expense.collective_id).await? else {
            return Ok(false);
        };
        if collective
            .host_collective_id
            .is_some_and(|host| user.has_role(&accountant, host))
        {
            return Ok(true);
        }

        let Some(parent_id) = collective.parent_collective_id else {
            return Ok(false);
        };
        let parent = self.collective(parent_id).await?;
        Ok(parent
            .and_then(|p| p.host_collective_id)
            .is_some_and(|host| user.has_role(&accountant, host)))
    }

    /// Evaluates one capability.
    pub async fn holds(&self, capability: Capability, expense: &Expense) -> ExpenseResult<bool> {
        match capability {
            Capability::Owner => self.is_owner(expense).await,
            Capability::CollectiveAdmin => self.is_collective_admin(expense).await,
            Capability::CollectiveAccountant => self.is_collective_accountant(expense).await,
            Capability::HostAdmin => self.is_host_admin(expense).await,
        }
    }

    /// True if the requester holds at least one of `conditions`, tried in order.
    ///
    /// Always false for unauthenticated requests.
    pub async fn meets_one_condition(
        &self,
        expense: &Expense,
        conditions: &[Capability],
    ) -> ExpenseResult<bool> {
        if self.remote_user().is_none() {
            return Ok(false);
        }

        for condition in conditions {
            if self.holds(*condition, expense).await? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Authenticated, allowed to use expenses, and `expense` is in one of `statuses`.
    fn expense_gate(&self, expense: &Expense, statuses: &[ExpenseStatus]) -> bool {
        self.remote_user().is_some()
            && self.can_use_feature(Feature::UseExpenses)
            && statuses.contains(&expense.status)
    }

    /// Item URLs and attached files.
    pub async fn can_see_attachments(&self, expense: &Expense) -> ExpenseResult<bool> {
        self.meets_one_condition(expense, SENSITIVE_DATA_VIEWERS).await
    }

    /// Payout method.
    pub async fn can_see_payout_method(&self, expense: &Expense) -> ExpenseResult<bool> {
        self.meets_one_condition(expense, SENSITIVE_DATA_VIEWERS).await
    }

    /// Invoice information.
    pub async fn can_see_invoice_info(&self, expense: &Expense) -> ExpenseResult<bool> {
        self.meets_one_condition(expense, SENSITIVE_DATA_VIEWERS).await
    }

    /// Payee address.
    pub async fn can_see_payee_location(&self, expense: &Expense) -> ExpenseResult<bool> {
        self.meets_one_condition(expense, SENSITIVE_DATA_VIEWERS).await
    }

    /// Verify or resend a draft.
    pub async fn can_verify_draft(&self, expense: &Expense) -> ExpenseResult<bool> {
        self.meets_one_condition(
            expense,
            &[
                Capability::Owner,
                Capability::CollectiveAdmin,
                Capability::HostAdmin,
            ],
        )
        .await
    }

    /// Edit, as long as the expense is not paid, in flight or a draft.
    pub async fn can_edit(&self, expense: &Expense) -> ExpenseResult<bool> {
        let editable = [
            ExpenseStatus::Unverified,
            ExpenseStatus::Pending,
            ExpenseStatus::Approved,
            ExpenseStatus::Rejected,
            ExpenseStatus::Error,
            ExpenseStatus::ScheduledForPayment,
        ];
        if !self.expense_gate(expense, &editable) {
            return Ok(false);
        }
        self.meets_one_condition(
            expense,
            &[
                Capability::Owner,
                Capability::HostAdmin,
                Capability::CollectiveAdmin,
            ],
        )
        .await
    }

    /// Delete; only rejected expenses can go.
    pub async fn can_delete(&self, expense: &Expense) -> ExpenseResult<bool> {
        if !self.expense_gate(expense, &[ExpenseStatus::Rejected]) {
            return Ok(false);
        }
        self.meets_one_condition(
            expense,
            &[
                Capability::Owner,
                Capability::CollectiveAdmin,
                Capability::HostAdmin,
            ],
        )
        .await
    }

    /// Pay or schedule for payment.
    pub async fn can_pay(&self, expense: &Expense) -> ExpenseResult<bool> {
        if !self.expense_gate(expense, &[ExpenseStatus::Approved, ExpenseStatus::Error]) {
            return Ok(false);
        }
        self.is_host_admin(expense).await
    }

    /// Approve.
    pub async fn can_approve(&self, expense: &Expense) -> ExpenseResult<bool> {
        if !self.expense_gate(expense, &[ExpenseStatus::Pending, ExpenseStatus::Rejected]) {
            return Ok(false);
        }
        self.meets_one_condition(expense, STATUS_MANAGERS).await
    }

    /// Reject.
    pub async fn can_reject(&self, expense: &Expense) -> ExpenseResult<bool> {
        if !self.expense_gate(expense, &[ExpenseStatus::Pending, ExpenseStatus::Unverified]) {
            return Ok(false);
        }
        self.meets_one_condition(expense, STATUS_MANAGERS).await
    }

    /// Unapprove.
    pub async fn can_unapprove(&self, expense: &Expense) -> ExpenseResult<bool> {
        if !self.expense_gate(expense, &[ExpenseStatus::Approved]) {
            return Ok(false);
        }
        self.meets_one_condition(expense, STATUS_MANAGERS).await
    }

    /// Mark a paid expense as unpaid.
    pub async fn can_mark_as_unpaid(&self, expense: &Expense) -> ExpenseResult<bool> {
        if !self.expense_gate(expense, &[ExpenseStatus::Paid]) {
            return Ok(false);
        }
        self.is_host_admin(expense).await
    }

    /// Comment on the expense and read its comments.
    pub async fn can_comment(&self, expense: &Expense) -> ExpenseResult<bool> {
        if !self.expense_gate(expense, &ExpenseStatus::ALL) {
            return Ok(false);
        }
        self.meets_one_condition(
            expense,
            &[
                Capability::CollectiveAdmin,
                Capability::HostAdmin,
                Capability::Owner,
            ],
        )
        .await
    }

    /// See which legal documents the payee still has to submit.
    pub async fn can_view_required_legal_documents(
        &self,
        expense: &Expense,
    ) -> ExpenseResult<bool> {
        self.meets_one_condition(
            expense,
            &[
                Capability::HostAdmin,
                Capability::CollectiveAccountant,
                Capability::Owner,
            ],
        )
        .await
    }

    /// All permissions of the requester on `expense`.
    pub async fn permissions(&self, expense: &Expense) -> ExpenseResult<ExpensePermissions> {
        if self.remote_user().is_none() {
            return Ok(ExpensePermissions::default());
        }

        Ok(ExpensePermissions {
            can_see_attachments: self.can_see_attachments(expense).await?,
            can_see_payout_method: self.can_see_payout_method(expense).await?,
            can_see_invoice_info: self.can_see_invoice_info(expense).await?,
            can_see_payee_location: self.can_see_payee_location(expense).await?,
            can_verify_draft: self.can_verify_draft(expense).await?,
            can_edit: self.can_edit(expense).await?,
            can_delete: self.can_delete(expense).await?,
            can_pay: self.can_pay(expense).await?,
            can_approve: self.can_approve(expense).await?,
            can_unapprove: self.can_unapprove(expense).await?,
            can_reject: self.can_reject(expense).await?,
            can_mark_as_unpaid: self.can_mark_as_unpaid(expense).await?,
            can_comment: self.can_comment(expense).await?,
            can_view_required_legal_documents: self
                .can_view_required_legal_documents(expense)
                .await?,
        })
    }

    /// Items of `expense`.
    pub async fn expense_items(&self, expense: &Expense) -> ExpenseResult<Vec<ExpenseItem>> {
        self.store().expense_items(expense.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expense::error::ExpenseError;
    use crate::expense::feature::ConfiguredFeatureGate;
    use crate::expense::testing::Fixture;
    use crate::expense::types::CollectiveType;
    use crate::expense::user::RemoteUser;
    use hostfund_shared::types::{CollectiveId, UserId};
    use rstest::rstest;

    #[tokio::test]
    async fn test_unauthenticated_is_denied_without_lookups() {
        let fixture = Fixture::new();
        let ctx = fixture.ctx(None);
        let expense = &fixture.expense;

        assert!(!ctx.can_see_attachments(expense).await.unwrap());
        assert!(!ctx.can_see_payout_method(expense).await.unwrap());
        assert!(!ctx.can_see_invoice_info(expense).await.unwrap());
        assert!(!ctx.can_see_payee_location(expense).await.unwrap());
        assert!(!ctx.can_view_required_legal_documents(expense).await.unwrap());
        assert_eq!(
            ctx.permissions(expense).await.unwrap(),
            ExpensePermissions::default()
        );
        assert_eq!(fixture.store.collective_lookups(), 0);
    }

    #[tokio::test]
    async fn test_author_is_owner_without_lookup() {
        let fixture = Fixture::new();
        let ctx = fixture.ctx(Some(fixture.author()));

        assert!(ctx.is_owner(&fixture.expense).await.unwrap());
        assert_eq!(fixture.store.collective_lookups(), 0);
    }

    #[tokio::test]
    async fn test_payee_admin_is_owner() {
        let fixture = Fixture::new();
        let payee_admin = RemoteUser::new(UserId::new(), CollectiveId::new())
            .with_role(MemberRole::Admin, fixture.payee.id);
        let ctx = fixture.ctx(Some(payee_admin));

        assert!(ctx.is_owner(&fixture.expense).await.unwrap());
    }

    #[tokio::test]
    async fn test_host_admin_requires_active_collective() {
        let fixture = Fixture::new().with_inactive_collective();
        let ctx = fixture.ctx(Some(fixture.host_admin()));

        assert!(!ctx.is_host_admin(&fixture.expense).await.unwrap());
        assert!(!ctx.can_see_payout_method(&fixture.expense).await.unwrap());
    }

    #[tokio::test]
    async fn test_host_admin_of_active_collective() {
        let fixture = Fixture::new();
        let ctx = fixture.ctx(Some(fixture.host_admin()));

        assert!(ctx.is_host_admin(&fixture.expense).await.unwrap());
        assert!(!ctx.is_collective_admin(&fixture.expense).await.unwrap());
    }

    #[tokio::test]
    async fn test_parent_admin_is_collective_admin_of_event() {
        let fixture = Fixture::new().with_event_collective();
        let parent_id = fixture.collective.parent_collective_id.unwrap();
        let parent_admin = RemoteUser::new(UserId::new(), CollectiveId::new())
            .with_role(MemberRole::Admin, parent_id);
        let ctx = fixture.ctx(Some(parent_admin));

        assert_eq!(fixture.collective.collective_type, CollectiveType::Event);
        assert!(ctx.is_collective_admin(&fixture.expense).await.unwrap());
    }

    #[tokio::test]
    async fn test_accountant_of_collective_needs_no_lookup() {
        let fixture = Fixture::new();
        let ctx = fixture.ctx(Some(fixture.accountant_of(fixture.collective.id)));

        assert!(ctx.is_collective_accountant(&fixture.expense).await.unwrap());
        assert_eq!(fixture.store.collective_lookups(), 0);
    }

    #[tokio::test]
    async fn test_accountant_of_host() {
        let fixture = Fixture::new();
        let ctx = fixture.ctx(Some(fixture.accountant_of(fixture.host.id)));

        assert!(ctx.is_collective_accountant(&fixture.expense).await.unwrap());
        assert_eq!(fixture.store.collective_lookups(), 1);
    }

    #[tokio::test]
    async fn test_accountant_of_parent_host_for_event() {
        let fixture = Fixture::new().with_event_collective();
        let parent_host = fixture.parent_host_id().unwrap();
        let ctx = fixture.ctx(Some(fixture.accountant_of(parent_host)));

        assert!(ctx.is_collective_accountant(&fixture.expense).await.unwrap());
        // the event itself, then its parent
        assert_eq!(fixture.store.collective_lookups(), 2);
    }

    #[tokio::test]
    async fn test_parent_host_not_consulted_when_host_matches() {
        let fixture = Fixture::new().with_event_collective();
        let ctx = fixture.ctx(Some(fixture.accountant_of(fixture.host.id)));

        assert!(ctx.is_collective_accountant(&fixture.expense).await.unwrap());
        assert_eq!(fixture.store.collective_lookups(), 1);
    }

    #[tokio::test]
    async fn test_accountant_cannot_manage_status() {
        let fixture = Fixture::new();
        let ctx = fixture.ctx(Some(fixture.accountant_of(fixture.collective.id)));

        assert!(ctx.can_see_attachments(&fixture.expense).await.unwrap());
        assert!(!ctx.can_approve(&fixture.expense).await.unwrap());
        assert!(!ctx.can_reject(&fixture.expense).await.unwrap());
    }

    #[tokio::test]
    async fn test_stranger_sees_nothing() {
        let fixture = Fixture::new();
        let ctx = fixture.ctx(Some(fixture.stranger()));

        let permissions = ctx.permissions(&fixture.expense).await.unwrap();
        assert_eq!(permissions, ExpensePermissions::default());
    }

    #[rstest]
    #[case(ExpenseStatus::Pending, true)]
    #[case(ExpenseStatus::Rejected, true)]
    #[case(ExpenseStatus::Approved, false)]
    #[case(ExpenseStatus::Paid, false)]
    #[case(ExpenseStatus::Draft, false)]
    #[tokio::test]
    async fn test_can_approve_by_status(#[case] status: ExpenseStatus, #[case] expected: bool) {
        let fixture = Fixture::new().with_status(status);
        let ctx = fixture.ctx(Some(fixture.collective_admin()));

        assert_eq!(ctx.can_approve(&fixture.expense).await.unwrap(), expected);
    }

    #[rstest]
    #[case(ExpenseStatus::Paid, false)]
    #[case(ExpenseStatus::Processing, false)]
    #[case(ExpenseStatus::Draft, false)]
    #[case(ExpenseStatus::Pending, true)]
    #[case(ExpenseStatus::ScheduledForPayment, true)]
    #[tokio::test]
    async fn test_can_edit_by_status(#[case] status: ExpenseStatus, #[case] expected: bool) {
        let fixture = Fixture::new().with_status(status);
        let ctx = fixture.ctx(Some(fixture.author()));

        assert_eq!(ctx.can_edit(&fixture.expense).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_can_delete_only_rejected() {
        let pending = Fixture::new();
        let rejected = Fixture::new().with_status(ExpenseStatus::Rejected);

        assert!(!pending
            .ctx(Some(pending.author()))
            .can_delete(&pending.expense)
            .await
            .unwrap());
        assert!(rejected
            .ctx(Some(rejected.author()))
            .can_delete(&rejected.expense)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_can_pay_and_mark_as_unpaid_require_host_admin() {
        let approved = Fixture::new().with_status(ExpenseStatus::Approved);
        assert!(approved
            .ctx(Some(approved.host_admin()))
            .can_pay(&approved.expense)
            .await
            .unwrap());
        assert!(!approved
            .ctx(Some(approved.collective_admin()))
            .can_pay(&approved.expense)
            .await
            .unwrap());

        let paid = Fixture::new().with_status(ExpenseStatus::Paid);
        assert!(paid
            .ctx(Some(paid.host_admin()))
            .can_mark_as_unpaid(&paid.expense)
            .await
            .unwrap());
        assert!(!paid
            .ctx(Some(paid.author()))
            .can_mark_as_unpaid(&paid.expense)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_feature_gate_blocks_admins() {
        let fixture = Fixture::new();
        let gate = ConfiguredFeatureGate::new().disable(Feature::UseExpenses);
        let ctx = RequestContext::new(Some(fixture.collective_admin()), &fixture.store, &gate);

        assert!(!ctx.can_approve(&fixture.expense).await.unwrap());
        assert!(!ctx.can_reject(&fixture.expense).await.unwrap());
        assert!(!ctx.can_comment(&fixture.expense).await.unwrap());
        // visibility is not feature-gated
        assert!(ctx.can_see_attachments(&fixture.expense).await.unwrap());
    }

    #[tokio::test]
    async fn test_user_level_feature_restriction() {
        let fixture = Fixture::new();
        let restricted = fixture
            .collective_admin()
            .with_disabled_feature(Feature::UseExpenses);
        let ctx = fixture.ctx(Some(restricted));

        assert!(!ctx.can_approve(&fixture.expense).await.unwrap());
    }

    #[tokio::test]
    async fn test_can_comment() {
        let fixture = Fixture::new();
        assert!(fixture
            .ctx(Some(fixture.author()))
            .can_comment(&fixture.expense)
            .await
            .unwrap());
        assert!(!fixture
            .ctx(Some(fixture.accountant_of(fixture.host.id)))
            .can_comment(&fixture.expense)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_lookup_failure_propagates() {
        let fixture = Fixture::new();
        fixture.store.fail_lookups();
        let ctx = fixture.ctx(Some(fixture.stranger()));

        let result = ctx.can_see_attachments(&fixture.expense).await;
        assert!(matches!(result, Err(ExpenseError::Database(_))));
    }

    #[tokio::test]
    async fn test_permissions_share_collective_lookups() {
        let fixture = Fixture::new();
        let ctx = fixture.ctx(Some(fixture.stranger()));

        ctx.permissions(&fixture.expense).await.unwrap();
        // billed collective and payee, each fetched once
        assert_eq!(fixture.store.collective_lookups(), 2);
    }

    #[tokio::test]
    async fn test_expense_items() {
        let fixture = Fixture::new().with_item("https://example.com/receipt.pdf");
        let ctx = fixture.ctx(Some(fixture.author()));

        let items = ctx.expense_items(&fixture.expense).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].expense_id, fixture.expense.id);
    }
}
