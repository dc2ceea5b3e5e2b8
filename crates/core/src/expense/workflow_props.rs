//! Property-based tests for expense status transitions.
//!
//! - Approve moves PENDING to APPROVED with one activity
//! - Approve on APPROVED is a no-op
//! - Scheduling never overdraws the collective
//! - Nobody can reject a paid expense

use proptest::prelude::*;

use super::error::ExpenseError;
use super::testing::Fixture;
use super::types::{ActivityType, ExpenseStatus};
use super::user::RemoteUser;
use super::workflow::ExpenseWorkflow;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

/// Requester picked from the fixture's cast.
fn requester(fixture: &Fixture, index: usize) -> RemoteUser {
    match index % 5 {
        0 => fixture.author(),
        1 => fixture.collective_admin(),
        2 => fixture.host_admin(),
        3 => fixture.accountant_of(fixture.host.id),
        _ => fixture.stranger(),
    }
}

fn any_requester() -> impl Strategy<Value = usize> {
    0usize..5
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Approving a pending expense as a collective admin appends exactly one
    /// activity, for plain collectives and events alike.
    #[test]
    fn prop_approve_pending(event in any::<bool>()) {
        let fixture = if event {
            Fixture::new().with_event_collective()
        } else {
            Fixture::new()
        };
        let ctx = fixture.ctx(Some(fixture.collective_admin()));

        let updated = block_on(ExpenseWorkflow::approve(&ctx, fixture.expense.clone())).unwrap();

        prop_assert_eq!(updated.status, ExpenseStatus::Approved);
        let activities = fixture.store.activities();
        prop_assert_eq!(activities.len(), 1);
        prop_assert_eq!(activities[0].activity, ActivityType::CollectiveExpenseApproved);
    }

    /// *For any* authenticated requester, approving an approved expense
    /// returns it unchanged.
    #[test]
    fn prop_approve_is_idempotent(who in any_requester()) {
        let fixture = Fixture::new().with_status(ExpenseStatus::Approved);
        let ctx = fixture.ctx(Some(requester(&fixture, who)));

        let result = block_on(ExpenseWorkflow::approve(&ctx, fixture.expense.clone())).unwrap();

        prop_assert_eq!(result, fixture.expense.clone());
        prop_assert!(fixture.store.activities().is_empty());
    }

    /// *For any* balance below the amount, scheduling fails with an
    /// insufficient funds error and leaves the status alone.
    #[test]
    fn prop_schedule_never_overdraws(balance in -50_000i64..100_000) {
        let fixture = Fixture::new()
            .with_status(ExpenseStatus::Approved)
            .with_balance(balance);
        let ctx = fixture.ctx(Some(fixture.host_admin()));

        let result = block_on(ExpenseWorkflow::schedule_for_payment(&ctx, fixture.expense.clone()));

        let is_insufficient = matches!(result, Err(ExpenseError::InsufficientFunds { .. }));
        prop_assert!(is_insufficient);
        prop_assert_eq!(fixture.store.status(), ExpenseStatus::Approved);
        prop_assert!(fixture.store.activities().is_empty());
    }

    /// *For any* requester, rejecting a paid expense is forbidden.
    #[test]
    fn prop_paid_cannot_be_rejected(who in any_requester()) {
        let fixture = Fixture::new().with_status(ExpenseStatus::Paid);
        let ctx = fixture.ctx(Some(requester(&fixture, who)));

        let result = block_on(ExpenseWorkflow::reject(&ctx, fixture.expense.clone()));

        let is_forbidden = matches!(result, Err(ExpenseError::Forbidden(_)));
        prop_assert!(is_forbidden);
        prop_assert_eq!(fixture.store.status(), ExpenseStatus::Paid);
    }

    /// A host admin's transitions succeed exactly from their allowed statuses.
    #[test]
    fn prop_transitions_follow_status_table(
        status in prop::sample::select(ExpenseStatus::ALL.to_vec()),
    ) {
        let fixture = Fixture::new().with_status(status).with_balance(1_000_000);
        let ctx = fixture.ctx(Some(fixture.host_admin()));

        let scheduled = block_on(ExpenseWorkflow::schedule_for_payment(&ctx, fixture.expense.clone()));
        let may_schedule = matches!(status, ExpenseStatus::Approved | ExpenseStatus::Error);
        prop_assert_eq!(scheduled.is_ok(), may_schedule);

        let fixture = Fixture::new().with_status(status);
        let ctx = fixture.ctx(Some(fixture.host_admin()));
        let unpaid = block_on(ExpenseWorkflow::mark_as_unpaid(&ctx, fixture.expense.clone(), false));
        prop_assert_eq!(unpaid.is_ok(), status == ExpenseStatus::Paid);
    }
}
