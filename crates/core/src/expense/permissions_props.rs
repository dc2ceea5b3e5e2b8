//! Property-based tests for expense permission checks.
//!
//! - Unauthenticated requesters never see sensitive data
//! - Inactive collectives grant nothing to host admins
//! - Accountant lookup order: collective, host, parent's host

use proptest::prelude::*;

use super::testing::Fixture;
use super::types::ExpenseStatus;
use super::user::RemoteUser;
use super::ExpensePermissions;

fn any_status() -> impl Strategy<Value = ExpenseStatus> {
    prop::sample::select(ExpenseStatus::ALL.to_vec())
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

/// Where an event accountant holds their role.
#[derive(Debug, Clone, Copy)]
enum AccountantOf {
    Event,
    Host,
    ParentHost,
    Nothing,
}

fn accountant_placement() -> impl Strategy<Value = AccountantOf> {
    prop_oneof![
        Just(AccountantOf::Event),
        Just(AccountantOf::Host),
        Just(AccountantOf::ParentHost),
        Just(AccountantOf::Nothing),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// *For any* status, every visibility check denies an unauthenticated
    /// requester without touching the store.
    #[test]
    fn prop_unauthenticated_sees_nothing(status in any_status()) {
        let fixture = Fixture::new().with_status(status);
        let ctx = fixture.ctx(None);
        let expense = &fixture.expense;

        let denied = block_on(async {
            !ctx.can_see_attachments(expense).await.unwrap()
                && !ctx.can_see_payout_method(expense).await.unwrap()
                && !ctx.can_see_invoice_info(expense).await.unwrap()
                && !ctx.can_see_payee_location(expense).await.unwrap()
        });

        prop_assert!(denied);
        prop_assert_eq!(fixture.store.collective_lookups(), 0);
    }

    /// *For any* status, the permission snapshot of an unauthenticated
    /// requester is all false.
    #[test]
    fn prop_unauthenticated_permissions_are_empty(status in any_status()) {
        let fixture = Fixture::new().with_status(status);
        let ctx = fixture.ctx(None);

        let permissions = block_on(ctx.permissions(&fixture.expense)).unwrap();
        prop_assert_eq!(permissions, ExpensePermissions::default());
    }

    /// *For any* status, a host admin is not a host admin of an inactive
    /// collective.
    #[test]
    fn prop_inactive_collective_has_no_host_admin(status in any_status()) {
        let fixture = Fixture::new().with_status(status).with_inactive_collective();
        let ctx = fixture.ctx(Some(fixture.host_admin()));

        prop_assert!(!block_on(ctx.is_host_admin(&fixture.expense)).unwrap());
        prop_assert!(!block_on(ctx.can_pay(&fixture.expense)).unwrap());
        prop_assert!(!block_on(ctx.can_mark_as_unpaid(&fixture.expense)).unwrap());
    }

    /// The parent's host is consulted only when neither the event nor its
    /// host matched.
    #[test]
    fn prop_accountant_precedence(placement in accountant_placement()) {
        let fixture = Fixture::new().with_event_collective();
        let user: RemoteUser = match placement {
            AccountantOf::Event => fixture.accountant_of(fixture.collective.id),
            AccountantOf::Host => fixture.accountant_of(fixture.host.id),
            AccountantOf::ParentHost => {
                fixture.accountant_of(fixture.parent_host_id().unwrap())
            }
            AccountantOf::Nothing => fixture.stranger(),
        };
        let ctx = fixture.ctx(Some(user));

        let is_accountant = block_on(ctx.is_collective_accountant(&fixture.expense)).unwrap();
        let (expected, lookups) = match placement {
            AccountantOf::Event => (true, 0),
            AccountantOf::Host => (true, 1),
            AccountantOf::ParentHost => (true, 2),
            AccountantOf::Nothing => (false, 2),
        };

        prop_assert_eq!(is_accountant, expected);
        prop_assert_eq!(fixture.store.collective_lookups(), lookups);
    }
}
