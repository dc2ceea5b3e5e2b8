//! In-memory store and fixtures shared by the expense tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use chrono::Utc;
use hostfund_shared::types::{CollectiveId, Currency, ExpenseId, ExpenseItemId, UserId};

use crate::expense::context::RequestContext;
use crate::expense::error::ExpenseError;
use crate::expense::feature::ConfiguredFeatureGate;
use crate::expense::store::ExpenseStore;
use crate::expense::types::{
    Collective, CollectiveType, Expense, ExpenseItem, ExpenseStatus, PayeeLocation,
    StatusTransition,
};
use crate::expense::user::{MemberRole, RemoteUser};

/// Store holding a single expense and the collectives around it.
pub(crate) struct InMemoryStore {
    collectives: Mutex<HashMap<CollectiveId, Collective>>,
    expense: Mutex<Expense>,
    items: Mutex<Vec<ExpenseItem>>,
    activities: Mutex<Vec<StatusTransition>>,
    balance: AtomicI64,
    lookups: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryStore {
    fn new(expense: Expense) -> Self {
        Self {
            collectives: Mutex::new(HashMap::new()),
            expense: Mutex::new(expense),
            items: Mutex::new(Vec::new()),
            activities: Mutex::new(Vec::new()),
            balance: AtomicI64::new(0),
            lookups: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    fn put_collective(&self, collective: Collective) {
        self.collectives
            .lock()
            .unwrap()
            .insert(collective.id, collective);
    }

    fn put_expense(&self, expense: Expense) {
        *self.expense.lock().unwrap() = expense;
    }

    /// Number of `find_collective` calls so far.
    pub(crate) fn collective_lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Makes every subsequent collective lookup fail.
    pub(crate) fn fail_lookups(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Stored status of the expense.
    pub(crate) fn status(&self) -> ExpenseStatus {
        self.expense.lock().unwrap().status
    }

    /// Overwrites the stored status, as a concurrent writer would.
    pub(crate) fn set_status(&self, status: ExpenseStatus) {
        self.expense.lock().unwrap().status = status;
    }

    /// Transitions applied so far, oldest first.
    pub(crate) fn activities(&self) -> Vec<StatusTransition> {
        self.activities.lock().unwrap().clone()
    }
}

impl ExpenseStore for InMemoryStore {
    async fn find_collective(&self, id: CollectiveId) -> Result<Option<Collective>, ExpenseError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ExpenseError::Database("connection reset".to_string()));
        }
        Ok(self.collectives.lock().unwrap().get(&id).cloned())
    }

    async fn collective_balance(&self, _collective: &Collective) -> Result<i64, ExpenseError> {
        Ok(self.balance.load(Ordering::SeqCst))
    }

    async fn expense_items(&self, expense_id: ExpenseId) -> Result<Vec<ExpenseItem>, ExpenseError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| item.expense_id == expense_id)
            .cloned()
            .collect())
    }

    async fn apply_transition(&self, transition: StatusTransition) -> Result<Expense, ExpenseError> {
        let mut expense = self.expense.lock().unwrap();
        if expense.id != transition.expense_id {
            return Err(ExpenseError::NotFound(transition.expense_id));
        }
        if expense.status != transition.from {
            return Err(ExpenseError::StaleStatus {
                expected: transition.from,
                actual: expense.status,
            });
        }

        expense.status = transition.to;
        expense.last_edited_by_id = Some(transition.edited_by);
        expense.updated_at = Utc::now();
        self.activities.lock().unwrap().push(transition);
        Ok(expense.clone())
    }
}

fn collective(collective_type: CollectiveType, slug: &str) -> Collective {
    Collective {
        id: CollectiveId::new(),
        collective_type,
        slug: slug.to_string(),
        host_collective_id: None,
        parent_collective_id: None,
        is_active: true,
        currency: Currency::Usd,
    }
}

/// A pending $1,000.00 expense billed to an active hosted collective.
pub(crate) struct Fixture {
    pub(crate) store: InMemoryStore,
    pub(crate) features: ConfiguredFeatureGate,
    pub(crate) expense: Expense,
    pub(crate) collective: Collective,
    pub(crate) host: Collective,
    pub(crate) payee: Collective,
    parent_host: Option<Collective>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let host = collective(CollectiveType::Organization, "host");
        let mut billed = collective(CollectiveType::Collective, "webpack");
        billed.host_collective_id = Some(host.id);
        let payee = collective(CollectiveType::User, "payee");

        let now = Utc::now();
        let expense = Expense {
            id: ExpenseId::new(),
            status: ExpenseStatus::Pending,
            amount: 100_000,
            currency: Currency::Usd,
            description: "Conference travel".to_string(),
            collective_id: billed.id,
            from_collective_id: payee.id,
            user_id: UserId::new(),
            last_edited_by_id: None,
            payout_method_id: Some(uuid::Uuid::new_v4()),
            invoice_info: Some("VAT FR123".to_string()),
            payee_location: Some(PayeeLocation {
                address: Some("1 rue de la Paix".to_string()),
                country: Some("FR".to_string()),
            }),
            created_at: now,
            updated_at: now,
        };

        let store = InMemoryStore::new(expense.clone());
        store.put_collective(host.clone());
        store.put_collective(billed.clone());
        store.put_collective(payee.clone());

        Self {
            store,
            features: ConfiguredFeatureGate::new(),
            expense,
            collective: billed,
            host,
            payee,
            parent_host: None,
        }
    }

    pub(crate) fn with_status(mut self, status: ExpenseStatus) -> Self {
        self.expense.status = status;
        self.store.put_expense(self.expense.clone());
        self
    }

    pub(crate) fn with_balance(self, balance: i64) -> Self {
        self.store.balance.store(balance, Ordering::SeqCst);
        self
    }

    pub(crate) fn with_collective_currency(mut self, currency: Currency) -> Self {
        self.collective.currency = currency;
        self.store.put_collective(self.collective.clone());
        self
    }

    pub(crate) fn with_inactive_collective(mut self) -> Self {
        self.collective.is_active = false;
        self.store.put_collective(self.collective.clone());
        self
    }

    /// Turns the billed collective into an event whose parent has its own host.
    pub(crate) fn with_event_collective(mut self) -> Self {
        let parent_host = collective(CollectiveType::Organization, "parent-host");
        let mut parent = collective(CollectiveType::Collective, "parent");
        parent.host_collective_id = Some(parent_host.id);

        self.collective.collective_type = CollectiveType::Event;
        self.collective.parent_collective_id = Some(parent.id);

        self.store.put_collective(parent_host.clone());
        self.store.put_collective(parent);
        self.store.put_collective(self.collective.clone());
        self.parent_host = Some(parent_host);
        self
    }

    pub(crate) fn with_item(self, url: &str) -> Self {
        self.store.items.lock().unwrap().push(ExpenseItem {
            id: ExpenseItemId::new(),
            expense_id: self.expense.id,
            amount: self.expense.amount,
            description: Some("Train ticket".to_string()),
            url: Some(url.to_string()),
            incurred_at: Utc::now(),
        });
        self
    }

    pub(crate) fn parent_host_id(&self) -> Option<CollectiveId> {
        self.parent_host.as_ref().map(|host| host.id)
    }

    pub(crate) fn author(&self) -> RemoteUser {
        RemoteUser::new(self.expense.user_id, self.payee.id)
    }

    pub(crate) fn collective_admin(&self) -> RemoteUser {
        RemoteUser::new(UserId::new(), CollectiveId::new())
            .with_role(MemberRole::Admin, self.collective.id)
    }

    pub(crate) fn host_admin(&self) -> RemoteUser {
        RemoteUser::new(UserId::new(), CollectiveId::new())
            .with_role(MemberRole::Admin, self.host.id)
    }

    pub(crate) fn accountant_of(&self, collective_id: CollectiveId) -> RemoteUser {
        RemoteUser::new(UserId::new(), CollectiveId::new())
            .with_role(MemberRole::Accountant, collective_id)
    }

    pub(crate) fn stranger(&self) -> RemoteUser {
        RemoteUser::new(UserId::new(), CollectiveId::new())
    }

    pub(crate) fn ctx(&self, user: Option<RemoteUser>) -> RequestContext<'_, InMemoryStore> {
        RequestContext::new(user, &self.store, &self.features)
    }
}
