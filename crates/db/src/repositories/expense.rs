//! Expense repository backing the expense engine.
//!
//! Status transitions run in one database transaction: the expense row is
//! locked, its status compared and updated, the activity appended and, for
//! an unpaid payment, the refund credit booked against the original debit.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    FromQueryResult, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use hostfund_core::expense::{
    Collective, CollectiveType, Expense, ExpenseError, ExpenseItem, ExpenseResult, ExpenseStatus,
    ExpenseStore, PayeeLocation, Refund, StatusTransition,
};
use hostfund_shared::types::{CollectiveId, Currency, ExpenseId, ExpenseItemId, UserId};

use crate::entities::{activities, collectives, expense_items, expenses, transactions};

const CREDIT: &str = "CREDIT";
const DEBIT: &str = "DEBIT";

/// Expense repository.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    db: DatabaseConnection,
}

impl ExpenseRepository {
    /// Creates a new expense repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds an expense by ID.
    ///
    /// # Errors
    ///
    /// Returns `ExpenseError::Database` if the query fails or the row holds
    /// an unknown status or currency.
    pub async fn find_expense(&self, id: ExpenseId) -> ExpenseResult<Option<Expense>> {
        expenses::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(expense_from_model)
            .transpose()
    }

    /// Books the refund credit compensating the payment debit of `expense`.
    async fn book_refund(
        txn: &DatabaseTransaction,
        expense: &expenses::Model,
        refund: Refund,
        now: DateTimeWithTimeZone,
    ) -> ExpenseResult<transactions::Model> {
        let debit = transactions::Entity::find()
            .filter(transactions::Column::ExpenseId.eq(expense.id))
            .filter(transactions::Column::Kind.eq(DEBIT))
            .filter(transactions::Column::IsRefund.eq(false))
            .filter(transactions::Column::RefundTransactionId.is_null())
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| ExpenseError::BadRequest("Expense has no payment to refund".to_string()))?;

        // The debit includes the processor fee; it comes back only if the
        // processor refunded it.
        let kept_fee = if refund.processor_fee_refunded {
            0
        } else {
            debit.payment_processor_fee
        };
        let credit_id = Uuid::new_v4();
        let credit = transactions::ActiveModel {
            id: Set(credit_id),
            kind: Set(CREDIT.to_string()),
            collective_id: Set(debit.collective_id),
            expense_id: Set(Some(expense.id)),
            amount: Set((-debit.amount - kept_fee).max(0)),
            currency: Set(debit.currency.clone()),
            payment_processor_fee: Set(0),
            is_refund: Set(true),
            refund_transaction_id: Set(Some(debit.id)),
            description: Set(Some(format!("Refund of \"{}\"", expense.description))),
            created_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(db_err)?;

        let mut debit_active: transactions::ActiveModel = debit.into();
        debit_active.refund_transaction_id = Set(Some(credit_id));
        debit_active.update(txn).await.map_err(db_err)?;

        Ok(credit)
    }
}

impl ExpenseStore for ExpenseRepository {
    async fn find_collective(&self, id: CollectiveId) -> ExpenseResult<Option<Collective>> {
        collectives::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(collective_from_model)
            .transpose()
    }

    async fn collective_balance(&self, collective: &Collective) -> ExpenseResult<i64> {
        #[derive(Debug, FromQueryResult)]
        struct BalanceRow {
            balance: Option<Decimal>,
        }

        let row = transactions::Entity::find()
            .select_only()
            .column_as(Expr::col(transactions::Column::Amount).sum(), "balance")
            .filter(transactions::Column::CollectiveId.eq(collective.id.into_inner()))
            .filter(transactions::Column::Currency.eq(collective.currency.to_string()))
            .into_model::<BalanceRow>()
            .one(&self.db)
            .await
            .map_err(db_err)?;

        let balance = row.and_then(|r| r.balance).unwrap_or_default();
        balance
            .to_i64()
            .ok_or_else(|| ExpenseError::Database(format!("Balance out of range: {balance}")))
    }

    async fn expense_items(&self, expense_id: ExpenseId) -> ExpenseResult<Vec<ExpenseItem>> {
        let items = expense_items::Entity::find()
            .filter(expense_items::Column::ExpenseId.eq(expense_id.into_inner()))
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(items.into_iter().map(item_from_model).collect())
    }

    async fn apply_transition(&self, transition: StatusTransition) -> ExpenseResult<Expense> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let row = expenses::Entity::find_by_id(transition.expense_id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(ExpenseError::NotFound(transition.expense_id))?;

        let actual = parse_status(&row.status)?;
        if actual != transition.from {
            debug!(
                expense_id = %transition.expense_id,
                expected = %transition.from,
                actual = %actual,
                "Rejecting stale transition"
            );
            return Err(ExpenseError::StaleStatus {
                expected: transition.from,
                actual,
            });
        }

        let now: DateTimeWithTimeZone = Utc::now().into();
        let editor = transition.edited_by.into_inner();
        let mut active: expenses::ActiveModel = row.into();
        active.status = Set(transition.to.as_str().to_string());
        active.last_edited_by_id = Set(Some(editor));
        active.updated_at = Set(now);
        let updated = active.update(&txn).await.map_err(db_err)?;

        let refund_id = match transition.refund {
            Some(refund) => Some(Self::book_refund(&txn, &updated, refund, now).await?.id),
            None => None,
        };

        activities::ActiveModel {
            id: Set(Uuid::new_v4()),
            activity_type: Set(transition.activity.as_str().to_string()),
            collective_id: Set(updated.collective_id),
            expense_id: Set(Some(updated.id)),
            user_id: Set(Some(editor)),
            data: Set(json!({
                "from": transition.from.as_str(),
                "to": transition.to.as_str(),
                "refundTransactionId": refund_id,
                "processorFeeRefunded": transition.refund.map(|r| r.processor_fee_refunded),
            })),
            created_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        if let Some(refund_id) = refund_id {
            info!(expense_id = %updated.id, %refund_id, "Refund booked");
        }
        expense_from_model(updated)
    }
}

fn db_err(err: DbErr) -> ExpenseError {
    ExpenseError::Database(err.to_string())
}

fn parse_status(value: &str) -> ExpenseResult<ExpenseStatus> {
    ExpenseStatus::parse(value)
        .ok_or_else(|| ExpenseError::Database(format!("Unknown expense status: {value}")))
}

fn parse_currency(value: &str) -> ExpenseResult<Currency> {
    value.parse().map_err(ExpenseError::Database)
}

fn collective_from_model(model: collectives::Model) -> ExpenseResult<Collective> {
    let collective_type = CollectiveType::parse(&model.collective_type).ok_or_else(|| {
        ExpenseError::Database(format!("Unknown collective type: {}", model.collective_type))
    })?;

    Ok(Collective {
        id: CollectiveId::from_uuid(model.id),
        collective_type,
        slug: model.slug,
        host_collective_id: model.host_collective_id.map(CollectiveId::from_uuid),
        parent_collective_id: model.parent_collective_id.map(CollectiveId::from_uuid),
        is_active: model.is_active,
        currency: parse_currency(&model.currency)?,
    })
}

fn expense_from_model(model: expenses::Model) -> ExpenseResult<Expense> {
    let payee_location = if model.payee_address.is_some() || model.payee_country.is_some() {
        Some(PayeeLocation {
            address: model.payee_address,
            country: model.payee_country,
        })
    } else {
        None
    };

    Ok(Expense {
        id: ExpenseId::from_uuid(model.id),
        status: parse_status(&model.status)?,
        amount: model.amount,
        currency: parse_currency(&model.currency)?,
        description: model.description,
        collective_id: CollectiveId::from_uuid(model.collective_id),
        from_collective_id: CollectiveId::from_uuid(model.from_collective_id),
        user_id: UserId::from_uuid(model.user_id),
        last_edited_by_id: model.last_edited_by_id.map(UserId::from_uuid),
        payout_method_id: model.payout_method_id,
        invoice_info: model.invoice_info,
        payee_location,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn item_from_model(model: expense_items::Model) -> ExpenseItem {
    ExpenseItem {
        id: ExpenseItemId::from_uuid(model.id),
        expense_id: ExpenseId::from_uuid(model.expense_id),
        amount: model.amount,
        description: model.description,
        url: model.url,
        incurred_at: model.incurred_at.with_timezone(&Utc),
    }
}
