//! Expense domain types.
//!
//! The engine only reads these records; persistence lives behind
//! [`crate::expense::ExpenseStore`].

use chrono::{DateTime, Utc};
use hostfund_shared::types::{CollectiveId, Currency, ExpenseId, ExpenseItemId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Expense status in the payment lifecycle.
///
/// The transitions driven by this crate are:
/// - Pending | Rejected → Approved (approve)
/// - Approved → Pending (unapprove)
/// - Pending | Unverified → Rejected (reject)
/// - Approved | Error → ScheduledForPayment (schedule for payment)
/// - Paid → Approved (mark as unpaid)
///
/// Draft, Unverified, Processing, Error and Paid are entered by the
/// submission and payment subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseStatus {
    /// Created but not yet submitted by its author.
    Draft,
    /// Submitted by someone who still has to confirm their account.
    Unverified,
    /// Waiting for an admin decision.
    Pending,
    /// Approved, waiting for the host to pay.
    Approved,
    /// Rejected by an admin.
    Rejected,
    /// Payment in flight.
    Processing,
    /// Payment failed.
    Error,
    /// Queued for a batch payment by the host.
    ScheduledForPayment,
    /// Paid out.
    Paid,
}

impl ExpenseStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 9] = [
        Self::Draft,
        Self::Unverified,
        Self::Pending,
        Self::Approved,
        Self::Rejected,
        Self::Processing,
        Self::Error,
        Self::ScheduledForPayment,
        Self::Paid,
    ];

    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Unverified => "UNVERIFIED",
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Processing => "PROCESSING",
            Self::Error => "ERROR",
            Self::ScheduledForPayment => "SCHEDULED_FOR_PAYMENT",
            Self::Paid => "PAID",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "UNVERIFIED" => Some(Self::Unverified),
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            "PROCESSING" => Some(Self::Processing),
            "ERROR" => Some(Self::Error),
            "SCHEDULED_FOR_PAYMENT" => Some(Self::ScheduledForPayment),
            "PAID" => Some(Self::Paid),
            _ => None,
        }
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectiveType {
    /// A user's own profile.
    User,
    /// A company or legal entity.
    Organization,
    /// A group raising money.
    Collective,
    /// An event run by a parent collective.
    Event,
    /// A project run by a parent collective.
    Project,
    /// A fund.
    Fund,
}

impl CollectiveType {
    /// Returns the string representation of the type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Organization => "ORGANIZATION",
            Self::Collective => "COLLECTIVE",
            Self::Event => "EVENT",
            Self::Project => "PROJECT",
            Self::Fund => "FUND",
        }
    }

    /// Parses a type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "USER" => Some(Self::User),
            "ORGANIZATION" => Some(Self::Organization),
            "COLLECTIVE" => Some(Self::Collective),
            "EVENT" => Some(Self::Event),
            "PROJECT" => Some(Self::Project),
            "FUND" => Some(Self::Fund),
            _ => None,
        }
    }

    /// Events and projects inherit admins from their parent.
    #[must_use]
    pub const fn inherits_parent_admins(&self) -> bool {
        matches!(self, Self::Event | Self::Project)
    }
}

/// An account that can receive funds and incur expenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collective {
    /// Collective ID.
    pub id: CollectiveId,
    /// Kind of account.
    pub collective_type: CollectiveType,
    /// URL slug.
    pub slug: String,
    /// Fiscal host, if any.
    pub host_collective_id: Option<CollectiveId>,
    /// Parent collective for events and projects.
    pub parent_collective_id: Option<CollectiveId>,
    /// Whether the host has approved the collective.
    pub is_active: bool,
    /// Currency the collective's balance is held in.
    pub currency: Currency,
}

/// Where the payee is located, as printed on the invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayeeLocation {
    /// Postal address.
    pub address: Option<String>,
    /// ISO country code.
    pub country: Option<String>,
}

/// A payment request raised against a collective's funds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    /// Expense ID.
    pub id: ExpenseId,
    /// Current lifecycle status.
    pub status: ExpenseStatus,
    /// Amount in minor units of `currency`.
    pub amount: i64,
    /// Currency of the amount.
    pub currency: Currency,
    /// Short description.
    pub description: String,
    /// Collective the expense is billed to.
    pub collective_id: CollectiveId,
    /// Payee.
    pub from_collective_id: CollectiveId,
    /// Author.
    pub user_id: UserId,
    /// Last user who changed the expense.
    pub last_edited_by_id: Option<UserId>,
    /// Payout method selected by the payee.
    pub payout_method_id: Option<Uuid>,
    /// Free-form invoice information.
    pub invoice_info: Option<String>,
    /// Payee address.
    pub payee_location: Option<PayeeLocation>,
    /// Created at timestamp.
    pub created_at: DateTime<Utc>,
    /// Updated at timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A line of an expense, optionally with an attached receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseItem {
    /// Item ID.
    pub id: ExpenseItemId,
    /// Owning expense.
    pub expense_id: ExpenseId,
    /// Amount in minor units.
    pub amount: i64,
    /// Description.
    pub description: Option<String>,
    /// Receipt URL.
    pub url: Option<String>,
    /// When the cost was incurred.
    pub incurred_at: DateTime<Utc>,
}

/// Audit-log entry kinds written alongside a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    /// `collective.expense.approved`
    #[serde(rename = "collective.expense.approved")]
    CollectiveExpenseApproved,
    /// `collective.expense.unapproved`
    #[serde(rename = "collective.expense.unapproved")]
    CollectiveExpenseUnapproved,
    /// `collective.expense.rejected`
    #[serde(rename = "collective.expense.rejected")]
    CollectiveExpenseRejected,
    /// `collective.expense.scheduledForPayment`
    #[serde(rename = "collective.expense.scheduledForPayment")]
    CollectiveExpenseScheduledForPayment,
    /// `collective.expense.markedAsUnpaid`
    #[serde(rename = "collective.expense.markedAsUnpaid")]
    CollectiveExpenseMarkedAsUnpaid,
}

impl ActivityType {
    /// Returns the string representation of the activity type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CollectiveExpenseApproved => "collective.expense.approved",
            Self::CollectiveExpenseUnapproved => "collective.expense.unapproved",
            Self::CollectiveExpenseRejected => "collective.expense.rejected",
            Self::CollectiveExpenseScheduledForPayment => {
                "collective.expense.scheduledForPayment"
            }
            Self::CollectiveExpenseMarkedAsUnpaid => "collective.expense.markedAsUnpaid",
        }
    }

    /// Parses an activity type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "collective.expense.approved" => Some(Self::CollectiveExpenseApproved),
            "collective.expense.unapproved" => Some(Self::CollectiveExpenseUnapproved),
            "collective.expense.rejected" => Some(Self::CollectiveExpenseRejected),
            "collective.expense.scheduledForPayment" => {
                Some(Self::CollectiveExpenseScheduledForPayment)
            }
            "collective.expense.markedAsUnpaid" => Some(Self::CollectiveExpenseMarkedAsUnpaid),
            _ => None,
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compensating bookkeeping for an expense that was paid and is now unpaid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refund {
    /// Whether the payment processor gave its fee back.
    pub processor_fee_refunded: bool,
}

/// A status change the store must apply together with its activity record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    /// Expense being changed.
    pub expense_id: ExpenseId,
    /// Status the row must still have.
    pub from: ExpenseStatus,
    /// Status to write.
    pub to: ExpenseStatus,
    /// Acting user, recorded as `last_edited_by_id` and on the activity.
    pub edited_by: UserId,
    /// Activity to append.
    pub activity: ActivityType,
    /// Refund to book in the same transaction, if any.
    pub refund: Option<Refund>,
}
