//! Expense authorization and lifecycle.
//!
//! This module implements:
//! - Capability predicates (owner, collective admin, accountant, host admin)
//! - Visibility and action permission checks
//! - Status transitions with their activity records
//! - The redacted view of an expense
//!
//! Every check runs against a [`RequestContext`] built for one request.

pub mod context;
pub mod error;
pub mod feature;
pub mod permissions;
pub mod store;
pub mod types;
pub mod user;
pub mod view;
pub mod workflow;

#[cfg(test)]
mod permissions_props;
#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod workflow_props;

pub use context::RequestContext;
pub use error::{ExpenseError, ExpenseResult};
pub use feature::{ConfiguredFeatureGate, Feature, FeatureGate};
pub use permissions::{Capability, ExpensePermissions};
pub use store::ExpenseStore;
pub use types::{
    ActivityType, Collective, CollectiveType, Expense, ExpenseItem, ExpenseStatus, PayeeLocation,
    Refund, StatusTransition,
};
pub use user::{MemberRole, Membership, RemoteUser};
pub use view::{ExpenseItemView, ExpenseView};
pub use workflow::ExpenseWorkflow;
