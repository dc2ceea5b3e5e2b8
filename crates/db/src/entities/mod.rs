//! `SeaORM` entities.

pub mod activities;
pub mod collectives;
pub mod expense_items;
pub mod expenses;
pub mod members;
pub mod transactions;
pub mod users;
