//! Core business logic for Hostfund.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence is reached through the [`expense::ExpenseStore`] trait, which the
//! db crate implements.
//!
//! # Modules
//!
//! - `expense` - Expense authorization rules and status lifecycle

pub mod expense;
