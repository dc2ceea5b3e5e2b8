//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::optional_auth_middleware};

pub mod expenses;
pub mod health;

/// Creates the API router. Expense routes resolve the requester through the
/// optional authentication middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let expense_routes = expenses::routes().layer(middleware::from_fn_with_state(
        state.clone(),
        optional_auth_middleware,
    ));

    Router::new().merge(health::routes()).merge(expense_routes)
}
