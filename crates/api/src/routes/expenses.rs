//! Expense routes.
//!
//! Every handler builds a fresh [`RequestContext`] so collective lookups are
//! memoized for exactly one request.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use hostfund_core::expense::{
    Expense, ExpenseError, ExpensePermissions, ExpenseView, ExpenseWorkflow, RemoteUser,
    RequestContext,
};
use hostfund_db::{ExpenseRepository, UserRepository};
use hostfund_shared::{AppError, Claims, types::ExpenseId};

use crate::{AppState, error::ApiError, middleware::MaybeAuthUser};

/// Creates the expense routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/expenses/{expense_id}", get(get_expense))
        .route("/expenses/{expense_id}/permissions", get(get_permissions))
        .route("/expenses/{expense_id}/approve", post(approve_expense))
        .route("/expenses/{expense_id}/unapprove", post(unapprove_expense))
        .route("/expenses/{expense_id}/reject", post(reject_expense))
        .route(
            "/expenses/{expense_id}/schedule-for-payment",
            post(schedule_expense_for_payment),
        )
        .route("/expenses/{expense_id}/mark-as-unpaid", post(mark_expense_as_unpaid))
}

/// Request body for marking an expense as unpaid.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAsUnpaidRequest {
    /// Whether the payment processor gave its fee back.
    #[serde(default)]
    pub processor_fee_refunded: bool,
}

/// Status-changing actions exposed over HTTP.
#[derive(Debug, Clone, Copy)]
enum Action {
    Approve,
    Unapprove,
    Reject,
    ScheduleForPayment,
    MarkAsUnpaid { processor_fee_refunded: bool },
}

/// Resolves the requester from the token claims.
///
/// A token for a user that no longer exists is treated as invalid.
async fn resolve_user(
    state: &AppState,
    claims: Option<&Claims>,
) -> Result<Option<RemoteUser>, ApiError> {
    let Some(claims) = claims else {
        return Ok(None);
    };

    UserRepository::new((*state.db).clone())
        .find_remote_user(claims.user_id())
        .await?
        .map(Some)
        .ok_or_else(|| ApiError(AppError::Unauthorized("Unknown user".to_string())))
}

async fn find_expense(repo: &ExpenseRepository, expense_id: Uuid) -> Result<Expense, ApiError> {
    let id = ExpenseId::from_uuid(expense_id);
    repo.find_expense(id)
        .await?
        .ok_or_else(|| ExpenseError::NotFound(id).into())
}

/// GET `/expenses/{expense_id}` - The expense with fields the requester may see.
async fn get_expense(
    State(state): State<AppState>,
    MaybeAuthUser(claims): MaybeAuthUser,
    Path(expense_id): Path<Uuid>,
) -> Result<Json<ExpenseView>, ApiError> {
    let remote_user = resolve_user(&state, claims.as_ref()).await?;
    let repo = ExpenseRepository::new((*state.db).clone());
    let expense = find_expense(&repo, expense_id).await?;

    let ctx = RequestContext::new(remote_user, &repo, state.feature_gate.as_ref());
    Ok(Json(ExpenseView::build(&ctx, expense).await?))
}

/// GET `/expenses/{expense_id}/permissions` - What the requester may do.
async fn get_permissions(
    State(state): State<AppState>,
    MaybeAuthUser(claims): MaybeAuthUser,
    Path(expense_id): Path<Uuid>,
) -> Result<Json<ExpensePermissions>, ApiError> {
    let remote_user = resolve_user(&state, claims.as_ref()).await?;
    let repo = ExpenseRepository::new((*state.db).clone());
    let expense = find_expense(&repo, expense_id).await?;

    let ctx = RequestContext::new(remote_user, &repo, state.feature_gate.as_ref());
    Ok(Json(ctx.permissions(&expense).await?))
}

/// Runs one status-changing action and returns the redacted updated expense.
async fn run_action(
    state: &AppState,
    claims: Option<&Claims>,
    expense_id: Uuid,
    action: Action,
) -> Result<Json<ExpenseView>, ApiError> {
    // Anonymous requests fail before the expense is even loaded.
    let Some(claims) = claims else {
        return Err(ExpenseError::Unauthenticated.into());
    };
    let remote_user = resolve_user(state, Some(claims)).await?;
    let repo = ExpenseRepository::new((*state.db).clone());
    let expense = find_expense(&repo, expense_id).await?;

    let ctx = RequestContext::new(remote_user, &repo, state.feature_gate.as_ref());
    let updated = match action {
        Action::Approve => ExpenseWorkflow::approve(&ctx, expense).await?,
        Action::Unapprove => ExpenseWorkflow::unapprove(&ctx, expense).await?,
        Action::Reject => ExpenseWorkflow::reject(&ctx, expense).await?,
        Action::ScheduleForPayment => ExpenseWorkflow::schedule_for_payment(&ctx, expense).await?,
        Action::MarkAsUnpaid {
            processor_fee_refunded,
        } => ExpenseWorkflow::mark_as_unpaid(&ctx, expense, processor_fee_refunded).await?,
    };

    info!(
        expense_id = %updated.id,
        status = %updated.status,
        action = ?action,
        "Expense action completed"
    );
    Ok(Json(ExpenseView::build(&ctx, updated).await?))
}

/// POST `/expenses/{expense_id}/approve`
async fn approve_expense(
    State(state): State<AppState>,
    MaybeAuthUser(claims): MaybeAuthUser,
    Path(expense_id): Path<Uuid>,
) -> Result<Json<ExpenseView>, ApiError> {
    run_action(&state, claims.as_ref(), expense_id, Action::Approve).await
}

/// POST `/expenses/{expense_id}/unapprove`
async fn unapprove_expense(
    State(state): State<AppState>,
    MaybeAuthUser(claims): MaybeAuthUser,
    Path(expense_id): Path<Uuid>,
) -> Result<Json<ExpenseView>, ApiError> {
    run_action(&state, claims.as_ref(), expense_id, Action::Unapprove).await
}

/// POST `/expenses/{expense_id}/reject`
async fn reject_expense(
    State(state): State<AppState>,
    MaybeAuthUser(claims): MaybeAuthUser,
    Path(expense_id): Path<Uuid>,
) -> Result<Json<ExpenseView>, ApiError> {
    run_action(&state, claims.as_ref(), expense_id, Action::Reject).await
}

/// POST `/expenses/{expense_id}/schedule-for-payment`
async fn schedule_expense_for_payment(
    State(state): State<AppState>,
    MaybeAuthUser(claims): MaybeAuthUser,
    Path(expense_id): Path<Uuid>,
) -> Result<Json<ExpenseView>, ApiError> {
    run_action(&state, claims.as_ref(), expense_id, Action::ScheduleForPayment).await
}

/// POST `/expenses/{expense_id}/mark-as-unpaid`
///
/// The JSON body is optional; without one the processor fee is kept.
async fn mark_expense_as_unpaid(
    State(state): State<AppState>,
    MaybeAuthUser(claims): MaybeAuthUser,
    Path(expense_id): Path<Uuid>,
    body: Result<Json<MarkAsUnpaidRequest>, JsonRejection>,
) -> Result<Json<ExpenseView>, ApiError> {
    if claims.is_none() {
        return Err(ExpenseError::Unauthenticated.into());
    }
    let body = match body {
        Ok(Json(body)) => body,
        Err(JsonRejection::MissingJsonContentType(_)) => MarkAsUnpaidRequest::default(),
        Err(rejection) => return Err(ApiError(AppError::BadRequest(rejection.body_text()))),
    };

    let action = Action::MarkAsUnpaid {
        processor_fee_refunded: body.processor_fee_refunded,
    };
    run_action(&state, claims.as_ref(), expense_id, action).await
}
