//! Category and budget endpoints.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use api_types::category::{
    BudgetStatusQuery, BudgetStatusResponse, BudgetStatusView, CategoryCreated, CategoryKind,
    CategoryListResponse, CategoryNew, CategoryUpdate, CategoryView,
};

use crate::{ServerError, server::ServerState};
use engine::{BudgetStatus, NewCategory, categories, users};

fn map_category(category: categories::Model) -> CategoryView {
    CategoryView {
        id: category.id,
        name: category.name,
        kind: category.kind,
        icon: category.icon,
        color: category.color,
        budget_minor: category.budget_minor,
        alert_threshold: category.alert_threshold,
        is_system: category.is_system,
    }
}

fn map_status(status: BudgetStatus) -> BudgetStatusView {
    BudgetStatusView {
        budget_minor: status.budget_minor,
        spent_minor: status.spent_minor,
        remaining_minor: status.remaining_minor,
        percentage: status.percentage,
        is_over_budget: status.is_over_budget,
        is_alert: status.is_alert,
        alert_threshold: status.alert_threshold,
    }
}

fn map_kind(kind: CategoryKind) -> engine::CategoryKind {
    match kind {
        CategoryKind::Income => engine::CategoryKind::Income,
        CategoryKind::Expense => engine::CategoryKind::Expense,
        CategoryKind::Both => engine::CategoryKind::Both,
    }
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<CategoryNew>,
) -> Result<(StatusCode, Json<CategoryCreated>), ServerError> {
    let id = state
        .engine
        .create_category(
            &user.id,
            NewCategory {
                name: payload.name,
                kind: map_kind(payload.kind),
                icon: payload.icon,
                color: payload.color,
                budget_minor: payload.budget_minor,
                alert_threshold: payload.alert_threshold,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(CategoryCreated { id })))
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<CategoryListResponse>, ServerError> {
    let categories = state
        .engine
        .list_categories(&user.id, None)
        .await?
        .into_iter()
        .map(map_category)
        .collect();
    Ok(Json(CategoryListResponse { categories }))
}

pub async fn update(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(category_id): Path<String>,
    Json(payload): Json<CategoryUpdate>,
) -> Result<Json<CategoryView>, ServerError> {
    let budget_minor = if payload.clear_budget.unwrap_or(false) {
        Some(None)
    } else {
        payload.budget_minor.map(Some)
    };
    let updated = state
        .engine
        .update_category(
            &user.id,
            &category_id,
            payload.name.as_deref(),
            budget_minor,
            payload.alert_threshold,
        )
        .await?;
    Ok(Json(map_category(updated)))
}

pub async fn remove(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(category_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_category(&user.id, &category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn budget_status(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(category_id): Path<String>,
    Query(query): Query<BudgetStatusQuery>,
) -> Result<Json<BudgetStatusResponse>, ServerError> {
    let status = state
        .engine
        .budget_status(&category_id, &user.id, query.year, query.month)
        .await?;
    Ok(Json(BudgetStatusResponse {
        category_id,
        status: status.map(map_status),
    }))
}
