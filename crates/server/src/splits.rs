//! Expense-split endpoints.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

use api_types::split::{SplitRequest, SplitView, SplitsResponse};

use crate::{ServerError, server::ServerState};
use engine::{ShareInput, SplitMode, expense_splits, users};

fn map_split(split: expense_splits::Model) -> SplitView {
    SplitView {
        id: split.id,
        transaction_id: split.transaction_id,
        user_id: split.user_id,
        amount_minor: split.amount_minor,
        is_paid: split.is_paid,
        paid_at: split.paid_at,
    }
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<String>,
    Json(payload): Json<SplitRequest>,
) -> Result<(StatusCode, Json<SplitsResponse>), ServerError> {
    let mode = match (payload.equal_split.unwrap_or(false), payload.shares) {
        (true, _) => SplitMode::Equal,
        (false, Some(shares)) if !shares.is_empty() => SplitMode::Explicit(
            shares
                .into_iter()
                .map(|share| ShareInput {
                    user_id: share.user_id,
                    amount_minor: share.amount_minor,
                })
                .collect(),
        ),
        _ => {
            return Err(ServerError::Generic(
                "either equal_split or shares is required".to_string(),
            ));
        }
    };

    let splits = state
        .engine
        .create_splits(&transaction_id, &user.id, mode)
        .await?
        .into_iter()
        .map(map_split)
        .collect();
    Ok((StatusCode::CREATED, Json(SplitsResponse { splits })))
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<SplitsResponse>, ServerError> {
    let splits = state
        .engine
        .list_splits(&transaction_id, &user.id)
        .await?
        .into_iter()
        .map(map_split)
        .collect();
    Ok(Json(SplitsResponse { splits }))
}

pub async fn mark_paid(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(split_id): Path<String>,
) -> Result<Json<SplitView>, ServerError> {
    let split = state
        .engine
        .mark_split_paid(&split_id, &user.id, Utc::now())
        .await?;
    Ok(Json(map_split(split)))
}

pub async fn mark_unpaid(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(split_id): Path<String>,
) -> Result<Json<SplitView>, ServerError> {
    let split = state.engine.mark_split_unpaid(&split_id, &user.id).await?;
    Ok(Json(map_split(split)))
}
