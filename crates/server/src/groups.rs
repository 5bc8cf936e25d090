//! Group CRUD endpoints.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use api_types::group::{
    GroupCreated, GroupListResponse, GroupNew, GroupSummary, GroupUpdate, GroupView,
};
use api_types::membership::MemberRole;

use crate::{ServerError, server::ServerState};
use engine::{groups, users};

fn map_group(group: groups::Model) -> GroupView {
    GroupView {
        id: group.id,
        name: group.name,
        description: group.description,
        owner_id: group.owner_id,
        currency: group.currency,
    }
}

fn map_role(role: engine::MemberRole) -> MemberRole {
    match role {
        engine::MemberRole::Admin => MemberRole::Admin,
        engine::MemberRole::Member => MemberRole::Member,
    }
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<GroupNew>,
) -> Result<(StatusCode, Json<GroupCreated>), ServerError> {
    let currency = payload
        .currency
        .map(|c| engine::Currency::try_from(c.as_str()).unwrap_or_default());
    let id = state
        .engine
        .create_group(
            &payload.name,
            payload.description.as_deref(),
            currency,
            &user.id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(GroupCreated { id })))
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<GroupListResponse>, ServerError> {
    let groups = state
        .engine
        .list_groups(&user.id)
        .await?
        .into_iter()
        .map(|(group, role)| GroupSummary {
            id: group.id,
            name: group.name,
            currency: group.currency,
            role: map_role(role),
        })
        .collect();
    Ok(Json(GroupListResponse { groups }))
}

pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<Json<GroupView>, ServerError> {
    let group = state.engine.group_for_member(&group_id, &user.id).await?;
    Ok(Json(map_group(group)))
}

pub async fn update(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
    Json(payload): Json<GroupUpdate>,
) -> Result<Json<GroupView>, ServerError> {
    let group = state
        .engine
        .update_group(
            &group_id,
            &user.id,
            payload.name.as_deref(),
            payload.description.as_deref(),
        )
        .await?;
    Ok(Json(map_group(group)))
}

pub async fn deactivate(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.deactivate_group(&group_id, &user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
