//! Membership and invitation endpoints.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use api_types::invitation::{
    AcceptInvitation, InvitationAccepted, InvitationCreated, InvitationView, InvitationsResponse,
    InviteNew,
};
use api_types::membership::{MemberRole, MemberStatus, MemberView, MembersResponse, RoleUpdate};

use crate::{ServerError, server::ServerState};
use engine::users;

fn map_role(role: &str) -> MemberRole {
    match role {
        "admin" => MemberRole::Admin,
        _ => MemberRole::Member,
    }
}

fn map_status(status: &str) -> MemberStatus {
    match status {
        "active" => MemberStatus::Active,
        "left" => MemberStatus::Left,
        _ => MemberStatus::Pending,
    }
}

pub async fn list_members(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<Json<MembersResponse>, ServerError> {
    let members = state
        .engine
        .list_members(&group_id, &user.id)
        .await?
        .into_iter()
        .map(|(member, member_user)| MemberView {
            user_id: member.user_id,
            email: member_user.email,
            full_name: member_user.full_name,
            role: map_role(&member.role),
            status: map_status(&member.status),
            joined_at: member.joined_at,
        })
        .collect();
    Ok(Json(MembersResponse { members }))
}

pub async fn change_role(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path((group_id, target_user_id)): Path<(String, String)>,
    Json(payload): Json<RoleUpdate>,
) -> Result<StatusCode, ServerError> {
    let role = match payload.role {
        MemberRole::Admin => engine::MemberRole::Admin,
        MemberRole::Member => engine::MemberRole::Member,
    };
    state
        .engine
        .change_member_role(&group_id, &target_user_id, role, &user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_member(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path((group_id, target_user_id)): Path<(String, String)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .remove_member(&group_id, &target_user_id, &user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn leave(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.leave_group(&group_id, &user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn invite(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
    Json(payload): Json<InviteNew>,
) -> Result<(StatusCode, Json<InvitationCreated>), ServerError> {
    let outcome = state
        .engine
        .invite_member(&group_id, &payload.email, &user.id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(InvitationCreated {
            invitation_id: outcome.invitation_id,
            token: outcome.token,
            expires_at: outcome.expires_at,
        }),
    ))
}

pub async fn list_invitations(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<Json<InvitationsResponse>, ServerError> {
    let invitations = state
        .engine
        .list_invitations(&group_id, &user.id)
        .await?
        .into_iter()
        .map(|invitation| InvitationView {
            id: invitation.id,
            email: invitation.email,
            status: invitation.status,
            expires_at: invitation.expires_at,
        })
        .collect();
    Ok(Json(InvitationsResponse { invitations }))
}

pub async fn accept(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<AcceptInvitation>,
) -> Result<Json<InvitationAccepted>, ServerError> {
    let group_id = state
        .engine
        .accept_invitation(&payload.token, &user.id)
        .await?;
    Ok(Json(InvitationAccepted { group_id }))
}

pub async fn decline(
    Extension(_user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<AcceptInvitation>,
) -> Result<StatusCode, ServerError> {
    state.engine.decline_invitation(&payload.token).await?;
    Ok(StatusCode::NO_CONTENT)
}
