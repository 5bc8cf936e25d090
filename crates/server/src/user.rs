//! Account endpoints: registration, profile and verification.

use axum::{Extension, Json, extract::State, http::StatusCode};

use api_types::user::{ProfileUpdate, RegisterUser, UserCreated, UserView};

use crate::{ServerError, server::ServerState};
use engine::{Currency, users};

fn map_user(user: users::Model) -> UserView {
    UserView {
        id: user.id,
        email: user.email,
        full_name: user.full_name,
        preferred_currency: user.preferred_currency,
        is_verified: user.is_verified,
    }
}

fn map_currency(currency: api_types::Currency) -> Currency {
    Currency::try_from(currency.as_str()).unwrap_or_default()
}

pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<RegisterUser>,
) -> Result<(StatusCode, Json<UserCreated>), ServerError> {
    let id = state
        .engine
        .register_user(
            &payload.email,
            &payload.password,
            &payload.full_name,
            payload.preferred_currency.map(map_currency),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(UserCreated { id })))
}

pub async fn profile(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<UserView>, ServerError> {
    let user = state.engine.user_profile(&user.id).await?;
    Ok(Json(map_user(user)))
}

pub async fn update_profile(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<UserView>, ServerError> {
    let updated = state
        .engine
        .update_profile(
            &user.id,
            payload.full_name.as_deref(),
            payload.preferred_currency.map(map_currency),
        )
        .await?;
    Ok(Json(map_user(updated)))
}

pub async fn verify(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<StatusCode, ServerError> {
    state.engine.verify_user(&user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
