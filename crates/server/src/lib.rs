use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{run, run_with_listener, spawn_with_listener};

mod balances;
mod categories;
mod groups;
mod memberships;
mod reminders;
mod server;
mod splits;
mod transactions;
mod user;

pub mod types {
    pub mod user {
        pub use api_types::user::{ProfileUpdate, RegisterUser, UserCreated, UserView};
    }

    pub mod group {
        pub use api_types::group::{
            GroupCreated, GroupListResponse, GroupNew, GroupSummary, GroupUpdate, GroupView,
        };
    }

    pub mod membership {
        pub use api_types::invitation::{
            AcceptInvitation, InvitationAccepted, InvitationCreated, InvitationView,
            InvitationsResponse, InviteNew,
        };
        pub use api_types::membership::{
            MemberRole, MemberStatus, MemberView, MembersResponse, RoleUpdate,
        };
    }

    pub mod category {
        pub use api_types::category::{
            BudgetStatusQuery, BudgetStatusResponse, BudgetStatusView, CategoryCreated,
            CategoryKind, CategoryListResponse, CategoryNew, CategoryUpdate, CategoryView,
        };
    }

    pub mod transaction {
        pub use api_types::transaction::{
            MonthlySummaryQuery, MonthlySummaryView, TransactionCreated, TransactionKind,
            TransactionListQuery, TransactionListResponse, TransactionNew, TransactionUpdate,
            TransactionView,
        };
    }

    pub mod split {
        pub use api_types::split::{ShareNew, SplitRequest, SplitView, SplitsResponse};
    }

    pub mod balance {
        pub use api_types::balance::{
            GroupBalanceResponse, GroupBalanceSummary, MemberBalanceView,
        };
    }

    pub mod reminder {
        pub use api_types::reminder::{
            ReminderCompleted, ReminderCreated, ReminderKind, ReminderListQuery, ReminderNew,
            ReminderUpdate, ReminderView, RemindersResponse,
        };
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) | EngineError::StateConflict(_) => StatusCode::CONFLICT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidAmount(_)
        | EngineError::InvalidValue(_)
        | EngineError::CategoryMismatch(_)
        | EngineError::InvalidSplitTarget(_)
        | EngineError::SplitSumMismatch { .. }
        | EngineError::NotAGroupMember(_)
        | EngineError::InvalidRecurrence(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_forbidden_maps_to_403() {
        let res = ServerError::from(EngineError::Forbidden("forbidden".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn engine_conflict_maps_to_409() {
        let res = ServerError::from(EngineError::ExistingKey("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);

        let res = ServerError::from(EngineError::StateConflict("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn engine_validation_maps_to_422() {
        let res = ServerError::from(EngineError::InvalidAmount("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let res = ServerError::from(EngineError::SplitSumMismatch {
            expected: 300,
            got: 299,
        })
        .into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let res =
            ServerError::from(EngineError::NotAGroupMember("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn engine_database_maps_to_500() {
        let res = ServerError::from(EngineError::Database(sea_orm::DbErr::Custom(
            "boom".to_string(),
        )))
        .into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
