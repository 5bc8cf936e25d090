use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{balances, categories, groups, memberships, reminders, splits, transactions, user};
use engine::{Engine, users};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
}

/// Resolves the Basic-auth credentials to an active user row and stores it
/// in the request extensions. Credential issuance (OTP and friends) is an
/// external collaborator; the server only checks them.
async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let email = auth_header.username().trim().to_ascii_lowercase();
    let user: Option<users::Model> = users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .filter(users::Column::IsActive.eq(true))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let user = match user {
        Some(user) if user.password == auth_header.password() => user,
        _ => return Err(StatusCode::UNAUTHORIZED),
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    let authed = Router::new()
        .route("/me", get(user::profile).patch(user::update_profile))
        .route("/me/verify", post(user::verify))
        .route("/groups", get(groups::list).post(groups::create))
        .route(
            "/groups/{group_id}",
            get(groups::get)
                .patch(groups::update)
                .delete(groups::deactivate),
        )
        .route("/groups/{group_id}/members", get(memberships::list_members))
        .route(
            "/groups/{group_id}/members/{user_id}",
            patch(memberships::change_role).delete(memberships::remove_member),
        )
        .route("/groups/{group_id}/leave", post(memberships::leave))
        .route(
            "/groups/{group_id}/invitations",
            get(memberships::list_invitations).post(memberships::invite),
        )
        .route("/invitations/accept", post(memberships::accept))
        .route("/invitations/decline", post(memberships::decline))
        .route("/groups/{group_id}/balance", get(balances::group_balance))
        .route("/categories", get(categories::list).post(categories::create))
        .route(
            "/categories/{category_id}",
            patch(categories::update).delete(categories::remove),
        )
        .route(
            "/categories/{category_id}/budget",
            get(categories::budget_status),
        )
        .route(
            "/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route(
            "/transactions/{transaction_id}",
            get(transactions::get)
                .patch(transactions::update)
                .delete(transactions::remove),
        )
        .route(
            "/transactions/{transaction_id}/splits",
            get(splits::list).post(splits::create),
        )
        .route("/splits/{split_id}/pay", post(splits::mark_paid))
        .route("/splits/{split_id}/unpay", post(splits::mark_unpaid))
        .route("/summary", get(transactions::summary))
        .route("/reminders", get(reminders::list).post(reminders::create))
        .route(
            "/reminders/{reminder_id}",
            patch(reminders::update).delete(reminders::remove),
        )
        .route(
            "/reminders/{reminder_id}/complete",
            post(reminders::complete),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    Router::new()
        .route("/register", post(user::register))
        .merge(authed)
        .with_state(state)
}

pub async fn run(engine: Arc<Engine>, db: DatabaseConnection) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Arc<Engine>,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState { engine, db };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Arc<Engine>,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, db, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use http_body_util::BodyExt;
    use migration::MigratorTrait;
    use tower::ServiceExt;

    async fn test_router() -> Router {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Arc::new(
            Engine::builder()
                .database(db.clone())
                .build()
                .await
                .unwrap(),
        );
        router(ServerState { engine, db })
    }

    fn basic_auth(email: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{email}:{password}")))
    }

    fn json_request(method: &str, uri: &str, body: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn register_then_authenticate_and_create_group() {
        let router = test_router().await;

        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/register",
                r#"{"email":"alice@example.com","password":"secret","full_name":"Alice","preferred_currency":null}"#,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        // No credentials: the header extractor rejects before any handler
        // runs.
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/me")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let auth = basic_auth("alice@example.com", "secret");
        let response = router
            .clone()
            .oneshot(json_request("GET", "/me", "", Some(&auth)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let profile: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(profile["email"], "alice@example.com");
        assert!(!profile["is_verified"].as_bool().unwrap());

        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/groups",
                r#"{"name":"Trip","description":null,"currency":"XAF"}"#,
                Some(&auth),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let created: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(created["id"].is_string());

        let wrong = basic_auth("alice@example.com", "wrong-password");
        let response = router
            .clone()
            .oneshot(json_request("GET", "/me", "", Some(&wrong)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
