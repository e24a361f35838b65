//! HTTP routes of the resource server.

use axum::extract::{Json, Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::admin::UserPayload;
use crate::auth::{AdminUser, AuthUser};
use crate::error::ServerError;
use crate::state::AppState;

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/public", get(public))
        .route("/private", get(private))
        .route("/admin", get(admin))
        .route("/admin/user", post(create_user))
        .route("/healthz", get(healthz))
        .fallback(fallback)
        .layer(middleware::from_fn(reject_anonymous_writes))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

/// Writes without any credentials are refused before routing.
async fn reject_anonymous_writes(request: Request, next: Next) -> Response {
    let unsafe_method = matches!(
        *request.method(),
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    );
    if unsafe_method && !request.headers().contains_key(AUTHORIZATION) {
        debug!(method = %request.method(), path = %request.uri().path(), "anonymous write refused");
        return ServerError::Forbidden.into_response();
    }
    next.run(request).await
}

async fn public() -> &'static str {
    "Hello PUBLIC"
}

async fn private(_user: AuthUser) -> &'static str {
    "Hello PRIVATE"
}

async fn admin(_admin: AdminUser) -> &'static str {
    "Hello ADMIN"
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn create_user(
    State(state): State<AppState>,
    AdminUser(caller): AdminUser,
    Json(payload): Json<UserPayload>,
) -> Result<(StatusCode, &'static str), ServerError> {
    debug!(caller = ?caller.username, username = %payload.username, "creating user");
    state.admin.create_user(&payload).await?;
    Ok((StatusCode::CREATED, "User created successfully"))
}

/// Unknown routes still require authentication.
async fn fallback(_user: AuthUser) -> ServerError {
    ServerError::NotFound
}
