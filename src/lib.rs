use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    routing::get,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::{Layer, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    normalize_path::NormalizePathLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod ownership;
pub mod password;
pub mod repository;
pub mod role;

// Per-resource routers with their gate groups.
pub mod routes;

// --- Public Re-exports ---

pub use auth::{AuthUser, TokenCodec};
pub use config::AppConfig;
pub use error::ApiError;
pub use memory::InMemoryRepository;
pub use password::PasswordHasher;
pub use repository::{PostgresRepository, Repository, RepositoryState};
pub use role::Role;

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and wire schema into the OpenAPI document
/// served at `/api-docs/openapi.json`. Paths are listed without the configured prefix.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::users::register_user, handlers::users::login, handlers::users::update_user,
        handlers::users::delete_user, handlers::users::get_user, handlers::users::list_users,
        handlers::boards::create_board, handlers::boards::update_board, handlers::boards::get_board,
        handlers::boards::list_boards, handlers::boards::delete_board,
        handlers::boards::add_board_member, handlers::boards::remove_board_member,
        handlers::cards::create_todo_card, handlers::cards::create_doing_card,
        handlers::cards::create_done_card, handlers::cards::update_card, handlers::cards::get_card,
        handlers::cards::list_cards, handlers::cards::delete_card, handlers::cards::move_to_todo,
        handlers::cards::move_to_doing, handlers::cards::move_to_done,
        handlers::cards::add_card_member, handlers::cards::remove_card_member,
    ),
    components(
        schemas(
            models::User, models::Board, models::Card, models::Lane, models::BoardDetails,
            models::CardDetails, models::CredentialsRequest, models::UpdateUserRequest,
            models::BoardRequest, models::CardRequest, models::MemberRequest,
            models::LoginResponse, error::ErrorBody, role::Role,
        )
    ),
    tags(
        (name = "kanban", description = "Kanban boards, cards and users")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container handed to every handler. Cloning is cheap: the repository
/// and codec are behind `Arc`, the hasher is `Copy`.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Postgres in production, in-memory in tests.
    pub repo: RepositoryState,
    /// Credential issue/verify, keyed with the configured secret.
    pub tokens: Arc<TokenCodec>,
    /// Argon2 with the work factor fixed at startup.
    pub passwords: PasswordHasher,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self {
            repo,
            tokens: Arc::new(TokenCodec::from_config(&config)),
            passwords: PasswordHasher::new(config.password_hash),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for Arc<TokenCodec> {
    fn from_ref(app_state: &AppState) -> Arc<TokenCodec> {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the resource routers under the configured prefix, applies global middleware
/// and registers the application state. List routes answer with or without a trailing
/// slash (`/board` and `/board/`).
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let prefix = state.config.api_prefix.clone();

    // 2. API Router: nested `"/"` routes only match without the slash, so it is trimmed first.
    let api_router = Router::new()
        .nest(&format!("{prefix}/user"), routes::users::user_routes(&state))
        .nest(&format!("{prefix}/board"), routes::boards::board_routes(&state))
        .nest(&format!("{prefix}/card"), routes::cards::card_routes(&state))
        .with_state(state);
    let api_service = NormalizePathLayer::trim_trailing_slash().layer(api_router);

    // 3. Base Router Assembly. Swagger UI stays outside the normalizer: it redirects
    // `/swagger-ui` to `/swagger-ui/`.
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(|| async { "ok" }))
        .fallback_service(api_service);

    // 4. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 4a. Request ID Generation
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 4b. Request Tracing: one span per request, tagged with the request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 4c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 5. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the `TraceLayer` span so every log line of one request carries its `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
