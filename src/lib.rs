use axum::{
    Extension, Router,
    extract::{FromRef, Request},
    http::{HeaderName, HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;

// Module for routing segregation (per entity, public/protected halves).
pub mod routes;
use auth::AuthUser; // The resolved authenticated user identity.
use routes::{collections, items, users};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use config::AppConfig;
pub use repository::{MongoRepository, RepositoryState};
pub use storage::{DiskStorageClient, MockStorageService, StorageState};

/// ApiDoc
///
/// This struct auto-generates the OpenAPI documentation (Swagger JSON) for the application.
/// It aggregates all API paths and data schemas that have been decorated with
/// the `#[utoipa::path]` and `#[derive(utoipa::ToSchema)]` macros.
/// The resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    // List all public handler functions here for documentation generation.
    paths(
        handlers::register, handlers::login, handlers::logout, handlers::refresh,
        handlers::get_users, handlers::update_user_role, handlers::delete_user,
        handlers::create_collection, handlers::get_collection, handlers::update_collection,
        handlers::delete_collection, handlers::get_largest_collections,
        handlers::get_my_collections, handlers::upload_image,
        handlers::create_item, handlers::get_item, handlers::update_item,
        handlers::delete_item, handlers::get_items_in_collection, handlers::get_latest_items,
        handlers::health_check
    ),
    // List all models (schemas) used in the request/response bodies.
    components(
        schemas(
            models::RegisterRequest, models::LoginRequest, models::CreateCollectionRequest,
            models::UpdateCollectionRequest, models::CreateItemRequest, models::UpdateItemRequest,
            models::UpdateUserRoleRequest, models::CollectionCategory, models::UserResponse,
            models::CollectionResponse, models::ItemResponse, models::AuthResponse,
            models::UploadResponse, models::MessageResponse,
        )
    ),
    tags(
        (name = "curio-api", description = "Collection cataloging API")
    )
)]
struct ApiDoc;

/// ApiVersion
///
/// Marks which mount point ('/api' or '/api/v2') a request entered through.
/// The upload handler uses it to pick the version subdirectory, keeping v1 and
/// v2 uploads separated on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V1,
    V2,
}

impl ApiVersion {
    /// The upload subdirectory for this version ("" for v1).
    pub fn subdir(&self) -> &'static str {
        match self {
            ApiVersion::V1 => "",
            ApiVersion::V2 => "v2",
        }
    }
}

/// AppState
///
/// Implements the **Unified State Pattern**. This is the single, thread-safe, and immutable
/// container holding all essential application services and configuration.
/// The application state is shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: Abstracts document store access via the driver handle.
    pub repo: RepositoryState,
    /// Storage Layer: Abstracts upload persistence and public path generation.
    pub storage: StorageState,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These implementations allow handlers and extractors to selectively pull
// components from the shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// A middleware function that enforces authentication for the protected routers.
///
/// *Mechanism*: It attempts to extract `AuthUser` from the request. Since `AuthUser`
/// implements `FromRequestParts`, if authentication (JWT validation, DB lookup) fails,
/// the extractor immediately rejects the request with a 401 Unauthorized status,
/// preventing execution of the handler. If successful, it allows the request to proceed.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and scoped middleware,
/// and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    // A configured origin gets credentialed CORS so the refresh cookie survives
    // cross-origin requests. Without one the layer is wide open, which is the
    // local development mode.
    let cors = match &state.config.cors_origin {
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(value) => CorsLayer::new()
                .allow_origin(value)
                .allow_credentials(true)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
            Err(_) => {
                tracing::warn!("CORS_ORIGIN is not a valid header value, allowing any origin");
                CorsLayer::new()
                    .allow_methods(Any)
                    .allow_origin(Any)
                    .allow_headers(Any)
            }
        },
        None => CorsLayer::new()
            .allow_methods(Any)
            .allow_origin(Any)
            .allow_headers(Any),
    };

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Versioned API Assembly
    // The same route modules are mounted under both '/api' and '/api/v2'. The
    // mounted version travels with the request as an extension so handlers can
    // tell the two apart.
    let api = |version: ApiVersion| -> Router<AppState> {
        let public = Router::new()
            .merge(users::public_routes())
            .merge(collections::public_routes())
            .merge(items::public_routes());

        // Protected routes carry the authentication layer; role checks happen
        // inside the handlers after the request passes this layer.
        let protected = Router::new()
            .merge(users::protected_routes())
            .merge(collections::protected_routes())
            .merge(items::protected_routes())
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            ));

        public.merge(protected).layer(Extension(version))
    };

    // 3. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Plain greeting at the root path.
        .route("/", get(handlers::welcome))
        // Liveness probe for monitoring and load balancer checks.
        .route("/health", get(handlers::health_check))
        .nest("/api", api(ApiVersion::V1))
        .nest("/api/v2", api(ApiVersion::V2))
        // Static file serving for stored uploads. v2 uploads live in a
        // subdirectory of the same root, so one mount covers both versions.
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        // Apply the Unified State to all routes.
        .with_state(state);

    // 4. Observability and Correlation Layers (Applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 4a. Request ID Generation: a unique UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 4b. Request Tracing: wraps the request/response lifecycle in a tracing span
                // carrying the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 4c. Request ID Propagation: returns the x-request-id header to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 5. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Helper function used by `TraceLayer` to customize the tracing span creation.
/// It extracts the `x-request-id` header (if present) and includes it in the
/// structured logging metadata alongside the HTTP method and URI.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    // The structured log format used by the tracing macros.
    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
