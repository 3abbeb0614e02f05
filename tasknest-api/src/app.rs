/// Application state and router builder
///
/// Defines the shared state handed to every handler and assembles the
/// Axum router with routes and middleware. All connections (database,
/// cache, Redis) are created once by the entry point and injected here;
/// no component opens its own.
///
/// # Example
///
/// ```no_run
/// use tasknest_api::{app::{build_router, AppState}, config::Config};
/// use tasknest_shared::cache::{Cache, CacheConfig};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let cache = Cache::connect(CacheConfig::default()).await;
/// let state = AppState::new(pool, cache, None, config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{config::Config, error::ApiError};
use tasknest_shared::{auth::identity, cache::Cache, models::user::User};

/// Shared application state
///
/// Cloned per request via Axum's `State` extractor; `Arc` keeps the
/// clone cheap.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Best-effort cache
    pub cache: Cache,

    /// Redis connection for rate limiting (None disables it)
    pub redis: Option<ConnectionManager>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(
        db: PgPool,
        cache: Cache,
        redis: Option<ConnectionManager>,
        config: Config,
    ) -> Self {
        Self {
            db,
            cache,
            redis,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// The authenticated user, inserted into request extensions by
/// [`auth_layer`]
///
/// Handlers extract it with `Extension<CurrentUser>`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Builds the complete Axum router
///
/// ```text
/// /
/// ├── /health                       # liveness + db check (public)
/// └── /v1/
///     ├── /auth/
///     │   ├── POST /register        # public
///     │   ├── POST /login           # public
///     │   ├── POST /refresh         # public (refresh token in body)
///     │   ├── GET  /me              # protected
///     │   └── PUT  /me              # protected
///     ├── /tasks/                   # protected, owner-scoped
///     │   ├── POST /    GET /       GET /stats
///     │   └── GET|PUT|DELETE /:id   PATCH /:id/status
///     └── /labels/                  # protected, owner-scoped
///         ├── POST /    GET /
///         └── GET|PUT|DELETE /:id
/// ```
///
/// Protected routers carry the auth layer (identity resolution) and, when
/// Redis is configured, the per-user rate limit layer.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_public = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let auth_protected = Router::new()
        .route(
            "/me",
            get(routes::auth::me).put(routes::auth::update_me),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_layer,
        ));

    let task_routes = Router::new()
        .route(
            "/",
            post(routes::tasks::create_task).get(routes::tasks::list_tasks),
        )
        .route("/stats", get(routes::tasks::task_stats))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/status", axum::routing::patch(routes::tasks::update_task_status));

    let label_routes = Router::new()
        .route(
            "/",
            post(routes::labels::create_label).get(routes::labels::list_labels),
        )
        .route(
            "/:id",
            get(routes::labels::get_label)
                .put(routes::labels::update_label)
                .delete(routes::labels::delete_label),
        );

    // Rate limiting runs after authentication so it can key on the user;
    // layers apply bottom-up, so auth_layer is added last
    let owner_scoped = Router::new()
        .nest("/tasks", task_routes)
        .nest("/labels", label_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::rate_limit::rate_limit_layer,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_public.merge(auth_protected))
        .merge(owner_scoped);

    let cors = build_cors(&state);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::security::security_headers,
        ))
        .with_state(state)
}

/// Builds the CORS layer from configured origins
fn build_cors(state: &AppState) -> CorsLayer {
    if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    }
}

/// Authentication middleware
///
/// Extracts the bearer token, resolves it to a persisted user (verifying
/// signature, expiry, existence, and active flag), and injects
/// [`CurrentUser`] into request extensions. A missing header is the same
/// 401 as an unverifiable token.
async fn auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Expected Bearer token".to_string()))?;

    let user = identity::resolve_user(&state.db, token, state.jwt_secret()).await?;

    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}
