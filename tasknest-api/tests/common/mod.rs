/// Common test utilities for integration tests
///
/// Provides a `TestContext` holding a database pool and a fully built
/// router, plus helpers for making JSON requests against it without
/// binding a socket.
///
/// Integration tests need a PostgreSQL instance. They are gated on
/// `TEST_DATABASE_URL`: when it is not set, `TestContext::try_new`
/// returns None and each test skips itself. Run them with e.g.:
///
/// ```bash
/// TEST_DATABASE_URL=postgres://localhost/tasknest_test cargo test -p tasknest-api
/// ```

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use tasknest_api::app::{build_router, AppState};
use tasknest_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig, RedisConfig};
use tasknest_shared::cache::{Cache, CacheConfig};

pub const TEST_JWT_SECRET: &str = "integration-test-secret-key-32-bytes!!";

/// Test context: database handle plus the app router
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub config: Config,
}

impl TestContext {
    /// Creates a context against TEST_DATABASE_URL, or None to skip
    pub async fn try_new() -> Option<Self> {
        let database_url = match std::env::var("TEST_DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                eprintln!("TEST_DATABASE_URL not set, skipping integration test");
                return None;
            }
        };

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: database_url.clone(),
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: TEST_JWT_SECRET.to_string(),
                access_ttl_minutes: 30,
                refresh_ttl_days: 7,
            },
            redis: RedisConfig {
                url: None,
                cache_ttl_seconds: 60,
                rate_limit_enabled: false,
                rate_limit_per_minute: 120,
            },
        };

        let db = PgPool::connect(&database_url)
            .await
            .expect("failed to connect to test database");

        sqlx::migrate!("../migrations")
            .run(&db)
            .await
            .expect("failed to run migrations");

        // In-memory cache, no Redis: rate limiting stays out of the way
        let cache = Cache::connect(CacheConfig::default()).await;

        let state = AppState::new(db.clone(), cache, None, config.clone());
        let app = build_router(state);

        Some(TestContext { db, app, config })
    }

    /// Sends a JSON request to the router and returns (status, body)
    ///
    /// A body that is empty (e.g. 204 responses) comes back as
    /// `Value::Null`.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router call failed");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, value)
    }

    /// Registers a fresh user and returns (user_id, access_token, refresh_token)
    ///
    /// Emails are randomized so tests can share one database.
    pub async fn register_user(&self, prefix: &str) -> (Uuid, String, String) {
        let email = format!("{}-{}@example.com", prefix, Uuid::new_v4());

        let (status, body) = self
            .request(
                "POST",
                "/v1/auth/register",
                None,
                Some(serde_json::json!({
                    "email": email,
                    "password": "Secret123!",
                })),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

        let user_id = body["user_id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .expect("register response has user_id");
        let access_token = body["access_token"].as_str().unwrap().to_string();
        let refresh_token = body["refresh_token"].as_str().unwrap().to_string();

        (user_id, access_token, refresh_token)
    }
}
