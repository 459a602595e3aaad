use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state. This struct is designed to be
/// immutable once loaded, ensuring consistency across all threads and services
/// (Repository, Storage, token issuing). It is pulled into the application state via
/// FromRef, embodying the "immutable AppConfig" part of the Unified State Pattern.
#[derive(Clone)]
pub struct AppConfig {
    // MongoDB connection string.
    pub mongodb_uri: String,
    // Database name selected on the connected client.
    pub db_name: String,
    // TCP port the HTTP server binds to.
    pub port: u16,
    // Allowed CORS origin for the browser frontend. None means permissive
    // (no credentials), which is only acceptable for local development.
    pub cors_origin: Option<String>,
    // Directory that uploaded images are written to and served from (/uploads).
    pub upload_dir: String,
    // Runtime environment marker. Controls feature activation (e.g., Dev Bypass).
    pub env: Env,
    // Secret key for the short-lived access tokens (Authorization header).
    pub jwt_access_secret: String,
    // Secret key for the long-lived refresh tokens (httpOnly cookie).
    pub jwt_refresh_secret: String,
}

/// Env
///
/// Defines the runtime context, used to switch between development utilities
/// (x-user-id bypass, permissive CORS) and hardened production behavior.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Provides a safe, non-panicking AppConfig instance primarily used for test setup.
    /// This allows us to instantiate the configuration without needing to set environment
    /// variables for lightweight unit or integration testing state scaffolding.
    fn default() -> Self {
        Self {
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            db_name: "curio_test".to_string(),
            port: 5000,
            cors_origin: None,
            upload_dir: "uploads".to_string(),
            env: Env::Local,
            jwt_access_secret: "local-access-secret-not-for-production".to_string(),
            jwt_refresh_secret: "local-refresh-secret-not-for-production".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// The canonical function for initializing the application configuration at startup.
    /// It reads all parameters from environment variables and implements the **fail-fast**
    /// principle.
    ///
    /// # Panics
    /// Panics if a critical environment variable required for the current runtime
    /// environment (especially Production) is not found. This prevents the application
    /// from starting with an incomplete or insecure configuration.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        // The database URI is mandatory in every environment; there is no sensible default
        // for a remote document store.
        let mongodb_uri = env::var("MONGODB_URI").expect("FATAL: MONGODB_URI must be set");

        let db_name = env::var("MONGODB_DB").unwrap_or_else(|_| "curio".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000);

        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());

        // Token Secret Resolution
        // The production secrets are mandatory and must be explicitly set.
        let (jwt_access_secret, jwt_refresh_secret) = match env {
            Env::Production => (
                env::var("JWT_ACCESS_SECRET")
                    .expect("FATAL: JWT_ACCESS_SECRET must be set in production."),
                env::var("JWT_REFRESH_SECRET")
                    .expect("FATAL: JWT_REFRESH_SECRET must be set in production."),
            ),
            // In local, we provide fallbacks so a developer can boot without a .env file.
            _ => (
                env::var("JWT_ACCESS_SECRET")
                    .unwrap_or_else(|_| "local-access-secret-not-for-production".to_string()),
                env::var("JWT_REFRESH_SECRET")
                    .unwrap_or_else(|_| "local-refresh-secret-not-for-production".to_string()),
            ),
        };

        // CORS Origin Resolution
        // Browsers send the refresh cookie cross-origin, so production must pin the
        // exact frontend origin. Local falls back to a permissive policy (no credentials).
        let cors_origin = match env {
            Env::Production => Some(
                env::var("CORS_ORIGIN").expect("FATAL: CORS_ORIGIN must be set in production."),
            ),
            _ => env::var("CORS_ORIGIN").ok(),
        };

        Self {
            mongodb_uri,
            db_name,
            port,
            cors_origin,
            upload_dir,
            env,
            jwt_access_secret,
            jwt_refresh_secret,
        }
    }
}
