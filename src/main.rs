use bson::doc;
use curio_api::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{MongoRepository, RepositoryState},
    storage::{DiskStorageClient, StorageService, StorageState},
};
use mongodb::Client;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// The asynchronous entry point for the application, responsible for initializing
/// all core components: Configuration, Logging, Database, Storage, and the HTTP Server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    // Loads .env file settings before configuration can be read.
    dotenv::dotenv().ok();
    // AppConfig::load() implements the fail-fast principle for missing Production secrets.
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // Sets the default log level. It prioritizes the RUST_LOG environment variable,
    // falling back to sensible defaults for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "curio_api=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    // The structured logging format is dynamically selected based on the APP_ENV.
    match config.env {
        Env::Local => {
            // LOCAL: Pretty print output for human readability during local debugging.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON format output for ingestion by centralized log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database Initialization (MongoDB)
    // Connects the driver and verifies the deployment is actually reachable
    // with a ping, so a bad URI aborts startup instead of failing lazily on
    // the first request.
    let client = Client::with_uri_str(&config.mongodb_uri)
        .await
        .expect("FATAL: Failed to connect to MongoDB. Check MONGODB_URI.");

    client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .await
        .expect("FATAL: MongoDB ping failed. Check MONGODB_URI.");

    tracing::info!("Connected to MongoDB database '{}'", config.db_name);

    let db = client.database(&config.db_name);

    // Instantiate the Repository, wrapping it in an Arc for thread-safe sharing.
    let repo = Arc::new(MongoRepository::new(db)) as RepositoryState;

    // 5. Storage Initialization (Local Disk)
    // The upload directories are created up front so the static file mount and
    // the upload handler never race against a missing path.
    let disk_client = DiskStorageClient::new(&config.upload_dir);
    disk_client.ensure_upload_dirs().await;

    // Instantiate the Storage State, ready to be shared.
    let storage = Arc::new(disk_client) as StorageState;

    let port = config.port;
    let addr = format!("0.0.0.0:{}", port);

    // 6. Unified State Assembly
    // Bundles all initialized dependencies into the shared AppState.
    let app_state = AppState {
        repo,
        storage,
        config,
    };

    // 7. Router and Server Startup
    let app = create_router(app_state);

    // Binds the TCP listener and initiates the HTTP server.
    let listener = TcpListener::bind(&addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check PORT.");

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on {}", addr);
    tracing::info!(
        "API Documentation (Swagger UI) available at: http://localhost:{}/swagger-ui",
        port
    );

    // The long-running Axum server process.
    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
