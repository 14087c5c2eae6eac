use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nbrelay_api::config::ServerConfig;
use nbrelay_api::store::FsNotebookStore;
use nbrelay_api::{background, routes, state};

use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Logging ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nbrelay_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Config ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Configuration loaded");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = nbrelay_db::create_pool(&database_url)
        .await
        .expect("Could not connect to Postgres");
    tracing::info!("Database pool ready");

    nbrelay_db::health_check(&pool)
        .await
        .expect("Database probe failed at startup");

    nbrelay_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations up to date");

    // --- Notebook blob store ---
    tokio::fs::create_dir_all(&config.notebook_dir)
        .await
        .expect("Failed to create notebook directory");
    tracing::info!(dir = %config.notebook_dir.display(), "Notebook directory ready");

    // --- CORS ---
    let cors = build_cors_layer(&config);

    // Spawn session cleanup (purges expired and revoked sessions hourly).
    let cleanup_cancel = tokio_util::sync::CancellationToken::new();
    let cleanup_cancel_clone = cleanup_cancel.clone();
    let cleanup_pool = pool.clone();
    let cleanup_handle = tokio::spawn(async move {
        background::session_cleanup::run(cleanup_pool, cleanup_cancel_clone).await;
    });

    // --- State ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        http: reqwest::Client::new(),
        store: Arc::new(FsNotebookStore::new(config.notebook_dir.clone())),
    };

    // --- Request ID header ---
    let request_id_header = HeaderName::from_static("x-request-id");

    // --- Router ---
    let app = Router::new()
        // Health probe stays at the root, outside /api/v1.
        .merge(routes::health::router())
        // Agency connector callbacks, also root level: their URLs are
        // baked into RED documents.
        .merge(routes::callbacks::router())
        // Versioned API surface.
        .nest("/api/v1", routes::api_routes())
        // -- Middleware; layers added later wrap the ones above --
        // Turn handler panics into 500 responses.
        .layer(CatchPanicLayer::new())
        // Cut off requests exceeding the configured timeout.
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        // Echo the request ID back on responses.
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        // Span-per-request tracing.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Assign a UUID request ID to incoming requests.
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        // CORS.
        .layer(cors)
        .with_state(state);

    // --- Serve ---
    let addr = SocketAddr::new(
        config.host.parse().expect("HOST must be a valid IP address"),
        config.port,
    );
    tracing::info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Could not bind listen address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server exited with error");

    // --- Drain background jobs ---
    cleanup_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), cleanup_handle).await;
    tracing::info!("Session cleanup job stopped");

    tracing::info!("Shutdown complete");
}

/// Resolve once the process receives a termination signal.
///
/// Listens for Ctrl-C and, on Unix, SIGTERM, so interactive use and
/// process managers both stop the server cleanly.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Ctrl-C handler installation failed");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation failed")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("SIGINT received, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("SIGTERM received, starting graceful shutdown");
        }
    }
}

/// Build the CORS layer from the configured origins. An invalid origin
/// panics at startup.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
