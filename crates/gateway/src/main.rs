//! R-kive API Gateway
//!
//! HTTP front for the paper repository.
//! Handles:
//! - Session extraction from hosted-backend access tokens
//! - Rate limiting
//! - Paper, citation, related-paper and citation-tree routes
//! - Realtime table-change streams over SSE
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use axum::{
    extract::FromRef,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use rkive_common::{
    config::AppConfig, db::DbPool, metrics, telemetry, EventBus, SessionVerifier,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{signal, sync::watch};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub events: EventBus,
    pub verifier: Arc<SessionVerifier>,
}

impl FromRef<AppState> for Arc<SessionVerifier> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.verifier)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    telemetry::init_tracing(&config.observability);

    info!("Starting R-kive API Gateway v{}", rkive_common::VERSION);

    metrics::register_metrics();
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .set_buckets(metrics::LATENCY_BUCKETS)?
            .install()?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }

    let verifier = Arc::new(SessionVerifier::from_config(&config.auth)?);

    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;

    let state = AppState {
        events: EventBus::new(config.events.channel_capacity),
        config: Arc::new(config),
        db,
        verifier,
    };

    let shutdown_timeout = state.config.shutdown_timeout();
    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port).parse()?;
    let app = create_router(state);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // SSE streams stay open until clients leave; cap the drain
    let (drain_tx, mut drain_rx) = watch::channel(false);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = drain_rx.changed().await;
    });

    tokio::select! {
        result = server.into_future() => result?,
        _ = async {
            shutdown_signal().await;
            let _ = drain_tx.send(true);
            tokio::time::sleep(shutdown_timeout).await;
        } => warn!(timeout = ?shutdown_timeout, "Graceful shutdown timed out, closing remaining connections"),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let api_routes = Router::new()
        // Health endpoints (no session)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Papers
        .route("/papers", get(handlers::papers::list_papers))
        .route("/papers/{id}", get(handlers::papers::get_paper))
        .route("/papers/{id}/citations", get(handlers::citations::get_citations))
        .route("/papers/{id}/related", get(handlers::related::get_related))
        .route("/papers/{id}/citation-tree", get(handlers::tree::get_citation_tree))
        // Citation curation (admin)
        .route("/citations", post(handlers::citations::create_citation))
        .route("/citations/{id}", delete(handlers::citations::delete_citation))
        // Realtime
        .route("/events/{table}", get(handlers::events::subscribe))
        .route_layer(from_fn(middleware::metrics::track_requests));

    let rate_limit = state.config.rate_limit.clone();
    let max_concurrent = state.config.server.max_concurrent_requests.max(1);

    let app = Router::new()
        .nest("/v1", api_routes)
        .with_state(state);

    let app = if rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            rate_limit.requests_per_second,
            rate_limit.burst,
        );
        app.layer(from_fn_with_state(limiter, middleware::rate_limit::rate_limit_middleware))
    } else {
        app
    };

    app.layer(ConcurrencyLimitLayer::new(max_concurrent))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use rkive_common::db::models::Paper;
    use rkive_common::Role;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use uuid::Uuid;

    pub const SECRET: &str = "gateway_test_secret";

    pub fn state_with(db: MockDatabase) -> AppState {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = Some(SECRET.to_string());
        config.rate_limit.enabled = false;

        AppState {
            verifier: Arc::new(SessionVerifier::from_config(&config.auth).unwrap()),
            events: EventBus::new(config.events.channel_capacity),
            config: Arc::new(config),
            db: DbPool::from_connection(db.into_connection()),
        }
    }

    pub fn empty_state() -> AppState {
        state_with(MockDatabase::new(DatabaseBackend::Postgres))
    }

    pub fn router(state: AppState) -> Router {
        create_router(state)
    }

    pub fn token(state: &AppState, role: Role) -> String {
        let bearer = state
            .verifier
            .issue(Uuid::from_u128(42), Some("user@example.edu".to_string()), role)
            .unwrap();
        format!("Bearer {}", bearer)
    }

    pub fn paper(n: u128, title: &str, category: Option<&str>, year: Option<i32>) -> Paper {
        Paper {
            id: Uuid::from_u128(n),
            title: title.to_string(),
            authors: Some("A. Santos".to_string()),
            abstract_text: None,
            category: category.map(str::to_string),
            year_published: year,
            created_at: chrono::Utc::now().fixed_offset(),
        }
    }

    pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
