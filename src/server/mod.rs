// Registry server: HTTP gateway in front of the registry service
//
// Every route shares one token bucket and one request deadline. Responses
// carry anti-sniffing and anti-clickjacking headers.

mod error;
mod handlers;
mod middleware;
mod pool;

pub use error::ApiError;
pub use handlers::{
    handle_heartbeat, handle_license_holder, handle_register, handle_stats,
    handle_token_transfer, health_check, metrics_endpoint, ApiJson, HeartbeatRequest,
    RegisterRequest,
};
pub use middleware::RateLimiter;
pub use pool::{PooledMap, ResponsePool};

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    handler::Handler,
    middleware::from_fn_with_state,
    routing::{get, post, MethodRouter},
    Router,
};
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{set_header::SetResponseHeaderLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::Settings;
use crate::metrics::Metrics;
use crate::service::{EvictionTask, RegistryService};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RegistryService>,
    pub limiter: RateLimiter,
    pub pool: ResponsePool,
}

impl AppState {
    pub fn new(service: Arc<RegistryService>, settings: &Settings) -> Self {
        Self {
            service,
            limiter: RateLimiter::new(
                settings.rate_limit.requests_per_second,
                settings.rate_limit.burst,
            ),
            pool: ResponsePool::new(settings.pool.max_idle),
        }
    }
}

/// GET route; every other method, HEAD included, gets 405.
fn get_only<H, T>(handler: H) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    get(handler)
        .head(handlers::method_not_allowed)
        .fallback(handlers::method_not_allowed)
}

fn post_only<H, T>(handler: H) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    post(handler).fallback(handlers::method_not_allowed)
}

/// Build the API router.
///
/// Unmatched paths fall through to axum's 404 without consuming a rate
/// limit token.
pub fn create_router(state: AppState, settings: &Settings) -> Router {
    Router::new()
        .route("/api/health", get_only(health_check))
        .route("/api/stats", get_only(handle_stats))
        .route("/api/devices/register", post_only(handle_register))
        .route("/api/devices/heartbeat", post_only(handle_heartbeat))
        .route("/api/licenses/:code/holder", get_only(handle_license_holder))
        .route("/api/tokens/transfer", post_only(handle_token_transfer))
        .route("/metrics", get_only(metrics_endpoint))
        .route_layer(from_fn_with_state(state.clone(), middleware::rate_limit_middleware))
        .route_layer(from_fn_with_state(state.clone(), middleware::track_requests))
        .with_state(state)
        .layer(DefaultBodyLimit::max(settings.server.max_body_bytes))
        .layer(TimeoutLayer::new(settings.server.request_timeout()))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(TraceLayer::new_for_http())
}

/// The registry HTTP server and its background sweep.
pub struct RegistryServer {
    settings: Settings,
    service: Arc<RegistryService>,
}

impl RegistryServer {
    /// Build the service graph. One registry per server; nothing global.
    pub fn new(settings: Settings) -> Result<Self> {
        let metrics = Metrics::new()?;
        let service = Arc::new(RegistryService::new(settings.registry.clone(), metrics));
        Ok(Self { settings, service })
    }

    pub fn service(&self) -> &Arc<RegistryService> {
        &self.service
    }

    pub fn router(&self) -> Router {
        let state = AppState::new(Arc::clone(&self.service), &self.settings);
        create_router(state, &self.settings)
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn serve(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let addr = self.settings.bind_addr()?;
        let listener = TcpListener::bind(addr).await?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already-bound listener.
    ///
    /// After `shutdown` resolves, in-flight requests get
    /// `server.shutdown_timeout_secs` to finish; the eviction task is
    /// stopped once the listener is closed.
    pub async fn serve_on(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let local_addr = listener.local_addr()?;
        let eviction = EvictionTask::spawn(
            Arc::clone(&self.service),
            self.settings.registry.sweep_interval(),
            self.settings.registry.inactive_timeout(),
        );

        let app = self.router();
        let drain_timeout = self.settings.server.shutdown_timeout();
        let draining = CancellationToken::new();
        let draining_signal = draining.clone();

        tracing::info!(
            addr = %local_addr,
            rate = self.settings.rate_limit.requests_per_second,
            burst = self.settings.rate_limit.burst,
            "Starting license registry server"
        );

        let server = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Shutting down server...");
            draining_signal.cancel();
        })
        .into_future();

        let result = tokio::select! {
            result = server => result.map_err(anyhow::Error::from),
            _ = drain_deadline(draining, drain_timeout) => {
                tracing::warn!(
                    timeout_secs = drain_timeout.as_secs(),
                    "In-flight requests did not finish before the shutdown deadline"
                );
                Ok(())
            }
        };

        eviction.shutdown().await;
        tracing::info!("Server stopped");
        result
    }
}

/// Resolves `timeout` after `draining` is cancelled.
async fn drain_deadline(draining: CancellationToken, timeout: Duration) {
    draining.cancelled().await;
    tokio::time::sleep(timeout).await;
}

/// Completes on Ctrl-C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
