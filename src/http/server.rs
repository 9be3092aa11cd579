//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID, timeouts)
//! - Serve the static form page as the fallback
//! - Bind server to listener and shut down on signal

use std::path::Path;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer, services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::config::RegistryConfig;
use crate::http::handlers;
use crate::http::request::{make_request_span, propagate_request_id_layer, set_request_id_layer};
use crate::http::response::{json_rejections, with_security_headers};
use crate::intake::IntakeService;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub intake: IntakeService,
}

/// HTTP server for the registration form.
pub struct HttpServer {
    router: Router,
    config: RegistryConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RegistryConfig, intake: IntakeService) -> Self {
        let state = AppState { intake };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RegistryConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/save", post(handlers::save))
            .route("/regions", get(handlers::list_regions))
            .route("/health", get(handlers::health))
            .with_state(state);

        let static_dir = Path::new(&config.static_files.dir);
        if config.static_files.enabled && static_dir.is_dir() {
            tracing::info!(dir = %static_dir.display(), "Serving static files");
            router = router.fallback_service(ServeDir::new(static_dir));
        } else if config.static_files.enabled {
            tracing::warn!(dir = %static_dir.display(), "Static directory missing, form page not served");
        }

        router = router
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(middleware::from_fn(json_rejections));

        if config.security.enable_headers {
            router = with_security_headers(router);
        }

        router
            .layer(middleware::from_fn(track_latency))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

async fn track_latency(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = next.run(request).await;
    metrics::record_request(&method, response.status().as_u16(), start);
    response
}
