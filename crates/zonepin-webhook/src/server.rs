use crate::error::{Result, WebhookError};
use crate::handlers::*;
use crate::tls::{resolve_tls, TlsMode};
use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Grace period for in-flight reviews once shutdown is requested
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Webhook server configuration
#[derive(Clone)]
pub struct Config {
    /// Address to listen on
    pub listen_addr: SocketAddr,
    /// TLS configuration
    pub tls_mode: TlsMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8443)),
            tls_mode: TlsMode::Disabled,
        }
    }
}

/// Admission webhook server
pub struct WebhookServer {
    config: Config,
    state: Arc<AppState>,
}

impl WebhookServer {
    /// Create a new webhook server
    pub fn new(config: Config, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Build the router
    pub fn build_router(&self) -> Router {
        Router::new()
            // Health checks
            .route("/healthz", get(healthz))
            .route("/livez", get(livez))
            .route("/readyz", get(readyz))
            // Admission
            .route("/inject", post(inject_zone_affinity))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server until `token` is cancelled
    pub async fn run(self, token: CancellationToken) -> miette::Result<()> {
        let app = self.build_router();
        let addr = self.config.listen_addr;

        match resolve_tls(&self.config.tls_mode)? {
            None => {
                info!("Starting webhook server on {} (plain HTTP)", addr);

                let listener = TcpListener::bind(addr)
                    .await
                    .map_err(|e| WebhookError::server_error(addr, e))?;

                axum::serve(listener, app)
                    .with_graceful_shutdown(token.cancelled_owned())
                    .await
                    .map_err(|e| WebhookError::server_error(addr, e))?;
            }
            Some(material) => {
                let tls_config = RustlsConfig::from_pem(material.cert_pem, material.key_pem)
                    .await
                    .map_err(|e| WebhookError::tls_error(e.to_string()))?;

                info!("Starting webhook server on {} (HTTPS)", addr);

                let handle = Handle::new();
                let shutdown = handle.clone();
                tokio::spawn(async move {
                    token.cancelled().await;
                    shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
                });

                serve_tls(addr, tls_config, handle, app).await?;
            }
        }

        info!("Webhook server stopped");
        Ok(())
    }
}

async fn serve_tls(
    addr: SocketAddr,
    tls_config: RustlsConfig,
    handle: Handle,
    app: Router,
) -> Result<()> {
    axum_server::bind_rustls(addr, tls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .map_err(|e| WebhookError::server_error(addr, e))
}
