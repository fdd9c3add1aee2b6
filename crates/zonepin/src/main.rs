use clap::{Args, Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use zonepin_cluster::KubeStateReader;
use zonepin_core::ZONE_LABEL;
use zonepin_engine::EngineConfig;
use zonepin_webhook::{AppState, Config as WebhookConfig, TlsMode, WebhookServer};

/// How long to wait for the server to drain after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Parser)]
#[command(
    name = "zonepin",
    about = "Admission webhook pinning pods to the zones of their persistent volumes"
)]
struct Cli {
    /// Log output format
    #[arg(long, env = "ZONEPIN_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the mutating admission webhook
    Serve(ServeArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "ZONEPIN_BIND", default_value = "0.0.0.0:8443")]
    bind: String,
    /// PEM serving certificate (requires --tls-key)
    #[arg(long, env = "ZONEPIN_TLS_CERT", requires = "tls_key")]
    tls_cert: Option<PathBuf>,
    /// PEM private key for --tls-cert
    #[arg(long, env = "ZONEPIN_TLS_KEY", requires = "tls_cert")]
    tls_key: Option<PathBuf>,
    /// Directory for generated self-signed certificates, used when no certificate is given
    #[arg(long, env = "ZONEPIN_TLS_AUTO_DIR", default_value = "./zonepin-tls")]
    tls_auto_dir: PathBuf,
    /// Subject alternative names for generated certificates
    #[arg(
        long,
        env = "ZONEPIN_TLS_SAN",
        value_delimiter = ',',
        default_value = "localhost"
    )]
    tls_san: Vec<String>,
    /// Serve plain HTTP (testing only; the API server requires HTTPS)
    #[arg(long, env = "ZONEPIN_INSECURE", conflicts_with_all = ["tls_cert", "tls_key"])]
    insecure: bool,
    /// Budget for resolving a pod's zones, in milliseconds
    #[arg(long, env = "ZONEPIN_RESOLVE_TIMEOUT_MS", default_value_t = 5000)]
    resolve_timeout_ms: u64,
    /// Volume label holding the zone, also used as the node label to match
    #[arg(long, env = "ZONEPIN_ZONE_LABEL", default_value = ZONE_LABEL)]
    zone_label: String,
}

impl ServeArgs {
    fn tls_mode(&self) -> TlsMode {
        if self.insecure {
            return TlsMode::Disabled;
        }
        match (&self.tls_cert, &self.tls_key) {
            (Some(cert_path), Some(key_path)) => TlsMode::Provided {
                cert_path: cert_path.clone(),
                key_path: key_path.clone(),
            },
            _ => TlsMode::AutoGenerate {
                data_dir: self.tls_auto_dir.clone(),
                san_entries: self.tls_san.clone(),
            },
        }
    }

    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            zone_label: self.zone_label.clone(),
            resolve_timeout: Duration::from_millis(self.resolve_timeout_ms),
        }
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_format);

    // kube and axum-server both pull in rustls; pick the provider explicitly
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        return Err(miette::miette!(
            "Failed to install rustls crypto provider: {:?}",
            e
        ));
    }

    match cli.command {
        Commands::Serve(args) => run_serve(args).await,
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

/// Run the webhook until a shutdown signal arrives
async fn run_serve(args: ServeArgs) -> miette::Result<()> {
    let listen_addr: std::net::SocketAddr = args
        .bind
        .parse()
        .map_err(|e| miette::miette!("Invalid bind address '{}': {}", args.bind, e))?;

    let reader = KubeStateReader::try_default()
        .await
        .wrap_err("failed to connect to the Kubernetes API")?;

    let engine_config = args.engine_config();
    info!(
        zone_label = %engine_config.zone_label,
        resolve_timeout_ms = args.resolve_timeout_ms,
        "Starting zonepin webhook"
    );

    let state = Arc::new(AppState::new(Arc::new(reader), engine_config));
    let config = WebhookConfig {
        listen_addr,
        tls_mode: args.tls_mode(),
    };
    let server = WebhookServer::new(config, state);

    let token = CancellationToken::new();
    let mut server_handle = tokio::spawn(server.run(token.clone()));

    tokio::select! {
        result = &mut server_handle => {
            // Server stopped on its own, e.g. the address was taken
            return result
                .into_diagnostic()
                .wrap_err("webhook server task failed")?;
        }
        _ = shutdown_signal() => {}
    }

    info!("Shutting down gracefully...");
    token.cancel();

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server_handle).await {
        Ok(Ok(result)) => result?,
        Ok(Err(e)) => error!("Webhook server task failed: {}", e),
        Err(_) => warn!("Timed out waiting for in-flight requests"),
    }

    info!("Shutdown complete");

    Ok(())
}

/// Resolves on ctrl-c or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
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
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
