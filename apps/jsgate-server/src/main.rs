use axum::{
    Router, middleware,
    routing::{delete, get, patch, post},
};
use clap::{Parser, Subcommand};
use jsgate_core::analytics::AccessRecorder;
use jsgate_core::delivery::DeliveryPipeline;
use jsgate_core::dns::{DnsVerifier, ProxyRanges, SystemResolver};
use jsgate_db::Repositories;
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod config;
mod error;
mod handlers;
mod platform_ip;

use config::ServerConfig;
use handlers::{analytics, campaigns, delivery, domains, health, logs, tester, whitelist};

#[derive(Parser)]
#[command(name = "jsgate-server")]
#[command(about = "Domain-scoped JavaScript delivery server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,
    /// Check a custom domain's DNS against the platform IP and print the report
    VerifyDomain {
        /// Domain to resolve, e.g. cdn.example.com
        domain: String,
    },
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub repos: Repositories,
    pub pipeline: DeliveryPipeline,
    pub recorder: AccessRecorder,
    pub verifier: DnsVerifier,
}

impl AppState {
    pub fn new(config: ServerConfig, repos: Repositories, verifier: DnsVerifier) -> Self {
        let pipeline = DeliveryPipeline::new(
            repos.projects.clone(),
            repos.scripts.clone(),
            repos.campaigns.clone(),
            repos.whitelist.clone(),
        );
        let recorder = AccessRecorder::new(repos.access_logs.clone());

        Self {
            config: Arc::new(config),
            repos,
            pipeline,
            recorder,
            verifier,
        }
    }
}

fn init_tracing(log_file: Option<&str>) -> Option<WorkerGuard> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path.file_name().unwrap_or(path.as_os_str());
            let (non_blocking, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (
                Some(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "jsgate_server=debug,jsgate_core=info,tower_http=info,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stdout))
        .with(file_layer)
        .init();

    guard
}

async fn build_verifier(config: &ServerConfig) -> anyhow::Result<DnsVerifier> {
    let platform_ip = platform_ip::resolve_platform_ip(config).await?;
    let resolver = SystemResolver::new(Duration::from_secs(config.dns_timeout_secs));
    Ok(DnsVerifier::new(
        Arc::new(resolver),
        platform_ip,
        ProxyRanges::cloudflare(),
    ))
}

pub fn router(state: AppState) -> Router {
    let operator = Router::new()
        .route(
            "/api/projects/{project_id}/scripts/{script_id}/test-domain",
            post(tester::test_domain),
        )
        .route(
            "/api/projects/{project_id}/scripts/{script_id}/whitelist",
            get(whitelist::list_entries).post(whitelist::create_entry),
        )
        .route(
            "/api/projects/{project_id}/scripts/{script_id}/whitelist/{entry_id}",
            patch(whitelist::update_entry).delete(whitelist::delete_entry),
        )
        .route(
            "/api/projects/{project_id}/popunders",
            get(campaigns::list_campaigns).post(campaigns::create_campaign),
        )
        .route(
            "/api/projects/{project_id}/popunders/{campaign_id}",
            get(campaigns::get_campaign)
                .patch(campaigns::update_campaign)
                .delete(campaigns::delete_campaign),
        )
        .route(
            "/api/projects/{project_id}/popunders/{campaign_id}/test-domain",
            post(tester::test_campaign_domain),
        )
        .route(
            "/api/projects/{project_id}/popunders/{campaign_id}/whitelist",
            get(whitelist::list_campaign_entries).post(whitelist::create_campaign_entry),
        )
        .route(
            "/api/projects/{project_id}/popunders/{campaign_id}/whitelist/{entry_id}",
            patch(whitelist::update_campaign_entry).delete(whitelist::delete_campaign_entry),
        )
        .route(
            "/api/projects/{project_id}/analytics",
            get(analytics::project_analytics),
        )
        .route(
            "/api/projects/{project_id}/scripts/{script_id}/analytics",
            get(analytics::script_analytics),
        )
        .route(
            "/api/projects/{project_id}/logs",
            get(logs::list_logs).delete(logs::clear_project_logs),
        )
        .route("/api/projects/{project_id}/logs/{log_id}", delete(logs::delete_log))
        .route(
            "/api/projects/{project_id}/scripts/{script_id}/logs",
            delete(logs::clear_script_logs),
        )
        .route(
            "/api/custom-domains",
            get(domains::list_domains).post(domains::create_domain),
        )
        .route("/api/custom-domains/{id}", delete(domains::delete_domain))
        .route("/api/custom-domains/{id}/verify", post(domains::verify_domain))
        .route("/api/custom-domains/{id}/activate", post(domains::activate_domain))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_admin));

    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/api/js/{project_slug}/{script_file}",
            get(delivery::serve_script),
        )
        .route(
            "/api/js/popunder/{project_slug}/{campaign_file}",
            get(delivery::serve_popunder),
        )
        .route("/api/custom-domains/active", get(domains::list_active_domains))
        .merge(operator)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let pool = jsgate_db::init_db(&config.database_url, config.db_max_connections).await?;
    tracing::info!("Database initialized");

    let verifier = build_verifier(&config).await?;
    tracing::info!("Platform IP: {}", verifier.platform_ip());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    let state = AppState::new(config, Repositories::new(pool), verifier);
    let app = router(state);

    tracing::info!("jsgate listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: failed to load .env file: {}", e);
    }

    let cli = Cli::parse();
    let config = ServerConfig::load()?;
    let _guard = init_tracing(config.log_file.as_deref());
    tracing::info!("Config loaded from {}", config.source);

    let _ = rustls::crypto::ring::default_provider().install_default();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config).await?,
        Commands::VerifyDomain { domain } => {
            let verifier = build_verifier(&config).await?;
            let report = verifier.verify(&domain).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
