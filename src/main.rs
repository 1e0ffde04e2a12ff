use std::path::PathBuf;

use billing_tags::{AppState, build_app, config, db, observability};
use clap::Parser;

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "billing-tags.toml";

/// CLI arguments for the billing tag reporting service
#[derive(Parser, Debug)]
#[command(version, about = "Billing tag usage reports", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (defaults to ./billing-tags.toml if it exists,
    /// otherwise built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Apply the bundled schema migrations to the configured database
    Migrate,
    /// Export the OpenAPI specification (JSON format)
    Openapi {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        Some(Command::Openapi { output }) => {
            let config = load_config(args.config.as_deref());
            #[cfg(feature = "utoipa")]
            run_openapi_export(&config, output);
            #[cfg(not(feature = "utoipa"))]
            {
                let _ = (config, output);
                eprintln!("Error: OpenAPI export requires the 'utoipa' feature to be enabled");
                std::process::exit(1);
            }
        }
        Some(Command::Migrate) => run_migrate(args.config.as_deref()).await,
        Some(Command::Serve) | None => run_server(args.config.as_deref()).await,
    }
}

/// Resolve the config file to load, if any.
fn resolve_config_path(explicit_path: Option<&str>) -> Result<Option<PathBuf>, String> {
    if let Some(path) = explicit_path {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(format!("Config file not found: {}", path.display()));
        }
        return Ok(Some(path));
    }

    let cwd_config = PathBuf::from(DEFAULT_CONFIG_FILE);
    if cwd_config.exists() {
        return Ok(Some(cwd_config));
    }

    Ok(None)
}

fn load_config(explicit_path: Option<&str>) -> config::ReportingServiceConfig {
    let config_path = match resolve_config_path(explicit_path) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let Some(config_path) = config_path else {
        return config::ReportingServiceConfig::default();
    };

    match config::ReportingServiceConfig::from_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!(
                "Failed to load config from {}: {}",
                config_path.display(),
                e
            );
            std::process::exit(1);
        }
    }
}

fn init_tracing(config: &config::ReportingServiceConfig) {
    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_server(explicit_config_path: Option<&str>) {
    let config = load_config(explicit_config_path);
    init_tracing(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting billing tag reporting service"
    );

    let state = match AppState::new(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize application state");
            std::process::exit(1);
        }
    };

    let app = build_app(&config, state);

    let bind_address = config.server.bind_address();
    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, address = %bind_address, "Failed to bind listener");
            std::process::exit(1);
        }
    };

    tracing::info!(
        address = %bind_address,
        admin_base_path = %config.server.admin_base_path,
        "Server listening"
    );

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }

    tracing::info!("Shutdown complete");
}

async fn run_migrate(explicit_config_path: Option<&str>) {
    let config = load_config(explicit_config_path);
    init_tracing(&config);

    if config.database.is_none() {
        eprintln!("Error: no [database] section configured");
        std::process::exit(1);
    }

    let result = async {
        let pool = db::DbPool::from_config(&config.database).await?;
        pool.run_migrations().await
    }
    .await;

    match result {
        Ok(()) => tracing::info!("Migrations applied"),
        Err(e) => {
            tracing::error!(error = %e, "Migration failed");
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "utoipa")]
fn run_openapi_export(config: &config::ReportingServiceConfig, output: Option<String>) {
    let spec = billing_tags::openapi::ApiDoc::build_for(&config.server.admin_base_path);
    let content = match serde_json::to_string_pretty(&spec) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Failed to serialize OpenAPI spec to JSON: {}", e);
            std::process::exit(1);
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, &content) {
                eprintln!("Failed to write to {}: {}", path, e);
                std::process::exit(1);
            }
            eprintln!("OpenAPI spec written to {}", path);
        }
        None => {
            println!("{}", content);
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received");
}
