//! Celprep WebUI - backend for the Celprep CELPIP practice studio
//!
//! Serves the key management flow, the gated practice pages and site-wide
//! content over a JSON API consumed by the frontend.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

use celprep_webui::{build_router, config, config::LogFormat, db, AppConfig, AppState};
use celprep_webui::services::api2d::{Api2dClient, KeyAuthority};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        println!("Celprep WebUI {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration first so logging knows its format
    let config = AppConfig::load().context("Failed to load configuration")?;

    // The guard must be kept alive for the duration of the program to
    // ensure log messages are flushed to files
    let _log_guard = init_logging(&config);

    info!("Celprep WebUI starting up");

    info!("Initializing database connection");
    let db = db::init_pool(&config.database)
        .await
        .context("Failed to initialize database")?;

    let api2d: Option<Arc<dyn KeyAuthority>> = match config.api2d {
        Some(ref api2d_config) => {
            info!("Initializing api2d client: {}", api2d_config.url);
            Some(Arc::new(
                Api2dClient::new(api2d_config).context("Failed to initialize api2d client")?,
            ))
        }
        None => {
            info!("api2d not configured, key provisioning will be unavailable");
            None
        }
    };

    let state = AppState {
        config: config.clone(),
        db,
        api2d,
    };

    let mut app = build_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    if let Some(ref static_dir) = config.server.static_dir {
        info!("Serving static files from {:?}", static_dir);
        app = app.fallback_service(ServeDir::new(static_dir));
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind server address")?;

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use config::LogTarget;
    use tracing_subscriber::{prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let log_config = &config.logging;

    match log_config.target {
        LogTarget::Console => {
            let registry = tracing_subscriber::registry().with(env_filter);
            match log_config.format {
                LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
                LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
            }
            None
        }
        LogTarget::File => {
            let (writer, guard) = create_file_writer(log_config);
            let registry = tracing_subscriber::registry().with(env_filter);
            match log_config.format {
                LogFormat::Json => registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_ansi(false)
                            .with_writer(writer),
                    )
                    .init(),
                LogFormat::Pretty => registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_ansi(false)
                            .with_writer(writer),
                    )
                    .init(),
            }
            Some(guard)
        }
        LogTarget::Both => {
            let (writer, guard) = create_file_writer(log_config);
            let registry = tracing_subscriber::registry().with(env_filter);
            match log_config.format {
                LogFormat::Json => registry
                    .with(tracing_subscriber::fmt::layer().json())
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_ansi(false)
                            .with_writer(writer),
                    )
                    .init(),
                LogFormat::Pretty => registry
                    .with(tracing_subscriber::fmt::layer())
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_ansi(false)
                            .with_writer(writer),
                    )
                    .init(),
            }
            Some(guard)
        }
    }
}

/// Create a file writer with optional daily rotation
fn create_file_writer(
    log_config: &config::LoggingConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let file_appender = if log_config.daily_rotation {
        tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_prefix)
    } else {
        tracing_appender::rolling::never(&log_config.log_dir, &log_config.log_prefix)
    };

    tracing_appender::non_blocking(file_appender)
}

fn print_help() {
    println!("Celprep WebUI {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("USAGE:");
    println!("    celprep-webui [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print this help message");
    println!("    -V, --version    Print version information");
    println!();
    println!("CONFIGURATION:");
    println!("    Reads config.yaml from the working directory,");
    println!("    /etc/celprep-webui/, or the user config directory.");
    println!("    CELPREP_CONFIG overrides the config file path.");
}
