//! Civic Agenda entry point.

use std::sync::Arc;

use chrono::NaiveDate;
use civic_agenda::{
    create_combined_router, ApiState, Config, LifecycleAction, RestApiConfig, Scope,
    StaticDirectory,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;

/// Civic Agenda: recurring-activity scheduling for civic-services establishments
#[derive(Parser, Debug)]
#[command(name = "civic-agenda")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the REST API server (default behavior)
    Serve {
        /// HTTP port. If not specified, uses config file value.
        #[arg(short, long)]
        port: Option<u16>,
        /// Enable JSON logging format
        #[arg(long)]
        json_logs: bool,
    },
    /// List occurrences in a date range
    Occurrences {
        /// First day (YYYY-MM-DD)
        #[arg(short, long)]
        start: NaiveDate,
        /// Last day, inclusive (default: start + configured default range)
        #[arg(short, long)]
        end: Option<NaiveDate>,
        /// Filter by establishment ID
        #[arg(long)]
        establishment: Option<String>,
        /// Hide cancelled occurrences
        #[arg(long)]
        hide_cancelled: bool,
    },
    /// Create an activity or a recurring series from a JSON file
    Create {
        /// JSON file with the activity ("-" for stdin)
        #[arg(short, long)]
        file: String,
        /// Create directly as PLANNED instead of DRAFT
        #[arg(long)]
        planned: bool,
    },
    /// Edit one occurrence or a whole series
    Update {
        /// Record ID or occurrence ID (series@YYYY-MM-DD)
        id: String,
        /// JSON file with the fields to change ("-" for stdin)
        #[arg(short, long)]
        file: String,
        /// occurrence or series
        #[arg(short, long, default_value = "occurrence")]
        scope: Scope,
    },
    /// Delete one occurrence or a whole series
    Delete {
        /// Record ID or occurrence ID (series@YYYY-MM-DD)
        id: String,
        /// occurrence or series
        #[arg(short, long, default_value = "occurrence")]
        scope: Scope,
    },
    /// Apply a lifecycle action (submit, approve, start, complete, file_report, cancel)
    Transition {
        /// Record ID or occurrence ID (series@YYYY-MM-DD)
        id: String,
        /// Action to apply
        action: LifecycleAction,
    },
    /// Submit every draft for validation
    SubmitAll {
        /// Only drafts of this establishment
        #[arg(long)]
        establishment: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // For CLI commands (non-serve), use minimal logging
    let is_serve = matches!(args.command, Some(Command::Serve { .. }) | None);

    if !is_serve {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::stderr)
            .init();
    }

    let load_config = || -> anyhow::Result<Config> {
        Ok(match &args.config {
            Some(path) => Config::from_file(path)?,
            None => Config::load()?,
        })
    };

    match args.command {
        Some(Command::Serve { port, json_logs }) => run_http_server(&args.config, port, json_logs).await,
        Some(Command::Occurrences {
            start,
            end,
            establishment,
            hide_cancelled,
        }) => {
            cli::run_occurrences(
                load_config()?,
                start,
                end,
                establishment,
                !hide_cancelled,
                args.json,
            )
            .await
        }
        Some(Command::Create { file, planned }) => {
            cli::run_create(load_config()?, file, planned, args.json).await
        }
        Some(Command::Update { id, file, scope }) => {
            cli::run_update(load_config()?, id, file, scope, args.json).await
        }
        Some(Command::Delete { id, scope }) => {
            cli::run_delete(load_config()?, id, scope, args.json).await
        }
        Some(Command::Transition { id, action }) => {
            cli::run_transition(load_config()?, id, action, args.json).await
        }
        Some(Command::SubmitAll { establishment }) => {
            cli::run_submit_all(load_config()?, establishment, args.json).await
        }
        None => run_http_server(&args.config, None, false).await,
    }
}

/// Run the REST API server.
async fn run_http_server(
    config_path: &Option<String>,
    port: Option<u16>,
    json_logs: bool,
) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting Civic Agenda v{}", env!("CARGO_PKG_VERSION"));

    let mut config = if let Some(config_path) = config_path {
        Config::from_file(config_path)?
    } else {
        Config::load()?
    };
    if let Some(p) = port {
        config.server.http_port = p;
    }

    tracing::info!(
        storage_backend = ?config.storage.backend,
        establishments = config.establishments.len(),
        max_range_days = config.scheduling.max_range_days,
        "Configuration loaded"
    );

    let service = cli::shared_service(&config).await?;
    let directory = StaticDirectory::new(config.establishments.iter().cloned());
    let state = Arc::new(ApiState::new(service).with_directory(Arc::new(directory)));
    let router = create_combined_router(state, &RestApiConfig::from(&config.api));

    let addr = format!("{}:{}", config.server.host, config.server.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("REST API listening on http://{}{}", addr, config.api.prefix);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
