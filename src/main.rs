use clap::{Parser, Subcommand};
use link_checker_api::admin::{self, AdminCommands};
use link_checker_api::config::Config;
use link_checker_api::error::AppResult;
use link_checker_api::server;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// link-checker-api - Checks whether links are safe and working
#[derive(Parser, Debug)]
#[command(name = "link-checker-api")]
#[command(version)]
#[command(about = "Checks whether links are safe and working", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web server
    Server {
        /// Host to bind to (overrides SERVER_HOST env var)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides SERVER_PORT env var)
        #[arg(long)]
        port: Option<u16>,

        /// Run migrations on startup
        #[arg(long)]
        migrate: bool,
    },

    /// Administrative commands
    Admin {
        #[command(subcommand)]
        admin_command: AdminCommands,
    },
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));
    if cli.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    match cli.command {
        Commands::Server { host, port, migrate } => {
            let mut config = Config::from_env()?;

            // Override config with CLI args if provided
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            server::run_server(config, migrate).await
        }
        Commands::Admin { admin_command } => admin::run(admin_command).await,
    }
}
