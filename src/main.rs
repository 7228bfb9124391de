use anyhow::Result;
use carstore_core::config::{Config, DatabaseConfig, JwtConfig, TelemetryConfig};
use carstore_core::domain::Role;
use carstore_core::jwt::JwtManager;
use carstore_core::{migration, server, telemetry};
use clap::{Parser, Subcommand};
use tracing::info;

/// CarStore core: inventory reconciliation and authorization services
#[derive(Parser)]
#[command(name = "carstore-core", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run migrations, the stock reconciliation subscriber and the ops server (default)
    Serve,

    /// Apply database migrations and exit
    Migrate,

    /// Mint an access token for local testing
    IssueToken {
        /// Subject (user id) to embed in the token
        #[arg(long)]
        subject: String,

        /// Role: anonymous, user or admin
        #[arg(long, default_value = "user")]
        role: Role,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let config = Config::from_env()?;
            let prometheus = telemetry::init(&config.telemetry)?;
            info!("Starting CarStore Core Service");
            server::run(config, prometheus).await
        }
        Commands::Migrate => {
            telemetry::init(&TelemetryConfig {
                metrics_enabled: false,
                ..TelemetryConfig::default()
            })?;
            migration::run_migrations(&DatabaseConfig::from_env()?).await
        }
        Commands::IssueToken { subject, role } => {
            let jwt = JwtManager::new(JwtConfig::from_env()?);
            let token = jwt.create_token(&subject, role)?;
            println!("{}", token);
            Ok(())
        }
    }
}
