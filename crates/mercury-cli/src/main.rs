mod run;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mercury")]
#[command(about = "Free and discounted game deal aggregator")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch every registered store (or one) and report new offers
    Run {
        /// Restrict the run to a single store (by name)
        #[arg(long)]
        store: Option<String>,

        /// Compare against the stored snapshot without writing or notifying
        #[arg(long)]
        dry_run: bool,
    },
    /// List registered stores and their notification channels
    Stores,
    /// Apply pending database migrations
    Migrate,
}

fn init_tracing(log_level: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_level))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}

/// Load configuration, install the tracing subscriber, and open the pool.
async fn bootstrap() -> anyhow::Result<(mercury_core::AppConfig, sqlx::PgPool)> {
    let config = mercury_core::load_app_config()?;
    init_tracing(&config.log_level)?;
    tracing::debug!(env = %config.env, "configuration loaded");

    let pool = mercury_db::connect_pool(
        &config.database_url,
        mercury_db::PoolConfig::from_app_config(&config),
    )
    .await?;
    Ok((config, pool))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { store, dry_run }) => {
            let (config, pool) = bootstrap().await?;
            run::run_stores(&pool, &config, store.as_deref(), dry_run).await
        }
        Some(Commands::Stores) => {
            run::print_stores();
            Ok(())
        }
        Some(Commands::Migrate) => {
            let (_config, pool) = bootstrap().await?;
            let applied = mercury_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
            Ok(())
        }
        None => {
            println!("no command given; try `mercury --help`");
            Ok(())
        }
    }
}
