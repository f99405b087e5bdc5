mod accounts;
mod analyze;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::accounts::{SessionCommands, TrackedCommands, UserCommands};

#[derive(Debug, Parser)]
#[command(name = "lemonade-cli")]
#[command(about = "Competitor Lemonade operator command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Issue login sessions
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Maintain a user's tracked competitors
    Tracked {
        #[command(subcommand)]
        command: TrackedCommands,
    },
    /// Run an analysis in the terminal and print the JSON result
    Analyze {
        /// Competitor names, comma or newline separated
        #[arg(long)]
        competitors: String,
        #[arg(long)]
        news: bool,
        #[arg(long)]
        funding: bool,
        #[arg(long)]
        social: bool,
        #[arg(long)]
        products: bool,
        /// Produce the short preview instead of the full report
        #[arg(long)]
        preview: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = lemonade_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Migrate) => {
            let pool = lemonade_db::connect_pool_from_config(&config).await?;
            let applied = lemonade_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Some(Commands::User { command }) => {
            let pool = lemonade_db::connect_pool_from_config(&config).await?;
            accounts::run_user_command(&pool, command).await?;
        }
        Some(Commands::Session { command }) => {
            let pool = lemonade_db::connect_pool_from_config(&config).await?;
            accounts::run_session_command(&pool, command).await?;
        }
        Some(Commands::Tracked { command }) => {
            let pool = lemonade_db::connect_pool_from_config(&config).await?;
            accounts::run_tracked_command(&pool, command).await?;
        }
        Some(Commands::Analyze {
            competitors,
            news,
            funding,
            social,
            products,
            preview,
        }) => {
            let toggles = analyze::toggles_from_flags(news, funding, social, products);
            analyze::run_analyze(&config, &competitors, toggles, preview).await?;
        }
        None => println!("lemonade-cli: run with --help to list commands"),
    }

    Ok(())
}
