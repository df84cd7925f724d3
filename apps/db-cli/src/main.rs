mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use db_infra::{manager_for, Config};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "amass_db=info,db_infra=info,migration=info,sqlx=warn,sea_orm=warn";

#[derive(Subcommand)]
enum Command {
    /// Create the primary SQL database if needed and apply the first migrations
    Init,
    /// Drop the primary SQL database
    Drop,
    /// Apply every pending migration
    Migrate,
    /// Show applied and pending migration counts
    Status,
}

#[derive(Parser)]
#[command(name = "amass-db")]
#[command(about = "Amass asset database management tool")]
struct Args {
    /// Path to the INI configuration file
    #[arg(short, long, env = "AMASS_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output directory holding config.ini
    #[arg(short, long, env = "AMASS_DIR", global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .without_time()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_env_filter(filter)
        .init();

    let args = Args::parse();

    let config = match Config::acquire(args.config.as_deref(), args.dir.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let db = config.primary_sql_database();
    let manager = match manager_for(&db) {
        Ok(manager) => manager,
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    let mut out = std::io::stdout();
    let result = match args.command {
        Command::Init => commands::run_init(manager.as_ref(), &mut out).await,
        Command::Drop => commands::run_drop(manager.as_ref(), &mut out).await,
        Command::Migrate => commands::run_migrate(manager.as_ref(), &mut out).await,
        Command::Status => commands::run_status(manager.as_ref(), &mut out).await,
    };

    if let Err(e) = result {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
}
