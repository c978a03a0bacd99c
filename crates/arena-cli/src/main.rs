use anyhow::Result;
use arena_challenge::ChallengeMode;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "arena")]
#[command(about = "Quiz arena operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daily challenge commands
    Challenge {
        #[command(subcommand)]
        cmd: ChallengeCmd,
    },

    /// Reconcile one game change read from two JSON files and print the patch
    Reconcile {
        /// Game document before the change
        #[arg(long)]
        before: String,

        /// Game document after the change
        #[arg(long)]
        after: String,

        /// Stamp a non-empty patch with this RFC 3339 time
        #[arg(long)]
        now: Option<String>,
    },

    /// Database commands (ARENA_DATABASE_URL)
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> overrides)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ChallengeCmd {
    /// Print challenges as JSON lines; nothing is stored
    Generate {
        /// advanced | expert (defaults to the configured mode)
        #[arg(long)]
        mode: Option<ChallengeMode>,

        #[arg(long, default_value_t = 1)]
        count: u32,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,
    },

    /// Store the challenge for a date unless one exists
    Create {
        /// YYYY-MM-DD; defaults to today in the configured zone
        #[arg(long)]
        date: Option<String>,

        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Challenge { cmd } => match cmd {
            ChallengeCmd::Generate {
                mode,
                count,
                seed,
                config_paths,
            } => commands::challenge::generate(mode, count, seed, &config_paths)?,
            ChallengeCmd::Create { date, config_paths } => {
                commands::challenge::create(date, &config_paths).await?
            }
        },

        Commands::Reconcile { before, after, now } => {
            commands::reconcile::run(&before, &after, now)?
        }

        Commands::Db { cmd } => {
            let pool = arena_store::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = arena_store::status(&pool).await?;
                    println!(
                        "db_ok={} has_games_table={} has_challenges_table={}",
                        s.ok, s.has_games_table, s.has_challenges_table
                    );
                }
                DbCmd::Migrate => {
                    arena_store::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = arena_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}
