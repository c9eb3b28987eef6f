mod config;
mod plan_cmds;
mod serve_cmd;
#[cfg(test)]
mod test_util;

use clap::{Parser, Subcommand};

use plandesk_db::pool;

use config::PlandeskConfig;

#[derive(Parser)]
#[command(name = "plandesk", about = "Plan document store with a small HTTP API")]
struct Cli {
    /// Database URL (overrides PLANDESK_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Working directory whose plans are used (overrides PROJECT_ROOT env var)
    #[arg(long, global = true)]
    working_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a plandesk config file
    Init {
        /// Database URL to record in the config file
        #[arg(long)]
        db_url: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the session database and run migrations
    DbInit,
    /// Serve the plan HTTP API
    Serve {
        /// Address to bind (default: config file, then 127.0.0.1)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (default: config file, then 3001)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Plan management
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// List plans in the working directory
    List,
    /// Show a plan and its metadata
    Show {
        /// Plan filename (e.g. add-login-1a2b3c4d.md)
        filename: String,
    },
    /// Store a markdown file as a new plan
    Create {
        /// Path to the markdown file
        file: String,
        /// Title (derived from the content when omitted)
        #[arg(long)]
        title: Option<String>,
        /// Plan type: implementation, research, or custom (detected when omitted)
        #[arg(long = "type")]
        plan_type: Option<String>,
        /// Session to associate the plan with
        #[arg(long)]
        session: Option<String>,
        /// Tag to attach (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Delete a plan
    Delete {
        /// Plan filename
        filename: String,
    },
}

/// Execute the `plandesk init` command: write config file.
fn cmd_init(db_url: Option<String>, working_dir: Option<String>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        server: config::ServerSection {
            bind: Some(config::DEFAULT_BIND.to_string()),
            port: Some(config::DEFAULT_PORT),
            default_working_dir: working_dir.map(Into::into),
        },
        database: config::DatabaseSection { url: db_url },
    };

    let path = config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    if let Some(url) = &cfg.database.url {
        println!("  database.url = {url}");
    }
    if let Some(dir) = &cfg.server.default_working_dir {
        println!("  server.default_working_dir = {}", dir.display());
    }
    println!();
    println!("Next: run `plandesk db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `plandesk db-init` command: create database and run migrations.
async fn cmd_db_init(resolved: &PlandeskConfig) -> anyhow::Result<()> {
    println!("Initializing plandesk database...");

    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready at {}. Tables:", resolved.db_config.database_url);
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("plandesk db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(db_url, cli.working_dir, force)?;
        }
        Commands::DbInit => {
            let resolved = PlandeskConfig::resolve(
                cli.database_url.as_deref(),
                cli.working_dir.as_deref(),
            )?;
            cmd_db_init(&resolved).await?;
        }
        Commands::Serve { bind, port } => {
            let resolved = PlandeskConfig::resolve(
                cli.database_url.as_deref(),
                cli.working_dir.as_deref(),
            )?;
            let bind = bind.unwrap_or(resolved.bind);
            let port = port.unwrap_or(resolved.port);
            serve_cmd::run_serve(resolved.api, &bind, port).await?;
        }
        Commands::Plan { command } => {
            let resolved = PlandeskConfig::resolve(
                cli.database_url.as_deref(),
                cli.working_dir.as_deref(),
            )?;
            plan_cmds::run_plan_command(command, &resolved.api.default_working_dir).await?;
        }
    }

    Ok(())
}
