mod config;
mod graphql;
mod http;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use platform_db::{DbPool, connect};
use platform_obs::{ObsConfig, init_tracing};
use products_hr::{EmployeeDraft, ServiceError};
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    graphql::{HrService, hr_service},
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "employee-server", version, about = "Employee records service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP + GraphQL server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Insert a small demo roster, skipping addresses that already exist.
    Seed,
    /// Print the GraphQL schema snapshot.
    #[command(name = "schema:print")]
    SchemaPrint {
        #[arg(long, value_name = "FILE", help = "Destination file path")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
    /// List migrations that have not been applied yet.
    Status,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
    #[arg(long, help = "Allow starting even when migrations are pending")]
    allow_dirty: bool,
}

impl From<&ServeCommand> for ServeConfig {
    fn from(value: &ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

const DEMO_ROSTER: &[(&str, &str, &str)] = &[
    ("John Doe", "john.doe@example.com", "IT"),
    ("Jane Smith", "jane.smith@example.com", "Human Resources"),
    ("Carlos Diaz", "carlos.diaz@example.com", "Finance"),
    ("Mei Chen", "mei.chen@example.com", "Engineering"),
];

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(ObsConfig::from_env("employee-server"))?;
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(cmd) => run_server(cmd).await,
        Command::Migrate(action) => {
            let config = AppConfig::load()?;
            let pool = connect(&config.database).await?;
            match action {
                MigrateCommand::Up => migrate_up(&pool).await,
                MigrateCommand::Down => migrate_down(&pool).await,
                MigrateCommand::Status => migrate_status(&pool).await,
            }
        }
        Command::Seed => run_seed().await,
        Command::SchemaPrint { output } => schema_print(output),
    }
}

fn schema_print(path: Option<PathBuf>) -> Result<()> {
    let sdl = graphql::schema_sdl();
    match path {
        Some(target) => {
            std::fs::write(&target, sdl)
                .with_context(|| format!("failed to write {}", target.display()))?;
            info!(path = %target.display(), "schema snapshot written");
        }
        None => println!("{sdl}"),
    }
    Ok(())
}

async fn run_seed() -> Result<()> {
    let config = AppConfig::load()?;
    let pool = connect(&config.database).await?;
    ensure_migrations(&pool, false).await?;
    let service = hr_service(pool);
    let inserted = seed_roster(&service).await?;
    info!(inserted, "seed complete");
    Ok(())
}

async fn seed_roster(service: &HrService) -> Result<usize> {
    let mut inserted = 0usize;
    for (name, email, department) in DEMO_ROSTER {
        match service
            .add_employee(EmployeeDraft::new(*name, *email, *department))
            .await
        {
            Ok(_) => inserted += 1,
            Err(ServiceError::Conflict { email }) => {
                info!(%email, "demo employee already present");
            }
            Err(err) => return Err(anyhow::Error::new(err).context("seeding demo roster")),
        }
    }
    Ok(inserted)
}

async fn run_server(cmd: ServeCommand) -> Result<()> {
    let config = Arc::new(AppConfig::load()?);
    let pool = connect(&config.database).await?;
    ensure_migrations(&pool, cmd.allow_dirty).await?;
    let service = hr_service(pool.clone());
    let schema = graphql::build_schema(service);
    let state = AppState {
        pool,
        schema,
        config,
    };
    http::serve((&cmd).into(), state).await
}

async fn ensure_migrations(pool: &DbPool, allow_dirty: bool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(pool).await?;
    if pending.is_empty() {
        return Ok(());
    }
    if !allow_dirty {
        anyhow::bail!(
            "pending migrations detected; run `employee-server migrate up` or pass --allow-dirty"
        );
    }
    warn!(pending = pending.len(), "starting with pending migrations");
    Ok(())
}

async fn migrate_up(pool: &DbPool) -> Result<()> {
    Migrator::up(pool, None).await?;
    info!("database migrations applied");
    Ok(())
}

async fn migrate_down(pool: &DbPool) -> Result<()> {
    Migrator::down(pool, Some(1)).await?;
    info!("most recent migration rolled back");
    Ok(())
}

async fn migrate_status(pool: &DbPool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(pool).await?;
    if pending.is_empty() {
        info!("database schema is up to date");
    }
    for migration in &pending {
        info!(name = migration.name(), "pending migration");
    }
    Ok(())
}
