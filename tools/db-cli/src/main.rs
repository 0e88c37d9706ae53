use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::{migrate::MigrateDatabase, Postgres};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use workup_common::DatabaseConfig;
use workup_database::{create_pool, MigrationRunner};

#[derive(Parser)]
#[command(name = "db-cli")]
#[command(about = "Work Up database CLI tool")]
struct Cli {
    /// Database URL override (defaults to DATABASE_* environment variables)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Check migration status
    Status,
    /// Seed demo client and artisan accounts
    Seed,
    /// Reset database (drop, recreate and migrate)
    Reset {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "workup_database=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = database_config(cli.database_url.as_deref())?;

    match cli.command {
        Commands::Migrate => {
            let runner = MigrationRunner::new(create_pool(&config).await?);
            runner.run_all_migrations().await?;

            println!("Migrations completed successfully");
        }
        Commands::Status => {
            let runner = MigrationRunner::new(create_pool(&config).await?);
            let status = runner.check_migration_status().await?;
            println!("{}", status);

            if status.is_up_to_date {
                println!("Database is up to date");
            } else {
                println!("Database needs migration");
            }
        }
        Commands::Seed => {
            let runner = MigrationRunner::new(create_pool(&config).await?);
            runner.run_all_migrations().await?;
            runner.seed_demo_data().await?;

            println!("Demo accounts seeded: client@workup.ng, artisan@workup.ng");
        }
        Commands::Reset { force } => {
            if !force && !confirm_reset(&config.database)? {
                println!("Operation cancelled");
                return Ok(());
            }

            reset_database(&config).await?;

            let runner = MigrationRunner::new(create_pool(&config).await?);
            runner.run_all_migrations().await?;

            println!("Database reset completed");
        }
    }

    Ok(())
}

fn confirm_reset(database: &str) -> anyhow::Result<bool> {
    println!("This will delete ALL data in database '{}'!", database);
    println!("Type 'yes' to continue:");

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim() == "yes")
}

async fn reset_database(config: &DatabaseConfig) -> anyhow::Result<()> {
    let admin_config = DatabaseConfig {
        database: "postgres".to_string(),
        max_connections: 1,
        ..config.clone()
    };
    let admin_pool = create_pool(&admin_config).await?;

    // Open connections would block the drop
    sqlx::query(
        "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = $1 AND pid <> pg_backend_pid()",
    )
    .bind(&config.database)
    .execute(&admin_pool)
    .await?;
    admin_pool.close().await;

    let url = config.connection_string();
    if Postgres::database_exists(&url).await? {
        Postgres::drop_database(&url)
            .await
            .with_context(|| format!("Failed to drop database {}", config.database))?;
    }
    tracing::info!("Dropped database {}", config.database);

    Ok(())
}

fn database_config(database_url: Option<&str>) -> anyhow::Result<DatabaseConfig> {
    let Some(raw) = database_url else {
        return Ok(DatabaseConfig::from_env());
    };

    let url = url::Url::parse(raw).context("Invalid database URL")?;
    let database = url.path().trim_start_matches('/');
    if database.is_empty() {
        anyhow::bail!("Database URL must name a database");
    }

    Ok(DatabaseConfig {
        host: url.host_str().unwrap_or("localhost").to_string(),
        port: url.port().unwrap_or(5432),
        username: url.username().to_string(),
        password: url.password().unwrap_or("").to_string(),
        database: database.to_string(),
        max_connections: DatabaseConfig::from_env().max_connections,
    })
}
