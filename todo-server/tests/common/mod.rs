#![allow(dead_code)]

use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::{postgres, testcontainers};
use todo_server::config::Config;

/// Connects to a fresh in-memory SQLite database with the schema applied.
///
/// Every pooled connection would open its own private in-memory database, so
/// the pool is pinned to a single connection.
pub async fn setup_db() -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn setup_container() -> anyhow::Result<testcontainers::ContainerAsync<postgres::Postgres>>
{
    let container = postgres::Postgres::default().start().await?;
    Ok(container)
}

pub async fn setup_postgres_db(
    container: &testcontainers::ContainerAsync<postgres::Postgres>,
) -> anyhow::Result<DatabaseConnection> {
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(5432).await?;
    let db_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
    let db = Database::connect(&db_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub fn test_config() -> Config {
    Config {
        db_url: "sqlite::memory:".to_string(),
        port: 8080,
        app_env: "test".to_string(),
        cors_allowed_origins: "*".to_string(),
        cors_allowed_methods: "GET, POST, PUT, DELETE, OPTIONS, PATCH".to_string(),
        cors_allowed_headers: "Accept, Authorization, Content-Type, X-CSRF-Token".to_string(),
        cors_allow_credentials: false,
        request_timeout_secs: 30,
    }
}
