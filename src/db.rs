use std::str::FromStr;

use anyhow::Context;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use tracing::info;

use crate::config::{AppConfig, DatabaseConfig};

pub fn connect_options(database: &DatabaseConfig) -> anyhow::Result<PgConnectOptions> {
    let options = match database {
        DatabaseConfig::Url(url) => {
            PgConnectOptions::from_str(url).context("parse DATABASE_URL")?
        }
        DatabaseConfig::Parts {
            host,
            port,
            user,
            password,
            name,
        } => PgConnectOptions::new()
            .host(host)
            .port(*port)
            .username(user)
            .password(password)
            .database(name),
    };
    Ok(options)
}

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect_with(connect_options(&config.database)?)
        .await
        .context("connect to database")?;
    info!(max_connections = config.db_max_connections, "database pool ready");
    Ok(db)
}

pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run database migrations")?;
    Ok(())
}
