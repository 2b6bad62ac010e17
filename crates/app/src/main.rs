use std::{sync::Arc, time::Duration};

use chrono::Utc;
use engine::{Engine, FixedRates};
use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "splitledger={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let Some(server) = settings.server else {
        tracing::warn!("no server settings found, nothing to run");
        return Ok(());
    };

    tracing::info!("Found server settings...");
    let db = parse_database(&server.database).await?;

    let rates = settings
        .rates
        .table
        .iter()
        .fold(FixedRates::new(), |rates, rate| {
            rates.with_rate(rate.from, rate.to, rate.rate_bps)
        });
    let engine = Arc::new(
        Engine::builder()
            .database(db.clone())
            .score_policy(settings.score)
            .rates(Arc::new(rates))
            .reference_currency(settings.rates.reference_currency)
            .build()
            .await?,
    );

    let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, server.port);
    let server_engine = Arc::clone(&engine);
    tasks.spawn(async move {
        server::run(server_engine, db, &addr).await;
    });

    let interval_secs = settings.sweep.interval_secs.max(1);
    tasks.spawn(async move {
        tracing::info!("sweep every {interval_secs}s");
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            if let Err(err) = engine.run_sweep(Utc::now()).await {
                tracing::error!("sweep failed: {err}");
            }
        }
    });

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn parse_database(
    config: &Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
