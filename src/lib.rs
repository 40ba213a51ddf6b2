pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::infrastructure::{
    axum_http::http_serve, billing_services, postgres::postgres_connection,
    scheduler::daily_sweep,
};

pub async fn run() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let dotenvy_env = config::config_loader::load()?;
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");

    let services = billing_services::build_services(Arc::new(postgres_pool), &dotenvy_env);

    tokio::spawn(daily_sweep::run_scheduler_loop(
        Arc::clone(&services.lifecycle),
        Arc::clone(&services.late_fees),
        Duration::from_secs(dotenvy_env.scheduler.sweep_interval_secs),
    ));

    http_serve::start(Arc::new(dotenvy_env), &services).await?;

    Ok(())
}
