//! # Slide Server
//!
//! Actix-web front end exposing the sliding-window limiter over HTTP.

use actix_web::middleware::Condition;
use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

mod config;
mod handlers;
mod middleware;
mod state;
mod telemetry;

use config::AppConfig;
use middleware::rate_limit::RateLimitMiddleware;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();

    tracing::info!(
        "Starting Slide Server on {}:{} with {} store",
        config.host,
        config.port,
        config.backend
    );

    let state = AppState::new(&config).await?;
    let http_limit = config.http_limit.clone();

    HttpServer::new(move || {
        let rate_limit = Condition::new(
            http_limit.enabled,
            RateLimitMiddleware::new(state.limiter.clone(), http_limit.clone()),
        );

        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(|cfg| handlers::configure_routes(cfg, rate_limit))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
