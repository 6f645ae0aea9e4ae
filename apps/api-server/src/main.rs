//! # Gatekeeper API Server
//!
//! Actix-web server that puts per-category admission control in front of
//! every `/api` route.

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

mod background;
mod config;
mod handlers;
mod middleware;
mod state;
mod telemetry;

use config::AppConfig;
use middleware::RateLimitMiddleware;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();

    tracing::info!(
        "Starting Gatekeeper API Server on {}:{}",
        config.host,
        config.port
    );

    let state = AppState::build(&config)?;
    tracing::info!("\n{}", state.limiter.dump_policies());

    serve(&config, state).await
}

/// Bind the server, start background work, and run until shutdown.
async fn serve(config: &AppConfig, state: AppState) -> anyhow::Result<()> {
    let server_state = state.clone();
    let classifier = config.classifier.clone();
    let operator_token = config.operator_token();

    // Background work starts only once the listener is bound.
    let server = HttpServer::new(move || {
        let operator_token = operator_token.clone();
        App::new()
            .wrap(TracingLogger::default())
            // Registered last so it runs first.
            .wrap(RateLimitMiddleware::new(
                server_state.rate_limiter(),
                classifier.clone(),
            ))
            .app_data(web::Data::new(server_state.clone()))
            .configure(|cfg| handlers::configure_routes(cfg, operator_token))
    })
    .bind((config.host.as_str(), config.port))?
    .run();

    state.limiter.start()?;

    #[cfg(feature = "scheduler")]
    let mut reporter = match background::StatsReporter::start(
        &config.stats_report_cron,
        state.limiter.clone(),
    )
    .await
    {
        Ok(reporter) => reporter,
        Err(e) => {
            state.limiter.stop().await;
            return Err(anyhow::anyhow!("failed to schedule stats report: {e:?}"));
        }
    };

    let served = server.await;

    #[cfg(feature = "scheduler")]
    {
        if let Err(e) = reporter.shutdown().await {
            tracing::error!("Failed to stop stats reporter: {:?}", e);
        }
    }

    state.limiter.stop().await;
    tracing::info!("Server stopped");

    Ok(served?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::RequestClassifier;
    use gatekeeper_infra::RateLimiterConfig;
    use std::net::TcpListener;

    #[actix_web::test]
    async fn test_bind_failure_leaves_sweeper_stopped() {
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();
        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port: taken.local_addr().unwrap().port(),
            limiter: RateLimiterConfig::default(),
            classifier: RequestClassifier::default(),
            policy_overrides: Vec::new(),
            admin_enabled: false,
            admin_token: None,
            stats_report_cron: "0 */5 * * * *".to_string(),
        };
        let state = AppState::build(&config).unwrap();

        assert!(serve(&config, state.clone()).await.is_err());
        assert!(!state.limiter.is_running());
    }
}
