//! Server mode
//!
//! Builds the stores and service, wires the HTTP routes and runs until the
//! server exits or Ctrl+C is received.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, HttpServer, middleware::DefaultHeaders, web};
use anyhow::Result;
use tracing::{info, warn};

use crate::api::middleware::RequestIdMiddleware;
use crate::api::{ApiSettings, configure_routes};
use crate::config::get_config;
use crate::remote_log::{EventLogger, Level, Package, RemoteLogger};
use crate::services::ShortUrlService;

/// Time allowed for queued remote log events to drain on shutdown
const LOG_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Run the HTTP server
///
/// **Note**: Configuration and logging must be initialized before calling this function
pub async fn run_server(logger: Arc<RemoteLogger>) -> Result<()> {
    let config = get_config();
    let event_logger: Arc<dyn EventLogger> = logger.clone();

    let service = web::Data::new(ShortUrlService::in_memory(
        config.links.clone(),
        event_logger.clone(),
    ));
    let settings = web::Data::new(ApiSettings::from_config(&config));

    let workers = config.server.workers.clamp(1, 32);
    let bind_address = (config.server.host.clone(), config.server.port);

    if !settings.trusted_proxies.is_empty() {
        warn!(
            "Trusting X-Forwarded-For from proxies: {:?}",
            settings.trusted_proxies
        );
    }

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestIdMiddleware)
            .wrap(DefaultHeaders::new().add(("Cache-Control", "no-store")))
            .app_data(service.clone())
            .app_data(settings.clone())
            .app_data(web::PayloadConfig::new(64 * 1024))
            .configure(configure_routes)
    })
    .workers(workers)
    .keep_alive(Duration::from_secs(30))
    .disable_signals()
    .bind(&bind_address)?
    .run();

    info!(
        "Starting server at http://{}:{} with {} workers",
        bind_address.0, bind_address.1, workers
    );
    event_logger.backend(
        Level::Info,
        Package::Config,
        &format!("Server running on port {}", bind_address.1),
    );

    let handle = server.handle();
    tokio::select! {
        res = server => {
            res?;
        }
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                warn!("Failed to listen for Ctrl+C: {}. Shutting down.", e);
            }
            info!("Shutdown signal received, stopping server...");
            handle.stop(true).await;
        }
    }

    // shutdown 会阻塞等待 worker，放到阻塞线程池执行
    let drain_logger = logger.clone();
    let drained = actix_web::rt::task::spawn_blocking(move || {
        drain_logger.shutdown(LOG_DRAIN_TIMEOUT)
    })
    .await
    .unwrap_or(false);
    if !drained {
        warn!("Remote log queue not fully drained");
    }
    let stats = logger.stats();
    info!(
        queued = stats.queued,
        delivered = stats.delivered,
        failed = stats.failed,
        dropped = stats.dropped,
        rejected = stats.rejected,
        "Remote log dispatch summary"
    );

    Ok(())
}
