//! Vapi call sync server
//!
//! Pulls call records from the Vapi platform on request, receives webhook
//! deliveries and serves the stored records to the dashboard.

use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpResponse, HttpServer};
use std::env;
use std::io;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vapi_api::{configure_calls, configure_sync, configure_webhook, WEBHOOK_SECRET_HEADER};
use vapi_client::VapiClient;
use vapi_core::AppConfig;
use vapi_db::{create_pool, run_migrations, PgCallRecordRepository};
use vapi_services::CallSyncService;

/// Health check endpoint
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "vapi-sync",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Configure API routes
fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            // Pull-sync and webhook ingress
            .configure(configure_sync)
            .configure(configure_webhook)
            // Stored call records
            .configure(configure_calls),
    );
}

/// Initialize tracing/logging
fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "vapi_sync={lvl},vapi_api={lvl},vapi_services={lvl},vapi_client={lvl},vapi_db={lvl},actix_web=info,sqlx=warn",
            lvl = log_level
        ))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

fn load_config() -> io::Result<AppConfig> {
    let loaded = match env::var("VAPI_SYNC_CONFIG") {
        Ok(path) => AppConfig::from_file(&path),
        Err(_) => AppConfig::load(),
    };
    loaded.map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("Invalid configuration: {}", e)))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    init_tracing();

    info!("Starting vapi-sync v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    if let Err(e) = config.upstream.api_key() {
        warn!("{}; pull-sync requests will fail until it is set", e);
    }
    if config.upstream.webhook_secret().is_none() {
        warn!("No webhook secret configured; webhook deliveries are not authenticated");
    }

    info!("Connecting to database...");
    let pool = create_pool(&config.database)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    run_migrations(&pool)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    let client = VapiClient::new(&config.upstream)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    info!("Upstream client configured for {}", client.base_url());

    let repository = Arc::new(PgCallRecordRepository::new(pool));
    let service = web::Data::new(CallSyncService::new(
        Arc::new(client),
        repository,
        &config.upstream,
    ));

    let bind_addr = config.server_addr();
    let workers = config.server.workers;
    let cors_origins = config.server.cors_origins.clone();
    info!(
        "Starting HTTP server on {} with {} workers",
        bind_addr, workers
    );

    HttpServer::new(move || {
        let cors_origins_inner = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                let origins: Vec<&str> = cors_origins_inner.split(',').collect();
                if let Ok(origin_str) = origin.to_str() {
                    origins.iter().any(|o| o.trim() == origin_str)
                } else {
                    false
                }
            })
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                header::ACCEPT,
                header::CONTENT_TYPE,
                header::HeaderName::from_static(WEBHOOK_SECRET_HEADER),
            ])
            .max_age(3600);

        App::new()
            .app_data(service.clone())
            .app_data(web::PayloadConfig::new(2 * 1024 * 1024))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                let error_message = err.to_string();
                actix_web::error::InternalError::from_response(
                    err,
                    HttpResponse::BadRequest().json(serde_json::json!({
                        "error": "validation_error",
                        "message": error_message,
                        "status": 400,
                    })),
                )
                .into()
            }))
            // Middleware
            .wrap(cors)
            .wrap(TracingLogger::default())
            .wrap(middleware::Compress::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(configure_routes)
            .route(
                "/",
                web::get().to(|| async {
                    HttpResponse::Found()
                        .append_header(("Location", "/api/v1/health"))
                        .finish()
                }),
            )
    })
    .workers(workers)
    .bind(&bind_addr)?
    .run()
    .await
}
