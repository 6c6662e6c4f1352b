//! HTTP control surface.
//!
//! JSON routes under `/api` for one-off scans, monitoring jobs, history and
//! SMS diagnostics. Shared state is injected with `web::Data`.

mod routes;

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, HttpServer, ResponseError, web};

use crate::error::{AppError, Result};
use crate::models::{Config, MonitorConfig};
use crate::services::Scheduler;

const API_PATH: &str = "/api";

/// State shared by all handlers.
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
    pub monitor: MonitorConfig,
}

impl AppState {
    pub fn new(scheduler: Arc<Scheduler>, monitor: MonitorConfig) -> Self {
        Self { scheduler, monitor }
    }
}

/// The `/api` scope with every route.
pub fn configure_routes() -> actix_web::Scope {
    web::scope(API_PATH)
        .route("/scan", web::post().to(routes::scan))
        .route("/monitor/start", web::post().to(routes::start_monitor))
        .route("/monitor/stop", web::post().to(routes::stop_monitor))
        .route("/monitor/status", web::get().to(routes::monitor_status))
        .route("/history", web::get().to(routes::history))
        .route("/destinations", web::get().to(routes::destinations))
        .route("/changes", web::get().to(routes::changes))
        .route("/health", web::get().to(routes::health))
        .route("/sms/test", web::post().to(routes::sms_test))
        .route("/sms/history", web::get().to(routes::sms_history))
        .route("/sms/status", web::get().to(routes::sms_status))
}

/// Serve until the process receives a termination signal, then cancel all
/// monitoring jobs.
pub async fn run(scheduler: Arc<Scheduler>, config: &Config) -> Result<()> {
    let state = web::Data::new(AppState::new(
        Arc::clone(&scheduler),
        config.monitor.clone(),
    ));
    let host = config.server.host.clone();
    let port = config.server.port;

    log::info!("Flight monitor server running on http://{}:{}", host, port);

    let served = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(configure_routes())
            .default_service(web::route().to(routes::not_found))
    })
    .bind((host.as_str(), port))?
    .run()
    .await;

    log::info!("Shutting down gracefully...");
    scheduler.shutdown().await;

    served.map_err(AppError::from)
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
        }))
    }
}
