// src/server/routes.rs

//! Handlers for the `/api` routes.
//!
//! Request bodies are optional: an empty body means "use the defaults", a
//! malformed one is a 400.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::AppState;
use crate::error::{AppError, Result};
use crate::models::{JobStarted, ScanRecord};

const HISTORY_LIMIT: usize = 50;
const CHANGES_LIMIT: usize = 20;
const SMS_HISTORY_LIMIT: usize = 20;

#[derive(Debug, Default, Deserialize)]
struct ScanRequest {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartRequest {
    url: Option<String>,
    interval_minutes: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SmsTestRequest {
    phone_number: Option<String>,
    message: Option<String>,
}

/// `?limit=N`; missing, zero or unparsable values fall back to the default.
#[derive(Debug, Deserialize)]
pub(super) struct LimitQuery {
    limit: Option<String>,
}

impl LimitQuery {
    fn limit_or(&self, default: usize) -> usize {
        self.limit
            .as_deref()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(default)
    }
}

#[derive(Serialize)]
struct ScanResponse<'a> {
    success: bool,
    #[serde(flatten)]
    record: &'a ScanRecord,
}

#[derive(Serialize)]
struct StartResponse {
    success: bool,
    message: String,
    #[serde(flatten)]
    started: JobStarted,
}

fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(body)?)
}

pub(super) async fn scan(state: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse> {
    let request: ScanRequest = parse_body(&body)?;
    let url = request.url.unwrap_or_else(|| state.monitor.default_url.clone());

    let record = state.scheduler.pipeline().run(&url).await;
    Ok(HttpResponse::Ok().json(ScanResponse {
        success: record.is_success(),
        record: &record,
    }))
}

pub(super) async fn start_monitor(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let request: StartRequest = parse_body(&body)?;
    let url = request.url.unwrap_or_else(|| state.monitor.default_url.clone());
    let interval = request
        .interval_minutes
        .unwrap_or(state.monitor.default_interval_minutes);

    let started = state.scheduler.start(&url, interval).await?;
    Ok(HttpResponse::Ok().json(StartResponse {
        success: true,
        message: format!("Monitoring started for {}", url),
        started,
    }))
}

pub(super) async fn stop_monitor(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let request: ScanRequest = parse_body(&body)?;
    let url = request.url.unwrap_or_else(|| state.monitor.default_url.clone());

    if state.scheduler.stop(&url).await {
        Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Monitoring stopped",
        })))
    } else {
        Err(AppError::NotFound("No active monitoring job found".to_string()))
    }
}

pub(super) async fn monitor_status(state: web::Data<AppState>) -> HttpResponse {
    let jobs = state.scheduler.status().await;
    let counts = state.scheduler.pipeline().history().counts().await;

    HttpResponse::Ok().json(json!({
        "activeJobs": jobs,
        "totalJobs": jobs.len(),
        "totalScans": counts.scans,
    }))
}

pub(super) async fn history(
    state: web::Data<AppState>,
    query: web::Query<LimitQuery>,
) -> HttpResponse {
    let history = state.scheduler.pipeline().history();
    let scans = history.recent_scans(query.limit_or(HISTORY_LIMIT)).await;
    let total = history.counts().await.scans;

    HttpResponse::Ok().json(json!({
        "history": scans,
        "total": total,
    }))
}

pub(super) async fn destinations(state: web::Data<AppState>) -> HttpResponse {
    let latest = state.scheduler.pipeline().history().latest_scan().await;

    HttpResponse::Ok().json(match latest {
        Some(scan) => json!({
            "destinations": scan.destinations,
            "lastUpdated": scan.timestamp,
            "totalFound": scan.total_destinations,
        }),
        None => json!({
            "destinations": [],
            "lastUpdated": null,
            "totalFound": 0,
        }),
    })
}

pub(super) async fn changes(
    state: web::Data<AppState>,
    query: web::Query<LimitQuery>,
) -> HttpResponse {
    let changes = state
        .scheduler
        .pipeline()
        .history()
        .recent_changes(query.limit_or(CHANGES_LIMIT))
        .await;

    HttpResponse::Ok().json(json!({
        "total": changes.len(),
        "changes": changes,
    }))
}

pub(super) async fn health(state: web::Data<AppState>) -> HttpResponse {
    let pipeline = state.scheduler.pipeline();
    let counts = pipeline.history().counts().await;

    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": Utc::now(),
        "activeJobs": state.scheduler.status().await.len(),
        "totalScans": counts.scans,
        "currentDestinations": pipeline.previous_snapshot().await.len(),
        "smsConfigured": pipeline.notifier().is_configured(),
        "totalSMSSent": counts.delivered,
    }))
}

pub(super) async fn sms_test(state: web::Data<AppState>, body: web::Bytes) -> Result<HttpResponse> {
    let request: SmsTestRequest = parse_body(&body)?;
    let notifier = state.scheduler.pipeline().notifier();

    if !notifier.is_configured() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "error": "SMS not configured - missing Twilio credentials",
        })));
    }

    match notifier
        .send_test(request.phone_number.as_deref(), request.message.as_deref())
        .await
    {
        Ok(sid) => {
            log::info!("Test SMS sent: {}", sid);
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "sid": sid,
                "message": "Test SMS sent successfully",
            })))
        }
        Err(e) => {
            log::error!("Test SMS failed: {}", e);
            Ok(HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": e.to_string(),
            })))
        }
    }
}

pub(super) async fn sms_history(
    state: web::Data<AppState>,
    query: web::Query<LimitQuery>,
) -> HttpResponse {
    let pipeline = state.scheduler.pipeline();
    let notifications = pipeline
        .history()
        .recent_notifications(query.limit_or(SMS_HISTORY_LIMIT))
        .await;
    let total = pipeline.history().counts().await.notifications;

    HttpResponse::Ok().json(json!({
        "smsHistory": notifications,
        "total": total,
        "configured": pipeline.notifier().is_configured(),
        "alertPhone": pipeline.notifier().alert_number(),
    }))
}

pub(super) async fn sms_status(state: web::Data<AppState>) -> HttpResponse {
    let pipeline = state.scheduler.pipeline();
    let counts = pipeline.history().counts().await;

    let mut body = json!(pipeline.notifier().status());
    body["totalSMSSent"] = json!(counts.delivered);
    HttpResponse::Ok().json(body)
}

pub(super) async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "error": "Not found" }))
}
