use crate::handlers::AppState;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct ComponentCheck {
    pub status: ComponentStatus,
    pub message: String,
    pub latency_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub storage: ComponentCheck,
    pub cached_listings: usize,
    pub timestamp: String,
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    match state.repo.health_check().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "yatube-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("storage check failed: {}", e),
            "service": "yatube-service"
        })),
    }
}

pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}

pub async fn readiness(state: web::Data<AppState>) -> HttpResponse {
    let start = Instant::now();
    let result = state.repo.health_check().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let storage = match result {
        Ok(()) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: "storage reachable".to_string(),
            latency_ms,
        },
        Err(e) => ComponentCheck {
            status: ComponentStatus::Unhealthy,
            message: format!("storage check failed: {}", e),
            latency_ms,
        },
    };
    let ready = matches!(storage.status, ComponentStatus::Healthy);

    let response = ReadinessResponse {
        ready,
        storage,
        cached_listings: state.cache.len(),
        timestamp: Utc::now().to_rfc3339(),
    };

    if ready {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
