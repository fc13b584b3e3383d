use actix_web::{web, HttpResponse, Result};
use serde_json::json;
use std::sync::Arc;

use crate::middleware::metrics::PerformanceMonitor;

/// 获取性能指标
#[utoipa::path(
    get,
    path = "/metrics",
    responses(
        (status = 200, description = "当前性能指标快照", body = crate::middleware::metrics::PerformanceMetrics),
    ),
    tag = "Metrics"
)]
pub async fn get_metrics(monitor: web::Data<Arc<PerformanceMonitor>>) -> Result<HttpResponse> {
    let metrics = monitor.get_metrics();

    Ok(HttpResponse::Ok().json(json!({
        "code": 0,
        "message": "success",
        "data": metrics
    })))
}

/// 健康检查端点（包含基本性能信息）
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "服务健康"),
        (status = 503, description = "服务异常"),
    ),
    tag = "Metrics"
)]
pub async fn health_check(monitor: web::Data<Arc<PerformanceMonitor>>) -> Result<HttpResponse> {
    let metrics = monitor.get_metrics();

    let success_rate = if metrics.total_requests > 0 {
        metrics.successful_requests as f64 / metrics.total_requests as f64
    } else {
        1.0
    };
    let is_healthy = metrics.avg_response_time_ms < 1000.0 && success_rate > 0.95;

    let status = if is_healthy { "healthy" } else { "unhealthy" };
    let status_code = if is_healthy {
        actix_web::http::StatusCode::OK
    } else {
        actix_web::http::StatusCode::SERVICE_UNAVAILABLE
    };

    Ok(HttpResponse::build(status_code).json(json!({
        "status": status,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "metrics": {
            "total_requests": metrics.total_requests,
            "success_rate": success_rate * 100.0,
            "avg_response_time_ms": metrics.avg_response_time_ms,
            "requests_per_second": metrics.requests_per_second,
        }
    })))
}

/// 配置指标相关路由
pub fn configure_metrics_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(get_metrics))
        .route("/health", web::get().to(health_check));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use std::time::Duration;

    #[actix_web::test]
    async fn test_get_metrics() {
        let monitor = Arc::new(PerformanceMonitor::new());

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(monitor.clone()))
                .route("/metrics", web::get().to(get_metrics)),
        )
        .await;

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn test_health_check_is_healthy_without_traffic() {
        let monitor = Arc::new(PerformanceMonitor::new());

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(monitor.clone()))
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn test_health_check_reports_unhealthy_on_failures() {
        let monitor = Arc::new(PerformanceMonitor::new());
        for _ in 0..10 {
            monitor.record("/add_message", "POST", 503, Duration::from_millis(1));
        }

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(monitor.clone()))
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status().as_u16(), 503);
    }
}
