/// 对外 API 辅助模块（指标、文档）
/// API helpers (metrics, docs)

pub mod metrics;
pub mod swagger;

/// 注册 API 辅助路由
pub fn register_api_routes() {
    crate::register_route!(
        "metrics",
        "性能指标与健康检查",
        "api",
        metrics::configure_metrics_routes
    );
}
