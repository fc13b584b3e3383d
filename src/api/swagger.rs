use utoipa::OpenApi;

/// OpenAPI 文档聚合
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::message::routes::add_message,
        crate::api::metrics::get_metrics,
        crate::api::metrics::health_check,
    ),
    components(
        schemas(
            crate::modules::message::models::MessageView,
            crate::modules::message::models::MessagesCount,
            crate::modules::message::models::AddMessageResponse,
            crate::middleware::metrics::PerformanceMetrics,
        )
    ),
    tags(
        (name = "Message", description = "消息写入与最近消息查询接口"),
        (name = "Metrics", description = "系统性能指标与健康检查相关接口")
    )
)]
pub struct ApiDoc;
