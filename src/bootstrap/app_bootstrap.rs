use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{error, info, instrument, warn};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::bootstrap::route_registry::{configure_global_routes, print_global_routes_info};
use crate::comm::config::get_global_config_manager;
use crate::comm::port::{available_port, is_port_available_sync};
use crate::db::pool::get_pool;
use crate::db::schema::ensure_schema;
use crate::error::{AppError, AppResult};
use crate::middleware::metrics::MetricsMiddleware;
use crate::middleware::metrics::PerformanceMonitor;
use crate::modules::message::repository::MessageRepository;

/// 应用配置结构体
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            workers: Some(8),
            debug: false,
        }
    }
}

impl AppConfig {
    /// 从全局配置读取服务器配置
    pub fn from_config() -> AppResult<Self> {
        let mgr = get_global_config_manager()?;
        let defaults = Self::default();
        Ok(Self {
            host: mgr.get_or("server.host", defaults.host),
            port: mgr.get_or("server.port", defaults.port),
            workers: mgr.get::<usize>("server.workers").ok().or(defaults.workers),
            debug: mgr.get_or("server.debug", defaults.debug),
        })
    }
}

/// 初始化日志订阅器（JSON 格式），重复调用时保留第一次的设置
pub fn init_tracing(service_name: &str) {
    let level = get_global_config_manager()
        .ok()
        .and_then(|mgr| mgr.get_string("logging.level").ok())
        .unwrap_or_else(|| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let formatting_layer = BunyanFormattingLayer::new(service_name.into(), std::io::stdout);
    let subscriber = Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer);
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// 应用启动器
pub struct AppBootstrap {
    config: Option<AppConfig>,
}

impl AppBootstrap {
    /// 创建新的应用启动器
    pub fn new() -> Self {
        Self { config: None }
    }

    /// 设置配置
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 运行应用服务器
    #[instrument(skip(self))]
    pub async fn run(self) -> AppResult<()> {
        let config = self.config.clone().unwrap_or_default();
        info!("启动应用服务器，配置: {:?}", config);

        // 打印配置源信息
        let config_manager = get_global_config_manager()?;
        config_manager.print_sources_info();

        // 初始化存储（带超时和重试），在接受连接之前保证表结构就绪
        let pool = self.init_store_with_retry().await?;
        let repository = MessageRepository::new(pool);

        // 检查端口可用性并获取可用端口
        let server_port = if is_port_available_sync(config.port) {
            config.port
        } else {
            warn!("端口 {} 不可用，正在寻找可用端口...", config.port);
            available_port(config.port)
        };

        info!("服务器将在端口 {} 上启动", server_port);
        print_global_routes_info();

        // 启动 HTTP 服务器
        let server_result = self
            .start_http_server(config, server_port, repository)
            .await;

        match server_result {
            Ok(_) => {
                info!("服务器已停止");
                Ok(())
            }
            Err(e) => {
                error!("服务器启动失败: {}", e);
                Err(e)
            }
        }
    }

    /// 带重试机制的存储初始化：建立连接池并执行幂等建表
    async fn init_store_with_retry(&self) -> AppResult<PgPool> {
        const MAX_RETRIES: u32 = 3;
        const TIMEOUT_DURATION: Duration = Duration::from_secs(10);

        for attempt in 1..=MAX_RETRIES {
            info!("存储初始化尝试 {}/{}", attempt, MAX_RETRIES);

            let init_result = timeout(TIMEOUT_DURATION, async {
                let pool = get_pool("default").await?;
                ensure_schema(&pool).await?;
                Ok::<_, AppError>(pool)
            })
            .await;

            match init_result {
                Ok(Ok(pool)) => {
                    info!("存储初始化成功");
                    return Ok(pool);
                }
                Ok(Err(e)) => {
                    warn!("存储初始化失败 (尝试 {}): {}", attempt, e);
                    if attempt == MAX_RETRIES {
                        return Err(e);
                    }
                }
                Err(_) => {
                    warn!("存储初始化超时 (尝试 {})", attempt);
                    if attempt == MAX_RETRIES {
                        return Err(AppError::store("存储初始化超时"));
                    }
                }
            }

            // 指数退避
            let delay = Duration::from_millis(1000 * 2_u64.pow(attempt - 1));
            info!("等待 {:?} 后重试", delay);
            sleep(delay).await;
        }

        unreachable!()
    }

    /// 启动HTTP服务器
    async fn start_http_server(
        &self,
        config: AppConfig,
        server_port: u16,
        repository: MessageRepository,
    ) -> AppResult<()> {
        // 性能监控器（全局共享）
        let monitor = Arc::new(PerformanceMonitor::new());
        let repository_data = web::Data::new(repository);

        let mut server = HttpServer::new(move || {
            App::new()
                .wrap(Logger::default())
                // 注入消息仓储
                .app_data(repository_data.clone())
                // 注入性能监控器到应用状态
                .app_data(web::Data::new(monitor.clone()))
                // 接入性能监控中间件
                .wrap(MetricsMiddleware::new(monitor.clone()))
                // 集成 Swagger UI 文档（使用通配路径以兼容静态资源与尾随斜杠）
                .service(SwaggerUi::new("/swagger-ui/{_:.*}").url(
                    "/api-doc/openapi.json",
                    crate::api::swagger::ApiDoc::openapi(),
                ))
                // 配置全局路由
                .configure(configure_global_routes)
        });
        if let Some(workers) = config.workers {
            server = server.workers(workers);
        }

        server
            .bind(format!("{}:{}", config.host, server_port))
            .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?
            .run()
            .await
            .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;

        Ok(())
    }
}

impl Default for AppBootstrap {
    fn default() -> Self {
        Self::new()
    }
}
