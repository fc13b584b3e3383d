use config::{Config, Environment, File, FileFormat};
use serde::de::DeserializeOwned;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::info;

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("配置初始化失败: {message}")]
    InitializationError { message: String },

    #[error("配置键不存在: {key}")]
    KeyNotFound { key: String },

    #[error("配置值反序列化失败: {key}: {message}")]
    DeserializeError { key: String, message: String },
}

/// 配置源描述
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// 配置文件源
    File {
        path: String,
        format: Option<FileFormat>,
        required: bool,
    },
    /// 环境变量源（前缀 + 分隔符）
    Env { prefix: String, separator: String },
}

/// 配置管理器：按顺序叠加多个配置源，后加入的覆盖先加入的
pub struct ConfigManager {
    config: Config,
    sources: Vec<String>,
}

impl ConfigManager {
    /// 使用指定配置源创建管理器
    pub fn with_sources(sources: Vec<ConfigSource>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        let mut descriptions = Vec::new();

        for source in &sources {
            match source {
                ConfigSource::File {
                    path,
                    format,
                    required,
                } => {
                    let file = match format {
                        Some(fmt) => File::with_name(path).format(*fmt),
                        None => File::with_name(path),
                    };
                    builder = builder.add_source(file.required(*required));
                    descriptions.push(format!(
                        "file: {} (required={})",
                        path, required
                    ));
                }
                ConfigSource::Env { prefix, separator } => {
                    builder = builder.add_source(
                        Environment::with_prefix(prefix)
                            .separator(separator)
                            .try_parsing(true),
                    );
                    descriptions.push(format!("env: {}{}*", prefix, separator));
                }
            }
        }

        let config = builder
            .build()
            .map_err(|e| ConfigError::InitializationError {
                message: e.to_string(),
            })?;

        Ok(Self {
            config,
            sources: descriptions,
        })
    }

    /// 获取配置值，键不存在或类型不匹配时返回错误
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        self.config.get::<T>(key).map_err(|e| match e {
            config::ConfigError::NotFound(_) => ConfigError::KeyNotFound {
                key: key.to_string(),
            },
            other => ConfigError::DeserializeError {
                key: key.to_string(),
                message: other.to_string(),
            },
        })
    }

    /// 获取配置值，失败时返回默认值
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// 便捷方法：获取字符串配置
    pub fn get_string(&self, key: &str) -> Result<String, ConfigError> {
        self.get::<String>(key)
    }

    /// 检查配置键是否存在
    pub fn exists(&self, key: &str) -> bool {
        self.config.get::<config::Value>(key).is_ok()
    }

    /// 打印配置源信息
    pub fn print_sources_info(&self) {
        info!("配置源 ({} 个):", self.sources.len());
        for source in &self.sources {
            info!("  - {}", source);
        }
    }
}

/// 默认配置源：default.toml + 环境特定 toml + VMSG_ 前缀环境变量
fn default_sources() -> Vec<ConfigSource> {
    let env_name = std::env::var("VMSG_ENV").unwrap_or_else(|_| "development".to_string());
    vec![
        ConfigSource::File {
            path: "config/default".to_string(),
            format: Some(FileFormat::Toml),
            required: false,
        },
        ConfigSource::File {
            path: format!("config/{}", env_name),
            format: Some(FileFormat::Toml),
            required: false,
        },
        ConfigSource::Env {
            prefix: "VMSG".to_string(),
            separator: "_".to_string(),
        },
    ]
}

// 全局配置管理器实例
static GLOBAL_CONFIG_MANAGER: OnceLock<Arc<ConfigManager>> = OnceLock::new();

/// 获取全局配置管理器（首次调用时初始化）
pub fn get_global_config_manager() -> Result<Arc<ConfigManager>, ConfigError> {
    if let Some(mgr) = GLOBAL_CONFIG_MANAGER.get() {
        return Ok(mgr.clone());
    }
    let mgr = Arc::new(ConfigManager::with_sources(default_sources())?);
    // 并发初始化时保留第一个实例
    let _ = GLOBAL_CONFIG_MANAGER.set(mgr);
    Ok(GLOBAL_CONFIG_MANAGER
        .get()
        .expect("global config manager just initialized")
        .clone())
}
