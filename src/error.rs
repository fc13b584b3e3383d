use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// 统一的应用错误类型
#[derive(Error, Debug)]
pub enum AppError {
    #[error("配置错误: {0}")]
    Config(#[from] crate::comm::config::ConfigError),

    #[error("验证错误: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("序列号冲突: 用户 '{name}' 重试 {attempts} 次后仍无法提交")]
    SequenceConflict { name: String, attempts: u32 },

    #[error("存储不可用: {message}")]
    Store { message: String },

    #[error("内部错误: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// 创建验证错误
    pub fn validation<T: Into<String>, U: Into<String>>(field: T, message: U) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// 创建存储错误
    pub fn store<T: Into<String>>(message: T) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// 获取错误代码
    pub fn error_code(&self) -> i32 {
        match self {
            AppError::Config(_) => 1001,
            AppError::Validation { .. } => 1004,
            AppError::Store { .. } => 1006,
            AppError::SequenceConflict { .. } => 1010,
            AppError::Internal(_) => 1000,
        }
    }

    /// 获取HTTP状态码
    pub fn http_status(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Store { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::SequenceConflict { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// 存储层基础设施错误统一归入 Store；序列号冲突由仓储层在转换前识别
impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Store {
            message: e.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        self.http_status()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.http_status();
        let error_code = self.error_code();
        let message = self.to_string();

        // 记录错误日志
        match self {
            AppError::Internal(_) | AppError::Store { .. } => {
                tracing::error!("Server error: {}", message);
            }
            AppError::SequenceConflict { .. } => {
                tracing::warn!("Sequence conflict: {}", message);
            }
            _ => {
                tracing::info!("Client error: {}", message);
            }
        }

        HttpResponse::build(status).json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message,
            },
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }
}

/// 应用结果类型
pub type AppResult<T> = Result<T, AppError>;
