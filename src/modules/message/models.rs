use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};

/// 用户名最大长度（字符数）
pub const MAX_NAME_LEN: usize = 64;
/// 消息文本最大长度（字符数）
pub const MAX_TEXT_LEN: usize = 1000;

/// messages 表行，写入后不可变
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub name: String,
    pub text: String,
    pub date: DateTime<Utc>,
    /// 该用户所有消息中的 1 起始序列号
    pub count: i64,
}

/// /add_message 的查询参数
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct AddMessageParams {
    /// 用户名
    pub name: String,
    /// 消息文本
    pub text: String,
}

/// 通过验证的待写入消息
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub name: String,
    pub text: String,
}

impl NewMessage {
    /// 显式输入验证：返回验证通过的值或带类型的验证错误
    ///
    /// 规则：`name` 去除首尾空白后非空且不超过 64 字符；
    /// `text` 不超过 1000 字符，允许为空
    pub fn parse(params: AddMessageParams) -> AppResult<Self> {
        let name = params.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("name", "不能为空"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(AppError::validation(
                "name",
                format!("长度不能超过 {} 字符", MAX_NAME_LEN),
            ));
        }
        if params.text.chars().count() > MAX_TEXT_LEN {
            return Err(AppError::validation(
                "text",
                format!("长度不能超过 {} 字符", MAX_TEXT_LEN),
            ));
        }
        Ok(Self {
            name,
            text: params.text,
        })
    }
}

/// 响应中的单条消息视图
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageView {
    pub name: String,
    pub text: String,
    pub id: i64,
    pub date: DateTime<Utc>,
}

impl From<Message> for MessageView {
    fn from(m: Message) -> Self {
        Self {
            name: m.name,
            text: m.text,
            id: m.id,
            date: m.date,
        }
    }
}

/// 当前用户消息总数
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessagesCount {
    pub count: i64,
}

/// /add_message 的响应体：最近 10 条（最新在前）+ 本次写入后的总数
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddMessageResponse {
    pub messages: Vec<MessageView>,
    pub count_messages: MessagesCount,
}

/// 仓储层 Append 操作的结果
#[derive(Debug, Clone)]
pub struct AddMessageOutcome {
    /// 最近至多 10 条消息，最新在前
    pub recent: Vec<Message>,
    /// 本次写入消息的序列号，即该用户当前消息总数
    pub total_count: i64,
}

impl From<AddMessageOutcome> for AddMessageResponse {
    fn from(outcome: AddMessageOutcome) -> Self {
        Self {
            messages: outcome.recent.into_iter().map(MessageView::from).collect(),
            count_messages: MessagesCount {
                count: outcome.total_count,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(name: &str, text: &str) -> AddMessageParams {
        AddMessageParams {
            name: name.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_parse_accepts_normal_message() {
        let msg = NewMessage::parse(params("Alice", "hi")).unwrap();
        assert_eq!(msg.name, "Alice");
        assert_eq!(msg.text, "hi");
    }

    #[test]
    fn test_parse_trims_name() {
        let msg = NewMessage::parse(params("  Bob  ", "hello")).unwrap();
        assert_eq!(msg.name, "Bob");
    }

    #[test]
    fn test_parse_rejects_empty_name() {
        let err = NewMessage::parse(params("", "hi")).unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation { ref field, .. } if field == "name"
        ));

        let err = NewMessage::parse(params("   ", "hi")).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_parse_rejects_overlong_fields() {
        let long_name = "n".repeat(MAX_NAME_LEN + 1);
        assert!(NewMessage::parse(params(&long_name, "hi")).is_err());

        let long_text = "t".repeat(MAX_TEXT_LEN + 1);
        assert!(NewMessage::parse(params("Alice", &long_text)).is_err());

        // 临界值允许
        let max_text = "t".repeat(MAX_TEXT_LEN);
        assert!(NewMessage::parse(params("Alice", &max_text)).is_ok());
    }

    #[test]
    fn test_parse_allows_empty_text() {
        assert!(NewMessage::parse(params("Alice", "")).is_ok());
    }

    #[test]
    fn test_response_json_shape() {
        let outcome = AddMessageOutcome {
            recent: vec![Message {
                id: 7,
                name: "Alice".to_string(),
                text: "hi".to_string(),
                date: Utc::now(),
                count: 3,
            }],
            total_count: 3,
        };
        let response = AddMessageResponse::from(outcome);
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["count_messages"]["count"], 3);
        assert_eq!(value["messages"][0]["name"], "Alice");
        assert_eq!(value["messages"][0]["text"], "hi");
        assert_eq!(value["messages"][0]["id"], 7);
        assert!(value["messages"][0]["date"].is_string());
        // 序列号不出现在单条消息视图中
        assert!(value["messages"][0].get("count").is_none());
    }
}
