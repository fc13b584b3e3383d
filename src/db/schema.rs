use sqlx::{Pool, Postgres};
use tracing::info;

use crate::error::AppResult;

/// messages 表：持久化的消息行，id 随插入顺序严格递增
const CREATE_MESSAGES: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id    BIGSERIAL PRIMARY KEY,
    name  TEXT NOT NULL,
    text  TEXT NOT NULL,
    date  TIMESTAMPTZ NOT NULL DEFAULT now(),
    count BIGINT NOT NULL
)
"#;

/// 支撑 "按用户取最近 10 条" 的索引
const CREATE_MESSAGES_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_messages_name_id ON messages (name, id DESC)
"#;

/// message_counters 表：每用户一行的计数器，序列号发放在其行锁上串行化
const CREATE_COUNTERS: &str = r#"
CREATE TABLE IF NOT EXISTS message_counters (
    name  TEXT PRIMARY KEY,
    count BIGINT NOT NULL
)
"#;

/// 幂等的建表步骤，在服务器开始接受连接之前执行一次
/// Idempotent schema bootstrap, run once before the server binds
pub async fn ensure_schema(pool: &Pool<Postgres>) -> AppResult<()> {
    sqlx::query(CREATE_MESSAGES).execute(pool).await?;
    sqlx::query(CREATE_MESSAGES_INDEX).execute(pool).await?;
    sqlx::query(CREATE_COUNTERS).execute(pool).await?;
    info!("数据库表结构已就绪");
    Ok(())
}
