use chrono::{DateTime, Utc};
use rand::Rng;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::modules::message::models::{AddMessageOutcome, Message, NewMessage};

/// 序列号冲突时整个写入单元的最大尝试次数
const MAX_ATTEMPTS: u32 = 3;

/// 计数器自增 SQL：同一用户的发放在 message_counters 行锁上串行化，
/// 事务回滚时自增一并回滚，因此已提交的序列号无空洞、无重复
const NEXT_SEQUENCE_SQL: &str = r#"
INSERT INTO message_counters (name, count) VALUES ($1, 1)
ON CONFLICT (name) DO UPDATE SET count = message_counters.count + 1
RETURNING count
"#;

const INSERT_MESSAGE_SQL: &str = r#"
INSERT INTO messages (name, text, count) VALUES ($1, $2, $3)
RETURNING id, date
"#;

const LAST_TEN_SQL: &str = r#"
SELECT id, name, text, date, count FROM messages
WHERE name = $1 ORDER BY id DESC LIMIT 10
"#;

/// 在调用方事务内为指定用户发放下一个序列号（1 起始）
///
/// 跨连接、跨进程的正确性完全依赖存储自身的并发控制，
/// 不使用任何应用层互斥量
pub async fn next_sequence(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(NEXT_SEQUENCE_SQL)
        .bind(name)
        .fetch_one(&mut **tx)
        .await
}

/// 消息仓储：把 "用户发送文本" 变成一条持久化消息，
/// 并返回该用户最近 10 条消息与本次写入后的总数
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 追加一条消息并读取追加后的最近消息视图
    ///
    /// 序列号发放与行插入在同一事务内提交；检测到序列化冲突时
    /// 重新执行整个写入单元（而不是复用可能过期的计数），
    /// 重试耗尽后返回 `SequenceConflict`
    pub async fn append(&self, msg: &NewMessage) -> AppResult<AddMessageOutcome> {
        let mut attempt: u32 = 0;
        loop {
            match self.try_append(msg).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if is_serialization_conflict(&e) => {
                    attempt += 1;
                    if attempt >= MAX_ATTEMPTS {
                        return Err(AppError::SequenceConflict {
                            name: msg.name.clone(),
                            attempts: attempt,
                        });
                    }
                    let delay = backoff_delay(attempt);
                    warn!(
                        "写入冲突 (用户 '{}', 第 {} 次尝试)，{}ms 后重试",
                        msg.name,
                        attempt,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(AppError::from(e)),
            }
        }
    }

    /// 单次写入单元：事务内发放序列号并插入行，提交后读取最近 10 条
    async fn try_append(&self, msg: &NewMessage) -> Result<AddMessageOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let sequence = next_sequence(&mut tx, &msg.name).await?;

        let (_id, _date): (i64, DateTime<Utc>) = sqlx::query_as(INSERT_MESSAGE_SQL)
            .bind(&msg.name)
            .bind(&msg.text)
            .bind(sequence)
            .fetch_one(&mut *tx)
            .await?;

        // 提交后消息永久可见，即使调用方随后放弃请求
        tx.commit().await?;

        // 提交后的读取必然包含刚写入的行
        let recent = self.last_ten(&msg.name).await?;

        Ok(AddMessageOutcome {
            recent,
            // 总数取本次发放的序列号，而不是可能过期的重新统计
            total_count: sequence,
        })
    }

    /// 读取指定用户最近至多 10 条消息，最新在前；无副作用，可重复
    pub async fn last_ten(&self, name: &str) -> Result<Vec<Message>, sqlx::Error> {
        sqlx::query_as::<_, Message>(LAST_TEN_SQL)
            .bind(name)
            .fetch_all(&self.pool)
            .await
    }
}

/// 识别需要重试整个写入单元的存储冲突
/// （PostgreSQL 序列化失败 40001 / 死锁 40P01）
fn is_serialization_conflict(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
        }
        _ => false,
    }
}

/// 指数退避 + 抖动
fn backoff_delay(attempt: u32) -> Duration {
    let base_ms = 20u64 << attempt.min(6);
    let jitter_ms = rand::thread_rng().gen_range(0..=10);
    Duration::from_millis(base_ms + jitter_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::pool::{check_health, get_pool};
    use crate::db::schema::ensure_schema;
    use crate::modules::message::models::{AddMessageParams, NewMessage};

    /// 本地数据库可用时返回就绪的仓储，否则返回 None 以跳过测试
    async fn ready_repository() -> Option<MessageRepository> {
        let pool = get_pool("default").await.ok()?;
        check_health(&pool).await.ok()?;
        ensure_schema(&pool).await.ok()?;
        Some(MessageRepository::new(pool))
    }

    fn unique_user(prefix: &str) -> String {
        format!(
            "{}-{}-{}",
            prefix,
            chrono::Utc::now().timestamp_micros(),
            rand::thread_rng().gen_range(0..100000)
        )
    }

    fn new_message(name: &str, text: &str) -> NewMessage {
        NewMessage::parse(AddMessageParams {
            name: name.to_string(),
            text: text.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_pool_timeout_is_not_a_conflict() {
        assert!(!is_serialization_conflict(&sqlx::Error::PoolTimedOut));
        assert!(!is_serialization_conflict(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn test_backoff_delay_is_bounded() {
        for attempt in 1..=10 {
            let d = backoff_delay(attempt);
            assert!(d >= Duration::from_millis(20));
            assert!(d <= Duration::from_millis((20 << 6) + 10));
        }
        // 第二次尝试的退避基数为 80ms
        assert!(backoff_delay(2) >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_append_reports_count_and_includes_new_row() {
        let Some(repo) = ready_repository().await else {
            return;
        };
        let user = unique_user("alice");

        let outcome = repo.append(&new_message(&user, "hi")).await.unwrap();
        assert_eq!(outcome.total_count, 1);
        assert_eq!(outcome.recent.len(), 1);
        assert_eq!(outcome.recent[0].name, user);
        assert_eq!(outcome.recent[0].text, "hi");
        assert_eq!(outcome.recent[0].count, 1);

        let outcome = repo.append(&new_message(&user, "again")).await.unwrap();
        assert_eq!(outcome.total_count, 2);
        // 刚写入的行必然出现在返回视图中
        assert_eq!(outcome.recent[0].text, "again");
        assert_eq!(outcome.recent[0].count, 2);
    }

    #[tokio::test]
    async fn test_recent_is_newest_first_and_capped_at_ten() {
        let Some(repo) = ready_repository().await else {
            return;
        };
        let user = unique_user("bob");

        for i in 1..=13 {
            let outcome = repo
                .append(&new_message(&user, &format!("msg-{}", i)))
                .await
                .unwrap();
            assert_eq!(outcome.total_count, i);
        }

        let recent = repo.last_ten(&user).await.unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].text, "msg-13");
        assert_eq!(recent[9].text, "msg-4");
        for pair in recent.windows(2) {
            assert!(pair[0].id > pair[1].id);
        }
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_gap_free() {
        let Some(repo) = ready_repository().await else {
            return;
        };
        let user = unique_user("carol");

        const WRITERS: i64 = 100;
        let mut handles = Vec::new();
        for i in 0..WRITERS {
            let repo = repo.clone();
            let user = user.clone();
            handles.push(tokio::spawn(async move {
                repo.append(&new_message(&user, &format!("c-{}", i)))
                    .await
                    .map(|o| o.total_count)
            }));
        }

        let mut issued = Vec::new();
        for handle in handles {
            issued.push(handle.await.unwrap().unwrap());
        }
        issued.sort_unstable();
        // 已发放序列号恰为 {1..N}：无重复、无空洞
        assert_eq!(issued, (1..=WRITERS).collect::<Vec<_>>());

        // 落库的序列号同样恰为 {1..N}
        let pool = get_pool("default").await.unwrap();
        let mut stored: Vec<i64> =
            sqlx::query_scalar("SELECT count FROM messages WHERE name = $1")
                .bind(&user)
                .fetch_all(&pool)
                .await
                .unwrap();
        stored.sort_unstable();
        assert_eq!(stored, (1..=WRITERS).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_sequencing_is_isolated_between_users() {
        let Some(repo) = ready_repository().await else {
            return;
        };
        let user_a = unique_user("dave");
        let user_b = unique_user("eve");

        repo.append(&new_message(&user_a, "a1")).await.unwrap();
        repo.append(&new_message(&user_b, "b1")).await.unwrap();
        repo.append(&new_message(&user_b, "b2")).await.unwrap();
        let outcome = repo.append(&new_message(&user_a, "a2")).await.unwrap();

        // B 的写入不影响 A 的序列号
        assert_eq!(outcome.total_count, 2);
    }

    #[tokio::test]
    async fn test_last_ten_is_repeatable_without_writes() {
        let Some(repo) = ready_repository().await else {
            return;
        };
        let user = unique_user("frank");

        repo.append(&new_message(&user, "only")).await.unwrap();

        let first = repo.last_ten(&user).await.unwrap();
        let second = repo.last_ten(&user).await.unwrap();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.count, b.count);
            assert_eq!(a.text, b.text);
        }
    }
}
