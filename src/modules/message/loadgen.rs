use futures_util::stream::{self, StreamExt};
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::comm::config::get_global_config_manager;
use crate::error::{AppError, AppResult};

/// 压测使用的固定用户集合
const USERS: [&str; 10] = [
    "Alice", "Bob", "Charlie", "David", "Eve", "Frank", "Grace", "Heidi", "Ivan", "Judy",
];

/// 压测参数
#[derive(Debug, Clone)]
pub struct LoadgenOptions {
    /// 总请求数
    pub requests: usize,
    /// 最大并发数
    pub concurrency: usize,
    /// 目标端点列表，每次调用随机选取其一
    pub targets: Vec<String>,
}

impl LoadgenOptions {
    /// 从全局配置读取默认压测参数
    pub fn from_config() -> AppResult<Self> {
        let mgr = get_global_config_manager()?;
        let requests = mgr.get_or("loadgen.requests", 5000i64) as usize;
        let concurrency = mgr.get_or("loadgen.concurrency", 512i64) as usize;
        let targets: Vec<String> = mgr.get_or(
            "loadgen.targets",
            vec![
                "http://127.0.0.1:5001/add_message".to_string(),
                "http://127.0.0.1:5002/add_message".to_string(),
            ],
        );
        Ok(Self {
            requests,
            concurrency,
            targets,
        })
    }
}

/// 压测结果汇总
#[derive(Debug, Clone)]
pub struct LoadgenReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub avg_latency_ms: f64,
    pub max_latency_ms: u64,
}

impl LoadgenReport {
    fn from_latencies(total: usize, latencies: &[u64], failed: usize, elapsed: Duration) -> Self {
        let avg_latency_ms = if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<u64>() as f64 / latencies.len() as f64
        };
        Self {
            total,
            succeeded: latencies.len(),
            failed,
            elapsed,
            avg_latency_ms,
            max_latency_ms: latencies.iter().copied().max().unwrap_or(0),
        }
    }

    /// 每秒完成请求数
    pub fn requests_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total as f64 / secs
        } else {
            0.0
        }
    }

    /// 输出压测摘要
    pub fn log_summary(&self) {
        info!(
            "压测完成: {} 次请求耗时 {:.2}s (成功 {}, 失败 {})",
            self.total,
            self.elapsed.as_secs_f64(),
            self.succeeded,
            self.failed
        );
        info!(
            "单请求平均 {:.2}ms, 最大 {}ms",
            self.avg_latency_ms, self.max_latency_ms
        );
        info!("RPS: {:.2}", self.requests_per_second());
    }
}

/// 运行压测：随机用户 + 随机文本 + 随机目标端点，有界并发发送
pub async fn run(opts: LoadgenOptions) -> AppResult<LoadgenReport> {
    if opts.targets.is_empty() {
        return Err(AppError::validation("targets", "至少需要一个目标端点"));
    }

    info!(
        "开始压测: {} 次请求, 并发 {}, 目标 {:?}",
        opts.requests, opts.concurrency, opts.targets
    );

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(opts.concurrency)
        .build()
        .map_err(|e| AppError::store(e.to_string()))?;

    let started = Instant::now();

    // 在同步闭包里完成随机选取，避免 RNG 跨越 await 点
    let requests = (0..opts.requests).map(|_| {
        let mut rng = rand::thread_rng();
        let user = *USERS.choose(&mut rng).expect("non-empty user set");
        let target = opts
            .targets
            .choose(&mut rng)
            .expect("non-empty target set")
            .clone();
        let text = format!("Hello world! {}", rng.gen_range(10000..=99999));
        let client = client.clone();

        async move {
            let request_started = Instant::now();
            let result = client
                .post(&target)
                .query(&[("name", user), ("text", text.as_str())])
                .send()
                .await;
            match result {
                Ok(resp) if resp.status().is_success() => {
                    Ok(request_started.elapsed().as_millis() as u64)
                }
                Ok(resp) => Err(format!("{} -> HTTP {}", target, resp.status())),
                Err(e) => Err(format!("{} -> {}", target, e)),
            }
        }
    });

    let results: Vec<Result<u64, String>> = stream::iter(requests)
        .buffer_unordered(opts.concurrency)
        .collect()
        .await;

    let elapsed = started.elapsed();
    let mut latencies = Vec::with_capacity(results.len());
    let mut failed = 0usize;
    for result in results {
        match result {
            Ok(latency) => latencies.push(latency),
            Err(e) => {
                if failed < 5 {
                    warn!("请求失败: {}", e);
                }
                failed += 1;
            }
        }
    }

    let report = LoadgenReport::from_latencies(opts.requests, &latencies, failed, elapsed);
    report.log_summary();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_math() {
        let report = LoadgenReport::from_latencies(
            5,
            &[10, 20, 30],
            2,
            Duration::from_secs(2),
        );
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 2);
        assert_eq!(report.avg_latency_ms, 20.0);
        assert_eq!(report.max_latency_ms, 30);
        assert_eq!(report.requests_per_second(), 2.5);
    }

    #[test]
    fn test_report_with_no_successes() {
        let report = LoadgenReport::from_latencies(3, &[], 3, Duration::from_millis(100));
        assert_eq!(report.avg_latency_ms, 0.0);
        assert_eq!(report.max_latency_ms, 0);
    }

    #[tokio::test]
    async fn test_run_rejects_empty_targets() {
        let opts = LoadgenOptions {
            requests: 1,
            concurrency: 1,
            targets: vec![],
        };
        assert!(run(opts).await.is_err());
    }

    #[test]
    fn test_options_from_config_have_sane_defaults() {
        let opts = LoadgenOptions::from_config().unwrap();
        assert!(opts.requests > 0);
        assert!(opts.concurrency > 0);
        assert!(!opts.targets.is_empty());
    }
}
