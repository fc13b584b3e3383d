use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures_util::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    rc::Rc,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, RwLock,
    },
    time::{Duration, Instant},
};
use tracing::warn;
use utoipa::ToSchema;

/// 响应时间样本窗口大小
const RESPONSE_TIME_SAMPLES: usize = 1000;

/// 性能指标快照
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PerformanceMetrics {
    /// 请求总数
    pub total_requests: u64,
    /// 成功请求数
    pub successful_requests: u64,
    /// 失败请求数
    pub failed_requests: u64,
    /// 平均响应时间（毫秒，最近样本窗口）
    pub avg_response_time_ms: f64,
    /// 最大响应时间（毫秒）
    pub max_response_time_ms: u64,
    /// 每秒请求数（QPS）
    pub requests_per_second: f64,
    /// 按状态码分组的请求数
    pub status_code_counts: HashMap<u16, u64>,
    /// 按路径分组的请求数
    pub path_counts: HashMap<String, u64>,
}

/// 高频更新的原子计数器
#[derive(Debug, Default)]
struct AtomicCounters {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    max_response_time_ms: AtomicU64,
}

impl AtomicCounters {
    fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.successful_requests.store(0, Ordering::Relaxed);
        self.failed_requests.store(0, Ordering::Relaxed);
        self.max_response_time_ms.store(0, Ordering::Relaxed);
    }
}

/// 环形缓冲区，保存最近的响应时间样本
#[derive(Debug)]
struct RingBuffer {
    buffer: Vec<u64>,
    capacity: usize,
    head: usize,
    size: usize,
}

impl RingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity],
            capacity,
            head: 0,
            size: 0,
        }
    }

    fn push(&mut self, value: u64) {
        self.buffer[self.head] = value;
        self.head = (self.head + 1) % self.capacity;
        if self.size < self.capacity {
            self.size += 1;
        }
    }

    fn average(&self) -> f64 {
        if self.size == 0 {
            return 0.0;
        }
        let sum: u64 = self.buffer.iter().take(self.size).sum();
        sum as f64 / self.size as f64
    }

    fn clear(&mut self) {
        self.head = 0;
        self.size = 0;
    }
}

/// 性能监控器：请求计数与响应时间统计
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    counters: Arc<AtomicCounters>,
    start_time: Instant,
    status_code_counts: Arc<RwLock<HashMap<u16, u64>>>,
    path_counts: Arc<RwLock<HashMap<String, u64>>>,
    response_times: Arc<Mutex<RingBuffer>>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(AtomicCounters::default()),
            start_time: Instant::now(),
            status_code_counts: Arc::new(RwLock::new(HashMap::new())),
            path_counts: Arc::new(RwLock::new(HashMap::new())),
            response_times: Arc::new(Mutex::new(RingBuffer::new(RESPONSE_TIME_SAMPLES))),
        }
    }

    /// 记录一次已完成的请求
    pub fn record(&self, path: &str, method: &str, status_code: u16, elapsed: Duration) {
        let response_time_ms = elapsed.as_millis() as u64;

        self.counters.total_requests.fetch_add(1, Ordering::Relaxed);
        if (200..400).contains(&status_code) {
            self.counters
                .successful_requests
                .fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
        self.counters
            .max_response_time_ms
            .fetch_max(response_time_ms, Ordering::Relaxed);

        // try_lock 失败时丢弃样本，不阻塞请求路径
        if let Ok(mut times) = self.response_times.try_lock() {
            times.push(response_time_ms);
        }
        if let Ok(mut status_counts) = self.status_code_counts.try_write() {
            *status_counts.entry(status_code).or_insert(0) += 1;
        }
        if let Ok(mut path_counts) = self.path_counts.try_write() {
            *path_counts.entry(path.to_string()).or_insert(0) += 1;
        }

        // 慢请求告警
        if response_time_ms > 1000 {
            warn!("慢请求检测: {} {} 耗时 {}ms", method, path, response_time_ms);
        }
    }

    /// 获取当前性能指标快照
    pub fn get_metrics(&self) -> PerformanceMetrics {
        let total_requests = self.counters.total_requests.load(Ordering::Relaxed);

        let avg_response_time_ms = self
            .response_times
            .try_lock()
            .map(|times| times.average())
            .unwrap_or(0.0);

        let elapsed_seconds = self.start_time.elapsed().as_secs_f64();
        let requests_per_second = if elapsed_seconds > 0.0 {
            total_requests as f64 / elapsed_seconds
        } else {
            0.0
        };

        PerformanceMetrics {
            total_requests,
            successful_requests: self.counters.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.counters.failed_requests.load(Ordering::Relaxed),
            avg_response_time_ms,
            max_response_time_ms: self.counters.max_response_time_ms.load(Ordering::Relaxed),
            requests_per_second,
            status_code_counts: self.status_code_counts.read().unwrap().clone(),
            path_counts: self.path_counts.read().unwrap().clone(),
        }
    }

    /// 重置性能指标
    pub fn reset_metrics(&self) {
        self.counters.reset();
        self.status_code_counts.write().unwrap().clear();
        self.path_counts.write().unwrap().clear();
        if let Ok(mut times) = self.response_times.try_lock() {
            times.clear();
        }
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// 性能监控中间件
pub struct MetricsMiddleware {
    monitor: Arc<PerformanceMonitor>,
}

impl MetricsMiddleware {
    pub fn new(monitor: Arc<PerformanceMonitor>) -> Self {
        Self { monitor }
    }
}

impl<S, B> Transform<S, ServiceRequest> for MetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = MetricsMiddlewareService<S>;
    type InitError = ();
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(MetricsMiddlewareService {
            service: Rc::new(service),
            monitor: self.monitor.clone(),
        }))
    }
}

pub struct MetricsMiddlewareService<S> {
    service: Rc<S>,
    monitor: Arc<PerformanceMonitor>,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let monitor = self.monitor.clone();
        let service = self.service.clone();

        Box::pin(async move {
            let path = req.path().to_string();
            let method = req.method().as_str().to_string();
            let started = Instant::now();

            match service.call(req).await {
                Ok(res) => {
                    monitor.record(&path, &method, res.status().as_u16(), started.elapsed());
                    Ok(res)
                }
                Err(e) => {
                    // 未到达处理器的失败按 500 计入
                    monitor.record(&path, &method, 500, started.elapsed());
                    Err(e)
                }
            }
        })
    }
}
