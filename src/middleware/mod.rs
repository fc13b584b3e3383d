/// 中间件模块
/// Middleware module

pub mod metrics;
