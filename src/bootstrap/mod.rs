/// 应用启动与注册器
/// Application bootstrap and registries

pub mod app_bootstrap;
pub mod command_registry;
pub mod route_registry;
