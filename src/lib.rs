pub mod api;
pub mod bootstrap;
pub mod cmd;
pub mod comm;
pub mod db;
pub mod error;
pub mod middleware;

// Modules
pub mod modules;

/// 初始化所有模块的命令
pub fn init_commands() {
    // 注册message模块的命令
    modules::message::register_message_commands();
}

/// 初始化所有模块的路由
pub fn init_routes() {
    // 注册message模块的路由
    modules::message::register_message_routes();

    // 注册API辅助路由（指标、健康检查）
    api::register_api_routes();
}

// Re-export bootstrap modules
pub use bootstrap::app_bootstrap::*;
pub use bootstrap::command_registry::*;
pub use bootstrap::route_registry::*;
