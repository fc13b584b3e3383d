/// Message 模块
/// 消息写入、按用户计数与最近消息读取

pub mod cmd;
pub mod loadgen;
pub mod models;
pub mod repository;
pub mod routes;

/// 注册消息模块的路由
pub fn register_message_routes() {
    crate::register_route!(
        "add_message",
        "写入消息并返回最近 10 条与总数",
        "message",
        routes::configure_message_routes
    );
}

/// 注册消息模块的命令
pub fn register_message_commands() {
    cmd::register_message_commands();
}
