use std::net::TcpListener;

use tracing::warn;

/// 检查端口是否可绑定
///
/// 通过实际尝试绑定 0.0.0.0 来判断，监听器在返回前关闭
pub fn is_port_available_sync(port: u16) -> bool {
    TcpListener::bind(("0.0.0.0", port)).is_ok()
}

/// 从起始端口向后扫描可绑定端口（含起始端口，向后最多 10 个）
///
/// 扫描范围内均被占用时返回起始端口，交由绑定阶段报错
pub fn available_port(start_port: u16) -> u16 {
    let end_port = start_port.saturating_add(10);
    for port in start_port..=end_port {
        if is_port_available_sync(port) {
            if port != start_port {
                warn!("端口 {} 被占用，改用端口 {}", start_port, port);
            }
            return port;
        }
    }
    start_port
}
