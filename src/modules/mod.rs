/// 业务模块集合
/// Business modules

pub mod message;
