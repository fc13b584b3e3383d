/// 数据库访问模块
/// Database access module

pub mod pool;
pub mod schema;
