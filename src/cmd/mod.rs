/// 内置命令
/// Built-in commands

pub mod version;
pub use version::*;
