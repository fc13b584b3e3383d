use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// 命令模块 trait，各模块实现此 trait 来注册命令
///
/// 命令处理是异步的，压测等命令需要在运行时内执行网络调用
#[async_trait]
pub trait CommandModule: Send + Sync {
    /// 获取模块名称
    fn module_name(&self) -> &'static str;

    /// 注册模块的子命令
    fn register_commands(&self) -> Vec<Command>;

    /// 处理模块命令
    async fn handle_command(
        &self,
        command_name: &str,
        matches: &ArgMatches,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// 命令注册器，使用单例模式
pub struct CommandRegistry {
    modules: HashMap<String, Arc<dyn CommandModule>>,
}

impl CommandRegistry {
    fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// 获取全局单例实例
    pub fn instance() -> &'static Arc<Mutex<CommandRegistry>> {
        static INSTANCE: OnceLock<Arc<Mutex<CommandRegistry>>> = OnceLock::new();
        INSTANCE.get_or_init(|| Arc::new(Mutex::new(CommandRegistry::new())))
    }

    /// 注册模块
    pub fn register_module(&mut self, module: Arc<dyn CommandModule>) {
        let module_name = module.module_name().to_string();
        self.modules.insert(module_name, module);
    }

    /// 构建完整的命令行应用
    pub fn build_app(&self) -> Command {
        let mut app = Command::new("vmsg-rust")
            .version(env!("CARGO_PKG_VERSION"))
            .about("带并发消息计数的消息服务")
            .subcommand_required(true)
            .arg_required_else_help(true);

        // 添加内置的server命令
        app = app.subcommand(
            Command::new("server")
                .about("启动 Web 服务器")
                .arg(
                    Arg::new("host")
                        .long("host")
                        .value_name("HOST")
                        .help("服务器主机地址，覆盖配置文件"),
                )
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .help("服务器端口，覆盖配置文件")
                        .value_parser(clap::value_parser!(u16)),
                )
                .arg(
                    Arg::new("workers")
                        .short('w')
                        .long("workers")
                        .value_name("WORKERS")
                        .help("工作线程数，覆盖配置文件")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("debug")
                        .short('d')
                        .long("debug")
                        .help("启用调试模式")
                        .action(clap::ArgAction::SetTrue),
                ),
        );

        // 添加内置的version命令
        app = app.subcommand(Command::new("version").about("显示版本信息"));

        // 添加各模块注册的命令
        for module in self.modules.values() {
            for command in module.register_commands() {
                app = app.subcommand(command);
            }
        }

        app
    }

    /// 查找能够处理指定命令的模块
    pub fn find_module(&self, command_name: &str) -> Option<Arc<dyn CommandModule>> {
        for module in self.modules.values() {
            for command in module.register_commands() {
                if command.get_name() == command_name {
                    return Some(module.clone());
                }
            }
        }
        None
    }
}

/// 便捷函数：注册模块
pub fn register_module(module: Arc<dyn CommandModule>) {
    let registry = CommandRegistry::instance();
    let mut registry = registry.lock().unwrap();
    registry.register_module(module);
}

/// 便捷函数：构建命令行应用
pub fn build_app() -> Command {
    let registry = CommandRegistry::instance();
    let registry = registry.lock().unwrap();
    registry.build_app()
}

/// 便捷函数：分发模块命令
///
/// 先在锁内定位模块，再在锁外执行异步处理
pub async fn handle_command(
    command_name: &str,
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let module = {
        let registry = CommandRegistry::instance();
        let registry = registry.lock().unwrap();
        registry.find_module(command_name)
    };

    match module {
        Some(module) => module.handle_command(command_name, matches).await,
        None => Err(format!("未找到处理命令 '{}' 的模块", command_name).into()),
    }
}
