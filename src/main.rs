use clap::ArgMatches;
use std::error::Error;

use vmsg_rust::bootstrap::app_bootstrap::{init_tracing, AppBootstrap, AppConfig};
use vmsg_rust::bootstrap::command_registry::{build_app, handle_command};
use vmsg_rust::cmd::handle_version_command;
use vmsg_rust::{init_commands, init_routes};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // 初始化所有模块的命令
    init_commands();

    // 构建命令行应用
    let matches: ArgMatches = build_app().get_matches();

    match matches.subcommand() {
        Some(("server", sub_matches)) => {
            handle_server_command(sub_matches).await?;
        }
        Some(("version", _)) => {
            handle_version_command();
        }
        Some((command_name, sub_matches)) => {
            // 模块命令（如 loadgen）通过注册器分发
            init_tracing("vmsg-rust");
            if let Err(e) = handle_command(command_name, sub_matches).await {
                eprintln!("处理命令 '{}' 时出错: {}", command_name, e);
                std::process::exit(1);
            }
        }
        _ => {
            // 这种情况不应该发生，因为我们设置了 subcommand_required(true)
            eprintln!("未知命令，请使用 --help 查看可用命令");
            std::process::exit(1);
        }
    }

    Ok(())
}

async fn handle_server_command(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    init_tracing("vmsg-rust");

    // 初始化路由
    init_routes();

    // 配置文件提供默认值，命令行参数优先
    let mut config = AppConfig::from_config()?;
    if let Some(host) = matches.get_one::<String>("host") {
        config.host = host.clone();
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        config.port = *port;
    }
    if let Some(workers) = matches.get_one::<usize>("workers") {
        config.workers = Some(*workers);
    }
    if matches.get_flag("debug") {
        config.debug = true;
    }

    // 启动应用
    AppBootstrap::new().with_config(config).run().await?;

    Ok(())
}
