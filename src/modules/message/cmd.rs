use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};

use crate::bootstrap::command_registry::CommandModule;
use crate::modules::message::loadgen::{self, LoadgenOptions};

/// 消息模块的命令处理器
pub struct MessageCommands;

#[async_trait]
impl CommandModule for MessageCommands {
    fn module_name(&self) -> &'static str {
        "message"
    }

    fn register_commands(&self) -> Vec<Command> {
        vec![Command::new("loadgen")
            .about("对 /add_message 端点发起并发压测")
            .arg(
                Arg::new("requests")
                    .short('n')
                    .long("requests")
                    .value_name("N")
                    .help("总请求数")
                    .value_parser(clap::value_parser!(usize)),
            )
            .arg(
                Arg::new("concurrency")
                    .short('c')
                    .long("concurrency")
                    .value_name("C")
                    .help("最大并发数")
                    .value_parser(clap::value_parser!(usize)),
            )
            .arg(
                Arg::new("target")
                    .short('t')
                    .long("target")
                    .value_name("URL")
                    .help("目标端点，可重复指定多个")
                    .action(clap::ArgAction::Append),
            )]
    }

    async fn handle_command(
        &self,
        command_name: &str,
        matches: &ArgMatches,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match command_name {
            "loadgen" => {
                // 命令行参数覆盖配置文件中的默认值
                let mut opts = LoadgenOptions::from_config()?;
                if let Some(requests) = matches.get_one::<usize>("requests") {
                    opts.requests = *requests;
                }
                if let Some(concurrency) = matches.get_one::<usize>("concurrency") {
                    opts.concurrency = *concurrency;
                }
                let targets: Vec<String> = matches
                    .get_many::<String>("target")
                    .map(|values| values.cloned().collect())
                    .unwrap_or_default();
                if !targets.is_empty() {
                    opts.targets = targets;
                }

                loadgen::run(opts).await?;
                Ok(())
            }
            _ => Err(format!("未知命令: {}", command_name).into()),
        }
    }
}

/// 注册消息模块的命令
pub fn register_message_commands() {
    crate::bootstrap::command_registry::register_module(std::sync::Arc::new(MessageCommands));
}
