use anyhow::Result;
use clap::Parser;
use quiz_poll::{logger, App, Command, Config};
use std::path::PathBuf;

/// 定时发布选择题投票，稍后回复正确答案
#[derive(Debug, Parser)]
#[command(name = "quiz-poll", version)]
struct Cli {
    /// TOML 配置文件（可选）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logger::init();

    let cli = Cli::parse();

    // 加载配置
    let config = Config::load(cli.config.as_deref())?;

    // 初始化并运行应用
    App::initialize(config).run(cli.command).await
}
