use crate::config::Config;
use crate::services::{source_for, JsonRotationStore, RotationStore, TwitterPublisher};
use crate::utils::logging::{
    log_post_outcome, log_reply_outcome, log_startup, print_status,
};
use crate::workflow::PostFlow;
use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

/// 子命令
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// 阶段 1：选题并发布投票，记录待回复后退出
    Post,
    /// 阶段 2：到时间后回复答案
    Reply {
        /// 不等待，立即回复
        #[arg(long)]
        force: bool,
    },
    /// 在一个进程内发布投票、等待、回复答案
    Run,
    /// 查看轮换状态
    Status,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Post => "post",
            Command::Reply { .. } => "reply",
            Command::Run => "run",
            Command::Status => "status",
        }
    }
}

/// 应用主结构
pub struct App {
    config: Config,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Self {
        Self { config }
    }

    /// 运行应用主逻辑
    pub async fn run(&self, command: Command) -> Result<()> {
        log_startup(command.name(), &self.config.source, &self.config.state_file);
        let delay_minutes = self.config.reply_delay().num_minutes();

        match command {
            Command::Status => {
                let state = JsonRotationStore::new(&self.config.state_file)
                    .load()
                    .await
                    .context("读取轮换记录失败")?;
                print_status(&state, delay_minutes);
            }
            Command::Post => {
                let mut flow = self.build_flow()?;
                let outcome = flow.post().await.context("发布投票失败")?;
                log_post_outcome(&outcome, delay_minutes);
            }
            Command::Reply { force } => {
                let flow = self.build_flow()?;
                let outcome = flow.reply(force).await.context("回复答案失败")?;
                log_reply_outcome(&outcome, chrono::Utc::now());
            }
            Command::Run => {
                let mut flow = self.build_flow()?;
                let (posted, replied) = flow.run().await.context("发布流程失败")?;
                log_post_outcome(&posted, delay_minutes);
                log_reply_outcome(&replied, chrono::Utc::now());
            }
        }

        info!("🏁 {} 完成", command.name());
        Ok(())
    }

    fn build_flow(&self) -> Result<PostFlow> {
        let publisher = TwitterPublisher::new(&self.config).context("初始化发布客户端失败")?;
        let store = JsonRotationStore::new(&self.config.state_file);

        Ok(PostFlow::new(
            source_for(&self.config),
            Box::new(store),
            Box::new(publisher),
        )
        .with_config(&self.config))
    }
}
