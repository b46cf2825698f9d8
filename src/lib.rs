//! # Quiz Poll
//!
//! 定时把选择题作为投票发布到社交平台，等待一段时间后在投票下回复正确答案。
//! 同一道题在整个题库轮完之前不会重复出现。
//!
//! ## 架构设计
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 只负责 HTTP 调用和签名
//! - `TwitterClient` - 发帖、上传图片
//! - `OAuthSigner` - OAuth 1.0a 签名
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `QuestionSource` - 获取题库
//! - `RotationStore` - 读写轮换记录
//! - `QuestionSelector` - 选出本轮未用过的题
//! - `PollPublisher` - 发投票、发答案回复
//! - `correlation` - 投票与回复的对应关系
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一道题"的两阶段流程
//! - `PostCtx` - 上下文封装（轮次 + 题目键）
//! - `PostFlow` - 流程编排（选题 → 投票 → 保存 → 回复 → 关联 → 保存）
//!
//! ### ④ 应用层（App）
//! - `app` - 子命令分发，由外部定时任务调用
//!
//! ## 模块结构

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::{App, Command};
pub use config::{Config, Credentials};
pub use error::{AppError, AppResult};
pub use models::{Corpus, PendingReply, PostEvent, PostStatus, Question, RotationState};
pub use workflow::{PostCtx, PostFlow, PostOutcome, ReplyOutcome};
