//! 发布流程 - 流程层
//!
//! 核心职责：定义"一道题"的两阶段发布流程
//!
//! 阶段 1（post）：读取轮换记录 → 下载题库 → 选题 → 发投票 → 记录待回复 → 保存
//! 阶段 2（reply）：读取待回复 → 到时间后回复答案 → 关联回复 → 保存
//!
//! 每次状态变化后立即保存，进程在两个阶段之间退出也不会丢失待回复记录。

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppResult, StateError};
use crate::models::rotation::PendingReply;
use crate::services::correlation;
use crate::services::{PollPublisher, QuestionSelector, QuestionSource, RotationStore};
use crate::utils::logging::truncate_text;
use crate::workflow::post_ctx::PostCtx;

/// 阶段 1 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostOutcome {
    pub question_key: String,
    pub poll_id: String,
    pub posted_at: DateTime<Utc>,
    /// 发布时所在的轮次
    pub interval: u64,
    /// 本次发布后是否开始了新一轮
    pub rolled_over: bool,
}

/// 阶段 2 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// 没有待回复的投票
    NothingPending,
    /// 还没到回复时间
    NotDue { poll_id: String, due_at: DateTime<Utc> },
    /// 已回复并关联
    Replied {
        question_key: String,
        poll_id: String,
        reply_id: String,
    },
}

/// 发布流程
///
/// - 编排选题、发布、关联、保存的顺序
/// - 只依赖业务能力（services），不直接发 HTTP 请求
pub struct PostFlow {
    source: Box<dyn QuestionSource>,
    store: Box<dyn RotationStore>,
    publisher: Box<dyn PollPublisher>,
    selector: QuestionSelector,
    cycle_threshold: Option<usize>,
    reply_delay: Duration,
}

impl PostFlow {
    pub fn new(
        source: Box<dyn QuestionSource>,
        store: Box<dyn RotationStore>,
        publisher: Box<dyn PollPublisher>,
    ) -> Self {
        let defaults = Config::default();
        Self {
            source,
            store,
            publisher,
            selector: QuestionSelector::from_entropy(),
            cycle_threshold: defaults.cycle_threshold,
            reply_delay: defaults.reply_delay(),
        }
    }

    /// 使用配置中的轮次阈值和等待时间
    pub fn with_config(mut self, config: &Config) -> Self {
        self.cycle_threshold = config.cycle_threshold;
        self.reply_delay = config.reply_delay();
        self
    }

    pub fn with_selector(mut self, selector: QuestionSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_cycle_threshold(mut self, threshold: Option<usize>) -> Self {
        self.cycle_threshold = threshold;
        self
    }

    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    /// 阶段 1：选题并发布投票
    pub async fn post(&mut self) -> AppResult<PostOutcome> {
        let mut state = self.store.load().await?;

        if let Some(pending) = &state.pending_reply {
            warn!(
                "⚠️ 投票 {} 的答案还没有回复，请先执行 reply",
                pending.poll_id
            );
            return Err(StateError::ReplyPending {
                poll_id: pending.poll_id.clone(),
                question_key: pending.question_key(),
            }
            .into());
        }

        info!("📚 题库来源: {}", self.source.describe());
        let mut corpus = self.source.fetch().await?;
        corpus.merge_history(&state.post_events);

        let total = corpus.total_questions();
        let threshold = effective_threshold(self.cycle_threshold, total);
        info!(
            "📚 题库共 {} 道题, 第 {} 轮已用 {}/{}",
            total,
            state.interval,
            state.used_count(),
            threshold
        );

        let stale = state.retain_known(&corpus.keys());
        if stale > 0 {
            warn!("⚠️ 移除了 {} 个题库中已不存在的题目记录", stale);
        }
        if state.complete_cycle_if_due(threshold) {
            info!("🔄 上一轮已完成，进入第 {} 轮", state.interval);
        }

        let (category, picked) = self.selector.pick(&corpus, &mut state)?;
        let mut question = picked.clone();
        let ctx = PostCtx::new(state.interval, question.key());
        info!(
            "{} 🎯 分类: {} | 题干: {}",
            ctx,
            category,
            truncate_text(&question.text, 80)
        );

        // 发布失败直接返回，本次选题不保存
        info!("{} 📤 正在发布投票...", ctx);
        let poll_id = self.publisher.publish_poll(&question).await?;
        let posted_at = Utc::now();
        info!("{} ✓ 投票发布成功: {}", ctx, poll_id);

        question.record_poll(&poll_id, posted_at)?;
        state
            .post_events
            .insert(question.key(), question.post_events.clone());
        state.pending_reply = Some(PendingReply {
            category: question.category.clone(),
            question_id: question.id.clone(),
            poll_id: poll_id.clone(),
            posted_at,
            answer_letter: question.answer_letter.clone(),
            answer_text: question.answer_text.clone(),
        });

        let rolled_over = state.complete_cycle_if_due(threshold);
        if rolled_over {
            info!("{} 🔄 本轮题目已全部发布，下次进入第 {} 轮", ctx, state.interval);
        }

        self.store.save(&state).await?;

        Ok(PostOutcome {
            question_key: ctx.question_key,
            poll_id,
            posted_at,
            interval: ctx.interval,
            rolled_over,
        })
    }

    /// 阶段 2：到时间后回复答案
    pub async fn reply(&self, force: bool) -> AppResult<ReplyOutcome> {
        self.reply_at(Utc::now(), force).await
    }

    pub async fn reply_at(&self, now: DateTime<Utc>, force: bool) -> AppResult<ReplyOutcome> {
        let mut state = self.store.load().await?;

        let Some(pending) = state.pending_reply.clone() else {
            info!("📭 没有待回复的投票");
            return Ok(ReplyOutcome::NothingPending);
        };

        let due_at = pending.due_at(self.reply_delay);
        if !force && !pending.is_due(now, self.reply_delay) {
            return Ok(ReplyOutcome::NotDue {
                poll_id: pending.poll_id,
                due_at,
            });
        }

        let key = pending.question_key();
        let ctx = PostCtx::new(state.interval, &key);
        correlation::ensure_awaiting_reply(state.history(&key), &key, &pending.poll_id)?;

        info!("{} 💬 正在回复答案: {}", ctx, pending.reply_text());
        let reply_id = self
            .publisher
            .publish_reply(&pending.poll_id, &pending.answer_letter, &pending.answer_text)
            .await?;
        info!("{} ✓ 回复成功: {}", ctx, reply_id);

        let events = state.post_events.entry(key.clone()).or_default();
        correlation::attach_reply(events, &key, &pending.poll_id, &reply_id)?;
        state.pending_reply = None;

        self.store.save(&state).await?;

        Ok(ReplyOutcome::Replied {
            question_key: key,
            poll_id: pending.poll_id,
            reply_id,
        })
    }

    /// 单进程完成两个阶段：发布投票 → 等待 → 回复答案
    pub async fn run(&mut self) -> AppResult<(PostOutcome, ReplyOutcome)> {
        let posted = self.post().await?;

        let wait = self.reply_delay.to_std().unwrap_or_default();
        info!(
            "⏳ 等待 {} 分钟后回复答案 (投票 {})",
            self.reply_delay.num_minutes(),
            posted.poll_id
        );
        tokio::time::sleep(wait).await;

        let replied = self.reply(true).await?;
        Ok((posted, replied))
    }
}

/// 实际使用的轮次阈值：未配置或超过题库总数时使用题库总数
pub fn effective_threshold(configured: Option<usize>, total: usize) -> usize {
    match configured {
        Some(t) if t > 0 && t <= total => t,
        Some(t) if t > total => {
            warn!("⚠️ 配置的轮次阈值 {} 超过题库总数 {}，使用题库总数", t, total);
            total
        }
        _ => total,
    }
}
