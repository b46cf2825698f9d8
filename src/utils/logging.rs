/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use chrono::{DateTime, Utc};
use tracing::info;

use crate::models::rotation::RotationState;
use crate::workflow::{PostOutcome, ReplyOutcome};

/// 记录程序启动信息
///
/// # 参数
/// - `command`: 本次执行的子命令
/// - `source`: 题库来源
/// - `state_file`: 轮换记录文件
pub fn log_startup(command: &str, source: &str, state_file: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - {}", command);
    info!("📚 题库来源: {}", source);
    info!("🗂️ 轮换记录: {}", state_file);
    info!("{}", "=".repeat(60));
}

/// 记录投票发布结果
pub fn log_post_outcome(outcome: &PostOutcome, reply_delay_minutes: i64) {
    info!("\n{}", "─".repeat(60));
    info!("✅ 投票已发布: {} → {}", outcome.question_key, outcome.poll_id);
    info!(
        "⏰ 预计回复时间: {}",
        (outcome.posted_at + chrono::Duration::minutes(reply_delay_minutes))
            .format("%Y-%m-%d %H:%M:%S UTC")
    );
    info!("{}", "─".repeat(60));
}

/// 记录答案回复结果
pub fn log_reply_outcome(outcome: &ReplyOutcome, now: DateTime<Utc>) {
    match outcome {
        ReplyOutcome::NothingPending => info!("💡 没有需要回复的投票"),
        ReplyOutcome::NotDue { poll_id, due_at } => {
            info!(
                "⏳ 投票 {} 还未到回复时间，剩余 {}",
                poll_id,
                format_remaining(*due_at - now)
            );
        }
        ReplyOutcome::Replied {
            question_key,
            poll_id,
            reply_id,
        } => {
            info!("\n{}", "─".repeat(60));
            info!("✅ 答案已回复: {} | 投票 {} → 回复 {}", question_key, poll_id, reply_id);
            info!("{}", "─".repeat(60));
        }
    }
}

/// 打印轮换状态
pub fn print_status(state: &RotationState, reply_delay_minutes: i64) {
    info!("\n{}", "=".repeat(60));
    info!("📊 轮换状态");
    info!("{}", "=".repeat(60));
    info!("🔢 当前轮次: {}", state.interval);
    info!("✅ 本轮已用: {}", state.used_count());
    info!("📝 已记录发布的题目: {}", state.post_events.len());
    match &state.pending_reply {
        Some(pending) => {
            let due_at = pending.due_at(chrono::Duration::minutes(reply_delay_minutes));
            info!(
                "💬 待回复: {} (投票 {}, 回复时间 {})",
                pending.question_key(),
                pending.poll_id,
                due_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        None => info!("💬 待回复: 无"),
    }
    info!("{}", "=".repeat(60));
}

/// 把剩余时间格式化为 `1小时05分`
pub fn format_remaining(remaining: chrono::Duration) -> String {
    let minutes = remaining.num_minutes().max(0);
    if minutes >= 60 {
        format!("{}小时{:02}分", minutes / 60, minutes % 60)
    } else {
        format!("{}分", minutes)
    }
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
