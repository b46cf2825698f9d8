//! 回复关联 - 业务能力层
//!
//! 只负责"投票 ↔ 答案回复"的对应关系：
//! - 投票 id 在同一道题的记录中只出现一次
//! - 回复只能关联到已存在的投票，且只能设置一次

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{AppResult, CorrelationError};
use crate::models::question::PostEvent;

/// 追加一条 `{poll_id, time, reply_id: None}` 记录
pub fn record_poll(events: &mut Vec<PostEvent>, poll_id: &str, time: DateTime<Utc>) -> AppResult<()> {
    if events.iter().any(|e| e.poll_id == poll_id) {
        return Err(CorrelationError::DuplicatePoll {
            poll_id: poll_id.to_string(),
        }
        .into());
    }

    events.push(PostEvent::new(poll_id, time));
    debug!("记录投票 {} ({})", poll_id, time);
    Ok(())
}

/// 检查 `poll_id` 有记录且还没有回复，发布回复前调用
pub fn ensure_awaiting_reply(events: &[PostEvent], question_key: &str, poll_id: &str) -> AppResult<()> {
    match events.iter().rev().find(|e| e.poll_id == poll_id) {
        None => Err(CorrelationError::UnknownPoll {
            question_key: question_key.to_string(),
            poll_id: poll_id.to_string(),
        }
        .into()),
        Some(PostEvent {
            reply_id: Some(reply_id),
            ..
        }) => Err(CorrelationError::AlreadyReplied {
            poll_id: poll_id.to_string(),
            reply_id: reply_id.clone(),
        }
        .into()),
        Some(_) => Ok(()),
    }
}

/// 找到最近一条匹配 `poll_id` 的记录并写入回复 id
///
/// 找不到匹配记录或已经回复过都会返回 [`CorrelationError`]
pub fn attach_reply(
    events: &mut [PostEvent],
    question_key: &str,
    poll_id: &str,
    reply_id: &str,
) -> AppResult<()> {
    let event = events
        .iter_mut()
        .rev()
        .find(|e| e.poll_id == poll_id)
        .ok_or_else(|| CorrelationError::UnknownPoll {
            question_key: question_key.to_string(),
            poll_id: poll_id.to_string(),
        })?;

    if let Some(existing) = &event.reply_id {
        return Err(CorrelationError::AlreadyReplied {
            poll_id: poll_id.to_string(),
            reply_id: existing.clone(),
        }
        .into());
    }

    event.reply_id = Some(reply_id.to_string());
    debug!("投票 {} 已关联回复 {}", poll_id, reply_id);
    Ok(())
}
