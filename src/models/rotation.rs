use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::question::{answer_reply_text, deserialize_id, question_key, PostEvent};

/// 等待回复答案的投票
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReply {
    pub category: String,
    pub question_id: String,
    pub poll_id: String,
    pub posted_at: DateTime<Utc>,
    pub answer_letter: String,
    pub answer_text: String,
}

impl PendingReply {
    pub fn question_key(&self) -> String {
        question_key(&self.category, &self.question_id)
    }

    pub fn reply_text(&self) -> String {
        answer_reply_text(&self.answer_letter, &self.answer_text)
    }

    pub fn due_at(&self, delay: Duration) -> DateTime<Utc> {
        self.posted_at + delay
    }

    pub fn is_due(&self, now: DateTime<Utc>, delay: Duration) -> bool {
        now >= self.due_at(delay)
    }
}

/// 轮换状态
///
/// `interval` 是当前轮次，`active_questions` 是本轮已经用过的题目键。
/// 已用数量达到阈值时轮次加一、集合清空。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationState {
    pub interval: u64,
    #[serde(deserialize_with = "deserialize_key_set")]
    pub active_questions: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub post_events: BTreeMap<String, Vec<PostEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_reply: Option<PendingReply>,
}

impl RotationState {
    /// 首次运行时的空状态
    pub fn fresh() -> Self {
        Self::default()
    }

    pub fn used_count(&self) -> usize {
        self.active_questions.len()
    }

    pub fn is_used(&self, key: &str) -> bool {
        self.active_questions.contains(key)
    }

    /// 返回是否为新加入
    pub fn mark_used(&mut self, key: impl Into<String>) -> bool {
        self.active_questions.insert(key.into())
    }

    /// 已用数量达到阈值时开始新一轮，返回是否发生了轮换
    pub fn complete_cycle_if_due(&mut self, threshold: usize) -> bool {
        if threshold == 0 || self.active_questions.len() < threshold {
            return false;
        }
        self.interval += 1;
        self.active_questions.clear();
        true
    }

    /// 删除题库中已不存在的题目键，返回删除的数量
    pub fn retain_known(&mut self, known: &BTreeSet<String>) -> usize {
        let before = self.active_questions.len();
        self.active_questions.retain(|key| known.contains(key));
        before - self.active_questions.len()
    }

    pub fn history(&self, key: &str) -> &[PostEvent] {
        self.post_events.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn deserialize_key_set<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Key(#[serde(deserialize_with = "deserialize_id")] String);

    let keys: Vec<Key> = Vec::deserialize(deserializer)?;
    Ok(keys.into_iter().map(|k| k.0).collect())
}
