use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::AppResult;
use crate::services::correlation;

/// 一次投票发布记录
///
/// 一个投票最多关联一条答案回复
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostEvent {
    #[serde(rename = "tweet_id", deserialize_with = "deserialize_id")]
    pub poll_id: String,
    pub time: DateTime<Utc>,
    #[serde(
        rename = "reply_tweet_id",
        default,
        deserialize_with = "deserialize_optional_text"
    )]
    pub reply_id: Option<String>,
}

impl PostEvent {
    pub fn new(poll_id: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            poll_id: poll_id.into(),
            time,
            reply_id: None,
        }
    }

    pub fn is_replied(&self) -> bool {
        self.reply_id.is_some()
    }
}

/// 单道题的发布状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostStatus {
    /// 从未发布
    Unpublished,
    /// 最近一次投票已发布，答案未回复
    PollPublished,
    /// 最近一次投票已回复答案
    Replied,
}

/// 题目记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "question_id", deserialize_with = "deserialize_id")]
    pub id: String,
    /// 记录自带的分类描述，只用于展示
    #[serde(default)]
    pub domain_objective: String,
    /// 所在题库分类的名称，由 [`Corpus`] 填入
    #[serde(skip)]
    pub category: String,
    #[serde(rename = "question_text")]
    pub text: String,
    pub choice_a: String,
    pub choice_b: String,
    pub choice_c: String,
    pub choice_d: String,
    pub answer_letter: String,
    pub answer_text: String,
    /// base64 编码的题目图片
    #[serde(
        rename = "question_image",
        default,
        deserialize_with = "deserialize_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub image: Option<String>,
    #[serde(rename = "tweet_ids", default)]
    pub post_events: Vec<PostEvent>,
}

impl Question {
    /// 轮换记录中使用的唯一键（题号只在分类内唯一）
    pub fn key(&self) -> String {
        question_key(&self.category, &self.id)
    }

    /// 展示用的分类名，记录没写时退回到题库分类
    pub fn display_category(&self) -> &str {
        if self.domain_objective.trim().is_empty() {
            &self.category
        } else {
            &self.domain_objective
        }
    }

    pub fn choices(&self) -> [&str; 4] {
        [
            self.choice_a.as_str(),
            self.choice_b.as_str(),
            self.choice_c.as_str(),
            self.choice_d.as_str(),
        ]
    }

    /// 投票正文
    pub fn poll_text(&self) -> String {
        format!("{} Question:\n{}", title_case(self.display_category()), self.text)
    }

    /// 答案回复正文
    pub fn answer_reply_text(&self) -> String {
        answer_reply_text(&self.answer_letter, &self.answer_text)
    }

    /// 上传图片时使用的文件名
    pub fn image_file_name(&self) -> String {
        format!("{}_question_{}.png", title_case(self.display_category()), self.id)
    }

    pub fn status(&self) -> PostStatus {
        match self.post_events.last() {
            None => PostStatus::Unpublished,
            Some(event) if event.is_replied() => PostStatus::Replied,
            Some(_) => PostStatus::PollPublished,
        }
    }

    /// 记录一次新发布的投票
    pub fn record_poll(&mut self, poll_id: &str, time: DateTime<Utc>) -> AppResult<()> {
        correlation::record_poll(&mut self.post_events, poll_id, time)
    }
}

pub fn question_key(category: &str, id: &str) -> String {
    format!("{}/{}", category, id)
}

pub fn answer_reply_text(answer_letter: &str, answer_text: &str) -> String {
    format!("{}: {}", answer_letter, answer_text)
}

/// 按分类组织的题库
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Corpus {
    categories: BTreeMap<String, Vec<Question>>,
}

impl Corpus {
    pub fn new(categories: BTreeMap<String, Vec<Question>>) -> Self {
        let mut corpus = Self { categories };
        corpus.normalize();
        corpus
    }

    /// 每道题的分类一律取题库映射的键
    pub fn normalize(&mut self) {
        for (category, questions) in self.categories.iter_mut() {
            for question in questions.iter_mut() {
                question.category.clone_from(category);
            }
        }
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn questions(&self, category: &str) -> &[Question] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.categories.values().flatten()
    }

    /// 去重后的题目总数
    pub fn total_questions(&self) -> usize {
        self.keys().len()
    }

    pub fn keys(&self) -> BTreeSet<String> {
        self.iter().map(Question::key).collect()
    }

    pub fn find(&self, key: &str) -> Option<&Question> {
        self.iter().find(|q| q.key() == key)
    }

    /// 把本地保存的发布历史合并到题目记录上（按投票 id 去重）
    pub fn merge_history(&mut self, history: &BTreeMap<String, Vec<PostEvent>>) {
        for question in self.categories.values_mut().flatten() {
            let Some(events) = history.get(&question.key()) else {
                continue;
            };
            for event in events {
                match question
                    .post_events
                    .iter_mut()
                    .find(|e| e.poll_id == event.poll_id)
                {
                    Some(existing) => {
                        if existing.reply_id.is_none() {
                            existing.reply_id = event.reply_id.clone();
                        }
                    }
                    None => question.post_events.push(event.clone()),
                }
            }
            question.post_events.sort_by_key(|e| e.time);
        }
    }
}

/// Python `str.title()` 风格：每个单词首字母大写，其余小写
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                result.extend(ch.to_lowercase());
            } else {
                result.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            result.push(ch);
            prev_alpha = false;
        }
    }
    result
}

// 题号、推文 id 在数据集中可能是字符串也可能是整数
struct IdVisitor;

impl<'de> serde::de::Visitor<'de> for IdVisitor {
    type Value = String;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a string or integer identifier")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(value.to_string())
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(value.to_string())
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(value.to_string())
    }
}

pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_any(IdVisitor)
}

/// 可选文本：null、缺失和空字符串都视为 None
pub(crate) fn deserialize_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "deserialize_id")] String);

    let value: Option<Wrapper> = Option::deserialize(deserializer)?;
    Ok(value.map(|w| w.0).filter(|s| !s.trim().is_empty()))
}
