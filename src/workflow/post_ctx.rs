//! 发布上下文
//!
//! 封装"第几轮、哪一道题"这一信息

use std::fmt::Display;

/// 发布上下文（仅用于日志）
#[derive(Debug, Clone)]
pub struct PostCtx {
    /// 当前轮次
    pub interval: u64,

    /// 题目键（分类/题号）
    pub question_key: String,
}

impl PostCtx {
    pub fn new(interval: u64, question_key: impl Into<String>) -> Self {
        Self {
            interval,
            question_key: question_key.into(),
        }
    }
}

impl Display for PostCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[第 {} 轮 {}]", self.interval, self.question_key)
    }
}
