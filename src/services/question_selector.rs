//! 选题服务 - 业务能力层
//!
//! 从题库中随机挑一道本轮没用过的题：
//! 1. 随机选分类
//! 2. 在分类中随机抽题，最多尝试分类大小次
//! 3. 分类已用完则换一个分类，全部用完返回 `NoQuestionAvailable`

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::{AppResult, SelectionError};
use crate::models::question::{Corpus, Question};
use crate::models::rotation::RotationState;

/// 选题器
pub struct QuestionSelector<R: Rng = StdRng> {
    rng: R,
}

impl QuestionSelector<StdRng> {
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// 固定种子，结果可复现
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> QuestionSelector<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// 选出一道未使用的题并加入 `state.active_questions`
    ///
    /// 轮次检查由调用方在之后执行（[`RotationState::complete_cycle_if_due`]）
    pub fn pick<'c>(
        &mut self,
        corpus: &'c Corpus,
        state: &mut RotationState,
    ) -> AppResult<(&'c str, &'c Question)> {
        let mut candidates: Vec<&str> = corpus
            .category_names()
            .filter(|name| !corpus.questions(name).is_empty())
            .collect();

        while !candidates.is_empty() {
            let slot = self.rng.gen_range(0..candidates.len());
            let category = candidates[slot];

            if let Some(question) = self.sample_unused(corpus.questions(category), state) {
                state.mark_used(question.key());
                debug!("选中 {} (本轮已用 {})", question.key(), state.used_count());
                return Ok((category, question));
            }

            debug!("分类 {} 已全部使用，重新选择分类", category);
            candidates.swap_remove(slot);
        }

        Err(SelectionError::NoQuestionAvailable {
            interval: state.interval,
            used: state.used_count(),
            total: corpus.total_questions(),
        }
        .into())
    }

    fn sample_unused<'c>(
        &mut self,
        questions: &'c [Question],
        state: &RotationState,
    ) -> Option<&'c Question> {
        for _ in 0..questions.len() {
            let question = &questions[self.rng.gen_range(0..questions.len())];
            if !state.is_used(&question.key()) {
                return Some(question);
            }
        }

        // 随机尝试次数用完，在剩余的题中均匀挑选
        let unused: Vec<&Question> = questions
            .iter()
            .filter(|q| !state.is_used(&q.key()))
            .collect();
        unused.choose(&mut self.rng).copied()
    }
}
