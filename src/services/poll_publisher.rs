//! 投票发布 - 业务能力层
//!
//! 只负责"发投票 / 发答案回复"能力，不记录关联关系

use async_trait::async_trait;
use base64::Engine;
use tracing::{debug, info};

use crate::clients::TwitterClient;
use crate::config::Config;
use crate::error::{AppResult, PublishError};
use crate::models::question::Question;

/// 投票发布能力
#[async_trait]
pub trait PollPublisher: Send + Sync {
    /// 发布投票，返回投票推文 id
    async fn publish_poll(&self, question: &Question) -> AppResult<String>;

    /// 在投票下回复答案，返回回复推文 id
    async fn publish_reply(
        &self,
        poll_id: &str,
        answer_letter: &str,
        answer_text: &str,
    ) -> AppResult<String>;
}

/// 发布到社交平台
pub struct TwitterPublisher {
    client: TwitterClient,
    poll_duration_minutes: u32,
}

impl TwitterPublisher {
    pub fn new(config: &Config) -> AppResult<Self> {
        Ok(Self {
            client: TwitterClient::new(config)?,
            poll_duration_minutes: config.poll_duration_minutes,
        })
    }

    /// 有图片时先上传，返回 media id 列表
    async fn upload_image(&self, question: &Question) -> AppResult<Vec<String>> {
        let Some(encoded) = question.image.as_deref() else {
            return Ok(Vec::new());
        };

        let bytes = decode_image(encoded).map_err(|source| PublishError::InvalidImage {
            question_key: question.key(),
            source,
        })?;

        let media_id = self
            .client
            .upload_media(&question.image_file_name(), bytes)
            .await?;
        info!("🖼️ 图片上传成功: {}", media_id);

        Ok(vec![media_id])
    }
}

#[async_trait]
impl PollPublisher for TwitterPublisher {
    async fn publish_poll(&self, question: &Question) -> AppResult<String> {
        let media_ids = self.upload_image(question).await?;

        debug!("发布投票 {}", question.key());
        self.client
            .create_poll(
                &question.poll_text(),
                &question.choices(),
                self.poll_duration_minutes,
                &media_ids,
            )
            .await
    }

    async fn publish_reply(
        &self,
        poll_id: &str,
        answer_letter: &str,
        answer_text: &str,
    ) -> AppResult<String> {
        let text = crate::models::question::answer_reply_text(answer_letter, answer_text);
        debug!("回复投票 {}: {}", poll_id, text);
        self.client.create_reply(&text, poll_id).await
    }
}

/// 解码 base64 图片，允许带 `data:image/png;base64,` 前缀和换行
fn decode_image(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = match encoded.split_once("base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => encoded,
    };
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD.decode(cleaned)
}
