/// 社交平台 API 客户端
///
/// 封装发帖（投票 / 回复）和图片上传的 HTTP 调用
use crate::clients::oauth::OAuthSigner;
use crate::config::Config;
use crate::error::{AppError, AppResult, PublishError};
use serde_json::{json, Value};
use tracing::debug;

/// 平台客户端
pub struct TwitterClient {
    http: reqwest::Client,
    api_base_url: String,
    upload_base_url: String,
    signer: OAuthSigner,
}

impl TwitterClient {
    /// 创建新的客户端，凭证不全时返回配置错误
    pub fn new(config: &Config) -> AppResult<Self> {
        config.credentials.ensure_complete()?;

        Ok(Self {
            http: reqwest::Client::new(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            upload_base_url: config.upload_base_url.trim_end_matches('/').to_string(),
            signer: OAuthSigner::new(&config.credentials),
        })
    }

    /// 发布投票
    ///
    /// # 返回
    /// 返回新推文的 id
    pub async fn create_poll(
        &self,
        text: &str,
        options: &[&str],
        duration_minutes: u32,
        media_ids: &[String],
    ) -> AppResult<String> {
        self.create_tweet(&poll_payload(text, options, duration_minutes, media_ids))
            .await
    }

    /// 回复指定推文
    pub async fn create_reply(&self, text: &str, in_reply_to: &str) -> AppResult<String> {
        self.create_tweet(&reply_payload(text, in_reply_to)).await
    }

    /// 上传图片
    ///
    /// # 返回
    /// 返回 media id
    pub async fn upload_media(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<String> {
        let url = format!("{}/1.1/media/upload.json", self.upload_base_url);
        debug!("上传图片 {} ({} 字节)", file_name, bytes.len());

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("image/png")
            .map_err(|e| AppError::publish_failed(&url, e))?;
        let form = reqwest::multipart::Form::new().part("media", part);

        let response = self
            .http
            .post(&url)
            .header("authorization", self.signer.authorization_header("POST", &url, &[])?)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::publish_failed(&url, e))?;

        let body = Self::read_body(&url, response).await?;
        extract_string(&body, &["media_id_string"], &url)
    }

    async fn create_tweet(&self, payload: &Value) -> AppResult<String> {
        let url = format!("{}/2/tweets", self.api_base_url);
        debug!("发帖 Payload: {}", payload);

        let response = self
            .http
            .post(&url)
            .header("authorization", self.signer.authorization_header("POST", &url, &[])?)
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::publish_failed(&url, e))?;

        let body = Self::read_body(&url, response).await?;
        debug!("发帖结果: {}", body);
        extract_string(&body, &["data", "id"], &url)
    }

    /// 非 2xx 响应转为 [`PublishError::BadResponse`]
    async fn read_body(url: &str, response: reqwest::Response) -> AppResult<Value> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::publish_failed(url, e))?;

        if !status.is_success() {
            return Err(PublishError::BadResponse {
                endpoint: url.to_string(),
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        serde_json::from_str(&text).map_err(|e| AppError::publish_failed(url, e))
    }
}

fn poll_payload(text: &str, options: &[&str], duration_minutes: u32, media_ids: &[String]) -> Value {
    let mut payload = json!({
        "text": text,
        "poll": {
            "options": options,
            "duration_minutes": duration_minutes,
        }
    });
    if !media_ids.is_empty() {
        payload["media"] = json!({ "media_ids": media_ids });
    }
    payload
}

fn reply_payload(text: &str, in_reply_to: &str) -> Value {
    json!({
        "text": text,
        "reply": { "in_reply_to_tweet_id": in_reply_to }
    })
}

/// 按路径取出字符串字段
fn extract_string(body: &Value, path: &[&str], endpoint: &str) -> AppResult<String> {
    let mut current = body;
    for segment in path {
        current = match current.get(segment) {
            Some(value) => value,
            None => return Err(missing_field(path, endpoint)),
        };
    }

    match current {
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(missing_field(path, endpoint)),
    }
}

fn missing_field(path: &[&str], endpoint: &str) -> AppError {
    PublishError::MissingField {
        endpoint: endpoint.to_string(),
        field: path.join("."),
    }
    .into()
}
