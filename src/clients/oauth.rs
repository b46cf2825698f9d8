/// OAuth 1.0a 请求签名
///
/// 用户上下文的发帖和上传图片接口都要求 HMAC-SHA1 签名
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::config::Credentials;
use crate::error::{AppResult, PublishError};

type HmacSha1 = Hmac<Sha1>;

/// OAuth 1.0a 签名器
#[derive(Clone)]
pub struct OAuthSigner {
    consumer_key: String,
    consumer_secret: String,
    token: String,
    token_secret: String,
}

impl OAuthSigner {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            consumer_key: credentials.consumer_key.clone(),
            consumer_secret: credentials.consumer_secret.clone(),
            token: credentials.access_token.clone(),
            token_secret: credentials.access_token_secret.clone(),
        }
    }

    /// 生成 `Authorization` 头
    ///
    /// # 参数
    /// - `method`: HTTP 方法
    /// - `url`: 不带查询串的地址
    /// - `params`: 参与签名的查询/表单参数（JSON 和 multipart 请求体不参与）
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
    ) -> AppResult<String> {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        self.header_with(method, url, params, &nonce, &timestamp)
    }

    fn header_with(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        nonce: &str,
        timestamp: &str,
    ) -> AppResult<String> {
        let oauth_params = [
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp),
            ("oauth_token", self.token.as_str()),
            ("oauth_version", "1.0"),
        ];

        let signature = self.signature(method, url, params, &oauth_params)?;

        let mut header_parts: Vec<String> = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();
        header_parts.push(format!("oauth_signature=\"{}\"", encode(&signature)));
        header_parts.sort();

        Ok(format!("OAuth {}", header_parts.join(", ")))
    }

    fn signature(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        oauth_params: &[(&str, &str)],
    ) -> AppResult<String> {
        let mut encoded: Vec<(String, String)> = params
            .iter()
            .chain(oauth_params.iter())
            .map(|(k, v)| (encode(k), encode(v)))
            .collect();
        encoded.sort();

        let parameter_string = encoded
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            method.to_uppercase(),
            encode(url),
            encode(&parameter_string)
        );
        let signing_key = format!("{}&{}", encode(&self.consumer_secret), encode(&self.token_secret));

        let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes()).map_err(|e| {
            PublishError::SigningFailed {
                endpoint: url.to_string(),
                reason: e.to_string(),
            }
        })?;
        mac.update(base_string.as_bytes());
        Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }
}

/// RFC 3986 百分号编码
fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
