use crate::error::{AppResult, ConfigError};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// 平台凭证
///
/// 五个密钥各自独立，不写日志也不落盘
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub bearer_token: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl Credentials {
    /// 从环境变量读取（缺失的字段留空）
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        Self {
            bearer_token: var("BEARER_TOKEN"),
            consumer_key: var("API_KEY"),
            consumer_secret: var("API_KEY_SECRET"),
            access_token: var("ACCESS_TOKEN"),
            access_token_secret: var("ACCESS_TOKEN_SECRET"),
        }
    }

    /// 检查发布所需的凭证是否齐全
    pub fn ensure_complete(&self) -> AppResult<()> {
        let fields = [
            ("BEARER_TOKEN", &self.bearer_token),
            ("API_KEY", &self.consumer_key),
            ("API_KEY_SECRET", &self.consumer_secret),
            ("ACCESS_TOKEN", &self.access_token),
            ("ACCESS_TOKEN_SECRET", &self.access_token_secret),
        ];
        for (var_name, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingCredential {
                    var_name: var_name.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |v: &str| if v.is_empty() { "<unset>" } else { "<redacted>" };
        f.debug_struct("Credentials")
            .field("bearer_token", &mask(&self.bearer_token))
            .field("consumer_key", &mask(&self.consumer_key))
            .field("consumer_secret", &mask(&self.consumer_secret))
            .field("access_token", &mask(&self.access_token))
            .field("access_token_secret", &mask(&self.access_token_secret))
            .finish()
    }
}

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 题库地址（http(s) URL 或本地路径）
    pub source: String,
    /// 轮换记录文件
    pub state_file: String,
    /// 一轮的题目数量，None 表示使用题库总数
    pub cycle_threshold: Option<usize>,
    /// 投票持续时间（分钟）
    pub poll_duration_minutes: u32,
    /// 发布投票到回复答案之间的等待时间（分钟）
    pub reply_delay_minutes: u64,
    // --- 平台 API 配置 ---
    pub api_base_url: String,
    pub upload_base_url: String,
    pub credentials: Credentials,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: "https://raw.githubusercontent.com/gutibran/data/main/text/books/comptia_security_practice_tests/json/data.json".to_string(),
            state_file: "./analytics_file.json".to_string(),
            cycle_threshold: None,
            poll_duration_minutes: 120,
            reply_delay_minutes: 120,
            api_base_url: "https://api.twitter.com".to_string(),
            upload_base_url: "https://upload.twitter.com".to_string(),
            credentials: Credentials::default(),
        }
    }
}

/// TOML 配置文件中允许出现的字段，凭证只从环境变量读取
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    source: Option<String>,
    state_file: Option<String>,
    cycle_threshold: Option<usize>,
    poll_duration_minutes: Option<u32>,
    reply_delay_minutes: Option<u64>,
    api_base_url: Option<String>,
    upload_base_url: Option<String>,
}

impl Config {
    /// 默认值 ← TOML 文件（可选）← 环境变量
    pub fn load(config_path: Option<&Path>) -> AppResult<Self> {
        check_env_file(dotenvy::dotenv())?;

        let base = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_env()
    }

    /// 从 TOML 文件读取，未出现的字段使用默认值
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    fn from_toml_str(content: &str, path: &str) -> AppResult<Self> {
        let file: FileConfig = toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_string(),
            source,
        })?;

        let default = Self::default();
        Ok(Self {
            source: file.source.unwrap_or(default.source),
            state_file: file.state_file.unwrap_or(default.state_file),
            cycle_threshold: file.cycle_threshold.or(default.cycle_threshold),
            poll_duration_minutes: file.poll_duration_minutes.unwrap_or(default.poll_duration_minutes),
            reply_delay_minutes: file.reply_delay_minutes.unwrap_or(default.reply_delay_minutes),
            api_base_url: file.api_base_url.unwrap_or(default.api_base_url),
            upload_base_url: file.upload_base_url.unwrap_or(default.upload_base_url),
            credentials: default.credentials,
        })
    }

    /// 用环境变量覆盖当前配置
    pub fn with_env(self) -> AppResult<Self> {
        Ok(Self {
            source: std::env::var("QUIZ_SOURCE").unwrap_or(self.source),
            state_file: std::env::var("QUIZ_STATE_FILE").unwrap_or(self.state_file),
            cycle_threshold: match std::env::var("QUIZ_CYCLE_THRESHOLD").ok() {
                Some(v) => Some(parse_env("QUIZ_CYCLE_THRESHOLD", &v, "usize")?),
                None => self.cycle_threshold,
            },
            poll_duration_minutes: match std::env::var("QUIZ_POLL_DURATION_MINUTES").ok() {
                Some(v) => parse_env("QUIZ_POLL_DURATION_MINUTES", &v, "u32")?,
                None => self.poll_duration_minutes,
            },
            reply_delay_minutes: match std::env::var("QUIZ_REPLY_DELAY_MINUTES").ok() {
                Some(v) => parse_env("QUIZ_REPLY_DELAY_MINUTES", &v, "u64")?,
                None => self.reply_delay_minutes,
            },
            api_base_url: std::env::var("TWITTER_API_BASE_URL").unwrap_or(self.api_base_url),
            upload_base_url: std::env::var("TWITTER_UPLOAD_BASE_URL").unwrap_or(self.upload_base_url),
            credentials: Credentials::from_env(),
        })
    }

    /// 等待时间
    pub fn reply_delay(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.reply_delay_minutes as i64)
    }
}

/// .env 不存在时忽略，存在但格式错误时报错
fn check_env_file<T>(result: Result<T, dotenvy::Error>) -> AppResult<()> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(source) => Err(ConfigError::EnvFileFailed { source }.into()),
    }
}

fn parse_env<T: std::str::FromStr>(var_name: &str, value: &str, expected_type: &str) -> AppResult<T> {
    value.trim().parse().map_err(|_| {
        ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.to_string(),
            expected_type: expected_type.to_string(),
        }
        .into()
    })
}
