use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 题库获取错误
    #[error("题库错误: {0}")]
    Source(#[from] SourceError),
    /// 轮换记录错误
    #[error("轮换记录错误: {0}")]
    State(#[from] StateError),
    /// 选题错误
    #[error("选题错误: {0}")]
    Selection(#[from] SelectionError),
    /// 发布错误
    #[error("发布错误: {0}")]
    Publish(#[from] PublishError),
    /// 回复关联错误
    #[error("关联错误: {0}")]
    Correlation(#[from] CorrelationError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 题库获取错误
#[derive(Debug, Error)]
pub enum SourceError {
    /// 网络请求失败
    #[error("获取题库失败 ({location}): {source}")]
    FetchFailed {
        location: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 返回非成功状态码
    #[error("题库返回错误状态 ({location}): HTTP {status}")]
    BadStatus { location: String, status: u16 },
    /// JSON 解析失败
    #[error("题库 JSON 解析失败 ({location}): {source}")]
    ParseFailed {
        location: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 轮换记录错误
#[derive(Debug, Error)]
pub enum StateError {
    /// 记录文件存在但无法读取或解析
    #[error("轮换记录已损坏 ({path}): {source}")]
    Corrupt {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入失败
    #[error("写入轮换记录失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 上一条投票的答案还没有回复
    #[error("投票 {poll_id} 的答案尚未回复 (题目 {question_key})")]
    ReplyPending {
        poll_id: String,
        question_key: String,
    },
}

/// 选题错误
#[derive(Debug, Error)]
pub enum SelectionError {
    /// 所有题目都已在本轮使用
    #[error("没有可用的题目 (第 {interval} 轮已使用 {used}/{total})")]
    NoQuestionAvailable {
        interval: u64,
        used: usize,
        total: usize,
    },
}

/// 发布错误
#[derive(Debug, Error)]
pub enum PublishError {
    /// 网络请求失败
    #[error("请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 平台返回错误响应
    #[error("平台返回错误响应 ({endpoint}): HTTP {status}, body={body}")]
    BadResponse {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// 请求签名失败
    #[error("请求签名失败 ({endpoint}): {reason}")]
    SigningFailed { endpoint: String, reason: String },
    /// 响应中缺少 id
    #[error("响应中缺少字段 {field} ({endpoint})")]
    MissingField { endpoint: String, field: String },
    /// 图片数据无法解码
    #[error("图片 base64 解码失败 ({question_key}): {source}")]
    InvalidImage {
        question_key: String,
        #[source]
        source: base64::DecodeError,
    },
}

/// 回复关联错误
#[derive(Debug, Error)]
pub enum CorrelationError {
    /// 找不到对应的投票记录
    #[error("题目 {question_key} 中没有投票 {poll_id} 的记录")]
    UnknownPoll {
        question_key: String,
        poll_id: String,
    },
    /// 投票已经回复过
    #[error("投票 {poll_id} 已关联回复 {reply_id}")]
    AlreadyReplied { poll_id: String, reply_id: String },
    /// 同一个投票 id 重复记录
    #[error("投票 {poll_id} 已经记录过")]
    DuplicatePoll { poll_id: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 缺少凭证
    #[error("缺少凭证环境变量 {var_name}")]
    MissingCredential { var_name: String },
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({path}): {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// .env 文件存在但无法解析
    #[error(".env 文件加载失败: {source}")]
    EnvFileFailed {
        #[source]
        source: dotenvy::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建题库请求失败错误
    pub fn source_fetch_failed(
        location: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Source(SourceError::FetchFailed {
            location: location.into(),
            source: Box::new(source),
        })
    }

    /// 创建轮换记录损坏错误
    pub fn corrupt_state(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::State(StateError::Corrupt {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建发布请求失败错误
    pub fn publish_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Publish(PublishError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 是否为"没有可用题目"
    pub fn is_no_question_available(&self) -> bool {
        matches!(
            self,
            AppError::Selection(SelectionError::NoQuestionAvailable { .. })
        )
    }

    /// 是否为关联错误
    pub fn is_correlation(&self) -> bool {
        matches!(self, AppError::Correlation(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_context() {
        let err: AppError = CorrelationError::UnknownPoll {
            question_key: "A/7".to_string(),
            poll_id: "p999".to_string(),
        }
        .into();

        let msg = err.to_string();
        assert!(msg.contains("p999"));
        assert!(msg.contains("A/7"));
        assert!(err.is_correlation());
    }

    #[test]
    fn test_corrupt_state_keeps_source() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = AppError::corrupt_state("analytics_file.json", parse_err);

        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("analytics_file.json"));
    }
}
