//! 题库来源 - 业务能力层
//!
//! 只负责"拿到整份题库"，不关心选题

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult, SourceError};
use crate::models::loaders::{load_corpus_file, parse_corpus};
use crate::models::question::Corpus;

/// 题库来源
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// 获取完整题库
    async fn fetch(&self) -> AppResult<Corpus>;

    /// 来源描述（用于日志）
    fn describe(&self) -> String;
}

/// 通过 HTTP 下载 JSON 题库
pub struct HttpQuestionSource {
    client: reqwest::Client,
    url: String,
}

impl HttpQuestionSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl QuestionSource for HttpQuestionSource {
    async fn fetch(&self) -> AppResult<Corpus> {
        info!("🌐 正在下载题库: {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AppError::source_fetch_failed(&self.url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::BadStatus {
                location: self.url.clone(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::source_fetch_failed(&self.url, e))?;

        parse_corpus(&body, &self.url)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// 从本地 JSON 文件读取题库
pub struct FileQuestionSource {
    path: PathBuf,
}

impl FileQuestionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl QuestionSource for FileQuestionSource {
    async fn fetch(&self) -> AppResult<Corpus> {
        info!("📁 正在读取题库文件: {}", self.path.display());
        load_corpus_file(&self.path).await
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// 已经在内存中的题库
pub struct StaticQuestionSource {
    corpus: Corpus,
}

impl StaticQuestionSource {
    pub fn new(corpus: Corpus) -> Self {
        Self { corpus }
    }
}

#[async_trait]
impl QuestionSource for StaticQuestionSource {
    async fn fetch(&self) -> AppResult<Corpus> {
        Ok(self.corpus.clone())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}

/// 根据配置选择来源：http(s) 地址走网络，否则视为本地路径
pub fn source_for(config: &Config) -> Box<dyn QuestionSource> {
    let source = config.source.trim();
    if source.starts_with("http://") || source.starts_with("https://") {
        Box::new(HttpQuestionSource::new(source))
    } else {
        Box::new(FileQuestionSource::new(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_for_picks_by_scheme() {
        let mut config = Config::default();
        assert!(source_for(&config).describe().starts_with("https://"));

        config.source = "./data/questions.json".to_string();
        assert_eq!(source_for(&config).describe(), "./data/questions.json");
    }

    #[tokio::test]
    async fn test_file_source_reads_corpus() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("data.json");
        std::fs::write(
            &path,
            r#"{"A": [{"question_id": "1", "question_text": "q", "choice_a": "a", "choice_b": "b",
                "choice_c": "c", "choice_d": "d", "answer_letter": "A", "answer_text": "a"}]}"#,
        )
        .unwrap();

        let corpus = FileQuestionSource::new(&path).fetch().await.unwrap();
        assert_eq!(corpus.total_questions(), 1);
        assert!(corpus.find("A/1").is_some());
    }
}
