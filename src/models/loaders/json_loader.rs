use crate::error::{AppError, AppResult, SourceError};
use crate::models::question::Corpus;
use std::path::Path;
use tokio::fs;

/// 把 JSON 文本解析为题库
///
/// # 参数
/// - `content`: JSON 内容（分类 → 题目列表）
/// - `location`: 来源地址，仅用于错误信息
pub fn parse_corpus(content: &str, location: &str) -> AppResult<Corpus> {
    let mut corpus: Corpus =
        serde_json::from_str(content).map_err(|source| SourceError::ParseFailed {
            location: location.to_string(),
            source,
        })?;

    corpus.normalize();

    tracing::debug!(
        "题库解析完成: {} 个分类, {} 道题目",
        corpus.category_names().count(),
        corpus.total_questions()
    );

    Ok(corpus)
}

/// 从本地 JSON 文件加载题库
pub async fn load_corpus_file(path: &Path) -> AppResult<Corpus> {
    let location = path.display().to_string();
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::source_fetch_failed(&location, e))?;

    parse_corpus(&content, &location)
}
