//! 轮换记录存储 - 业务能力层
//!
//! 只负责读写轮换状态，不关心选题流程

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, StateError};
use crate::models::rotation::RotationState;

/// 轮换状态的持久化
#[async_trait]
pub trait RotationStore: Send + Sync {
    /// 读取状态，首次运行时返回空状态
    async fn load(&self) -> AppResult<RotationState>;

    /// 覆盖写入状态
    async fn save(&self, state: &RotationState) -> AppResult<()>;
}

/// JSON 文件存储
///
/// 文件不存在视为首次运行；文件存在但无法读取或解析时返回
/// [`StateError::Corrupt`]，不会用空状态覆盖。
pub struct JsonRotationStore {
    path: PathBuf,
}

impl JsonRotationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "analytics_file.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_failed(&self, source: std::io::Error) -> AppError {
        StateError::WriteFailed {
            path: self.display_path(),
            source,
        }
        .into()
    }
}

#[async_trait]
impl RotationStore for JsonRotationStore {
    async fn load(&self) -> AppResult<RotationState> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("📄 轮换记录不存在，从第 0 轮开始: {}", self.display_path());
                return Ok(RotationState::fresh());
            }
            Err(e) => return Err(AppError::corrupt_state(self.display_path(), e)),
        };

        let state: RotationState = serde_json::from_str(&content)
            .map_err(|e| AppError::corrupt_state(self.display_path(), e))?;

        debug!(
            "读取轮换记录: 第 {} 轮, 已用 {} 道",
            state.interval,
            state.used_count()
        );

        Ok(state)
    }

    async fn save(&self, state: &RotationState) -> AppResult<()> {
        let content = serde_json::to_string_pretty(state)
            .map_err(|e| self.write_failed(std::io::Error::new(ErrorKind::InvalidData, e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_failed(e))?;
        }

        // 先写临时文件再重命名，避免写到一半留下损坏的记录
        let temp_path = self.temp_path();
        fs::write(&temp_path, content)
            .await
            .map_err(|e| self.write_failed(e))?;
        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| self.write_failed(e))?;

        debug!("轮换记录已保存: {}", self.display_path());
        Ok(())
    }
}
