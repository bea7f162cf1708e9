//! Keeper 错误类型
//!
//! 与主循环配合：致命错误（配置缺陷、凭证缺失）终止整轮运行，
//! 其余错误只影响当前用例，循环记录后继续下一条。

use std::path::PathBuf;

use thiserror::Error;

/// 改进回路运行过程中可能出现的错误（配置、子进程、服务、提取、存储）
#[derive(Error, Debug)]
pub enum KeeperError {
    /// 用例配置缺陷（精确匹配与子串校验必须恰好设置其一）
    #[error("Config error: {0}")]
    ConfigError(String),

    /// servant 进程无法启动（解释器缺失、路径错误等）
    #[error("Failed to spawn servant: {0}")]
    SpawnFailed(String),

    /// servant 非零退出：携带退出码与 stderr，绝不折叠为空输出
    #[error("Servant exited with code {code}: {stderr}")]
    RunFailure { code: i32, stderr: String },

    #[error("Servant timed out after {0}s")]
    RunTimeout(u64),

    /// 服务凭证缺失：首个失败用例即中止整轮（后续用例同样无法修订）
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("LLM service error: {0}")]
    ServiceError(String),

    /// 响应全文中找不到任何可解析的 JSON 对象
    #[error("No JSON object found in master response")]
    NoJsonFound,

    /// new_code 非哨兵值但不含语言围栏代码块；不回退为整段文本
    #[error("No fenced code block found in new_code")]
    NoCodeBlock,

    #[error("Servant source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Store error: {0}")]
    StoreError(String),
}

impl KeeperError {
    /// 是否终止整轮运行（其余错误仅记录当前用例后继续）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            KeeperError::ConfigError(_) | KeeperError::MissingCredential(_)
        )
    }
}
