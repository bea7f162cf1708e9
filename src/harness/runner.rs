//! Servant 运行器：每次调用起一个全新的隔离子进程
//!
//! 输入整段写入子进程 stdin 后关闭（EOF 即输入结束），不走命令行参数——
//! 这是 servant 必须遵守的协议。stdout 去末尾空白后返回；非零退出是硬失败，
//! 携带退出码与 stderr，绝不折叠为空字符串。带超时，防止 servant 挂死主循环。

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::core::KeeperError;

/// Servant 运行器：解释器 + 源码路径 + 超时
pub struct ServantRunner {
    interpreter: String,
    source_path: PathBuf,
    timeout_secs: u64,
}

impl ServantRunner {
    pub fn new(
        interpreter: impl Into<String>,
        source_path: impl AsRef<Path>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            source_path: source_path.as_ref().to_path_buf(),
            timeout_secs,
        }
    }

    /// 运行一次 servant：写入 stdin、等待退出、返回去尾空白的 stdout
    pub async fn run(&self, input: &str) -> Result<String, KeeperError> {
        tracing::info!(
            servant = %self.source_path.display(),
            input = %input,
            "running servant"
        );

        let mut child = Command::new(&self.interpreter)
            .arg(&self.source_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| KeeperError::SpawnFailed(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(|e| KeeperError::SpawnFailed(format!("failed to write stdin: {}", e)))?;
            // drop 关闭管道，servant 读到 EOF
        }

        let output = tokio::time::timeout(
            std::time::Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| KeeperError::RunTimeout(self.timeout_secs))?
        .map_err(|e| KeeperError::SpawnFailed(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(KeeperError::RunFailure {
                code: output.status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(stdout.trim_end().to_string())
    }
}
