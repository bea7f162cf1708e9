//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 预置一个响应队列，complete 按序弹出；队列耗尽后回落到最后一条。
//! 便于在不访问外部服务的情况下跑通 修订请求 → 决策提取 → 热替换 全流程。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::traits::{LlmClient, Message};

/// Mock 客户端：按序返回预置响应
pub struct MockLlmClient {
    responses: Mutex<VecDeque<String>>,
    fallback: String,
    configured: bool,
    failure: Option<String>,
}

impl MockLlmClient {
    /// 单一固定响应
    pub fn canned(response: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: response.into(),
            configured: true,
            failure: None,
        }
    }

    /// 响应序列：第 N 次调用返回第 N 条，耗尽后返回最后一条
    pub fn scripted(responses: Vec<String>) -> Self {
        let fallback = responses.last().cloned().unwrap_or_default();
        Self {
            responses: Mutex::new(responses.into()),
            fallback,
            configured: true,
            failure: None,
        }
    }

    /// 模拟服务故障：持有凭证但 complete 恒返回 Err（网络断、响应畸形等）
    pub fn failing(error: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: String::new(),
            configured: true,
            failure: Some(error.into()),
        }
    }

    /// 模拟凭证缺失（is_configured 返回 false）
    pub fn without_credentials(mut self) -> Self {
        self.configured = false;
        self
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        let mut queue = self.responses.lock().map_err(|e| e.to_string())?;
        Ok(queue.pop_front().unwrap_or_else(|| self.fallback.clone()))
    }
}
