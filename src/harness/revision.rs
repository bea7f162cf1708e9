//! 修订请求器：把失败现场打包成一次 LLM 请求
//!
//! 将（失败输入、观察输出、当前源码）渲染进 master 提示词，单次阻塞式
//! complete 调用，无流式、无多轮、无自动重试。源码以围栏块原样附在提示词
//! 末尾。返回原始响应文本，解析交给 extract。

use std::sync::Arc;

use crate::core::KeeperError;
use crate::harness::extract::NO_CHANGE_SENTINEL;
use crate::llm::{LlmClient, Message};

/// 修订请求器：持有 LLM 客户端与围栏语言标注
pub struct RevisionRequester {
    llm: Arc<dyn LlmClient>,
    language: String,
    request_timeout_secs: u64,
}

impl RevisionRequester {
    pub fn new(llm: Arc<dyn LlmClient>, language: impl Into<String>, request_timeout_secs: u64) -> Self {
        Self {
            llm,
            language: language.into(),
            request_timeout_secs,
        }
    }

    /// 服务是否持有真实凭证；false 时主循环在首次请求前终止
    pub fn is_configured(&self) -> bool {
        self.llm.is_configured()
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    /// System 提示词：master 职责、步骤、JSON 响应契约与哨兵值
    fn system_prompt(&self) -> String {
        format!(
            r#"You are a master agent tasked with improving a servant agent's performance.
The servant reads input from standard input, not command-line arguments.
Here's what to do:
1. Read the servant's current source code provided below.
2. Check the servant's output against its input.
3. If the output is wrong or could be better, rewrite the servant's entire code to improve it, keeping input from standard input.
4. If the output is spot-on, indicate that no changes are needed.
5. Respond with a JSON object containing your reasoning and the new code (if any).

Respond with a JSON object in the following format:
{{
    "reasoning": "Your reasoning here",
    "new_code": "```{language}\n[New servant code here]\n```"
}}
If no improvement is needed, `new_code` should be "{sentinel}"."#,
            language = self.language,
            sentinel = NO_CHANGE_SENTINEL,
        )
    }

    /// User 提示词：失败现场 + 源码围栏块
    fn build_prompt(&self, failing_input: &str, observed_output: &str, current_source: &str) -> String {
        format!(
            r#"The servant got this input: "{failing_input}"
It gave this output: "{observed_output}"

Servant Source Code:
```
{current_source}
```"#,
            failing_input = failing_input,
            observed_output = observed_output,
            current_source = current_source,
        )
    }

    /// 发出一次修订请求，返回服务的原始响应文本
    pub async fn request(
        &self,
        failing_input: &str,
        observed_output: &str,
        current_source: &str,
    ) -> Result<String, KeeperError> {
        let messages = [
            Message::system(self.system_prompt()),
            Message::user(self.build_prompt(failing_input, observed_output, current_source)),
        ];

        tracing::info!(input = %failing_input, "requesting revision from master LLM");

        tokio::time::timeout(
            std::time::Duration::from_secs(self.request_timeout_secs),
            self.llm.complete(&messages),
        )
        .await
        .map_err(|_| {
            KeeperError::ServiceError(format!(
                "request timed out after {}s",
                self.request_timeout_secs
            ))
        })?
        .map_err(KeeperError::ServiceError)
    }
}
