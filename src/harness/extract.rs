//! 决策提取器：从非结构化响应中解析修订决策
//!
//! 响应是自然语言包着的 JSON，JSON 里又嵌着围栏代码块字符串——两层都可能
//! 畸形。提取分两步：先定位 JSON 信封（reasoning / new_code），再从 new_code
//! 中取围栏块。定位不用「首个 { 到末个 }」的贪婪切片（reasoning 里可能出现
//! 花括号），而是从每个 { 位置做一次真实的增量解析，取首个解析成功的对象。
//!
//! 三种形态必须可区分：全文无 JSON → NoJsonFound；new_code 为空或哨兵值 →
//! NoChange；new_code 非哨兵但无围栏块 → NoCodeBlock（绝不把整段文本当源码）。

use regex::Regex;

use crate::core::KeeperError;
use crate::harness::types::RevisionDecision;

/// 哨兵值：master 用这个字面量表示无需改动（区分大小写，精确匹配）
pub const NO_CHANGE_SENTINEL: &str = "No improvement needed";

/// 响应中的 JSON 信封：reasoning 可缺省，new_code 缺省视为空串
#[derive(Debug, Clone)]
pub struct RevisionEnvelope {
    pub reasoning: String,
    pub new_code: String,
}

/// 提取结果：决策 + 供日志使用的 reasoning
#[derive(Debug, Clone)]
pub struct ExtractedRevision {
    pub reasoning: String,
    pub decision: RevisionDecision,
}

/// 决策提取器：围栏语言标注可配置（```python / ```sh / ...）
pub struct DecisionExtractor {
    fence: Regex,
}

impl DecisionExtractor {
    pub fn new(language: &str) -> Self {
        // 固定形状的模式，language 已转义，编译不会失败
        let fence = Regex::new(&format!(
            r"(?s)```{}\s*(.*?)\s*```",
            regex::escape(language)
        ))
        .unwrap();
        Self { fence }
    }

    /// 从每个 `{` 位置尝试增量解析，返回首个完整解析出的 JSON 对象
    fn first_json_object(raw: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
        for (idx, ch) in raw.char_indices() {
            if ch != '{' {
                continue;
            }
            let mut values =
                serde_json::Deserializer::from_str(&raw[idx..]).into_iter::<serde_json::Value>();
            if let Some(Ok(serde_json::Value::Object(map))) = values.next() {
                return Some(map);
            }
        }
        None
    }

    /// 第一步：定位 JSON 信封；全文无可解析对象时报 NoJsonFound
    pub fn parse_envelope(&self, raw: &str) -> Result<RevisionEnvelope, KeeperError> {
        let obj = Self::first_json_object(raw).ok_or(KeeperError::NoJsonFound)?;

        let reasoning = obj
            .get("reasoning")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let new_code = obj
            .get("new_code")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(RevisionEnvelope { reasoning, new_code })
    }

    /// 第二步：信封 → 决策；非哨兵且无围栏块时报 NoCodeBlock
    pub fn decide(&self, envelope: &RevisionEnvelope) -> Result<RevisionDecision, KeeperError> {
        if envelope.new_code.is_empty() || envelope.new_code == NO_CHANGE_SENTINEL {
            return Ok(RevisionDecision::NoChange);
        }

        match self.fence.captures(&envelope.new_code) {
            Some(caps) => Ok(RevisionDecision::Replace(caps[1].trim().to_string())),
            None => Err(KeeperError::NoCodeBlock),
        }
    }

    /// 一步到位：raw → 决策 + reasoning（纯函数，幂等）
    pub fn extract(&self, raw: &str) -> Result<ExtractedRevision, KeeperError> {
        let envelope = self.parse_envelope(raw)?;
        let decision = self.decide(&envelope)?;
        Ok(ExtractedRevision {
            reasoning: envelope.reasoning,
            decision,
        })
    }
}
