//! 测试用例与判定
//!
//! 每条用例恰好设置一种匹配模式：expected_output（逐字节精确匹配）或
//! validation（子串出现即通过）。两者都设或都不设属配置缺陷，直接报
//! ConfigError 而不是猜一个优先级。

use serde::{Deserialize, Serialize};

use crate::core::KeeperError;

/// 单条测试用例：固定输入 + 成功判据；启动时构造，之后不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    /// 精确匹配：输出与该串逐字节相等（runner 已去掉末尾空白）
    #[serde(default)]
    pub expected_output: Option<String>,
    /// 子串校验：该串出现在输出任意位置即通过
    #[serde(default)]
    pub validation: Option<String>,
}

impl TestCase {
    /// 精确匹配用例
    pub fn exact(input: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: Some(expected.into()),
            validation: None,
        }
    }

    /// 子串校验用例
    pub fn contains(input: impl Into<String>, needle: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: None,
            validation: Some(needle.into()),
        }
    }

    /// 判定输出是否通过；匹配模式配置缺陷返回 ConfigError（致命）
    pub fn validate(&self, output: &str) -> Result<bool, KeeperError> {
        match (&self.expected_output, &self.validation) {
            (Some(expected), None) => Ok(output == expected),
            (None, Some(needle)) => Ok(output.contains(needle.as_str())),
            (Some(_), Some(_)) => Err(KeeperError::ConfigError(format!(
                "case '{}' sets both expected_output and validation",
                self.input
            ))),
            (None, None) => Err(KeeperError::ConfigError(format!(
                "case '{}' sets neither expected_output nor validation",
                self.input
            ))),
        }
    }
}

/// 内置默认用例：算术、时间、位置、IP（servant 的四类基础能力）
pub fn default_cases() -> Vec<TestCase> {
    vec![
        TestCase::exact("What is 2 + 2?", "4"),
        TestCase::exact("what is 10 divided by 2?", "5.0"),
        TestCase::contains("what time is it?", "The current time is"),
        TestCase::contains("where are we?", "Based on your IP, you appear to be in"),
        TestCase::contains("what is my ip address?", "Your public IP address is:"),
    ]
}
