//! Beekeeper - 主从自我改进回路
//!
//! Keeper（master）按测试用例评估 servant 子进程的输出；输出不合格时请求 LLM
//! 重写 servant 全部源码，带一代备份地热替换后再验证一次。
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类（KeeperError 与致命性判定）
//! - **harness**: 改进回路核心（用例、运行器、代码仓、修订请求、决策提取、主循环）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）

pub mod config;
pub mod core;
pub mod harness;
pub mod llm;

pub use harness::{ImprovementLoop, TestCase};
