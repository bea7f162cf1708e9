//! 改进回路核心
//!
//! 数据流（单用例）：cases 提供输入 → runner 运行 servant → cases 判定；
//! 失败时 store 读源码 → revision 请求 LLM → extract 提取决策；
//! 接受替换则 store 备份+写入，runner 复验一次后出报告。

pub mod cases;
pub mod extract;
pub mod loop_;
pub mod revision;
pub mod runner;
pub mod store;
pub mod types;

pub use cases::TestCase;
pub use extract::{DecisionExtractor, ExtractedRevision, NO_CHANGE_SENTINEL};
pub use loop_::ImprovementLoop;
pub use revision::RevisionRequester;
pub use runner::ServantRunner;
pub use store::CodeStore;
pub use types::{CaseOutcome, CaseReport, RevisionDecision};
