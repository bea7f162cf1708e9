use serde::{Deserialize, Serialize};

/// 对修订响应的结构化决策
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevisionDecision {
    /// new_code 为空或等于哨兵值："No improvement needed"
    NoChange,
    /// 围栏代码块中的完整替换源码（已去首尾空白）
    Replace(String),
}

/// 单个用例的终态
///
/// 四类可区分结果：通过 / 失败未动作 / 失败已更新仍失败 / 失败已更新转通过，
/// 未动作的原因再细分为 无需改动、提取失败、服务出错、写入失败。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CaseOutcome {
    /// 首轮即通过，未请求修订
    Passed,
    /// Master 判定无需改动；未写入任何代码
    NoChangeAccepted { reasoning: String },
    /// 响应中提取不出决策（无 JSON / 无代码块），未写入
    ExtractionFailed { error: String },
    /// 单次服务调用失败（非凭证缺失），未写入
    ServiceError { error: String },
    /// 备份或写入失败，源码保持可恢复状态
    StoreFailed { error: String },
    /// 已热替换且复验通过
    RevisedNowPassing { reasoning: String },
    /// 已热替换但复验仍失败（不再迭代）
    RevisedStillFailing { reasoning: String, new_output: String },
}

impl CaseOutcome {
    /// 该用例最终是否满足其判定条件
    pub fn is_passing(&self) -> bool {
        matches!(
            self,
            CaseOutcome::Passed | CaseOutcome::RevisedNowPassing { .. }
        )
    }
}

impl std::fmt::Display for CaseOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaseOutcome::Passed => write!(f, "passed"),
            CaseOutcome::NoChangeAccepted { .. } => write!(f, "failed, no change accepted"),
            CaseOutcome::ExtractionFailed { error } => {
                write!(f, "failed, extraction failed: {}", error)
            }
            CaseOutcome::ServiceError { error } => write!(f, "failed, service error: {}", error),
            CaseOutcome::StoreFailed { error } => write!(f, "failed, store error: {}", error),
            CaseOutcome::RevisedNowPassing { .. } => write!(f, "revised, now passing"),
            CaseOutcome::RevisedStillFailing { .. } => write!(f, "revised, still failing"),
        }
    }
}

/// 单个用例的运行报告（结构化，可直接序列化进日志）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseReport {
    /// 用例序号（从 1 开始）
    pub index: usize,
    pub input: String,
    /// 首轮捕获的输出；runner 自身失败时为其错误文本
    pub observed_output: String,
    pub outcome: CaseOutcome,
}
