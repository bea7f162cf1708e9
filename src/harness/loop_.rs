//! 改进回路主循环
//!
//! 逐用例顺序执行：运行 → 判定 → （失败时）请求修订 → 提取决策 →
//! （接受替换时）备份+写入 → 复验一次 → 报告。复验只做一次，不迭代收敛，
//! 每个失败用例也只请求一次修订，不自动重试。
//!
//! 致命错误（用例配置缺陷、服务凭证缺失）直接终止整轮——后续用例同样无法
//! 通过或修订；其余错误只记入当前用例的报告，循环继续。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::KeeperError;
use crate::harness::cases::{default_cases, TestCase};
use crate::harness::extract::DecisionExtractor;
use crate::harness::revision::RevisionRequester;
use crate::harness::runner::ServantRunner;
use crate::harness::store::CodeStore;
use crate::harness::types::{CaseOutcome, CaseReport, RevisionDecision};
use crate::llm::LlmClient;

/// 改进回路：组合用例、运行器、代码仓、修订请求器与决策提取器
pub struct ImprovementLoop {
    cases: Vec<TestCase>,
    runner: ServantRunner,
    store: CodeStore,
    requester: RevisionRequester,
    extractor: DecisionExtractor,
}

impl ImprovementLoop {
    pub fn new(
        cases: Vec<TestCase>,
        runner: ServantRunner,
        store: CodeStore,
        requester: RevisionRequester,
        extractor: DecisionExtractor,
    ) -> Self {
        Self {
            cases,
            runner,
            store,
            requester,
            extractor,
        }
    }

    /// 按配置组装：用例缺省时用内置五条，围栏语言与超时取自 [servant] / [llm]
    pub fn from_config(cfg: &AppConfig, llm: Arc<dyn LlmClient>) -> Self {
        let cases = if cfg.harness.cases.is_empty() {
            default_cases()
        } else {
            cfg.harness.cases.clone()
        };

        Self::new(
            cases,
            ServantRunner::new(
                cfg.servant.interpreter.clone(),
                &cfg.servant.source_path,
                cfg.servant.timeout_secs,
            ),
            CodeStore::new(&cfg.servant.source_path),
            RevisionRequester::new(llm, cfg.servant.language.clone(), cfg.llm.timeouts.request),
            DecisionExtractor::new(&cfg.servant.language),
        )
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.requester.token_usage()
    }

    /// 跑完整轮用例；返回逐用例报告，致命错误时提前终止
    pub async fn run(&self) -> Result<Vec<CaseReport>, KeeperError> {
        let mut reports = Vec::with_capacity(self.cases.len());

        for (i, case) in self.cases.iter().enumerate() {
            let report = self.run_case(i + 1, case).await?;
            tracing::info!(
                case = report.index,
                input = %report.input,
                outcome = %report.outcome,
                "case finished"
            );
            reports.push(report);
        }

        Ok(reports)
    }

    /// 单用例状态机；只有致命错误（ConfigError / MissingCredential）会 Err
    async fn run_case(&self, index: usize, case: &TestCase) -> Result<CaseReport, KeeperError> {
        println!("--- Running Test Case #{} ---", index);
        println!("Input: {}", case.input);

        // runner 自身失败视为用例失败，其错误文本充当观察输出进入修订请求
        let (observed_output, run_ok) = match self.runner.run(&case.input).await {
            Ok(out) => (out, true),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(case = index, error = %e, "servant run failed");
                (e.to_string(), false)
            }
        };
        println!("Servant Output: {}", observed_output);

        // 无论 servant 是否跑成功都先过一遍判定：匹配模式的配置缺陷要立刻暴露
        let validated = case.validate(&observed_output)?;
        let passed = run_ok && validated;
        if passed {
            println!("Output is correct. No improvement needed.\n");
            return Ok(CaseReport {
                index,
                input: case.input.clone(),
                observed_output,
                outcome: CaseOutcome::Passed,
            });
        }

        println!("Output is incorrect or needs improvement.");
        let outcome = self.request_and_apply(case, &observed_output).await?;

        Ok(CaseReport {
            index,
            input: case.input.clone(),
            observed_output,
            outcome,
        })
    }

    /// 失败分支：凭证检查 → 读源码 → 请求修订 → 提取 → （替换时）写入并复验
    async fn request_and_apply(
        &self,
        case: &TestCase,
        observed_output: &str,
    ) -> Result<CaseOutcome, KeeperError> {
        // 凭证缺失是整轮的前置条件缺陷，不是单用例的可跳过错误
        if !self.requester.is_configured() {
            return Err(KeeperError::MissingCredential(
                "no API key for the revision service (set DEEPSEEK_API_KEY or OPENAI_API_KEY)"
                    .to_string(),
            ));
        }

        let current_source = match self.store.read() {
            Ok(source) => source,
            Err(e) => {
                println!("Could not read servant source: {}\n", e);
                return Ok(CaseOutcome::StoreFailed {
                    error: e.to_string(),
                });
            }
        };

        println!("Running Master Agent...");
        let raw = match self
            .requester
            .request(&case.input, observed_output, &current_source)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                println!("Master request failed: {}\n", e);
                return Ok(CaseOutcome::ServiceError {
                    error: e.to_string(),
                });
            }
        };
        println!("Master Response:\n{}\n", raw);

        let envelope = match self.extractor.parse_envelope(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                println!("No JSON object found in the master response.\n");
                return Ok(CaseOutcome::ExtractionFailed {
                    error: e.to_string(),
                });
            }
        };
        println!("Master Reasoning: {}", envelope.reasoning);

        let new_code = match self.extractor.decide(&envelope) {
            Ok(RevisionDecision::NoChange) => {
                println!("No improvement needed per Master Agent.\n");
                return Ok(CaseOutcome::NoChangeAccepted {
                    reasoning: envelope.reasoning,
                });
            }
            Ok(RevisionDecision::Replace(code)) => code,
            Err(e) => {
                println!("No valid code block found in the master response. No update performed.\n");
                return Ok(CaseOutcome::ExtractionFailed {
                    error: e.to_string(),
                });
            }
        };

        println!("Updating Servant Code...");
        if let Err(e) = self.store.write(&new_code) {
            // 写入失败时备份仍在，源码保持可恢复；此用例按「改进未能落盘」上报
            println!("Failed to apply improvement: {}\n", e);
            return Ok(CaseOutcome::StoreFailed {
                error: e.to_string(),
            });
        }

        // 写入已完成（rename 返回即落盘），复验读到的必然是新版
        println!("Running Servant (Improved Run)...");
        match self.runner.run(&case.input).await {
            Ok(new_output) => {
                println!("Improved Servant Output: {}\n", new_output);
                if case.validate(&new_output)? {
                    Ok(CaseOutcome::RevisedNowPassing {
                        reasoning: envelope.reasoning,
                    })
                } else {
                    Ok(CaseOutcome::RevisedStillFailing {
                        reasoning: envelope.reasoning,
                        new_output,
                    })
                }
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                println!("Improved servant failed to run: {}\n", e);
                Ok(CaseOutcome::RevisedStillFailing {
                    reasoning: envelope.reasoning,
                    new_output: e.to_string(),
                })
            }
        }
    }
}
