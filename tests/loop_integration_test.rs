//! 改进回路端到端测试
//!
//! 用 sh 脚本充当 servant、Mock 客户端充当修订服务，覆盖四种可区分结局：
//! 通过 / 失败未动作 / 失败已更新仍失败 / 失败已更新转通过。

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Arc;

    use beekeeper::core::KeeperError;
    use beekeeper::harness::{
        CaseOutcome, CodeStore, DecisionExtractor, ImprovementLoop, RevisionRequester,
        ServantRunner, TestCase,
    };
    use beekeeper::llm::MockLlmClient;

    fn write_servant(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("servant.sh");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "{}", body).unwrap();
        path
    }

    fn make_loop(
        cases: Vec<TestCase>,
        servant: &std::path::Path,
        llm: MockLlmClient,
    ) -> ImprovementLoop {
        ImprovementLoop::new(
            cases,
            ServantRunner::new("sh", servant, 10),
            CodeStore::new(servant),
            RevisionRequester::new(Arc::new(llm), "sh", 10),
            DecisionExtractor::new("sh"),
        )
    }

    /// 围成 {"reasoning": ..., "new_code": "```sh\n<code>\n```"} 的响应
    fn replacement_response(reasoning: &str, code: &str) -> String {
        serde_json::json!({
            "reasoning": reasoning,
            "new_code": format!("```sh\n{}\n```", code),
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_correct_output_passes_without_revision() {
        let dir = tempfile::tempdir().unwrap();
        let servant = write_servant(&dir, "echo '4'");
        // 凭证缺失的 Mock：一旦错误地请求修订，run 会以 MissingCredential 失败
        let the_loop = make_loop(
            vec![TestCase::exact("What is 2 + 2?", "4")],
            &servant,
            MockLlmClient::canned("").without_credentials(),
        );

        let reports = the_loop.run().await.unwrap();
        assert_eq!(reports.len(), 1);
        assert!(matches!(reports[0].outcome, CaseOutcome::Passed));
        assert_eq!(reports[0].observed_output, "4");
    }

    #[tokio::test]
    async fn test_string_mismatch_fails_and_requests_revision() {
        let dir = tempfile::tempdir().unwrap();
        // servant 输出 "5"，期望 "5.0"：字符串不等即失败，不做数值比较
        let servant = write_servant(&dir, "echo '5'");
        let the_loop = make_loop(
            vec![TestCase::exact("what is 10 divided by 2?", "5.0")],
            &servant,
            MockLlmClient::canned(r#"{"reasoning":"needs float formatting","new_code":"No improvement needed"}"#),
        );

        let reports = the_loop.run().await.unwrap();
        match &reports[0].outcome {
            CaseOutcome::NoChangeAccepted { reasoning } => {
                assert_eq!(reasoning, "needs float formatting");
            }
            other => panic!("expected NoChangeAccepted, got {:?}", other),
        }
        assert_eq!(reports[0].observed_output, "5");
    }

    #[tokio::test]
    async fn test_no_change_decision_leaves_source_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let servant = write_servant(&dir, "echo 'wrong'");
        let original = std::fs::read_to_string(&servant).unwrap();

        let the_loop = make_loop(
            vec![TestCase::exact("ping", "pong")],
            &servant,
            MockLlmClient::canned(r#"{"reasoning":"ok","new_code":"No improvement needed"}"#),
        );
        let reports = the_loop.run().await.unwrap();

        assert!(matches!(
            reports[0].outcome,
            CaseOutcome::NoChangeAccepted { .. }
        ));
        // 未发生写入：源码原样、无备份文件
        assert_eq!(std::fs::read_to_string(&servant).unwrap(), original);
        assert!(!CodeStore::new(&servant).backup_path().exists());
    }

    #[tokio::test]
    async fn test_replacement_is_applied_backed_up_and_reverified() {
        let dir = tempfile::tempdir().unwrap();
        let servant = write_servant(&dir, "echo 'wrong'");
        let original = std::fs::read_to_string(&servant).unwrap();

        let the_loop = make_loop(
            vec![TestCase::exact("ping", "pong")],
            &servant,
            MockLlmClient::canned(replacement_response("echo the right thing", "echo 'pong'")),
        );
        let reports = the_loop.run().await.unwrap();

        match &reports[0].outcome {
            CaseOutcome::RevisedNowPassing { reasoning } => {
                assert_eq!(reasoning, "echo the right thing");
            }
            other => panic!("expected RevisedNowPassing, got {:?}", other),
        }
        // 新源码已落盘（围栏内容，去首尾空白），旧版在 .bak
        assert_eq!(std::fs::read_to_string(&servant).unwrap(), "echo 'pong'");
        assert_eq!(
            std::fs::read_to_string(CodeStore::new(&servant).backup_path()).unwrap(),
            original
        );
    }

    #[tokio::test]
    async fn test_replacement_that_still_fails_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let servant = write_servant(&dir, "echo 'wrong'");

        let the_loop = make_loop(
            vec![TestCase::exact("ping", "pong")],
            &servant,
            MockLlmClient::canned(replacement_response("try again", "echo 'still wrong'")),
        );
        let reports = the_loop.run().await.unwrap();

        match &reports[0].outcome {
            CaseOutcome::RevisedStillFailing { new_output, .. } => {
                assert_eq!(new_output, "still wrong");
            }
            other => panic!("expected RevisedStillFailing, got {:?}", other),
        }
        // 复验只做一次：Mock 若被再次调用会重复返回同一响应，但不应有第二次写入
        assert_eq!(
            std::fs::read_to_string(&servant).unwrap(),
            "echo 'still wrong'"
        );
    }

    #[tokio::test]
    async fn test_unparseable_response_does_not_update() {
        let dir = tempfile::tempdir().unwrap();
        let servant = write_servant(&dir, "echo 'wrong'");
        let original = std::fs::read_to_string(&servant).unwrap();

        let the_loop = make_loop(
            vec![TestCase::exact("ping", "pong")],
            &servant,
            MockLlmClient::canned("I think the servant is mostly fine, maybe tweak it a bit."),
        );
        let reports = the_loop.run().await.unwrap();

        assert!(matches!(
            reports[0].outcome,
            CaseOutcome::ExtractionFailed { .. }
        ));
        assert_eq!(std::fs::read_to_string(&servant).unwrap(), original);
    }

    #[tokio::test]
    async fn test_substring_case_passes_on_partial_match() {
        let dir = tempfile::tempdir().unwrap();
        let servant = write_servant(&dir, "echo 'The current time is 10:25:01'");
        let the_loop = make_loop(
            vec![TestCase::contains("what time is it?", "The current time is")],
            &servant,
            MockLlmClient::canned("").without_credentials(),
        );

        let reports = the_loop.run().await.unwrap();
        assert!(matches!(reports[0].outcome, CaseOutcome::Passed));
    }

    #[tokio::test]
    async fn test_mixed_run_continues_after_local_failures() {
        let dir = tempfile::tempdir().unwrap();
        // 对任何输入都回显 stdin 的 servant：第 1 条通过，第 2 条失败
        let servant = write_servant(&dir, "cat");
        let the_loop = make_loop(
            vec![
                TestCase::exact("echo me", "echo me"),
                TestCase::exact("what is 2 + 2?", "4"),
                TestCase::contains("echo me too", "me too"),
            ],
            &servant,
            // 第 2 条的修订响应无代码块 → 局部失败，循环继续到第 3 条
            MockLlmClient::canned(r#"{"reasoning":"prose only","new_code":"wrap it in code next time"}"#),
        );

        let reports = the_loop.run().await.unwrap();
        assert_eq!(reports.len(), 3);
        assert!(matches!(reports[0].outcome, CaseOutcome::Passed));
        assert!(matches!(
            reports[1].outcome,
            CaseOutcome::ExtractionFailed { .. }
        ));
        assert!(matches!(reports[2].outcome, CaseOutcome::Passed));
    }

    #[tokio::test]
    async fn test_service_failure_is_local_to_one_case() {
        let dir = tempfile::tempdir().unwrap();
        // 回显 stdin：第 1 条失败触发修订请求，第 2 条本身通过
        let servant = write_servant(&dir, "cat");
        let original = std::fs::read_to_string(&servant).unwrap();

        let the_loop = make_loop(
            vec![
                TestCase::exact("nope", "yes"),
                TestCase::contains("hello there", "hello"),
            ],
            &servant,
            MockLlmClient::failing("connection reset by peer"),
        );
        let reports = the_loop.run().await.unwrap();

        // 单次服务故障只影响当前用例，循环继续到下一条
        assert_eq!(reports.len(), 2);
        match &reports[0].outcome {
            CaseOutcome::ServiceError { error } => {
                assert!(error.contains("connection reset by peer"));
            }
            other => panic!("expected ServiceError, got {:?}", other),
        }
        assert!(matches!(reports[1].outcome, CaseOutcome::Passed));
        // 无决策即无写入
        assert_eq!(std::fs::read_to_string(&servant).unwrap(), original);
    }

    #[tokio::test]
    async fn test_blocked_store_write_reports_failure_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let servant = write_servant(&dir, "echo 'wrong'");
        let original = std::fs::read_to_string(&servant).unwrap();
        // 占住备份路径：备份失败必须中止更新，不碰源文件
        std::fs::create_dir(CodeStore::new(&servant).backup_path()).unwrap();

        let the_loop = make_loop(
            vec![
                TestCase::exact("ping", "pong"),
                TestCase::contains("anything", "wrong"),
            ],
            &servant,
            MockLlmClient::canned(replacement_response("swap the echo", "echo 'pong'")),
        );
        let reports = the_loop.run().await.unwrap();

        assert!(matches!(
            reports[0].outcome,
            CaseOutcome::StoreFailed { .. }
        ));
        // 改进未能落盘，源码原样可恢复；后续用例照常处理
        assert_eq!(std::fs::read_to_string(&servant).unwrap(), original);
        assert!(matches!(reports[1].outcome, CaseOutcome::Passed));
    }

    #[tokio::test]
    async fn test_malformed_case_is_fatal_even_when_servant_crashes() {
        let dir = tempfile::tempdir().unwrap();
        let servant = write_servant(&dir, "exit 9");
        let broken = TestCase {
            input: "ping".to_string(),
            expected_output: None,
            validation: None,
        };

        let the_loop = make_loop(vec![broken], &servant, MockLlmClient::canned(""));
        // 配置缺陷在首轮判定即暴露，不等到修订/复验路径
        assert!(matches!(
            the_loop.run().await,
            Err(KeeperError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_credential_is_fatal_not_per_case() {
        let dir = tempfile::tempdir().unwrap();
        let servant = write_servant(&dir, "echo 'wrong'");
        let the_loop = make_loop(
            vec![
                TestCase::exact("a", "right"),
                TestCase::exact("b", "right"),
            ],
            &servant,
            MockLlmClient::canned("").without_credentials(),
        );

        assert!(matches!(
            the_loop.run().await,
            Err(KeeperError::MissingCredential(_))
        ));
    }
}
