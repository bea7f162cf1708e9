//! Beekeeper - 主从自我改进回路
//!
//! 入口：初始化日志、加载配置、按 provider 构建 LLM 客户端，跑一轮改进回路并汇总。

use std::sync::Arc;

use anyhow::Context;
use beekeeper::config::{load_config, AppConfig};
use beekeeper::harness::ImprovementLoop;
use beekeeper::llm::{create_deepseek_client, LlmClient, OpenAiClient};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 按 [llm] 段选择后端：openai 走可配 base_url 的 OpenAI 兼容端点，其余走 DeepSeek
fn build_llm_client(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    match cfg.llm.provider.as_str() {
        "openai" => {
            let model = cfg
                .llm
                .openai
                .model
                .clone()
                .unwrap_or_else(|| cfg.llm.model.clone());
            Arc::new(OpenAiClient::new(cfg.llm.base_url.as_deref(), &model, None))
        }
        _ => {
            let model = cfg.llm.deepseek.model.clone().unwrap_or_else(|| cfg.llm.model.clone());
            Arc::new(create_deepseek_client(Some(&model)))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();

    let cfg = load_config(None).context("Failed to load config")?;
    let llm = build_llm_client(&cfg);

    let the_loop = ImprovementLoop::from_config(&cfg, llm);
    let reports = the_loop.run().await.context("Improvement loop failed")?;

    println!("--- Summary ---");
    for report in &reports {
        println!("#{} {:?}: {}", report.index, report.input, report.outcome);
    }
    let passing = reports.iter().filter(|r| r.outcome.is_passing()).count();
    println!("{}/{} cases passing", passing, reports.len());

    let (prompt, completion, total) = the_loop.token_usage();
    if total > 0 {
        println!(
            "Token usage: prompt={} completion={} total={}",
            prompt, completion, total
        );
    }

    Ok(())
}
