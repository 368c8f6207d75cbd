//! Scout - 基于计划的项目问答智能体
//!
//! 入口：初始化日志、加载配置、构建编排器，回答命令行给出的问题。
//! 用法：scout <project_id> <branch> <question...>

use anyhow::{bail, Context};
use scout::{config::load_config, observability, OrchestratorBuilder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let mut args = std::env::args().skip(1);
    let (Some(project_id), Some(branch)) = (args.next(), args.next()) else {
        bail!("usage: scout <project_id> <branch> <question...>");
    };
    let question = args.collect::<Vec<_>>().join(" ");
    if question.trim().is_empty() {
        bail!("question must not be empty");
    }

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        Default::default()
    });

    let orchestrator = OrchestratorBuilder::new(cfg).build();
    let answer = orchestrator
        .answer(&question, &project_id, &branch)
        .await
        .context("Failed to answer question")?;

    println!("{}", answer);
    Ok(())
}
