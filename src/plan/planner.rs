//! Planner：向 LLM 请求计划并严格解析
//!
//! 回复必须整体是步骤对象组成的 JSON 数组；不剥离代码块、不做局部修复。
//! 步骤类型是否可识别留给执行器判断。

use std::sync::Arc;

use crate::core::AgentError;
use crate::llm::{invoke, LlmClient};
use crate::plan::prompt::{planning_prompt, DEFAULT_PLANNER_SYSTEM_PROMPT};
use crate::plan::Plan;

const RAW_PREVIEW_CHARS: usize = 200;

/// 解析计划 JSON；失败时错误里带上回复预览
pub fn parse_plan(raw: &str) -> Result<Plan, AgentError> {
    Plan::from_json(raw).map_err(|e| {
        let preview: String = raw.chars().take(RAW_PREVIEW_CHARS).collect();
        AgentError::PlanParse(format!("{}: {}", e, preview))
    })
}

pub struct Planner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
        }
    }

    /// 使用默认的规划角色描述
    pub fn with_default_prompt(llm: Arc<dyn LlmClient>) -> Self {
        Self::new(llm, DEFAULT_PLANNER_SYSTEM_PROMPT)
    }

    pub async fn propose(
        &self,
        query: &str,
        project_id: &str,
        branch: &str,
    ) -> Result<Plan, AgentError> {
        let prompt = planning_prompt(query, project_id, branch);
        let raw = invoke(self.llm.as_ref(), &prompt, &self.system_prompt)
            .await
            .map_err(AgentError::PlanGeneration)?;
        let plan = parse_plan(&raw)?;
        tracing::debug!(steps = plan.len(), kinds = ?plan.kinds(), "plan proposed");
        Ok(plan)
    }
}
