//! 重试编排器
//!
//! answer(query, project_id, branch)：
//! 1. 查询项目 Token；不存在或过期直接返回 Authorization 错误，不重试、不规划；
//! 2. 重试循环 1：Planner 生成计划；
//! 3. 重试循环 2：以同一份计划、每次全新的 AgentState 执行（执行失败不会重新规划）；
//! 4. 取 final_answer，为空时返回固定兜底文案。

use std::sync::Arc;

use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;

use crate::auth::TokenService;
use crate::core::{AgentError, Phase, RetryPolicy};
use crate::plan::{PlanExecutor, Planner};

/// 计划执行成功但没有产出答案时的回复
pub const FALLBACK_ANSWER: &str = "No answer could be generated.";

pub struct RetryingOrchestrator {
    tokens: Arc<dyn TokenService>,
    planner: Planner,
    executor: PlanExecutor,
    retry: RetryPolicy,
}

impl RetryingOrchestrator {
    pub fn new(
        tokens: Arc<dyn TokenService>,
        planner: Planner,
        executor: PlanExecutor,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            tokens,
            planner,
            executor,
            retry,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub async fn answer(
        &self,
        query: &str,
        project_id: &str,
        branch: &str,
    ) -> Result<String, AgentError> {
        let span = tracing::info_span!(
            "answer",
            query_id = %Uuid::new_v4(),
            project_id = %project_id,
            branch = %branch
        );
        self.answer_inner(query, project_id, branch)
            .instrument(span)
            .await
    }

    async fn answer_inner(
        &self,
        query: &str,
        project_id: &str,
        branch: &str,
    ) -> Result<String, AgentError> {
        self.authorize(project_id).await?;

        let plan = self
            .retry
            .run(Phase::Planning, move |_| {
                self.planner.propose(query, project_id, branch)
            })
            .await?;
        tracing::info!(steps = plan.len(), kinds = ?plan.kinds(), "plan completed");

        let plan = &plan;
        let state = self
            .retry
            .run(Phase::Execution, move |_| {
                self.executor.run(plan, query, project_id, branch)
            })
            .await?;

        if state.final_answer.is_empty() {
            tracing::warn!(
                skipped = state.skipped_steps.len(),
                "plan finished without an answer"
            );
            return Ok(FALLBACK_ANSWER.to_string());
        }
        Ok(state.final_answer)
    }

    async fn authorize(&self, project_id: &str) -> Result<(), AgentError> {
        let token = self.tokens.get_token(project_id).await?.ok_or_else(|| {
            AgentError::Authorization(format!("no token for project {}", project_id))
        })?;
        if token.is_expired_at(Utc::now()) {
            return Err(AgentError::Authorization(format!(
                "token expired for project {}",
                project_id
            )));
        }
        Ok(())
    }
}
