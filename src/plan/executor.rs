//! 计划执行器
//!
//! StepExecutor 按 StepKind 分派单个步骤并就地修改 AgentState；
//! PlanExecutor 以全新的 AgentState 顺序执行整份计划，遇到第一个失败立即中止且不返回部分状态。
//! 每个步骤输出一条结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;

use crate::context::ContextStore;
use crate::core::AgentError;
use crate::llm::{invoke, LlmClient};
use crate::plan::prompt::{final_prompt, normalize_line_breaks, render_combined_context};
use crate::plan::{
    AgentState, ContextArgs, InvokeArgs, Plan, SearchArgs, SearchResult, SkippedStep, Step,
    StepKind,
};
use crate::search::VectorSearch;

/// 单个步骤的执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Applied,
    /// 未识别的步骤类型，已记录并跳过
    Skipped,
}

fn typed_args<T: DeserializeOwned>(index: usize, step: &Step) -> Result<T, AgentError> {
    step.parse_args().map_err(|e| AgentError::MalformedStepArguments {
        index,
        kind: step.kind.to_string(),
        reason: e.to_string(),
    })
}

/// 单步解释器：持有 LLM、向量检索与上下文存储
pub struct StepExecutor {
    llm: Arc<dyn LlmClient>,
    search: Arc<dyn VectorSearch>,
    context_store: Arc<dyn ContextStore>,
}

impl StepExecutor {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn VectorSearch>,
        context_store: Arc<dyn ContextStore>,
    ) -> Self {
        Self {
            llm,
            search,
            context_store,
        }
    }

    /// 执行第 index 个步骤；失败对本次计划执行是终止性的
    pub async fn execute(
        &self,
        index: usize,
        step: &Step,
        state: &mut AgentState,
        project_id: &str,
        branch: &str,
    ) -> Result<StepOutcome, AgentError> {
        let start = Instant::now();
        let result = self.dispatch(index, step, state, project_id, branch).await;

        let outcome = match &result {
            Ok(StepOutcome::Applied) => "ok",
            Ok(StepOutcome::Skipped) => "skipped",
            Err(_) => "error",
        };
        let audit = serde_json::json!({
            "event": "step_audit",
            "step": index,
            "kind": step.kind.as_str(),
            "ok": result.is_ok(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
        });
        tracing::info!(audit = %audit, "step");

        result
    }

    async fn dispatch(
        &self,
        index: usize,
        step: &Step,
        state: &mut AgentState,
        project_id: &str,
        branch: &str,
    ) -> Result<StepOutcome, AgentError> {
        match &step.kind {
            StepKind::SearchByQuery => {
                let args: SearchArgs = typed_args(index, step)?;
                let tasks = self.search.query(&args.query, project_id, branch).await?;
                tracing::debug!(step = index, hits = tasks.len(), "search results");
                state.search_results.push(SearchResult { tasks });
            }
            StepKind::GetGlobalContext => {
                let args: ContextArgs = typed_args(index, step)?;
                let context = self.context_store.fetch(&args.project_id).await?;
                // 后写覆盖
                state.global_context = Some(context);
            }
            StepKind::Combine => {
                state.combined_context =
                    render_combined_context(&state.search_results, state.global_context.as_ref())
                        .map_err(|e| AgentError::ContextSerialization(e.to_string()))?;
            }
            StepKind::InvokeLlm => {
                let args: InvokeArgs = typed_args(index, step)?;
                let prompt =
                    final_prompt(&args.system_prompt, &state.combined_context, &args.user_prompt);
                let answer = invoke(self.llm.as_ref(), &prompt, &args.system_prompt).await?;
                state.final_answer = normalize_line_breaks(&answer);
            }
            StepKind::Unknown(raw) => {
                tracing::warn!(step = index, kind = %raw, "unknown step type, skipping");
                state.skipped_steps.push(SkippedStep {
                    index,
                    kind: raw.clone(),
                });
                return Ok(StepOutcome::Skipped);
            }
        }
        Ok(StepOutcome::Applied)
    }
}

/// 整份计划的顺序执行器
pub struct PlanExecutor {
    steps: StepExecutor,
}

impl PlanExecutor {
    pub fn new(steps: StepExecutor) -> Self {
        Self { steps }
    }

    pub async fn run(
        &self,
        plan: &Plan,
        query: &str,
        project_id: &str,
        branch: &str,
    ) -> Result<AgentState, AgentError> {
        let mut state = AgentState::new(query, plan.clone());
        for (index, step) in plan.steps().iter().enumerate() {
            tracing::info!(step = index, kind = %step.kind, "executing step");
            self.steps
                .execute(index, step, &mut state, project_id, branch)
                .await?;
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextError, GlobalContext, InMemoryContextStore};
    use crate::core::ErrorKind;
    use crate::llm::{LlmError, Role, ScriptedLlmClient};
    use crate::search::{InMemoryVectorSearch, SearchError};
    use async_trait::async_trait;
    use serde_json::json;

    struct FailingSearch;

    #[async_trait]
    impl VectorSearch for FailingSearch {
        async fn query(&self, _: &str, _: &str, _: &str) -> Result<Vec<String>, SearchError> {
            Err(SearchError("index offline".into()))
        }
    }

    struct FailingContext;

    #[async_trait]
    impl ContextStore for FailingContext {
        async fn fetch(&self, _: &str) -> Result<GlobalContext, ContextError> {
            Err(ContextError::Unavailable("db down".into()))
        }
    }

    fn step(value: serde_json::Value) -> Step {
        serde_json::from_value(value).unwrap()
    }

    fn plan(value: serde_json::Value) -> Plan {
        serde_json::from_value(value).unwrap()
    }

    fn executor(llm: Arc<ScriptedLlmClient>) -> StepExecutor {
        let search = InMemoryVectorSearch::new(10).with_snippets(
            "42",
            "main",
            ["auth: task-1 desc", "auth: task-2 desc", "billing: task-3"],
        );
        let store = InMemoryContextStore::new()
            .with_context("42", json!({"owner": "alice"}))
            .with_context("43", json!({"owner": "bob"}));
        StepExecutor::new(llm, Arc::new(search), Arc::new(store))
    }

    /// 在项目 42 / main 分支上执行一个 JSON 描述的步骤
    async fn apply(
        exec: &StepExecutor,
        index: usize,
        value: serde_json::Value,
        state: &mut AgentState,
    ) -> Result<StepOutcome, AgentError> {
        exec.execute(index, &step(value), state, "42", "main").await
    }

    fn search(query: &str) -> serde_json::Value {
        json!({"type": "search_by_query", "args": {"query": query}})
    }

    fn context(project_id: &str) -> serde_json::Value {
        json!({"type": "get_global_context", "args": {"project_id": project_id}})
    }

    fn invoke_llm() -> serde_json::Value {
        json!({"type": "invoke_llm", "args": {"system_prompt": "S", "user_prompt": "U"}})
    }

    #[tokio::test]
    async fn test_search_appends_results_in_order() {
        let exec = executor(Arc::new(ScriptedLlmClient::default()));
        let mut state = AgentState::new("q", Plan::default());
        apply(&exec, 0, search("auth"), &mut state).await.unwrap();
        apply(&exec, 1, search("billing"), &mut state).await.unwrap();
        assert_eq!(state.search_results.len(), 2);
        assert_eq!(state.search_results[0].tasks.len(), 2);
        assert_eq!(
            state.search_results[1].tasks,
            vec!["billing: task-3".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_search_is_not_a_failure() {
        let exec = executor(Arc::new(ScriptedLlmClient::default()));
        let mut state = AgentState::new("q", Plan::default());
        apply(&exec, 0, search("nothing"), &mut state).await.unwrap();
        assert_eq!(state.search_results, vec![SearchResult::default()]);
    }

    #[tokio::test]
    async fn test_global_context_last_write_wins() {
        let exec = executor(Arc::new(ScriptedLlmClient::default()));
        let mut state = AgentState::new("q", Plan::default());
        for (i, id) in ["42", "43"].into_iter().enumerate() {
            apply(&exec, i, context(id), &mut state).await.unwrap();
        }
        let ctx = state.global_context.unwrap();
        assert_eq!(ctx.project_id, "43");
        assert_eq!(ctx.data, json!({"owner": "bob"}));
    }

    #[tokio::test]
    async fn test_combine_is_idempotent() {
        let exec = executor(Arc::new(ScriptedLlmClient::default()));
        let mut state = AgentState::new("q", Plan::default());
        let combine = json!({"type": "combine", "args": {}});
        apply(&exec, 0, search("auth"), &mut state).await.unwrap();
        apply(&exec, 1, context("42"), &mut state).await.unwrap();
        apply(&exec, 2, combine.clone(), &mut state).await.unwrap();
        let first = state.combined_context.clone();
        apply(&exec, 3, combine, &mut state).await.unwrap();
        assert_eq!(state.combined_context, first);

        let task_pos = first.find("task-2 desc").unwrap();
        let ctx_pos = first.find("GlobalContext").unwrap();
        assert!(task_pos < ctx_pos);
    }

    #[tokio::test]
    async fn test_combine_without_context_renders_null_block() {
        let exec = PlanExecutor::new(executor(Arc::new(ScriptedLlmClient::default())));
        let plan = plan(json!([
            {"type": "search_by_query", "args": {"query": "billing"}},
            {"type": "combine", "args": {}}
        ]));
        let state = exec.run(&plan, "q", "42", "main").await.unwrap();
        assert!(state.global_context.is_none());
        assert_eq!(
            state.combined_context,
            "<h3>Combined Context</h3><br>Result 1:<br>- billing: task-3<br><br>GlobalContext null"
        );
    }

    #[tokio::test]
    async fn test_invoke_llm_builds_final_prompt_and_normalizes() {
        let llm = Arc::new(ScriptedLlmClient::with_replies(["line one\nline two"]));
        let exec = executor(llm.clone());
        let mut state = AgentState::new("q", Plan::default());
        state.combined_context = "CTX".to_string();
        apply(&exec, 0, invoke_llm(), &mut state).await.unwrap();
        assert_eq!(state.final_answer, "line one<br>line two");

        let sent = &llm.received()[0];
        assert_eq!(sent[0].role, Role::System);
        assert_eq!(sent[0].content, "S");
        assert_eq!(sent[1].content, "S<br><br>CTX<br><br>U");
    }

    #[tokio::test]
    async fn test_unknown_kind_is_skipped_and_recorded() {
        let exec = executor(Arc::new(ScriptedLlmClient::default()));
        let mut state = AgentState::new("q", Plan::default());
        let unknown = json!({"type": "reticulate", "args": {"x": 1}});
        let outcome = apply(&exec, 4, unknown, &mut state).await.unwrap();
        assert_eq!(outcome, StepOutcome::Skipped);
        assert_eq!(
            state.skipped_steps,
            vec![SkippedStep {
                index: 4,
                kind: "reticulate".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_malformed_arguments_are_distinct() {
        let exec = executor(Arc::new(ScriptedLlmClient::default()));
        let mut state = AgentState::new("q", Plan::default());
        let cases = [
            json!({"type": "search_by_query", "args": {}}),
            json!({"type": "search_by_query", "args": {"query": 7}}),
            json!({"type": "get_global_context", "args": {"project_id": null}}),
            json!({"type": "invoke_llm", "args": {"system_prompt": "S"}}),
        ];
        for (i, case) in cases.into_iter().enumerate() {
            let err = apply(&exec, i, case, &mut state).await.unwrap_err();
            assert!(matches!(err, AgentError::MalformedStepArguments { index, .. } if index == i));
            assert_eq!(err.kind(), ErrorKind::MalformedStepArguments);
        }
    }

    #[tokio::test]
    async fn test_collaborator_failures() {
        let llm = Arc::new(ScriptedLlmClient::new([Err(LlmError::Api("quota".into()))]));
        let exec = StepExecutor::new(llm, Arc::new(FailingSearch), Arc::new(FailingContext));
        let mut state = AgentState::new("q", Plan::default());

        let err = apply(&exec, 0, search("a"), &mut state).await.unwrap_err();
        assert!(matches!(err, AgentError::Search(_)));

        let err = apply(&exec, 1, context("42"), &mut state).await.unwrap_err();
        assert!(matches!(err, AgentError::Context(_)));

        let err = apply(&exec, 2, invoke_llm(), &mut state).await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(LlmError::Api(_))));
        assert_eq!(err.kind(), ErrorKind::Collaborator);
    }

    #[tokio::test]
    async fn test_run_continues_past_unknown_steps() {
        let llm = Arc::new(ScriptedLlmClient::with_replies(["answer"]));
        let exec = PlanExecutor::new(executor(llm));
        let plan = plan(json!([
            {"type": "", "args": {}},
            {"type": "search_by_query", "args": {"query": "auth"}},
            {"type": "mystery", "args": {}},
            {"type": "combine", "args": {}},
            {"type": "invoke_llm", "args": {"system_prompt": "S", "user_prompt": "U"}}
        ]));
        let state = exec.run(&plan, "how?", "42", "main").await.unwrap();
        assert_eq!(state.original_query, "how?");
        assert_eq!(state.plan, plan);
        assert_eq!(state.final_answer, "answer");
        assert_eq!(state.skipped_steps.len(), 2);
    }

    #[tokio::test]
    async fn test_run_aborts_on_first_failure() {
        let llm = Arc::new(ScriptedLlmClient::with_replies(["never used"]));
        let exec = PlanExecutor::new(StepExecutor::new(
            llm.clone(),
            Arc::new(FailingSearch),
            Arc::new(InMemoryContextStore::new()),
        ));
        let plan = plan(json!([
            {"type": "search_by_query", "args": {"query": "auth"}},
            {"type": "invoke_llm", "args": {"system_prompt": "S", "user_prompt": "U"}}
        ]));
        let err = exec.run(&plan, "q", "42", "main").await.unwrap_err();
        assert!(matches!(err, AgentError::Search(_)));
        assert_eq!(llm.calls(), 0);
    }
}
