//! AgentState：单次查询执行的可变累加器
//!
//! 由 PlanExecutor::run 独占创建与修改，执行结束后交给编排器取 final_answer。

use serde::Serialize;

use crate::context::GlobalContext;
use crate::plan::Plan;

/// 一次 search_by_query 得到的片段
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub tasks: Vec<String>,
}

/// 被跳过的未知步骤（诊断记录）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedStep {
    pub index: usize,
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentState {
    pub original_query: String,
    pub plan: Plan,
    pub search_results: Vec<SearchResult>,
    /// 最多一份；再次 get_global_context 会覆盖
    pub global_context: Option<GlobalContext>,
    pub combined_context: String,
    pub final_answer: String,
    pub skipped_steps: Vec<SkippedStep>,
}

impl AgentState {
    pub fn new(original_query: impl Into<String>, plan: Plan) -> Self {
        Self {
            original_query: original_query.into(),
            plan,
            search_results: Vec::new(),
            global_context: None,
            combined_context: String::new(),
            final_answer: String::new(),
            skipped_steps: Vec::new(),
        }
    }
}
