//! 计划层：步骤模型、累加状态、提示词拼装、Planner 与执行器

pub mod executor;
pub mod planner;
pub mod prompt;
pub mod state;
pub mod step;

pub use executor::{PlanExecutor, StepExecutor, StepOutcome};
pub use planner::{parse_plan, Planner};
pub use state::{AgentState, SearchResult, SkippedStep};
pub use step::{ContextArgs, InvokeArgs, Plan, SearchArgs, Step, StepKind};
