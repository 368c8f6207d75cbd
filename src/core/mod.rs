//! 核心编排层：错误分类、重试策略、重试编排器与构建器

pub mod builder;
pub mod error;
pub mod orchestrator;
pub mod retry;

pub use builder::OrchestratorBuilder;
pub use error::{AgentError, ErrorKind, Phase, RetriesExhaustedError};
pub use orchestrator::{RetryingOrchestrator, FALLBACK_ANSWER};
pub use retry::RetryPolicy;
