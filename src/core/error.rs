//! Agent 错误类型
//!
//! 每个错误都能归入一个 ErrorKind（授权 / 规划 / 步骤参数 / 协作方 / 配置），
//! 重试耗尽时包装为 RetriesExhausted，保留阶段名、尝试次数与最后一次失败（可通过 source() 或 last_error() 取得）。

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::auth::TokenError;
use crate::context::ContextError;
use crate::llm::LlmError;
use crate::search::SearchError;

/// 被重试的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Planning,
    Execution,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Planning => f.write_str("planning"),
            Phase::Execution => f.write_str("execution"),
        }
    }
}

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Token 不存在 / 过期 / 查询失败，不重试
    Authorization,
    /// 生成计划失败（LLM 失败或计划 JSON 无法解析）
    Planning,
    /// 步骤参数缺失或类型错误
    MalformedStepArguments,
    /// 执行步骤时检索 / 上下文 / LLM 调用失败
    Collaborator,
    Config,
}

/// 某阶段重试耗尽：source() 直接给出最后一次失败的 AgentError
#[derive(Debug)]
pub struct RetriesExhaustedError {
    pub phase: Phase,
    pub attempts: u32,
    pub last: Box<AgentError>,
}

impl fmt::Display for RetriesExhaustedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Plan {} failed after {} attempts: {}",
            self.phase, self.attempts, self.last
        )
    }
}

impl StdError for RetriesExhaustedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.last.as_ref())
    }
}

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error(transparent)]
    TokenLookup(#[from] TokenError),

    #[error("Failed to generate plan: {0}")]
    PlanGeneration(#[source] LlmError),

    #[error("Failed to parse plan JSON: {0}")]
    PlanParse(String),

    #[error("Malformed arguments for step {index} ({kind}): {reason}")]
    MalformedStepArguments {
        index: usize,
        kind: String,
        reason: String,
    },

    #[error("Search step failed: {0}")]
    Search(#[from] SearchError),

    #[error("Global context step failed: {0}")]
    Context(#[from] ContextError),

    #[error("LLM invocation failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Failed to serialize global context: {0}")]
    ContextSerialization(String),

    #[error(transparent)]
    RetriesExhausted(#[from] RetriesExhaustedError),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl AgentError {
    /// 错误分类；RetriesExhausted 返回被包装错误的分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            AgentError::Authorization(_) | AgentError::TokenLookup(_) => ErrorKind::Authorization,
            AgentError::PlanGeneration(_) | AgentError::PlanParse(_) => ErrorKind::Planning,
            AgentError::MalformedStepArguments { .. } => ErrorKind::MalformedStepArguments,
            AgentError::Search(_)
            | AgentError::Context(_)
            | AgentError::Llm(_)
            | AgentError::ContextSerialization(_) => ErrorKind::Collaborator,
            AgentError::RetriesExhausted(e) => e.last.kind(),
            AgentError::ConfigError(_) => ErrorKind::Config,
        }
    }

    /// 重试耗尽时的尝试次数
    pub fn attempts(&self) -> Option<u32> {
        match self {
            AgentError::RetriesExhausted(e) => Some(e.attempts),
            _ => None,
        }
    }

    /// 重试耗尽时所在阶段
    pub fn phase(&self) -> Option<Phase> {
        match self {
            AgentError::RetriesExhausted(e) => Some(e.phase),
            _ => None,
        }
    }

    /// 重试耗尽时最后一次失败
    pub fn last_error(&self) -> Option<&AgentError> {
        match self {
            AgentError::RetriesExhausted(e) => Some(e.last.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            AgentError::Authorization("expired".into()).kind(),
            ErrorKind::Authorization
        );
        assert_eq!(
            AgentError::TokenLookup(TokenError::Lookup("x".into())).kind(),
            ErrorKind::Authorization
        );
        assert_eq!(AgentError::PlanParse("x".into()).kind(), ErrorKind::Planning);
        assert_eq!(
            AgentError::PlanGeneration(LlmError::Unavailable("x".into())).kind(),
            ErrorKind::Planning
        );
        assert_eq!(
            AgentError::Search(SearchError("x".into())).kind(),
            ErrorKind::Collaborator
        );
        assert_eq!(
            AgentError::MalformedStepArguments {
                index: 0,
                kind: "combine".into(),
                reason: "x".into()
            }
            .kind(),
            ErrorKind::MalformedStepArguments
        );
    }

    #[test]
    fn test_retries_exhausted_wraps_source() {
        let err = AgentError::from(RetriesExhaustedError {
            phase: Phase::Execution,
            attempts: 3,
            last: Box::new(AgentError::Llm(LlmError::Api("boom".into()))),
        });
        assert_eq!(err.kind(), ErrorKind::Collaborator);
        assert_eq!(err.attempts(), Some(3));
        assert_eq!(err.phase(), Some(Phase::Execution));
        assert!(err.to_string().starts_with("Plan execution failed after 3 attempts"));
        let source = err.source().and_then(|s| s.downcast_ref::<AgentError>());
        assert!(matches!(source, Some(AgentError::Llm(LlmError::Api(_)))));
        assert!(matches!(err.last_error(), Some(AgentError::Llm(_))));
        assert!(AgentError::PlanParse("x".into()).last_error().is_none());
    }
}
