//! Scout - 基于计划的项目问答智能体
//!
//! 模块划分：
//! - **auth**: Token 服务协作方（回答前的授权检查）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **context**: 项目全局上下文存储协作方
//! - **core**: 错误分类、重试策略、重试编排器与构建器
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock / Scripted）
//! - **observability**: 日志初始化
//! - **plan**: 步骤模型、AgentState、Planner、StepExecutor / PlanExecutor
//! - **search**: 向量检索协作方

pub mod auth;
pub mod config;
pub mod context;
pub mod core;
pub mod llm;
pub mod observability;
pub mod plan;
pub mod remote;
pub mod search;

pub use crate::core::{AgentError, OrchestratorBuilder, RetryingOrchestrator};
