//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock / Scripted）实现 LlmClient::complete；
//! invoke 把「user prompt + system prompt」拼成消息列表，是执行器与 Planner 唯一的调用入口。

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::Message;

/// LLM 调用失败：传输层不可用 / 模型或 API 返回错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("LLM unavailable: {0}")]
    Unavailable(String),

    #[error("LLM API error: {0}")]
    Api(String),
}

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成，返回完整文本
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;
}

/// 以 (user_prompt, system_prompt) 调用 LLM；system 在前，user 在后
pub async fn invoke(
    llm: &dyn LlmClient,
    user_prompt: &str,
    system_prompt: &str,
) -> Result<String, LlmError> {
    let messages = [Message::system(system_prompt), Message::user(user_prompt)];
    llm.complete(&messages).await
}
