//! Mock / Scripted LLM 客户端（用于离线运行与测试，无需 API）
//!
//! - MockLlmClient：遇到规划请求返回一个固定的可执行计划，其它请求回显为答案，便于本地跑通整条流水线。
//! - ScriptedLlmClient：按顺序返回预设回复，并记录调用次数与收到的消息。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, Message, Role};
use crate::plan::prompt::PLAN_RESPONSE_INSTRUCTION;

const MOCK_PLAN: &str = r#"[
    {"type": "search_by_query", "args": {"query": "project overview"}},
    {"type": "combine", "args": {}},
    {"type": "invoke_llm", "args": {"system_prompt": "You are a project assistant.", "user_prompt": "Summarize the project."}}
]"#;

fn last_user(messages: &[Message]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| matches!(m.role, Role::User))
        .map(|m| m.content.as_str())
        .unwrap_or("(no input)")
}

/// Mock 客户端：规划请求返回固定计划，否则回显最后一条 user 消息
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let input = last_user(messages);
        if input.contains(PLAN_RESPONSE_INSTRUCTION) {
            return Ok(MOCK_PLAN.to_string());
        }
        let preview: String = input.chars().take(200).collect();
        Ok(format!("Mock answer for: {}", preview))
    }
}

/// 脚本化客户端：每次调用弹出一条预设结果；脚本耗尽后返回 Api 错误
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: AtomicUsize,
    received: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new(replies: impl IntoIterator<Item = Result<String, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    /// 只包含成功回复的脚本
    pub fn with_replies<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self::new(replies.into_iter().map(|r| Ok(r.into())))
    }

    /// 已发生的调用次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 每次调用收到的完整消息列表
    pub fn received(&self) -> Vec<Vec<Message>> {
        self.received
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut received) = self.received.lock() {
            received.push(messages.to_vec());
        }
        let next = self
            .replies
            .lock()
            .map_err(|e| LlmError::Api(format!("script lock poisoned: {e}")))?
            .pop_front();
        next.unwrap_or_else(|| Err(LlmError::Api("script exhausted".to_string())))
    }
}
