//! 编排器构建器：按配置装配协作方，并允许注入替换实现
//!
//! 有 endpoint 的协作方使用 HTTP 适配器，否则使用内存实现；LLM 按 provider 与 API Key 选择 OpenAI 兼容客户端或 Mock。

use std::sync::Arc;

use crate::auth::{HttpTokenService, InMemoryTokenService, TokenService};
use crate::config::AppConfig;
use crate::context::{ContextStore, HttpContextStore, InMemoryContextStore};
use crate::core::RetryingOrchestrator;
use crate::llm::{LlmClient, MockLlmClient, OpenAiClient};
use crate::plan::{PlanExecutor, Planner, StepExecutor};
use crate::search::{HttpVectorSearch, InMemoryVectorSearch, VectorSearch};

/// 根据配置与环境变量选择 LLM 后端（OpenAI 兼容 / Mock）
pub(crate) fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let api_key = std::env::var("OPENAI_API_KEY").ok();

    match (provider.as_str(), api_key) {
        ("openai", Some(key)) => {
            tracing::info!("Using OpenAI-compatible LLM ({})", cfg.llm.model);
            Arc::new(OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                Some(key.as_str()),
            ))
        }
        ("mock", _) => {
            tracing::info!("Using Mock LLM");
            Arc::new(MockLlmClient)
        }
        _ => {
            tracing::warn!("No API key set or provider unknown, using Mock LLM");
            Arc::new(MockLlmClient)
        }
    }
}

fn create_search_from_config(cfg: &AppConfig) -> Arc<dyn VectorSearch> {
    match &cfg.search.endpoint {
        Some(endpoint) => Arc::new(HttpVectorSearch::new(
            endpoint.clone(),
            cfg.search.timeout_secs,
            cfg.search.top_k,
        )),
        None => {
            tracing::warn!("No search endpoint configured, using empty in-memory index");
            Arc::new(InMemoryVectorSearch::new(cfg.search.top_k))
        }
    }
}

fn create_context_store_from_config(cfg: &AppConfig) -> Arc<dyn ContextStore> {
    match &cfg.context.endpoint {
        Some(endpoint) => Arc::new(HttpContextStore::new(
            endpoint.clone(),
            cfg.context.timeout_secs,
        )),
        None => Arc::new(InMemoryContextStore::new()),
    }
}

fn create_token_service_from_config(cfg: &AppConfig) -> Arc<dyn TokenService> {
    match &cfg.auth.endpoint {
        Some(endpoint) => Arc::new(HttpTokenService::new(endpoint.clone(), cfg.auth.timeout_secs)),
        None => Arc::new(InMemoryTokenService::from_expiry_map(&cfg.auth.tokens)),
    }
}

/// 编排器构建器
pub struct OrchestratorBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    search: Option<Arc<dyn VectorSearch>>,
    context_store: Option<Arc<dyn ContextStore>>,
    tokens: Option<Arc<dyn TokenService>>,
}

impl OrchestratorBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            search: None,
            context_store: None,
            tokens: None,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_search(mut self, search: Arc<dyn VectorSearch>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_context_store(mut self, store: Arc<dyn ContextStore>) -> Self {
        self.context_store = Some(store);
        self
    }

    pub fn with_token_service(mut self, tokens: Arc<dyn TokenService>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn build(self) -> RetryingOrchestrator {
        let cfg = &self.config;
        let llm = self.llm.unwrap_or_else(|| create_llm_from_config(cfg));
        let search = self.search.unwrap_or_else(|| create_search_from_config(cfg));
        let context_store = self
            .context_store
            .unwrap_or_else(|| create_context_store_from_config(cfg));
        let tokens = self
            .tokens
            .unwrap_or_else(|| create_token_service_from_config(cfg));

        RetryingOrchestrator::new(
            tokens,
            Planner::new(llm.clone(), cfg.planner.system_prompt.clone()),
            PlanExecutor::new(StepExecutor::new(llm, search, context_store)),
            cfg.retry.policy(),
        )
    }
}
