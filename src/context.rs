//! 项目上下文存储协作方
//!
//! ContextStore::fetch(project_id) 返回项目级全局上下文（project_id + 任意 JSON 负载）。

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::remote::{build_client, project_url};

/// 项目全局上下文；data 对核心是不透明的
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalContext {
    pub project_id: String,
    #[serde(default)]
    pub data: Value,
}

impl GlobalContext {
    pub fn new(project_id: impl Into<String>, data: Value) -> Self {
        Self {
            project_id: project_id.into(),
            data,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("Context unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ContextStore: Send + Sync {
    async fn fetch(&self, project_id: &str) -> Result<GlobalContext, ContextError>;
}

/// HTTP 上下文存储：GET {endpoint}/projects/{id}/context
pub struct HttpContextStore {
    client: Client,
    endpoint: String,
}

impl HttpContextStore {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: build_client(timeout_secs),
            endpoint: endpoint.into(),
        }
    }

    fn url(&self, project_id: &str) -> Result<Url, ContextError> {
        project_url(&self.endpoint, project_id, "context").map_err(ContextError::Unavailable)
    }
}

#[async_trait]
impl ContextStore for HttpContextStore {
    async fn fetch(&self, project_id: &str) -> Result<GlobalContext, ContextError> {
        let url = self.url(project_id)?;
        tracing::debug!(url = %url, "fetch global context");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ContextError::Unavailable(format!("Request failed: {}", e)))?;
        if !resp.status().is_success() {
            return Err(ContextError::Unavailable(format!("HTTP {}", resp.status())));
        }
        resp.json()
            .await
            .map_err(|e| ContextError::Unavailable(format!("Read body: {}", e)))
    }
}

/// 内存上下文存储；未登记的项目返回 data 为 null 的上下文
#[derive(Debug, Default)]
pub struct InMemoryContextStore {
    contexts: HashMap<String, Value>,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, project_id: impl Into<String>, data: Value) -> Self {
        self.contexts.insert(project_id.into(), data);
        self
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn fetch(&self, project_id: &str) -> Result<GlobalContext, ContextError> {
        let data = self.contexts.get(project_id).cloned().unwrap_or(Value::Null);
        Ok(GlobalContext::new(project_id, data))
    }
}
