//! 向量检索协作方
//!
//! VectorSearch::query(query, project_id, branch) 返回按相似度排序的文本片段；空结果合法。
//! HttpVectorSearch 调用外部检索服务；InMemoryVectorSearch 用于离线运行与测试。

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::remote::build_client;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Search failed: {0}")]
pub struct SearchError(pub String);

/// 向量检索 trait
#[async_trait]
pub trait VectorSearch: Send + Sync {
    async fn query(
        &self,
        query: &str,
        project_id: &str,
        branch: &str,
    ) -> Result<Vec<String>, SearchError>;
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    project_id: &'a str,
    branch: &'a str,
    top_k: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    snippets: Vec<String>,
}

/// HTTP 检索：POST {endpoint} JSON {query, project_id, branch, top_k} -> {"snippets": [...]}
pub struct HttpVectorSearch {
    client: Client,
    endpoint: String,
    top_k: usize,
}

impl HttpVectorSearch {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64, top_k: usize) -> Self {
        Self {
            client: build_client(timeout_secs),
            endpoint: endpoint.into(),
            top_k,
        }
    }
}

#[async_trait]
impl VectorSearch for HttpVectorSearch {
    async fn query(
        &self,
        query: &str,
        project_id: &str,
        branch: &str,
    ) -> Result<Vec<String>, SearchError> {
        tracing::debug!(endpoint = %self.endpoint, project_id, branch, "vector search");
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&SearchRequest {
                query,
                project_id,
                branch,
                top_k: self.top_k,
            })
            .send()
            .await
            .map_err(|e| SearchError(format!("Request failed: {}", e)))?;
        if !resp.status().is_success() {
            return Err(SearchError(format!("HTTP {}", resp.status())));
        }
        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| SearchError(format!("Read body: {}", e)))?;
        Ok(body.snippets)
    }
}

/// 内存检索：按 (project_id, branch) 存放片段，查询词任一命中（忽略大小写）即返回，最多 top_k 条
#[derive(Debug, Default)]
pub struct InMemoryVectorSearch {
    documents: HashMap<(String, String), Vec<String>>,
    top_k: usize,
}

impl InMemoryVectorSearch {
    pub fn new(top_k: usize) -> Self {
        Self {
            documents: HashMap::new(),
            top_k,
        }
    }

    pub fn insert(
        &mut self,
        project_id: impl Into<String>,
        branch: impl Into<String>,
        snippet: impl Into<String>,
    ) {
        self.documents
            .entry((project_id.into(), branch.into()))
            .or_default()
            .push(snippet.into());
    }

    pub fn with_snippets<S: Into<String>>(
        mut self,
        project_id: &str,
        branch: &str,
        snippets: impl IntoIterator<Item = S>,
    ) -> Self {
        for s in snippets {
            self.insert(project_id, branch, s);
        }
        self
    }
}

#[async_trait]
impl VectorSearch for InMemoryVectorSearch {
    async fn query(
        &self,
        query: &str,
        project_id: &str,
        branch: &str,
    ) -> Result<Vec<String>, SearchError> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        let Some(docs) = self
            .documents
            .get(&(project_id.to_string(), branch.to_string()))
        else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|doc| {
                let lower = doc.to_lowercase();
                terms.iter().any(|t| lower.contains(t.as_str()))
            })
            .take(self.top_k)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_matches_terms_case_insensitive() {
        let search = InMemoryVectorSearch::new(10).with_snippets(
            "42",
            "main",
            ["Auth flow uses OAuth", "Billing page layout", "token refresh in AUTH module"],
        );
        let hits = search.query("auth", "42", "main").await.unwrap();
        assert_eq!(
            hits,
            vec!["Auth flow uses OAuth".to_string(), "token refresh in AUTH module".to_string()]
        );
    }

    #[tokio::test]
    async fn test_in_memory_scoped_by_branch_and_limited() {
        let search = InMemoryVectorSearch::new(1)
            .with_snippets("42", "main", ["a task", "another task"])
            .with_snippets("42", "dev", ["dev task"]);
        assert_eq!(search.query("task", "42", "main").await.unwrap().len(), 1);
        assert!(search.query("task", "42", "feature").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_http_search_unreachable_endpoint_fails() {
        let search = HttpVectorSearch::new("http://127.0.0.1:1/search", 1, 5);
        assert!(search.query("q", "42", "main").await.is_err());
    }
}
