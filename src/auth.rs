//! Token 服务协作方
//!
//! 每次回答前查询一次项目 Token：不存在或已过期则拒绝，不进入规划/执行。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::remote::{build_client, project_url};

/// 项目 Token 信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub project_id: String,
    /// 服务端显式标记的过期状态
    #[serde(default)]
    pub is_expired: bool,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenInfo {
    pub fn new(project_id: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            project_id: project_id.into(),
            is_expired: false,
            expires_at,
        }
    }

    /// 显式过期，或 expires_at 不晚于 now
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.is_expired || self.expires_at.is_some_and(|t| t <= now)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token lookup failed: {0}")]
    Lookup(String),
}

/// Token 服务 trait；Ok(None) 表示项目没有 Token
#[async_trait]
pub trait TokenService: Send + Sync {
    async fn get_token(&self, project_id: &str) -> Result<Option<TokenInfo>, TokenError>;
}

/// HTTP Token 服务：GET {endpoint}/projects/{id}/token，404 视为不存在
pub struct HttpTokenService {
    client: Client,
    endpoint: String,
}

impl HttpTokenService {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: build_client(timeout_secs),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl TokenService for HttpTokenService {
    async fn get_token(&self, project_id: &str) -> Result<Option<TokenInfo>, TokenError> {
        let url = project_url(&self.endpoint, project_id, "token").map_err(TokenError::Lookup)?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TokenError::Lookup(format!("Request failed: {}", e)))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(TokenError::Lookup(format!("HTTP {}", resp.status())));
        }
        resp.json()
            .await
            .map(Some)
            .map_err(|e| TokenError::Lookup(format!("Read body: {}", e)))
    }
}

/// 内存 Token 服务（可由配置 [auth.tokens] 填充）
#[derive(Debug, Default)]
pub struct InMemoryTokenService {
    tokens: HashMap<String, TokenInfo>,
}

impl InMemoryTokenService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: TokenInfo) -> Self {
        self.tokens.insert(token.project_id.clone(), token);
        self
    }

    /// 从 project_id -> RFC3339 过期时间 映射构建；无法解析的时间视为已过期
    pub fn from_expiry_map(entries: &HashMap<String, String>) -> Self {
        let mut service = Self::new();
        for (project_id, expiry) in entries {
            let token = match DateTime::parse_from_rfc3339(expiry) {
                Ok(t) => TokenInfo::new(project_id.clone(), Some(t.with_timezone(&Utc))),
                Err(e) => {
                    tracing::warn!(
                        project_id = %project_id,
                        "invalid token expiry '{}': {}",
                        expiry,
                        e
                    );
                    TokenInfo {
                        is_expired: true,
                        ..TokenInfo::new(project_id.clone(), None)
                    }
                }
            };
            service = service.with_token(token);
        }
        service
    }
}

#[async_trait]
impl TokenService for InMemoryTokenService {
    async fn get_token(&self, project_id: &str) -> Result<Option<TokenInfo>, TokenError> {
        Ok(self.tokens.get(project_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiry_check() {
        let now = Utc::now();
        assert!(!TokenInfo::new("1", None).is_expired_at(now));
        assert!(!TokenInfo::new("1", Some(now + Duration::hours(1))).is_expired_at(now));
        assert!(TokenInfo::new("1", Some(now - Duration::seconds(1))).is_expired_at(now));
        let flagged = TokenInfo {
            is_expired: true,
            ..TokenInfo::new("1", None)
        };
        assert!(flagged.is_expired_at(now));
    }

    #[tokio::test]
    async fn test_from_expiry_map() {
        let mut entries = HashMap::new();
        entries.insert("42".to_string(), "2999-01-01T00:00:00Z".to_string());
        entries.insert("7".to_string(), "not a date".to_string());
        let service = InMemoryTokenService::from_expiry_map(&entries);

        let valid = service.get_token("42").await.unwrap().unwrap();
        assert!(!valid.is_expired_at(Utc::now()));
        let broken = service.get_token("7").await.unwrap().unwrap();
        assert!(broken.is_expired_at(Utc::now()));
        assert!(service.get_token("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_http_token_unreachable_is_lookup_error() {
        let service = HttpTokenService::new("http://127.0.0.1:1", 1);
        assert!(matches!(
            service.get_token("42").await,
            Err(TokenError::Lookup(_))
        ));
    }

    #[tokio::test]
    async fn test_http_token_rejects_dot_segment_project() {
        let service = HttpTokenService::new("http://tok.local/api", 1);
        assert!(matches!(
            service.get_token("..").await,
            Err(TokenError::Lookup(msg)) if msg.contains("invalid project id")
        ));
    }
}
