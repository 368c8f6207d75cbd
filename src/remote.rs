//! HTTP 协作方公共部分
//!
//! 向量检索、上下文存储、Token 服务的 HTTP 适配器共用同一种 reqwest Client：带超时、User-Agent 与 JSON Accept 头。
//! 带 project_id 的地址按路径段拼接，project_id 永远只占一个经过转义的段。

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Url};

const USER_AGENT: &str = concat!("scout/", env!("CARGO_PKG_VERSION"));

/// 创建带超时的 HTTP 客户端；构建失败时退回默认 Client（无超时与默认头）
pub fn build_client(timeout_secs: u64) -> Client {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(
                error = %e,
                timeout_secs,
                "failed to build HTTP client, falling back to defaults"
            );
            Client::new()
        })
}

/// `{endpoint}/projects/{project_id}/{resource}`
///
/// `.` 与 `..` 会被 Url 静默丢弃，因此作为 project_id 时直接拒绝。
pub fn project_url(endpoint: &str, project_id: &str, resource: &str) -> Result<Url, String> {
    if matches!(project_id, "" | "." | "..") {
        return Err(format!("invalid project id '{}'", project_id));
    }
    let mut url =
        Url::parse(endpoint).map_err(|e| format!("invalid endpoint '{}': {}", endpoint, e))?;
    url.path_segments_mut()
        .map_err(|_| format!("endpoint '{}' cannot carry a path", endpoint))?
        .pop_if_empty()
        .extend(["projects", project_id, resource]);
    Ok(url)
}
