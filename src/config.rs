//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SCOUT__*` 覆盖（双下划线表示嵌套，如 `SCOUT__RETRY__MAX_ATTEMPTS=5`）。

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::core::RetryPolicy;
use crate::plan::prompt::DEFAULT_PLANNER_SYSTEM_PROMPT;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub planner: PlannerSection,
    pub retry: RetrySection,
    pub search: SearchSection,
    pub context: ContextSection,
    pub auth: AuthSection,
}

/// [llm] 段：后端选择
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai / mock；openai 但没有 OPENAI_API_KEY 时退回 mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

/// [planner] 段：规划时发给 LLM 的角色描述
#[derive(Debug, Clone, Deserialize)]
pub struct PlannerSection {
    #[serde(default = "default_planner_prompt")]
    pub system_prompt: String,
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            system_prompt: default_planner_prompt(),
        }
    }
}

fn default_planner_prompt() -> String {
    DEFAULT_PLANNER_SYSTEM_PROMPT.to_string()
}

/// [retry] 段：规划与执行各自的最大尝试次数与线性退避基数
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetrySection {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

/// [search] 段：未设置 endpoint 时使用内存检索
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSection {
    pub endpoint: Option<String>,
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_remote_timeout_secs(),
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    10
}

fn default_remote_timeout_secs() -> u64 {
    15
}

/// [context] 段：未设置 endpoint 时使用内存上下文存储
#[derive(Debug, Clone, Deserialize)]
pub struct ContextSection {
    pub endpoint: Option<String>,
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ContextSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_remote_timeout_secs(),
        }
    }
}

/// [auth] 段：有 endpoint 时查询 Token 服务，否则使用 tokens 表（project_id -> RFC3339 过期时间）
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSection {
    pub endpoint: Option<String>,
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub tokens: HashMap<String, String>,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_remote_timeout_secs(),
            tokens: HashMap::new(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 SCOUT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SCOUT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SCOUT")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
