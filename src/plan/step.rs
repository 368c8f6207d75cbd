//! 计划与步骤
//!
//! 计划的线上格式是 LLM 生成的 JSON 数组：`[{"type": "search_by_query", "args": {...}}, ...]`。
//! type 解析为封闭的 StepKind（未知值保留原文），args 保持为 JSON 对象，
//! 由执行器在各自分支里转换为强类型参数（SearchArgs / ContextArgs / InvokeArgs）。

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// 步骤类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepKind {
    SearchByQuery,
    GetGlobalContext,
    Combine,
    InvokeLlm,
    /// 未识别的类型（含空字符串），执行时跳过
    Unknown(String),
}

impl StepKind {
    pub fn as_str(&self) -> &str {
        match self {
            StepKind::SearchByQuery => "search_by_query",
            StepKind::GetGlobalContext => "get_global_context",
            StepKind::Combine => "combine",
            StepKind::InvokeLlm => "invoke_llm",
            StepKind::Unknown(raw) => raw,
        }
    }
}

impl Default for StepKind {
    fn default() -> Self {
        StepKind::Unknown(String::new())
    }
}

impl From<String> for StepKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "search_by_query" => StepKind::SearchByQuery,
            "get_global_context" => StepKind::GetGlobalContext,
            "combine" => StepKind::Combine,
            "invoke_llm" => StepKind::InvokeLlm,
            _ => StepKind::Unknown(value),
        }
    }
}

impl From<&str> for StepKind {
    fn from(value: &str) -> Self {
        StepKind::from(value.to_string())
    }
}

impl From<StepKind> for String {
    fn from(value: StepKind) -> Self {
        match value {
            StepKind::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 计划中的单个步骤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(rename = "type", default)]
    pub kind: StepKind,
    /// 缺失或为 null 时视为空对象
    #[serde(default, deserialize_with = "null_as_empty_args")]
    pub args: Map<String, Value>,
}

fn null_as_empty_args<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Step {
    pub fn new(kind: impl Into<StepKind>, args: Map<String, Value>) -> Self {
        Self {
            kind: kind.into(),
            args,
        }
    }

    /// 把 args 转成强类型参数；多余字段忽略
    pub fn parse_args<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.args.clone()))
    }
}

/// search_by_query 参数
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchArgs {
    pub query: String,
}

/// get_global_context 参数
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContextArgs {
    pub project_id: String,
}

/// invoke_llm 参数
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InvokeArgs {
    pub system_prompt: String,
    pub user_prompt: String,
}

/// 有序步骤序列；由 Planner 整体生成，之后不再修改
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan(Vec<Step>);

impl Plan {
    pub fn new(steps: Vec<Step>) -> Self {
        Self(steps)
    }

    /// 严格解析：必须是步骤对象组成的 JSON 数组
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 各步骤类型，用于日志
    pub fn kinds(&self) -> Vec<&str> {
        self.0.iter().map(|s| s.kind.as_str()).collect()
    }
}

impl From<Vec<Step>> for Plan {
    fn from(steps: Vec<Step>) -> Self {
        Self(steps)
    }
}
