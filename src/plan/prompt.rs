//! 提示词与文本拼装
//!
//! 输出沿用 HTML 换行约定（`<br>`）：规划提示、合并上下文、最终提示与答案都按此拼接。

use crate::context::GlobalContext;
use crate::plan::SearchResult;

pub const LINE_BREAK: &str = "<br>";
/// 合并上下文中各块之间、最终提示中各段之间的分隔符
pub const SECTION_SEPARATOR: &str = "<br><br>";
pub const COMBINED_HEADING: &str = "<h3>Combined Context</h3><br>";

pub const DEFAULT_PLANNER_SYSTEM_PROMPT: &str =
    "You are a strategic planning assistant for GitHub project summaries.";

/// 规划提示中要求返回格式的那句话；MockLlmClient 以此识别规划请求
pub const PLAN_RESPONSE_INSTRUCTION: &str = "Respond with a JSON array of steps.";

/// 规划提示：列出四种步骤并给出示例计划
pub fn planning_prompt(query: &str, project_id: &str, branch: &str) -> String {
    format!(
        r#"You are a strategic planning assistant for GitHub project analysis. The user from repository {project_id} (branch: {branch}) has asked:<br>
{query}<br><br>

Use these available steps:<br>
- search_by_query: to search for relevant tasks using vector similarity<br>
- get_global_context: to get summaries of tasks in the project<br>
- combine: to aggregate information from multiple tasks<br>
- invoke_llm: to generate the final response<br><br>

{PLAN_RESPONSE_INSTRUCTION} Example:<br>
[
    {{"type": "search_by_query", "args": {{"query": "UI design requirements"}}}},
    {{"type": "get_global_context", "args": {{"project_id": "{project_id}"}}}},
    {{"type": "combine", "args": {{}}}},
    {{"type": "invoke_llm", "args": {{"system_prompt": "...", "user_prompt": "..."}}}}
]"#
    )
}

/// 单个检索结果块：`Result n:` 后逐行列出片段
pub fn render_search_result(number: usize, result: &SearchResult) -> String {
    let mut block = format!("Result {}:", number);
    if result.tasks.is_empty() {
        block.push_str(LINE_BREAK);
        block.push_str("(no matches)");
    }
    for task in &result.tasks {
        block.push_str(LINE_BREAK);
        block.push_str("- ");
        block.push_str(task);
    }
    block
}

/// 合并上下文：标题 + 按追加顺序的检索块 + 全局上下文块（JSON）；未获取全局上下文时为 `GlobalContext null`
pub fn render_combined_context(
    results: &[SearchResult],
    global_context: Option<&GlobalContext>,
) -> Result<String, serde_json::Error> {
    let mut blocks: Vec<String> = results
        .iter()
        .enumerate()
        .map(|(i, r)| render_search_result(i + 1, r))
        .collect();
    blocks.push(format!(
        "GlobalContext {}",
        serde_json::to_string(&global_context)?
    ));
    Ok(format!("{}{}", COMBINED_HEADING, blocks.join(SECTION_SEPARATOR)))
}

/// 最终提示：system + 分隔符 + 合并上下文 + 分隔符 + user
pub fn final_prompt(system_prompt: &str, combined_context: &str, user_prompt: &str) -> String {
    format!(
        "{}{}{}{}{}",
        system_prompt, SECTION_SEPARATOR, combined_context, SECTION_SEPARATOR, user_prompt
    )
}

/// 把答案中的换行统一为 `<br>`
pub fn normalize_line_breaks(text: &str) -> String {
    text.replace("\r\n", LINE_BREAK).replace('\n', LINE_BREAK)
}
