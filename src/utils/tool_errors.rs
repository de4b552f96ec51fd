use crate::errors::ToolError;
use crate::utils::suggest::suggest;

pub fn unknown_tool_error<S: AsRef<str>>(tool: &str, known_tools: &[S]) -> ToolError {
    let known: Vec<String> = known_tools.iter().map(|t| t.as_ref().to_string()).collect();
    let suggestions = suggest(tool, &known, 5);
    let hint = if suggestions.is_empty() {
        "Call tools/list to see the available tools".to_string()
    } else {
        format!("Did you mean: {}?", suggestions.join(", "))
    };
    ToolError::not_found(format!("Unknown tool: {}", tool))
        .with_hint(hint)
        .with_details(serde_json::json!({ "did_you_mean": suggestions }))
}
