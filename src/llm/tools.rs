use crate::errors::{SentinelError, SentinelResult};
use crate::llm::types::ToolDef;

/// Loads the UI automation tool declarations from prompts/tools/builtin.json.
/// The JSON is embedded at compile time via include_str!.
pub fn load_builtin_tools() -> SentinelResult<Vec<ToolDef>> {
    let json = include_str!("../../prompts/tools/builtin.json");
    serde_json::from_str(json)
        .map_err(|e| SentinelError::Config(format!("Failed to parse builtin tools: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_declarations_cover_the_tool_surface() {
        let tools = load_builtin_tools().unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec![
                "query_ui",
                "click",
                "type_text",
                "scroll",
                "wait_seconds",
                "wait_for_element",
                "check_element_state",
                "screenshot",
                "start_test",
                "finish_test",
            ]
        );
        assert!(tools.iter().all(|t| t.def_type == "function"));
    }
}
