use serde::{Deserialize, Serialize};

/// How the model should select among the available tools.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ToolChoice {
    /// The model decides whether to call a tool.
    #[default]
    Auto,
    /// The model must not call any tool.
    None,
    /// The model must call some tool.
    Required,
    /// The model must call the named tool.
    Tool {
        /// Name of the required tool.
        name: String,
    },
}

impl ToolChoice {
    /// Requires the named tool.
    pub fn tool(name: impl Into<String>) -> Self {
        Self::Tool { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_auto() {
        assert_eq!(ToolChoice::default(), ToolChoice::Auto);
    }

    #[test]
    fn test_specific_tool() {
        let choice = ToolChoice::tool("get_weather");
        assert_eq!(
            choice,
            ToolChoice::Tool {
                name: "get_weather".to_string()
            }
        );
    }
}
