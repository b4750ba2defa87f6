//! Route Tool Definitions
//!
//! The three tools advertised through `tools/list`.

use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::ToolError;
use crate::protocol::{InputSchema, Tool};

/// Identity of a route tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    ListAllRoutes,
    SearchRoutes,
    GetRouteDetails,
}

impl ToolName {
    pub const ALL: [ToolName; 3] = [
        ToolName::ListAllRoutes,
        ToolName::SearchRoutes,
        ToolName::GetRouteDetails,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListAllRoutes => "list_all_routes",
            Self::SearchRoutes => "search_routes",
            Self::GetRouteDetails => "get_route_details",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

/// Create a tool definition with the given name, description, and schema properties
fn tool(name: ToolName, description: &str, properties: Value, required: Vec<&str>) -> Tool {
    let props = properties.as_object().cloned().unwrap_or_default();
    Tool {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: InputSchema {
            schema_type: "object".to_string(),
            properties: props,
            required: required.into_iter().map(|s| s.to_string()).collect(),
        },
    }
}

/// Get all route tools
pub fn all_tools() -> Vec<Tool> {
    vec![
        tool(
            ToolName::ListAllRoutes,
            "List all routes in the Rails application",
            json!({
                "format": {
                    "type": "string",
                    "enum": ["full", "simple"],
                    "description": "Output format - full includes HTTP verbs and controller actions",
                    "default": "full"
                }
            }),
            vec![],
        ),
        tool(
            ToolName::SearchRoutes,
            "Search routes by pattern",
            json!({
                "pattern": {
                    "type": "string",
                    "description": "Pattern to search for (e.g., \"user\", \"api/v2\")"
                },
                "controller": {
                    "type": "string",
                    "description": "Filter by controller name"
                }
            }),
            vec!["pattern"],
        ),
        tool(
            ToolName::GetRouteDetails,
            "Get detailed information about routes for a specific controller",
            json!({
                "controller": {
                    "type": "string",
                    "description": "Controller name (e.g., \"users\", \"api/v2/orders\")"
                }
            }),
            vec!["controller"],
        ),
    ]
}
