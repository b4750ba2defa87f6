//! Command Builder
//!
//! Turns a validated tool call into the shell pipeline that produces its
//! output. The pipeline always starts with `<rails> routes`; caller supplied
//! filter text is quoted before it is spliced in, so it is only ever seen by
//! grep as a pattern.

use routes_core::Config;
use serde_json::{Map, Value};

use crate::error::ToolError;
use crate::tools::ToolName;

/// Column projection used by `format: simple`
const SIMPLE_PROJECTION: &str = "awk '{print $1, $2, $3}'";

/// Output format of `list_all_routes`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListFormat {
    #[default]
    Full,
    Simple,
}

impl ListFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "full" => Some(Self::Full),
            "simple" => Some(Self::Simple),
            _ => None,
        }
    }
}

/// A tool call whose arguments have been validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteQuery {
    ListAll { format: ListFormat },
    Search { pattern: String, controller: Option<String> },
    Details { controller: String },
}

impl RouteQuery {
    /// Validate raw MCP arguments for `tool`
    pub fn from_arguments(tool: ToolName, args: &Map<String, Value>) -> Result<Self, ToolError> {
        match tool {
            ToolName::ListAllRoutes => {
                let format = match optional_str(args, "format")? {
                    None => ListFormat::default(),
                    Some(value) => ListFormat::parse(&value).ok_or_else(|| {
                        ToolError::invalid("format", format!("expected full or simple, got {}", value))
                    })?,
                };
                Ok(Self::ListAll { format })
            }
            ToolName::SearchRoutes => Ok(Self::Search {
                pattern: required_str(args, "pattern")?,
                controller: optional_str(args, "controller")?,
            }),
            ToolName::GetRouteDetails => Ok(Self::Details {
                controller: required_str(args, "controller")?,
            }),
        }
    }

    pub fn tool(&self) -> ToolName {
        match self {
            Self::ListAll { .. } => ToolName::ListAllRoutes,
            Self::Search { .. } => ToolName::SearchRoutes,
            Self::Details { .. } => ToolName::GetRouteDetails,
        }
    }

    /// Text returned when the query matched nothing
    pub fn empty_message(&self) -> String {
        match self {
            Self::ListAll { .. } => "No routes found".to_string(),
            Self::Search { pattern, .. } => format!("No routes found matching pattern: {}", pattern),
            Self::Details { controller } => format!("No routes found for controller: {}", controller),
        }
    }
}

/// Helper to get an optional string argument; empty strings count as absent.
/// Whitespace is kept: searching for `" "` is a valid grep.
fn optional_str(args: &Map<String, Value>, key: &str) -> Result<Option<String>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ToolError::invalid(key, format!("expected a string, got {}", other))),
    }
}

/// Helper to get a required, non-empty string argument
fn required_str(args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    optional_str(args, key)?.ok_or_else(|| ToolError::missing(key))
}

/// A shell pipeline ready to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteCommand {
    pub line: String,
    /// Whether the pipeline ends in a grep stage, whose exit status 1 means
    /// "no lines selected"
    pub filtered: bool,
}

fn quote(argument: &str, value: &str) -> Result<String, ToolError> {
    shlex::try_quote(value)
        .map(|q| q.into_owned())
        .map_err(|e| ToolError::invalid(argument, e))
}

/// The configured rails invocation. An explicit command is a trusted shell
/// snippet (`bundle exec rails`); the default binstub is a path and gets quoted.
fn rails(config: &Config) -> Result<String, ToolError> {
    match &config.rails_command {
        Some(cmd) => Ok(cmd.clone()),
        None => quote("rails command", &config.binstub().to_string_lossy()),
    }
}

/// `rails --version`, used to check the command at startup
pub fn version(config: &Config) -> Result<RouteCommand, ToolError> {
    Ok(RouteCommand {
        line: format!("{} --version", rails(config)?),
        filtered: false,
    })
}

/// Build the pipeline for a query
pub fn build(config: &Config, query: &RouteQuery) -> Result<RouteCommand, ToolError> {
    let report = format!("{} routes", rails(config)?);

    let command = match query {
        RouteQuery::ListAll { format: ListFormat::Full } => RouteCommand {
            line: report,
            filtered: false,
        },
        RouteQuery::ListAll { format: ListFormat::Simple } => RouteCommand {
            line: format!("{} | {}", report, SIMPLE_PROJECTION),
            filtered: false,
        },
        RouteQuery::Search { pattern, controller } => {
            let mut line = format!("{} | grep -i -e {}", report, quote("pattern", pattern)?);
            if let Some(controller) = controller {
                let action = format!("{}#", controller);
                line.push_str(&format!(" | grep -i -e {}", quote("controller", &action)?));
            }
            RouteCommand { line, filtered: true }
        }
        RouteQuery::Details { controller } => {
            let action = format!("{}#", controller);
            RouteCommand {
                line: format!("{} | grep -e {}", report, quote("controller", &action)?),
                filtered: true,
            }
        }
    };

    Ok(command)
}
