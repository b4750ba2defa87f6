//! Result Shaper
//!
//! Turns a pipeline outcome into the tool result the client sees. An empty
//! result set is a valid answer and comes back as text, not as an error.

use routes_core::route::{parse_report, RouteSummary};
use tracing::error;

use crate::command::RouteQuery;
use crate::error::ToolError;
use crate::protocol::ToolResult;
use crate::runner::{ExecutionOutcome, FailureKind};

pub fn shape(query: &RouteQuery, outcome: ExecutionOutcome) -> ToolResult {
    match outcome {
        ExecutionOutcome::Failure {
            kind: FailureKind::NoMatches,
            ..
        } => ToolResult::success(query.empty_message()),
        ExecutionOutcome::Failure {
            kind: FailureKind::ExecutionError,
            message,
        } => {
            error!("{} failed: {}", query.tool(), message);
            ToolError::Execution(message).into()
        }
        ExecutionOutcome::Success(stdout) if stdout.trim().is_empty() => {
            ToolResult::success(query.empty_message())
        }
        ExecutionOutcome::Success(stdout) => match query {
            RouteQuery::ListAll { .. } | RouteQuery::Search { .. } => ToolResult::success(stdout),
            RouteQuery::Details { controller } => {
                let summary = RouteSummary::from_routes(controller, &parse_report(&stdout));
                ToolResult::success(summary.render(&stdout))
            }
        },
    }
}
