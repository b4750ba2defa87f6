//! Tool Handler
//!
//! Dispatch boundary for tool calls: validate, build, run, shape. Every
//! failure is turned into an error result here, so one bad call never
//! affects another.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use routes_core::Config;

use crate::command::{self, RouteQuery};
use crate::error::ToolError;
use crate::protocol::ToolResult;
use crate::runner::{CommandRunner, ExecutionOutcome, ShellRunner};
use crate::shaper::shape;
use crate::tools::ToolName;

pub struct ToolHandler<R = ShellRunner> {
    config: Config,
    runner: R,
}

impl ToolHandler<ShellRunner> {
    pub fn new(config: Config) -> Self {
        let runner = ShellRunner::new(&config);
        Self { config, runner }
    }
}

impl<R: CommandRunner> ToolHandler<R> {
    pub fn with_runner(config: Config, runner: R) -> Self {
        Self { config, runner }
    }

    /// Handle a tool call
    pub async fn handle_tool(&self, name: &str, arguments: Map<String, Value>) -> ToolResult {
        match self.dispatch(name, &arguments).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Tool {} rejected: {}", name, e);
                ToolResult::from(e)
            }
        }
    }

    async fn dispatch(&self, name: &str, arguments: &Map<String, Value>) -> Result<ToolResult, ToolError> {
        let tool: ToolName = name.parse()?;
        let query = RouteQuery::from_arguments(tool, arguments)?;
        let cmd = command::build(&self.config, &query)?;

        debug!("{} -> {}", tool, cmd.line);
        let outcome = self.runner.run(&cmd).await;
        Ok(shape(&query, outcome))
    }

    /// Check that the configured rails command starts. Failures are only
    /// reported; the server keeps running so the client sees the real error
    /// on its first call.
    pub async fn verify(&self) -> bool {
        let cmd = match command::version(&self.config) {
            Ok(cmd) => cmd,
            Err(e) => {
                warn!("Warning: Could not verify rails command: {}", e);
                return false;
            }
        };

        match self.runner.run(&cmd).await {
            ExecutionOutcome::Success(version) => {
                info!("Rails command verified successfully: {}", version.trim());
                true
            }
            ExecutionOutcome::Failure { message, .. } => {
                warn!("Warning: Could not verify rails command: {}", message);
                false
            }
        }
    }
}
