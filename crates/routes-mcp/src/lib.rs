//! Rails Routes MCP Server
//!
//! Exposes `rails routes` introspection to Claude and other AI assistants via
//! the Model Context Protocol (MCP). Implements MCP over stdio using JSON-RPC 2.0.
//!
//! A tool call flows through [`command`] (build the pipeline), [`runner`]
//! (execute and classify) and [`shaper`] (format the result), tied together
//! by [`handler`].

pub mod command;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod runner;
pub mod server;
pub mod shaper;
pub mod tools;

pub use handler::ToolHandler;
pub use server::McpServer;
