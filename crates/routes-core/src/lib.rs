//! Rails Routes Core - Shared functionality for the rails-routes tools
//!
//! Configuration resolution and parsing of the `rails routes` report.

pub mod config;
pub mod paths;
pub mod route;

pub use config::Config;
pub use paths::Paths;
pub use route::{RouteLine, RouteSummary};
