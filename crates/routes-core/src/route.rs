//! Parsing of the `rails routes` report
//!
//! The report is line oriented with four whitespace separated columns:
//!
//! ```text
//!    Prefix Verb   URI Pattern               Controller#Action
//!     users GET    /users(.:format)          users#index
//!           POST   /users(.:format)          users#create
//! ```
//!
//! Rows belonging to the same helper leave the prefix column blank, and
//! mounted engines leave the verb blank, so columns are located around the
//! URI pattern when one is present.

/// One row of the routes report
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteLine {
    pub prefix: String,
    pub verb: String,
    pub pattern: String,
    pub action: String,
}

impl RouteLine {
    /// Parse a single report line. Missing columns are left empty.
    pub fn parse(line: &str) -> Self {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        match tokens.iter().position(|t| t.starts_with('/')) {
            Some(idx) => {
                let (prefix, verb) = match &tokens[..idx] {
                    [] => ("", ""),
                    [single] if looks_like_verb(single) => ("", *single),
                    [single] => (*single, ""),
                    [prefix, verb, ..] => (*prefix, *verb),
                };
                Self {
                    prefix: prefix.to_string(),
                    verb: verb.to_string(),
                    pattern: tokens[idx].to_string(),
                    action: tokens.get(idx + 1).copied().unwrap_or_default().to_string(),
                }
            }
            None => {
                let field = |i: usize| tokens.get(i).copied().unwrap_or_default().to_string();
                Self {
                    prefix: field(0),
                    verb: field(1),
                    pattern: field(2),
                    action: field(3),
                }
            }
        }
    }

    /// Method half of `controller#method`
    pub fn method_name(&self) -> Option<&str> {
        self.action
            .split_once('#')
            .map(|(_, method)| method)
            .filter(|method| !method.is_empty())
    }
}

/// HTTP verbs in the report are upper case, joined with `|` for `match` routes
fn looks_like_verb(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_uppercase() || c == '|')
}

/// Parse every non-blank line of a report
pub fn parse_report(report: &str) -> Vec<RouteLine> {
    report
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(RouteLine::parse)
        .collect()
}

/// Aggregate view of the routes served by one controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSummary {
    pub controller: String,
    pub total: usize,
    /// Distinct method names in order of first appearance
    pub actions: Vec<String>,
}

impl RouteSummary {
    pub fn from_routes(controller: &str, routes: &[RouteLine]) -> Self {
        let mut actions: Vec<String> = Vec::new();
        for name in routes.iter().filter_map(RouteLine::method_name) {
            if !actions.iter().any(|seen| seen == name) {
                actions.push(name.to_string());
            }
        }

        Self {
            controller: controller.to_string(),
            total: routes.len(),
            actions,
        }
    }

    /// Summary header followed by the verbatim report
    pub fn render(&self, report: &str) -> String {
        format!(
            "Controller: {}\nTotal routes: {}\nActions: {}\n\nFull routes:\n{}",
            self.controller,
            self.total,
            self.actions.join(", "),
            report
        )
    }
}
