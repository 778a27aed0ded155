//! Parser for shell-export style environment files (e.g. openrc).

use crate::domain::Environment;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

const EXPORT_PREFIX: &str = "export ";

/// Reads `path` and returns every `export NAME=VALUE` assignment in it.
/// A missing or unreadable file is an error; odd lines are not.
pub fn get_env(path: impl AsRef<Path>) -> Result<Environment> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read environment file {}", path.display()))?;

    Ok(parse_env(&content))
}

/// Parses environment text. Later assignments to the same name win.
pub fn parse_env(content: &str) -> Environment {
    let mut env = Environment::new();

    for line in content.lines() {
        // Prefix is matched case-sensitively on the raw line
        let Some(assignment) = line.strip_prefix(EXPORT_PREFIX) else {
            continue;
        };

        let Some((name, value)) = assignment.split_once('=') else {
            debug!(line, "Skipping export line without '='");
            continue;
        };

        let name = name.trim();
        if name.is_empty() {
            debug!(line, "Skipping export line with empty name");
            continue;
        }

        env.insert(name.to_string(), unquote(value.trim()).to_string());
    }

    env
}

/// Strips one pair of matching surrounding quotes
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
