//! Request scripts for the command-line driver.
//!
//! A script is either a JSON array of requests or JSON lines, one request
//! per line. In JSON-lines form, blank lines and lines starting with `#`
//! are skipped.

use std::path::Path;

use anyhow::Context;

use crate::request::Request;

/// Parse script text into requests.
///
/// # Errors
///
/// Returns an error naming the first line that fails to decode.
pub fn parse_script(contents: &str) -> anyhow::Result<Vec<Request>> {
    if contents.trim_start().starts_with('[') {
        return serde_json::from_str(contents).context("failed to parse JSON array script");
    }
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("line {}: invalid request", index.saturating_add(1)))
        })
        .collect()
}

/// Read and parse a script file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_script(path: &Path) -> anyhow::Result<Vec<Request>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    parse_script(&contents).with_context(|| format!("in script {}", path.display()))
}
