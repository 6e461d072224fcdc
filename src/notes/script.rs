//! AppleScript execution
//!
//! Scripts are piped to `osascript` on stdin. Multi-value results are emitted
//! with ASCII control characters as separators, so note titles and bodies may
//! contain any printable text without breaking the parse.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{AdapterError, AuthError, ProviderError, Result};

/// Separates fields within one record (ASCII unit separator)
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// Separates records (ASCII record separator)
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// AppleScript prologue binding `fs`/`rs` to the separators and `isoDate`
/// to an ISO 8601 date formatter
pub const PROLOGUE: &str = r#"set fs to character id 31
set rs to character id 30
on isoDate(d)
    return (d as «class isot» as string)
end isoDate
"#;

/// Runs AppleScript source and returns its result text
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(&self, script: &str) -> Result<String>;
}

/// [`ScriptRunner`] backed by the `osascript` binary
pub struct Osascript {
    timeout: Duration,
}

impl Osascript {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ScriptRunner for Osascript {
    async fn run(&self, script: &str) -> Result<String> {
        let mut child = Command::new("osascript")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                AdapterError::Provider(ProviderError::Unavailable {
                    message: format!("Failed to start osascript: {}", e),
                })
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(script.as_bytes()).await?;
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                AdapterError::Provider(ProviderError::Unavailable {
                    message: format!("Notes did not respond within {}s", self.timeout.as_secs()),
                })
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(stderr = %stderr.trim(), "osascript failed");
            return Err(classify_failure(&stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.strip_suffix('\n').unwrap_or(&stdout).to_string())
    }
}

/// Map `osascript` error output onto the error taxonomy
pub fn classify_failure(stderr: &str) -> AdapterError {
    let message = stderr.trim().to_string();
    if message.contains("-1743") || message.contains("Not authorized to send Apple events") {
        AdapterError::Auth(AuthError::Rejected {
            message: format!(
                "Automation access to Notes was denied. Allow it in System Settings > \
                 Privacy & Security > Automation. ({})",
                message
            ),
        })
    } else if message.contains("Can’t get") || message.contains("Can't get") || message.contains("-1728") {
        AdapterError::not_found(format!("note ({})", message))
    } else {
        AdapterError::Provider(ProviderError::Unavailable { message })
    }
}

/// Escape text for use inside an AppleScript string literal
pub fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Split script output into records of fields
pub fn parse_records(output: &str) -> Vec<Vec<String>> {
    output
        .split(RECORD_SEPARATOR)
        .filter(|record| !record.trim().is_empty())
        .map(|record| {
            record
                .trim_start_matches('\n')
                .split(FIELD_SEPARATOR)
                .map(str::to_string)
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape(r"C:\path"), r"C:\\path");
    }

    #[test]
    fn test_parse_records() {
        let output = "id1\u{1f}Groceries\u{1f}2024-01-05\u{1e}id2\u{1f}Plan || v2\u{1f}\u{1e}";
        let records = parse_records(output);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], vec!["id1", "Groceries", "2024-01-05"]);
        assert_eq!(records[1], vec!["id2", "Plan || v2", ""]);
        assert!(parse_records("").is_empty());
    }

    #[test]
    fn test_classify_failure() {
        assert_eq!(
            classify_failure("execution error: Not authorized to send Apple events to Notes. (-1743)")
                .kind(),
            ErrorKind::AuthRejectedError
        );
        assert_eq!(
            classify_failure("execution error: Notes got an error: Can’t get note id \"x\". (-1728)")
                .kind(),
            ErrorKind::NotFoundError
        );
        assert_eq!(
            classify_failure("execution error: Notes got an error: AppleEvent timed out. (-1712)").kind(),
            ErrorKind::ProviderUnavailableError
        );
    }
}
