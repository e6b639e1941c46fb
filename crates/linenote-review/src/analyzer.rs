//! Suggestion sources: the fixed header policy and the external analyzer process.

use std::process::Stdio;

use async_trait::async_trait;
use linenote_core::{AnalyzerError, LinenoteConfig, Policy, Suggestion};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::suggestion::parse_analyzer_output;

/// Derives line suggestions from the text of one changed file.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Suggest comments for `content`, the text of `path` at the head commit.
    ///
    /// # Errors
    ///
    /// Returns an [`AnalyzerError`] when suggestions cannot be produced; the
    /// caller skips the file.
    async fn analyze(&self, path: &str, content: &str) -> Result<Vec<Suggestion>, AnalyzerError>;
}

/// Build the analyzer selected by `policy`.
///
/// # Examples
///
/// ```
/// use linenote_core::{LinenoteConfig, Policy};
/// use linenote_review::analyzer::from_config;
///
/// let analyzer = from_config(&LinenoteConfig::default(), Policy::Header);
/// ```
pub fn from_config(config: &LinenoteConfig, policy: Policy) -> Box<dyn Analyzer> {
    match policy {
        Policy::Header => Box::new(HeaderPolicy::new(&config.header.sentinel)),
        Policy::Analyzer => Box::new(ProcessAnalyzer {
            command: config.analyzer.command.clone(),
            args: config.analyzer.args.clone(),
            max_output_bytes: config.analyzer.max_output_bytes,
            marker: config.comments.marker.clone(),
        }),
    }
}

/// Proposes a fixed first line for files that do not start with it.
///
/// # Examples
///
/// ```
/// use linenote_review::analyzer::HeaderPolicy;
///
/// let policy = HeaderPolicy::new("# -*- coding: utf-8 -*-");
/// assert!(policy.suggest("# -*- coding: utf-8 -*-\nimport os\n").is_none());
/// assert_eq!(policy.suggest("import os\n").unwrap().line, 1);
/// ```
#[derive(Debug, Clone)]
pub struct HeaderPolicy {
    sentinel: String,
}

impl HeaderPolicy {
    /// Create a policy requiring `sentinel` as the first line.
    pub fn new(sentinel: impl Into<String>) -> Self {
        Self {
            sentinel: sentinel.into(),
        }
    }

    /// The insertion suggestion for `content`, if its first line differs.
    pub fn suggest(&self, content: &str) -> Option<Suggestion> {
        let first = content.lines().next().unwrap_or("");
        if first == self.sentinel {
            return None;
        }
        Some(Suggestion::new(1, self.sentinel.clone()))
    }
}

#[async_trait]
impl Analyzer for HeaderPolicy {
    async fn analyze(&self, _path: &str, content: &str) -> Result<Vec<Suggestion>, AnalyzerError> {
        Ok(self.suggest(content).into_iter().collect())
    }
}

/// Runs an external program with the file text on stdin and reads JSON
/// suggestions from stdout.
///
/// Stdout beyond `max_output_bytes` kills the process and fails the file.
#[derive(Debug, Clone)]
pub struct ProcessAnalyzer {
    /// Program to run.
    pub command: String,
    /// Arguments, typically the analyzer script path.
    pub args: Vec<String>,
    /// Stdout ceiling in bytes.
    pub max_output_bytes: usize,
    /// Line-comment marker used to normalize comment text.
    pub marker: String,
}

impl ProcessAnalyzer {
    fn spawn_error(&self, source: std::io::Error) -> AnalyzerError {
        AnalyzerError::Spawn {
            command: self.command.clone(),
            source,
        }
    }

    async fn run(&self, input: &str) -> Result<Vec<u8>, AnalyzerError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let (Some(mut stdin), Some(mut stdout), Some(mut stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(self.spawn_error(std::io::Error::other("analyzer pipes not captured")));
        };

        let input = input.as_bytes().to_vec();
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            match result {
                // The analyzer may exit without reading all of its input.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
        });

        let limit = self.max_output_bytes;
        let stderr_reader = tokio::spawn(async move {
            let mut captured = Vec::new();
            let _ = (&mut stderr)
                .take(limit as u64)
                .read_to_end(&mut captured)
                .await;
            let _ = tokio::io::copy(&mut stderr, &mut tokio::io::sink()).await;
            captured
        });

        let mut output = Vec::new();
        if let Err(e) = (&mut stdout)
            .take(limit as u64 + 1)
            .read_to_end(&mut output)
            .await
        {
            let _ = child.kill().await;
            return Err(self.spawn_error(e));
        }
        if output.len() > limit {
            let _ = child.kill().await;
            writer.abort();
            return Err(AnalyzerError::OutputTooLarge { limit });
        }

        let status = child.wait().await.map_err(|e| self.spawn_error(e))?;
        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(self.spawn_error(e)),
            Err(e) => return Err(self.spawn_error(std::io::Error::other(e))),
        }
        let stderr = stderr_reader.await.unwrap_or_default();

        if !status.success() {
            return Err(AnalyzerError::Exit {
                code: status.code(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        tracing::debug!(
            command = %self.command,
            bytes = output.len(),
            "analyzer finished"
        );
        Ok(output)
    }
}

#[async_trait]
impl Analyzer for ProcessAnalyzer {
    async fn analyze(&self, path: &str, content: &str) -> Result<Vec<Suggestion>, AnalyzerError> {
        tracing::debug!(path, command = %self.command, "running analyzer");
        let output = self.run(content).await?;
        parse_analyzer_output(&output, &self.marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_present_yields_nothing() {
        let policy = HeaderPolicy::new("# header");
        assert!(policy.suggest("# header\nbody\n").is_none());
        assert!(policy.suggest("# header").is_none());
        assert!(policy.suggest("# header\r\nbody").is_none());
    }

    #[test]
    fn header_missing_inserts_at_line_one() {
        let policy = HeaderPolicy::new("# header");
        assert_eq!(
            policy.suggest("def reverse_string(text):\n"),
            Some(Suggestion::new(1, "# header"))
        );
    }

    #[test]
    fn header_must_match_exactly() {
        let policy = HeaderPolicy::new("# header");
        assert!(policy.suggest("#  header\n").is_some());
        assert!(policy.suggest("\n# header\n").is_some());
    }

    #[test]
    fn empty_file_gets_header() {
        let policy = HeaderPolicy::new("# header");
        assert!(policy.suggest("").is_some());
    }

    #[tokio::test]
    async fn header_policy_as_analyzer() {
        let analyzer = from_config(&LinenoteConfig::default(), Policy::Header);
        let suggestions = analyzer.analyze("a.py", "import os\n").await.unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].comment, "# -*- coding: utf-8 -*-");
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let analyzer = ProcessAnalyzer {
            command: "/nonexistent/linenote-analyzer".into(),
            args: vec![],
            max_output_bytes: 1024,
            marker: "#".into(),
        };
        let err = analyzer.analyze("a.py", "x").await.unwrap_err();
        assert!(matches!(err, AnalyzerError::Spawn { .. }));
    }
}
