use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LinenoteError;
use crate::types::{CommentStyle, FallbackPolicy, Policy};

/// Top-level configuration loaded from `.linenote.toml`.
///
/// Resolution order: CLI flags > config file > defaults.
///
/// # Examples
///
/// ```
/// use linenote_core::LinenoteConfig;
///
/// let config = LinenoteConfig::default();
/// assert_eq!(config.analyzer.command, "python3");
/// assert_eq!(config.comments.marker, "#");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinenoteConfig {
    /// How suggestions are derived.
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    /// Header policy settings.
    #[serde(default)]
    pub header: HeaderConfig,
    /// Comment formatting and posting settings.
    #[serde(default)]
    pub comments: CommentConfig,
}

impl LinenoteConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LinenoteError::Io`] if the file cannot be read, or
    /// [`LinenoteError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use linenote_core::LinenoteConfig;
    /// use std::path::Path;
    ///
    /// let config = LinenoteConfig::from_file(Path::new(".linenote.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, LinenoteError> {
        if !path.exists() {
            return Err(LinenoteError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`LinenoteError::Toml`] if parsing fails, or
    /// [`LinenoteError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use linenote_core::{LinenoteConfig, Policy};
    ///
    /// let toml = r#"
    /// [analyzer]
    /// policy = "header"
    /// "#;
    /// let config = LinenoteConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.analyzer.policy, Policy::Header);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, LinenoteError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), LinenoteError> {
        if self.analyzer.command.trim().is_empty() {
            return Err(LinenoteError::Config("analyzer.command is empty".into()));
        }
        if self.analyzer.max_output_bytes == 0 {
            return Err(LinenoteError::Config(
                "analyzer.max_output_bytes must be greater than zero".into(),
            ));
        }
        if self.comments.marker.trim().is_empty() {
            return Err(LinenoteError::Config("comments.marker is empty".into()));
        }
        for pat in &self.comments.skip_patterns {
            if let Err(e) = glob::Pattern::new(pat) {
                return Err(LinenoteError::Config(format!(
                    "invalid skip pattern '{pat}': {e}"
                )));
            }
        }
        Ok(())
    }
}

/// External analyzer configuration.
///
/// # Examples
///
/// ```
/// use linenote_core::AnalyzerConfig;
///
/// let config = AnalyzerConfig::default();
/// assert_eq!(config.args, vec![".github/scripts/analyze.py".to_string()]);
/// assert_eq!(config.max_output_bytes, 1024 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Suggestion policy (default: `analyzer`).
    #[serde(default)]
    pub policy: Policy,
    /// Program to run (default: `python3`).
    #[serde(default = "default_command")]
    pub command: String,
    /// Arguments passed to the program, typically the analyzer script path.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Ceiling on analyzer stdout; larger output fails the file (default: 1 MiB).
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

fn default_command() -> String {
    "python3".into()
}

fn default_args() -> Vec<String> {
    vec![".github/scripts/analyze.py".into()]
}

fn default_max_output_bytes() -> usize {
    1024 * 1024
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            policy: Policy::default(),
            command: default_command(),
            args: default_args(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

/// Header policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderConfig {
    /// Line every file must start with (default: `# -*- coding: utf-8 -*-`).
    #[serde(default = "default_sentinel")]
    pub sentinel: String,
}

fn default_sentinel() -> String {
    "# -*- coding: utf-8 -*-".into()
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            sentinel: default_sentinel(),
        }
    }
}

/// Comment formatting and posting configuration.
///
/// # Examples
///
/// ```
/// use linenote_core::{CommentConfig, CommentStyle, FallbackPolicy};
///
/// let config = CommentConfig::default();
/// assert_eq!(config.style, CommentStyle::Suggestion);
/// assert_eq!(config.fallback, FallbackPolicy::UnprocessableOnly);
/// assert!(config.skip_patterns.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentConfig {
    /// Line-comment marker prefixed to analyzer comments (default: `#`).
    #[serde(default = "default_marker")]
    pub marker: String,
    /// Body style (default: `suggestion`).
    #[serde(default)]
    pub style: CommentStyle,
    /// Which inline failures fall back to an issue comment.
    #[serde(default)]
    pub fallback: FallbackPolicy,
    /// Glob patterns for changed files that are never commented on.
    #[serde(default)]
    pub skip_patterns: Vec<String>,
}

fn default_marker() -> String {
    "#".into()
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            style: CommentStyle::default(),
            fallback: FallbackPolicy::default(),
            skip_patterns: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = LinenoteConfig::default();
        assert_eq!(config.analyzer.policy, Policy::Analyzer);
        assert_eq!(config.analyzer.command, "python3");
        assert_eq!(config.analyzer.max_output_bytes, 1_048_576);
        assert_eq!(config.header.sentinel, "# -*- coding: utf-8 -*-");
        assert_eq!(config.comments.marker, "#");
        assert_eq!(config.comments.style, CommentStyle::Suggestion);
        assert_eq!(config.comments.fallback, FallbackPolicy::UnprocessableOnly);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[analyzer]
policy = "analyzer"
command = "node"
args = ["tools/lint.js", "--json"]
max_output_bytes = 4096

[header]
sentinel = "// SPDX-License-Identifier: MIT"

[comments]
marker = "//"
style = "preview"
fallback = "always"
skip_patterns = ["vendor/**", "*.lock"]
"#;
        let config = LinenoteConfig::from_toml(toml).unwrap();
        assert_eq!(config.analyzer.command, "node");
        assert_eq!(config.analyzer.args, vec!["tools/lint.js", "--json"]);
        assert_eq!(config.analyzer.max_output_bytes, 4096);
        assert_eq!(config.header.sentinel, "// SPDX-License-Identifier: MIT");
        assert_eq!(config.comments.marker, "//");
        assert_eq!(config.comments.style, CommentStyle::Preview);
        assert_eq!(config.comments.fallback, FallbackPolicy::Always);
        assert_eq!(config.comments.skip_patterns.len(), 2);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = LinenoteConfig::from_toml("").unwrap();
        assert_eq!(config.analyzer.command, "python3");
        assert_eq!(config.comments.marker, "#");
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = LinenoteConfig::from_toml("{{invalid}}");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_fallback_policy_is_rejected() {
        let result = LinenoteConfig::from_toml("[comments]\nfallback = \"sometimes\"\n");
        assert!(matches!(result, Err(LinenoteError::Toml(_))));
    }

    #[test]
    fn zero_output_ceiling_is_rejected() {
        let result = LinenoteConfig::from_toml("[analyzer]\nmax_output_bytes = 0\n");
        assert!(matches!(result, Err(LinenoteError::Config(_))));
    }

    #[test]
    fn unclosed_skip_pattern_is_rejected() {
        let result = LinenoteConfig::from_toml("[comments]\nskip_patterns = [\"src/[ab\"]\n");
        assert!(matches!(result, Err(LinenoteError::Config(_))));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = LinenoteConfig::from_file(Path::new("/nonexistent/.linenote.toml")).unwrap_err();
        assert!(matches!(err, LinenoteError::FileNotFound(_)));
    }
}
