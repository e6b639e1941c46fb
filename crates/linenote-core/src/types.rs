use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LinenoteError;

/// The pull request a run comments on.
///
/// `head_sha` anchors both content fetches and inline review comments.
///
/// # Examples
///
/// ```
/// use linenote_core::PullRequest;
///
/// let pr = PullRequest {
///     owner: "octocat".into(),
///     repo: "hello-world".into(),
///     number: 42,
///     head_sha: "abc123".into(),
/// };
/// assert_eq!(pr.to_string(), "octocat/hello-world#42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Pull request number.
    pub number: u64,
    /// Latest commit on the pull request's source branch.
    pub head_sha: String,
}

impl fmt::Display for PullRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// A proposed comment on one line of a file.
///
/// # Examples
///
/// ```
/// use linenote_core::Suggestion;
///
/// let s = Suggestion::new(3, "# explain this");
/// assert_eq!(s.line, 3);
/// assert_eq!(s.comment, "# explain this");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// 1-indexed target line.
    pub line: u32,
    /// Comment text to insert above the target line.
    pub comment: String,
}

impl Suggestion {
    /// Create a suggestion for `line`.
    pub fn new(line: u32, comment: impl Into<String>) -> Self {
        Self {
            line,
            comment: comment.into(),
        }
    }
}

/// Where a posted suggestion ended up.
///
/// # Examples
///
/// ```
/// use linenote_core::PostKind;
///
/// assert_eq!(PostKind::Fallback.to_string(), "issue comment");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    /// Inline review comment anchored to file, line, and head commit.
    Inline,
    /// Issue comment on the pull request as a whole.
    Fallback,
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostKind::Inline => write!(f, "review comment"),
            PostKind::Fallback => write!(f, "issue comment"),
        }
    }
}

/// Which suggestion policy derives comments from file content.
///
/// # Examples
///
/// ```
/// use linenote_core::Policy;
///
/// let p: Policy = "header".parse().unwrap();
/// assert_eq!(p, Policy::Header);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Ask the external analyzer process.
    #[default]
    Analyzer,
    /// Propose a fixed header line when the file lacks it.
    Header,
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Analyzer => write!(f, "analyzer"),
            Policy::Header => write!(f, "header"),
        }
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "analyzer" => Ok(Policy::Analyzer),
            "header" => Ok(Policy::Header),
            other => Err(format!("unknown policy: {other}")),
        }
    }
}

/// How a comment body presents the suggestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStyle {
    /// A GitHub `suggestion` block replacing the target line.
    #[default]
    Suggestion,
    /// A fenced preview of the whole file with the suggestion applied.
    Preview,
}

/// When a failed inline comment is re-posted as an issue comment.
///
/// # Examples
///
/// ```
/// use linenote_core::{FallbackPolicy, LinenoteError};
///
/// let not_in_diff = LinenoteError::GitHub { status: Some(422), message: "line".into() };
/// let outage = LinenoteError::GitHub { status: Some(502), message: "bad gateway".into() };
/// assert!(FallbackPolicy::UnprocessableOnly.covers(&not_in_diff));
/// assert!(!FallbackPolicy::UnprocessableOnly.covers(&outage));
/// assert!(FallbackPolicy::Always.covers(&outage));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// Only GitHub's 422 "line not part of the diff" rejection falls back.
    #[default]
    UnprocessableOnly,
    /// Every inline failure falls back.
    Always,
}

impl FallbackPolicy {
    /// Whether this inline comment failure should fall back.
    pub fn covers(self, err: &LinenoteError) -> bool {
        match self {
            FallbackPolicy::UnprocessableOnly => err.is_unprocessable(),
            FallbackPolicy::Always => true,
        }
    }
}

/// Output format for the run report.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use linenote_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summary.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output, e.g. for `$GITHUB_STEP_SUMMARY`.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "markdown".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn policy_round_trips_through_display() {
        for p in [Policy::Analyzer, Policy::Header] {
            assert_eq!(p.to_string().parse::<Policy>().unwrap(), p);
        }
        assert!("lint".parse::<Policy>().is_err());
    }

    #[test]
    fn fallback_policy_deserializes_kebab_case() {
        let p: FallbackPolicy = serde_json::from_str("\"unprocessable-only\"").unwrap();
        assert_eq!(p, FallbackPolicy::UnprocessableOnly);
        let p: FallbackPolicy = serde_json::from_str("\"always\"").unwrap();
        assert_eq!(p, FallbackPolicy::Always);
    }

    #[test]
    fn always_fallback_covers_network_errors() {
        let network = LinenoteError::github("connection reset");
        assert!(FallbackPolicy::Always.covers(&network));
        assert!(!FallbackPolicy::UnprocessableOnly.covers(&network));
        assert!(!FallbackPolicy::UnprocessableOnly.covers(&LinenoteError::Config("x".into())));
    }

    #[test]
    fn pull_request_serializes_camel_case() {
        let pr = PullRequest {
            owner: "o".into(),
            repo: "r".into(),
            number: 7,
            head_sha: "deadbeef".into(),
        };
        let json = serde_json::to_value(&pr).unwrap();
        assert_eq!(json["headSha"], "deadbeef");
    }
}
