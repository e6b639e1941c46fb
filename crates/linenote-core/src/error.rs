use std::path::PathBuf;

/// Errors that can occur across the linenote crates.
///
/// Library crates return this type directly; the binary renders it through
/// `miette` at the boundary.
///
/// # Examples
///
/// ```
/// use linenote_core::LinenoteError;
///
/// let err = LinenoteError::Config("missing token".into());
/// assert!(err.to_string().contains("missing token"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum LinenoteError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// GitHub API failure. `status` is the HTTP status when GitHub answered.
    #[error("GitHub error: {message}")]
    GitHub {
        /// HTTP status code of the error response, if any.
        status: Option<u16>,
        /// Human-readable description including the failed operation.
        message: String,
    },

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

impl LinenoteError {
    /// Status code GitHub uses when a review comment targets a line outside the diff.
    pub const UNPROCESSABLE: u16 = 422;

    /// Build a [`LinenoteError::GitHub`] without a status code.
    pub fn github(message: impl Into<String>) -> Self {
        Self::GitHub {
            status: None,
            message: message.into(),
        }
    }

    /// HTTP status carried by a GitHub error, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use linenote_core::LinenoteError;
    ///
    /// let err = LinenoteError::GitHub { status: Some(422), message: "line not in diff".into() };
    /// assert_eq!(err.status(), Some(422));
    /// assert!(err.is_unprocessable());
    /// assert_eq!(LinenoteError::Config("x".into()).status(), None);
    /// ```
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::GitHub { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether this is GitHub's "line is not part of the diff" rejection.
    pub fn is_unprocessable(&self) -> bool {
        self.status() == Some(Self::UNPROCESSABLE)
    }
}

/// Failure of the external analyzer for a single file.
///
/// # Examples
///
/// ```
/// use linenote_core::AnalyzerError;
///
/// let err = AnalyzerError::OutputTooLarge { limit: 1024 };
/// assert!(err.to_string().contains("1024"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum AnalyzerError {
    /// The analyzer process could not be started or its pipes failed.
    #[error("failed to run analyzer `{command}`: {source}")]
    Spawn {
        /// Program that was invoked.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The analyzer exited unsuccessfully.
    #[error(
        "analyzer exited with {}: {stderr}",
        .code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}"))
    )]
    Exit {
        /// Exit code, or `None` when terminated by a signal.
        code: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The analyzer wrote more than the configured output ceiling.
    #[error("analyzer output exceeded {limit} bytes")]
    OutputTooLarge {
        /// Configured ceiling in bytes.
        limit: usize,
    },

    /// The analyzer output is not a JSON object or array of objects.
    #[error("analyzer output is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: LinenoteError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = LinenoteError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn file_not_found_shows_path() {
        let err = LinenoteError::FileNotFound(PathBuf::from("/tmp/files.txt"));
        assert!(err.to_string().contains("/tmp/files.txt"));
    }

    #[test]
    fn only_422_is_unprocessable() {
        let err = LinenoteError::GitHub {
            status: Some(500),
            message: "boom".into(),
        };
        assert!(!err.is_unprocessable());
        assert!(!LinenoteError::github("network down").is_unprocessable());
    }

    #[test]
    fn analyzer_exit_mentions_code_and_stderr() {
        let err = AnalyzerError::Exit {
            code: Some(2),
            stderr: "Traceback".into(),
        };
        let text = err.to_string();
        assert!(text.contains("status 2"));
        assert!(text.contains("Traceback"));

        let killed = AnalyzerError::Exit {
            code: None,
            stderr: String::new(),
        };
        assert!(killed.to_string().contains("signal"));
    }
}
