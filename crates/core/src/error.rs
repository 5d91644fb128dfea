// Copyright 2025 urbench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types shared across the harness.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while preparing, running or reporting benchmarks.
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem or pipe failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Benchmark output could not be parsed
    #[error("{benchmark}: {message}")]
    Parse {
        /// Benchmark whose output was rejected.
        benchmark: String,
        /// What was wrong with the output.
        message: String,
    },

    /// A subprocess exited unsuccessfully
    #[error("command `{command}` failed with {status}: {stderr}")]
    Process {
        /// Command line that was executed.
        command: String,
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },

    /// A subprocess exceeded its time budget
    #[error("command `{command}` timed out after {}s", timeout.as_secs())]
    Timeout {
        /// Command line that was executed.
        command: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Working directory is unusable
    #[error("Working directory error: {0}")]
    Workdir(String),

    /// Download failed
    #[error("Download of {url} failed: {message}")]
    Download {
        /// Source URL.
        url: String,
        /// Failure description.
        message: String,
    },

    /// Caller supplied an invalid value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a parse error for the given benchmark.
    pub fn parse(benchmark: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            benchmark: benchmark.into(),
            message: message.into(),
        }
    }

    /// Build an invalid-input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Build a download error.
    pub fn download(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Download {
            url: url.into(),
            message: message.to_string(),
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        Error::download(url, err)
    }
}

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_names_benchmark() {
        let err = Error::parse("Velocity-Bench Hashtable", "no keys/second in output");
        assert_eq!(
            err.to_string(),
            "Velocity-Bench Hashtable: no keys/second in output"
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = Error::Timeout {
            command: "sleep 10".to_string(),
            timeout: Duration::from_secs(3),
        };
        assert_eq!(err.to_string(), "command `sleep 10` timed out after 3s");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
