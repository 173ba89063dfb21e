//! Error types for the health agent.
//!
//! Failures inside the query executor never surface as this type; they are
//! folded into a structured `QueryResult` and handed to the model instead.
//! What remains are the failures a person at the terminal has to act on.

use thiserror::Error;

/// Errors that stop a question (or startup) from completing.
///
/// `Display` yields the bare message; [`AgentError::report`] prefixes the
/// category for the line shown to the user.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Bad or missing configuration: config file, connection string, API key.
    #[error("{0}")]
    Config(String),

    /// The database could not be reached or refused the login.
    #[error("{0}")]
    Connection(String),

    /// The database rejected a statement or returned something unreadable.
    #[error("{0}")]
    Query(String),

    /// The model API failed or answered with something unusable.
    #[error("{0}")]
    Llm(String),

    /// Reading the question or writing the answer failed.
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Short label for the kind of failure.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Llm(_) => "LLM Error",
            Self::Io(_) => "I/O Error",
        }
    }

    /// The single line printed for this error: `<category>: <message>`.
    pub fn report(&self) -> String {
        format!("{}: {}", self.category(), self)
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
