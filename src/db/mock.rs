//! Mock connection factories for testing.
//!
//! `MockConnectionFactory` serves canned rows and counts how many
//! connections were opened; `FailingConnectionFactory` behaves like an
//! unreachable server.

use super::{ConnectionFactory, DatabaseConnection, Row, Value};
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A canned reply for statements containing a pattern.
#[derive(Debug, Clone)]
enum Reply {
    Rows(Vec<Row>),
    Error(String),
}

/// A connection factory that returns predefined results.
#[derive(Debug, Clone, Default)]
pub struct MockConnectionFactory {
    replies: Vec<(String, Reply)>,
    connects: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl MockConnectionFactory {
    /// Creates a factory with no canned replies.
    ///
    /// Unmatched statements return a single `result` column echoing the SQL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `rows` for any statement containing `pattern` (case-insensitive).
    pub fn with_rows(mut self, pattern: impl Into<String>, rows: Vec<Row>) -> Self {
        self.replies
            .push((pattern.into().to_lowercase(), Reply::Rows(rows)));
        self
    }

    /// Fails any statement containing `pattern` (case-insensitive) with `message`.
    pub fn with_error(mut self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.replies
            .push((pattern.into().to_lowercase(), Reply::Error(message.into())));
        self
    }

    /// Number of connections opened so far.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Number of connections closed so far.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionFactory for MockConnectionFactory {
    async fn connect(&self) -> Result<Box<dyn DatabaseConnection>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            replies: self.replies.clone(),
            closes: Arc::clone(&self.closes),
            open: true,
        }))
    }
}

struct MockConnection {
    replies: Vec<(String, Reply)>,
    closes: Arc<AtomicUsize>,
    open: bool,
}

#[async_trait]
impl DatabaseConnection for MockConnection {
    async fn fetch_rows(&mut self, sql: &str) -> Result<Vec<Row>> {
        if !self.open {
            return Err(AgentError::connection("connection is closed"));
        }

        let sql_lower = sql.to_lowercase();
        for (pattern, reply) in &self.replies {
            if sql_lower.contains(pattern.as_str()) {
                return match reply {
                    Reply::Rows(rows) => Ok(rows.clone()),
                    Reply::Error(message) => Err(AgentError::query(message.clone())),
                };
            }
        }

        Ok(vec![
            Row::new().with("result", Value::String(format!("Mock result for: {}", sql)))
        ])
    }

    async fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// A connection factory whose server can never be reached.
#[derive(Debug, Clone)]
pub struct FailingConnectionFactory {
    message: String,
}

impl FailingConnectionFactory {
    /// Creates a factory that fails every connection attempt with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for FailingConnectionFactory {
    fn default() -> Self {
        Self::new("Cannot connect to localhost:5432. Check that the server is running.")
    }
}

#[async_trait]
impl ConnectionFactory for FailingConnectionFactory {
    async fn connect(&self) -> Result<Box<dyn DatabaseConnection>> {
        Err(AgentError::connection(self.message.clone()))
    }
}
