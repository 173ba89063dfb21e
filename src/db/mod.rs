//! Database abstraction layer.
//!
//! Connections are opened per request through a `ConnectionFactory` and
//! released when the request is done; nothing is pooled.

mod mock;
mod postgres;
mod types;

pub use mock::{FailingConnectionFactory, MockConnectionFactory};
pub use postgres::PostgresConnector;
pub use types::{Row, Value};

use crate::error::Result;
use async_trait::async_trait;

/// Opens fresh database connections.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Opens a new connection.
    async fn connect(&self) -> Result<Box<dyn DatabaseConnection>>;
}

/// A single open database connection.
#[async_trait]
pub trait DatabaseConnection: Send {
    /// Executes a statement and returns every row it produced.
    async fn fetch_rows(&mut self, sql: &str) -> Result<Vec<Row>>;

    /// Closes the connection. Further calls fail.
    async fn close(&mut self) -> Result<()>;
}
