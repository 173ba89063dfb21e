//! Query execution for the health agent.
//!
//! Isolates guarded SQL execution and result shaping from the agent loop.

pub mod executor;

pub use executor::{QueryExecutor, QueryResult};
