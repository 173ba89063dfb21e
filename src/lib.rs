//! health-agent - ask questions about a health database in plain language.
//!
//! This library exposes the core modules for use by the binary and
//! integration tests.

pub mod agent;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod query;
pub mod repl;
pub mod safety;
