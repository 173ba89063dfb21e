//! Integration tests for health-agent.

pub mod agent_test;
pub mod executor_test;
pub mod guard_test;
