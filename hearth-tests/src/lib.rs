//! # Hearth Tests
//!
//! Shared fixtures for exercising the lifecycle orchestrator without a
//! database or a real job runner: a scripted mock runner, builders for
//! execution records, and pre-wired engine/API fixtures over the
//! in-memory store.

pub mod builders;
pub mod fixtures;
pub mod mocks;

pub use builders::ExecutionBuilder;
pub use fixtures::{test_api, test_engine, test_platform, TestHarness};
pub use mocks::MockJobRunner;
