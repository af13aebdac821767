//! Common test utilities for integration tests.

pub mod generator;
pub mod harness;

pub use generator::FakeGenerator;
pub use harness::TestHarness;
