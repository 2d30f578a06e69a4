// tests/integration/mod.rs

//! Integration tests for SpinelDB
//! 
//! These tests execute commands end-to-end with a real database instance,
//! verifying command execution, state changes, and data consistency.

pub mod test_helpers;
pub mod fixtures;
pub mod string_commands_test;

