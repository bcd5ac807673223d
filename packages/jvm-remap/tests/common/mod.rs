//! Common test utilities for jvm-remap
//!
//! Builders for class files and jars, plus mapping fixtures shared by the
//! integration tests.

#![allow(dead_code)]

mod builders;
mod fixtures;

// Re-export all utilities
pub use builders::*;
pub use fixtures::*;
