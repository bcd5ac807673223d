//! Feature modules (vertical slices)
//!
//! ```text
//! mapping ──▶ classpath ──▶ rewrite ──▶ archive
//!                 ▲            │
//!                 └─ classfile ┘
//! ```

pub mod archive;
pub mod classfile;
pub mod classpath;
pub mod mapping;
pub mod rewrite;
