//! Class rewriting: name resolution and the per-class rewriter

pub mod class_rewriter;
pub mod error;
pub mod remapper;

pub use class_rewriter::{rewrite, ClassRewriter, RewrittenClass};
pub use error::{RewriteError, RewriteResult};
pub use remapper::{Remapper, RewriteStats};
