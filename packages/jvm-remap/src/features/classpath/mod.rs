//! Reference classpath: hierarchy and member ownership of referenced classes

pub mod class_info;
pub mod error;
pub mod index;

pub use class_info::{is_overridable, ClassInfo, MemberTable};
pub use error::{ClasspathError, ClasspathResult};
pub use index::{ArtifactSource, ClasspathIndex, MemberDeclaration, ReferenceArtifact};
