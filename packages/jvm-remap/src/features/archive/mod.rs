//! Archive Transformer: remaps every class entry of a jar

pub mod entry;
pub mod transformer;

pub use entry::{read_entries, write_entries, ArchiveEntry};
pub use transformer::{ArchiveTransformer, CancellationToken, TransformReport};
