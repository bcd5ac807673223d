//! Mapping domain types: namespaces, input tables and the merged model

mod model;
mod namespace;
mod table;

pub use model::{ClassMapping, MappingModel, MemberKind, MemberMapping};
pub use namespace::{Namespace, NamespaceError, NamespaceId};
pub use table::{ClassEntry, MappingTable, MemberEntry};
pub(crate) use table::name_cells;
