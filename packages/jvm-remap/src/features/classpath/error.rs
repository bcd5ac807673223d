use crate::features::mapping::NamespaceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClasspathError {
    #[error("cannot open reference artifact '{label}': {source}")]
    Io {
        label: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read reference archive '{label}': {source}")]
    Archive {
        label: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("reference artifact '{label}': {source}")]
    Namespace {
        label: String,
        #[source]
        source: NamespaceError,
    },
}

pub type ClasspathResult<T> = Result<T, ClasspathError>;
