use crate::features::classfile::ClassFileError;
use crate::features::classpath::ClasspathError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RewriteError {
    /// The input is not a structurally valid class
    #[error(transparent)]
    Malformed(#[from] ClassFileError),

    #[error(transparent)]
    Classpath(#[from] ClasspathError),
}

pub type RewriteResult<T> = Result<T, RewriteError>;
