use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeedError {
    #[error("Unknown library '{0}' (expected one of: python, numpy, pytorch, tensorflow, jax)")]
    UnknownLibrary(String),
}
