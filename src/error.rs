use thiserror::Error;

/// Failures surfaced by the tree and registry layers.
///
/// All three are synchronous, locally-originating errors; nothing in the
/// core performs I/O, so nothing here is retryable. The HTTP adapter maps
/// these onto status codes; the core itself never swallows one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The path string is malformed (missing leading separator, trailing
    /// separator, or an empty segment).
    #[error("invalid path `{path}`: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// The operation targeted a path with no node behind it.
    #[error("no node exists at `{0}`")]
    PathNotFound(String),

    /// A bind was attempted on a path whose edge already carries a model.
    #[error("a model is already bound at `{0}`")]
    AlreadyBound(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
