//! Error types for the query layer.

/// Errors produced while translating a typed query.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The constraint tree nests deeper than the normalizer's bound.
    ///
    /// The bound keeps the rewrite provably terminating; real queries stay
    /// far below it.
    #[error("constraint tree nests deeper than the supported {max} levels")]
    DepthExceeded { max: usize },
}
