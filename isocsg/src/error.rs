//! Module containing the universal error type
use thiserror::Error;

/// Universal error type for `isocsg`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Node is not present in this `Context`
    #[error("node is not present in this `Context`")]
    BadNode,

    /// Evaluation left the valid domain of an operation
    #[error("`{op}` is not defined for an argument of {value}")]
    NumericDomain {
        /// Name of the failing operation
        op: &'static str,
        /// Offending argument (or result, for binary operations)
        value: f64,
    },

    /// Region has zero, negative, or non-finite extent on some axis
    #[error("region has invalid extent on axis {axis} ([{lower}, {upper}])")]
    InvalidRegion {
        /// Index of the offending axis
        axis: usize,
        /// Lower bound on that axis
        lower: f64,
        /// Upper bound on that axis
        upper: f64,
    },

    /// Malformed argument to a combinator or sampler
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The shape has no bounding region, and none was provided
    #[error("shape has no bounding region")]
    MissingRegion,

    /// Input slice lengths are mismatched
    #[error("input slice lengths are mismatched")]
    MismatchedSlices,

    /// A fold over shapes was given no inputs
    #[error("cannot fold an empty list of shapes")]
    EmptyInput,
}
