//! Input variables to math expressions
//!
//! A [`Var`] maintains a persistent identity from
//! [`Tree`](crate::context::Tree) to [`Context`](crate::context::Context)
//! (where it is wrapped in an [`Op::Input`](crate::context::Op::Input)) to
//! evaluation, where every tape reads the same three coordinate slices.
use serde::{Deserialize, Serialize};

/// A spatial coordinate used as an input to a math expression
#[allow(missing_docs)]
#[derive(
    Copy,
    Clone,
    Debug,
    Hash,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    strum::EnumIter,
)]
pub enum Var {
    X,
    Y,
    Z,
}

impl Var {
    /// Returns the axis index (0 for X, 1 for Y, 2 for Z)
    pub fn index(&self) -> usize {
        match self {
            Var::X => 0,
            Var::Y => 1,
            Var::Z => 2,
        }
    }

    /// Looks up a variable by axis index
    pub fn from_index(i: usize) -> Option<Self> {
        match i {
            0 => Some(Var::X),
            1 => Some(Var::Y),
            2 => Some(Var::Z),
            _ => None,
        }
    }
}

impl std::fmt::Display for Var {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Var::X => write!(f, "X"),
            Var::Y => write!(f, "Y"),
            Var::Z => write!(f, "Z"),
        }
    }
}
