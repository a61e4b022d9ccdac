use crate::{context::Node, var::Var, Error};
use ordered_float::OrderedFloat;

/// A one-argument math operation
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
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum UnaryOpcode {
    Neg,
    Abs,
    Recip,
    Sqrt,
    Square,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Exp,
    Ln,
}

/// A two-argument math operation
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
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum BinaryOpcode {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Atan2,
    Min,
    Max,
    /// Returns 1 if `lhs > rhs`, 0 otherwise
    GreaterThan,
    /// Returns 1 if `lhs < rhs`, 0 otherwise
    LessThan,
}

impl UnaryOpcode {
    /// Returns the name of this opcode
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Checks whether `a` lies in the domain of this operation
    ///
    /// NaN inputs are not flagged here; they propagate through evaluation.
    #[inline]
    pub fn check_domain(&self, a: f64) -> Result<(), Error> {
        let ok = match self {
            UnaryOpcode::Sqrt | UnaryOpcode::Ln => !(a < 0.0),
            UnaryOpcode::Asin | UnaryOpcode::Acos => !(a.abs() > 1.0),
            _ => true,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::NumericDomain {
                op: self.name(),
                value: a,
            })
        }
    }

    /// Applies the operation without a domain check
    #[inline]
    pub fn apply_unchecked(&self, a: f64) -> f64 {
        match self {
            UnaryOpcode::Neg => -a,
            UnaryOpcode::Abs => a.abs(),
            UnaryOpcode::Recip => 1.0 / a,
            UnaryOpcode::Sqrt => a.sqrt(),
            UnaryOpcode::Square => a * a,
            UnaryOpcode::Sin => a.sin(),
            UnaryOpcode::Cos => a.cos(),
            UnaryOpcode::Tan => a.tan(),
            UnaryOpcode::Asin => a.asin(),
            UnaryOpcode::Acos => a.acos(),
            UnaryOpcode::Atan => a.atan(),
            UnaryOpcode::Exp => a.exp(),
            UnaryOpcode::Ln => a.ln(),
        }
    }

    /// Applies the operation, returning an error outside its domain
    #[inline]
    pub fn apply(&self, a: f64) -> Result<f64, Error> {
        self.check_domain(a)?;
        Ok(self.apply_unchecked(a))
    }
}

impl BinaryOpcode {
    /// Returns the name of this opcode
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Checks whether `a op b` is commutative
    pub fn is_commutative(&self) -> bool {
        matches!(
            self,
            BinaryOpcode::Add
                | BinaryOpcode::Mul
                | BinaryOpcode::Min
                | BinaryOpcode::Max
        )
    }

    /// Applies the operation without a domain check
    ///
    /// A `NaN` operand always produces `NaN`, including for `min`, `max`,
    /// and `pow` (where IEEE would return the other operand or 1).
    #[inline]
    pub fn apply_unchecked(&self, a: f64, b: f64) -> f64 {
        if a.is_nan() || b.is_nan() {
            return f64::NAN;
        }
        match self {
            BinaryOpcode::Add => a + b,
            BinaryOpcode::Sub => a - b,
            BinaryOpcode::Mul => a * b,
            BinaryOpcode::Div => a / b,
            BinaryOpcode::Pow => a.powf(b),
            BinaryOpcode::Atan2 => a.atan2(b),
            BinaryOpcode::Min => a.min(b),
            BinaryOpcode::Max => a.max(b),
            BinaryOpcode::GreaterThan => (a > b) as u8 as f64,
            BinaryOpcode::LessThan => (a < b) as u8 as f64,
        }
    }

    /// Applies the operation, returning an error outside its domain
    ///
    /// Only `pow` has a restricted domain: a negative base with a
    /// non-integer exponent.
    #[inline]
    pub fn apply(&self, a: f64, b: f64) -> Result<f64, Error> {
        let out = self.apply_unchecked(a, b);
        if *self == BinaryOpcode::Pow
            && out.is_nan()
            && !a.is_nan()
            && !b.is_nan()
        {
            Err(Error::NumericDomain {
                op: self.name(),
                value: a,
            })
        } else {
            Ok(out)
        }
    }
}

/// Represents an operation in a math expression.
///
/// `Op`s should be constructed by calling functions on
/// [`Context`](crate::context::Context), e.g.
/// [`Context::add`](crate::context::Context::add) will generate an
/// `Op::Binary(BinaryOpcode::Add, .., ..)` node and return an opaque handle.
///
/// Each `Op` is tightly coupled to the [`Context`](crate::context::Context)
/// which generated it, and will not be valid for a different `Context`.
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum Op {
    Input(Var),
    Const(OrderedFloat<f64>),
    Binary(BinaryOpcode, Node, Node),
    Unary(UnaryOpcode, Node),
}

impl Op {
    /// Iterates over children, producing 0, 1, or 2 values
    pub fn iter_children(&self) -> impl Iterator<Item = Node> {
        let out = match self {
            Op::Binary(_, a, b) => [Some(*a), Some(*b)],
            Op::Unary(_, a) => [Some(*a), None],
            Op::Input(..) | Op::Const(..) => [None, None],
        };
        out.into_iter().flatten()
    }
}
