//! Bulk evaluation over slices of points
use super::tape::{Tape, TapeOp};
use crate::Error;

/// Evaluator for many points at once, returning one `f64` per point
///
/// Evaluation proceeds one tape instruction at a time over the whole batch,
/// so each node of the expression graph is computed exactly once per point
/// (shared subexpressions are shared in the tape).
///
/// The evaluator owns scratch memory and carries no other state; build one
/// per thread and reuse it across calls.
#[derive(Default)]
pub struct FloatSliceEval {
    /// Register data, `reg_count * n` values with register `r` at
    /// `[r * n, (r + 1) * n)`
    slots: Vec<f64>,
}

impl FloatSliceEval {
    /// Build a new empty evaluator
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates many points using the given instruction tape
    ///
    /// Returns [`Error::MismatchedSlices`] if the input slices have different
    /// lengths, and [`Error::NumericDomain`] for the first point (in input
    /// order) where an operation leaves its domain.
    ///
    /// ```
    /// # use isocsg::{context::Context, eval::{FloatSliceEval, Tape}};
    /// let mut ctx = Context::new();
    /// let x = ctx.x();
    /// let y = ctx.y();
    /// let sum = ctx.add(x, y)?;
    /// let tape = Tape::new(&ctx, sum)?;
    /// let mut eval = FloatSliceEval::new();
    /// let out = eval.eval(&tape, &[1.0, 2.0], &[10.0, 20.0], &[0.0, 0.0])?;
    /// assert_eq!(out, [11.0, 22.0]);
    /// # Ok::<(), isocsg::Error>(())
    /// ```
    pub fn eval(
        &mut self,
        tape: &Tape,
        xs: &[f64],
        ys: &[f64],
        zs: &[f64],
    ) -> Result<&[f64], Error> {
        if xs.len() != ys.len() || ys.len() != zs.len() {
            return Err(Error::MismatchedSlices);
        }
        let n = xs.len();
        self.slots.resize(tape.reg_count() * n, 0.0);
        let slots = &mut self.slots;
        let reg = |r: u32| r as usize * n;

        for op in tape.iter() {
            match *op {
                TapeOp::Input { out, var } => {
                    let src = [xs, ys, zs][var.index()];
                    let o = reg(out);
                    slots[o..o + n].copy_from_slice(src);
                }
                TapeOp::Const { out, value } => {
                    let o = reg(out);
                    slots[o..o + n].fill(value);
                }
                TapeOp::Unary { op, out, arg } => {
                    let (o, a) = (reg(out), reg(arg));
                    for i in 0..n {
                        slots[o + i] = op.apply(slots[a + i])?;
                    }
                }
                TapeOp::Binary { op, out, lhs, rhs } => {
                    let (o, a, b) = (reg(out), reg(lhs), reg(rhs));
                    for i in 0..n {
                        slots[o + i] = op.apply(slots[a + i], slots[b + i])?;
                    }
                }
            }
        }
        let o = reg(tape.output());
        Ok(&self.slots[o..o + n])
    }
}
