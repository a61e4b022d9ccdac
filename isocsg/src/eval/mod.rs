//! Evaluation of math expressions over batches of points
//!
//! Before evaluation, an expression is flattened into a [`Tape`], which is a
//! straight-line list of instructions.  A [`FloatSliceEval`] then runs the
//! tape over slices of `x`, `y`, `z` coordinates.
//!
//! Tapes are immutable and `Send + Sync`, so a single tape can be shared by
//! many evaluators (e.g. one per worker thread).
//!
//! # Domain errors
//! Operations with a restricted domain (`sqrt`, `ln`, `asin`, `acos`, and
//! `pow` with a negative base) return [`Error::NumericDomain`] when evaluated
//! outside of it.  Values are never clamped, because a silently-clamped value
//! would corrupt downstream geometry.  `NaN` inputs are not an error and
//! propagate through evaluation.
use crate::{context::Tree, Context, Error};
use nalgebra::Point3;

mod float_slice;
mod tape;

pub use float_slice::FloatSliceEval;
pub use tape::{Tape, TapeOp};

/// Evaluates a tree at many points, given as separate coordinate slices
///
/// ```
/// # use isocsg::{context::Tree, eval};
/// let t = Tree::x() * Tree::y();
/// let out = eval::evaluate(&t, &[1.0, 2.0], &[3.0, 4.0], &[0.0, 0.0])?;
/// assert_eq!(out, [3.0, 8.0]);
/// # Ok::<(), isocsg::Error>(())
/// ```
pub fn evaluate(
    tree: &Tree,
    xs: &[f64],
    ys: &[f64],
    zs: &[f64],
) -> Result<Vec<f64>, Error> {
    let mut ctx = Context::new();
    let root = ctx.import(tree)?;
    let tape = Tape::new(&ctx, root)?;
    let mut eval = FloatSliceEval::new();
    Ok(eval.eval(&tape, xs, ys, zs)?.to_vec())
}

/// Evaluates a tree at a batch of 3D points
pub fn evaluate_points(
    tree: &Tree,
    points: &[Point3<f64>],
) -> Result<Vec<f64>, Error> {
    let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
    let zs: Vec<f64> = points.iter().map(|p| p.z).collect();
    evaluate(tree, &xs, &ys, &zs)
}
