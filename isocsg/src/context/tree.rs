//! Standalone expression trees
use super::op::{BinaryOpcode, UnaryOpcode};
use crate::{var::Var, Error};
use arrayvec::ArrayVec;
use nalgebra::Affine3;
use std::sync::{Arc, LazyLock};

/// A single node in a [`Tree`]
///
/// This mirrors [`Op`](crate::context::Op), plus two lazy coordinate
/// substitutions which are resolved when the tree is imported into a
/// [`Context`](crate::Context).
#[derive(Debug)]
pub enum TreeOp {
    /// One of the spatial axes
    Input(Var),
    /// Constant value
    Const(f64),
    /// Unary operation
    Unary(UnaryOpcode, Arc<TreeOp>),
    /// Binary operation
    Binary(BinaryOpcode, Arc<TreeOp>, Arc<TreeOp>),
    /// `target`, with each axis replaced by the matching tree in `axes`
    Remap {
        /// Tree to remap
        target: Arc<TreeOp>,
        /// Replacements for X, Y, Z
        axes: [Arc<TreeOp>; 3],
    },
    /// `target`, evaluated at `mat * p`
    ///
    /// Nested affine maps are collapsed into a single node.
    Affine {
        /// Tree to remap
        target: Arc<TreeOp>,
        /// Map from outer to inner coordinates
        mat: Affine3<f64>,
    },
}

/// Placeholder swapped in for children while tearing down deep trees
static LEAF: LazyLock<Arc<TreeOp>> =
    LazyLock::new(|| Arc::new(TreeOp::Const(0.0)));

impl TreeOp {
    fn is_leaf(&self) -> bool {
        matches!(self, TreeOp::Input(..) | TreeOp::Const(..))
    }

    /// Returns child subtrees, with the remap target first
    pub(crate) fn children(&self) -> ArrayVec<&Arc<TreeOp>, 4> {
        let mut out = ArrayVec::new();
        match self {
            TreeOp::Input(..) | TreeOp::Const(..) => (),
            TreeOp::Unary(_, a) | TreeOp::Affine { target: a, .. } => {
                out.push(a)
            }
            TreeOp::Binary(_, a, b) => out.extend([a, b]),
            TreeOp::Remap { target, axes } => {
                out.push(target);
                out.extend(axes.iter());
            }
        }
        out
    }

    /// Detaches every child, replacing it with [`LEAF`]
    fn take_children(&mut self) -> ArrayVec<Arc<TreeOp>, 4> {
        let mut out = ArrayVec::new();
        let mut take = |c: &mut Arc<TreeOp>| {
            out.push(std::mem::replace(c, LEAF.clone()))
        };
        match self {
            TreeOp::Input(..) | TreeOp::Const(..) => (),
            TreeOp::Unary(_, a) | TreeOp::Affine { target: a, .. } => take(a),
            TreeOp::Binary(_, a, b) => {
                take(a);
                take(b);
            }
            TreeOp::Remap { target, axes } => {
                take(target);
                axes.iter_mut().for_each(take);
            }
        }
        out
    }
}

impl Drop for TreeOp {
    /// Drops on the heap rather than the stack, so long chains (e.g. a few
    /// million chained additions) can't overflow it
    fn drop(&mut self) {
        if self.children().iter().all(|c| c.is_leaf()) {
            return;
        }
        let mut todo: Vec<_> = self.take_children().into_iter().collect();
        while let Some(c) = todo.pop() {
            if let Some(mut inner) = Arc::into_inner(c) {
                todo.extend(inner.take_children());
            }
        }
    }
}

/// Owned handle for a standalone math tree
///
/// Trees are immutable; every operation returns a new tree which shares its
/// operands by reference count.
#[derive(Clone, Debug)]
pub struct Tree(Arc<TreeOp>);

impl std::ops::Deref for Tree {
    type Target = TreeOp;
    fn deref(&self) -> &TreeOp {
        &self.0
    }
}

impl From<f64> for Tree {
    fn from(v: f64) -> Tree {
        Tree::constant(v)
    }
}

impl From<Var> for Tree {
    fn from(v: Var) -> Tree {
        Tree::var(v)
    }
}

macro_rules! unary_methods {
    ($($name:ident => $op:ident),* $(,)?) => {
        $(
            #[doc = concat!("Returns `", stringify!($name), "(self)`")]
            pub fn $name(&self) -> Self {
                Self::unary(UnaryOpcode::$op, self.clone())
            }
        )*
    };
}

macro_rules! binary_methods {
    ($($name:ident => $op:ident),* $(,)?) => {
        $(
            #[doc = concat!("Returns `", stringify!($name), "(self, other)`")]
            pub fn $name<T: Into<Tree>>(&self, other: T) -> Self {
                Self::binary(BinaryOpcode::$op, self.clone(), other)
            }
        )*
    };
}

impl Tree {
    /// Returns the X axis
    pub fn x() -> Self {
        Self::var(Var::X)
    }
    /// Returns the Y axis
    pub fn y() -> Self {
        Self::var(Var::Y)
    }
    /// Returns the Z axis
    pub fn z() -> Self {
        Self::var(Var::Z)
    }
    /// Returns an `(x, y, z)` tuple
    pub fn axes() -> (Self, Self, Self) {
        (Self::x(), Self::y(), Self::z())
    }
    /// Returns the given axis
    pub fn var(v: Var) -> Self {
        Self(Arc::new(TreeOp::Input(v)))
    }
    /// Returns a constant
    pub fn constant(f: f64) -> Self {
        Self(Arc::new(TreeOp::Const(f)))
    }
    /// Applies a unary operation
    pub fn unary(op: UnaryOpcode, a: Tree) -> Self {
        Self(Arc::new(TreeOp::Unary(op, a.0)))
    }
    /// Applies a binary operation
    pub fn binary<A: Into<Tree>, B: Into<Tree>>(
        op: BinaryOpcode,
        a: A,
        b: B,
    ) -> Self {
        Self(Arc::new(TreeOp::Binary(op, a.into().0, b.into().0)))
    }

    unary_methods!(
        square => Square,
        sqrt => Sqrt,
        abs => Abs,
        recip => Recip,
        sin => Sin,
        cos => Cos,
        tan => Tan,
        asin => Asin,
        acos => Acos,
        atan => Atan,
        exp => Exp,
        ln => Ln,
    );

    binary_methods!(
        min => Min,
        max => Max,
        pow => Pow,
        atan2 => Atan2,
        greater_than => GreaterThan,
        less_than => LessThan,
    );

    /// Checks whether two handles share the same node
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Returns the node pointer, used as an identity during import
    pub(crate) fn as_ptr(&self) -> *const TreeOp {
        Arc::as_ptr(&self.0)
    }

    pub(crate) fn arc(&self) -> &Arc<TreeOp> {
        &self.0
    }

    /// Returns the constant value, if this is a constant tree
    pub fn as_const(&self) -> Option<f64> {
        match *self.0 {
            TreeOp::Const(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the axis, if this is an input tree
    pub fn as_var(&self) -> Option<Var> {
        match *self.0 {
            TreeOp::Input(v) => Some(v),
            _ => None,
        }
    }

    /// Replaces the X, Y, Z axes with the given trees
    ///
    /// Substitution is lazy and happens when the tree is imported into a
    /// [`Context`](crate::Context).  Use [`remap_affine`](Self::remap_affine)
    /// for affine maps, since those can be collapsed.
    pub fn remap_xyz(&self, x: Tree, y: Tree, z: Tree) -> Tree {
        Self(Arc::new(TreeOp::Remap {
            target: self.0.clone(),
            axes: [x.0, y.0, z.0],
        }))
    }

    /// Replaces every occurrence of `axis` with `replacement`
    ///
    /// ```
    /// # use isocsg::{context::Tree, var::Var};
    /// let t = Tree::x() * 2.0;
    /// let r = t.substitute(Var::X, -Tree::y());
    /// assert_eq!(r.eval_xyz(0.0, 3.0, 0.0)?, -6.0);
    /// # Ok::<(), isocsg::Error>(())
    /// ```
    pub fn substitute(&self, axis: Var, replacement: Tree) -> Tree {
        let mut axes = [Self::x(), Self::y(), Self::z()];
        axes[axis.index()] = replacement;
        let [x, y, z] = axes;
        self.remap_xyz(x, y, z)
    }

    /// Evaluates `self` at `mat * p` for each point `p`
    ///
    /// Applying this to a tree which is itself an affine remap composes the
    /// two matrices, so chains of transforms stay one node deep.
    pub fn remap_affine(&self, mat: Affine3<f64>) -> Tree {
        let op = match &*self.0 {
            TreeOp::Affine { target, mat: inner } => TreeOp::Affine {
                target: target.clone(),
                mat: inner * mat,
            },
            _ => TreeOp::Affine {
                target: self.0.clone(),
                mat,
            },
        };
        Self(Arc::new(op))
    }

    /// Raises the tree to an integer power, by repeated squaring
    ///
    /// Negative exponents take the reciprocal first; `powi(0)` is the
    /// constant 1.
    pub fn powi(&self, n: i32) -> Self {
        let mut base = if n < 0 { self.recip() } else { self.clone() };
        let mut e = n.unsigned_abs();
        let mut acc: Option<Tree> = None;
        while e > 0 {
            if e & 1 == 1 {
                acc = Some(match acc {
                    Some(a) => a * base.clone(),
                    None => base.clone(),
                });
            }
            e >>= 1;
            if e > 0 {
                base = base.square();
            }
        }
        acc.unwrap_or_else(|| Self::constant(1.0))
    }

    /// Evaluates the tree at a single point
    ///
    /// This builds a temporary [`Context`](crate::Context), so it's only
    /// appropriate for spot checks; use [`eval::evaluate`](crate::eval::evaluate)
    /// for batches of points.
    pub fn eval_xyz(&self, x: f64, y: f64, z: f64) -> Result<f64, Error> {
        let mut ctx = crate::Context::new();
        let node = ctx.import(self)?;
        ctx.eval_xyz(node, x, y, z)
    }
}

macro_rules! arith_ops {
    ($($trait:ident::$method:ident => $op:ident),* $(,)?) => {
        $(
            impl<T: Into<Tree>> std::ops::$trait<T> for Tree {
                type Output = Tree;
                fn $method(self, rhs: T) -> Tree {
                    Tree::binary(BinaryOpcode::$op, self, rhs)
                }
            }
            impl std::ops::$trait<Tree> for f64 {
                type Output = Tree;
                fn $method(self, rhs: Tree) -> Tree {
                    Tree::binary(BinaryOpcode::$op, self, rhs)
                }
            }
        )*
    };
}

arith_ops!(Add::add => Add, Sub::sub => Sub, Mul::mul => Mul, Div::div => Div);

impl std::ops::Neg for Tree {
    type Output = Tree;
    fn neg(self) -> Tree {
        Tree::unary(UnaryOpcode::Neg, self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Context;
    use nalgebra::{Rotation3, Vector3};

    fn rotation(deg: f64) -> Affine3<f64> {
        nalgebra::convert(Rotation3::from_axis_angle(
            &Vector3::z_axis(),
            deg.to_radians(),
        ))
    }

    #[test]
    fn shared_subtrees_import_once() {
        let r = (Tree::x().square() + Tree::y().square()).sqrt();
        let ring = (r.clone() - 2.0).abs() - 0.25;
        let twice = ring.clone().min(ring.clone() + r);

        let mut ctx = Context::new();
        let a = ctx.import(&twice).unwrap();
        let n = ctx.len();
        let b = ctx.import(&twice).unwrap();
        assert_eq!(a, b);
        assert_eq!(ctx.len(), n);
        assert_eq!(twice.eval_xyz(2.0, 0.0, 0.0).unwrap(), -0.25);
    }

    #[test]
    fn substitute_each_axis() {
        let t = Tree::x() - 2.0 * Tree::y() + 3.0 * Tree::z();
        assert_eq!(t.eval_xyz(1.0, 1.0, 1.0).unwrap(), 2.0);

        let sx = t.substitute(Var::X, Tree::constant(10.0));
        assert_eq!(sx.eval_xyz(1.0, 1.0, 1.0).unwrap(), 11.0);
        let sy = t.substitute(Var::Y, Tree::z());
        assert_eq!(sy.eval_xyz(1.0, 5.0, 2.0).unwrap(), 3.0);
        let sz = t.substitute(Var::Z, -Tree::x());
        assert_eq!(sz.eval_xyz(1.0, 0.0, 4.0).unwrap(), -2.0);

        // The input tree is unchanged
        assert_eq!(t.eval_xyz(1.0, 1.0, 1.0).unwrap(), 2.0);
    }

    #[test]
    fn nested_substitution() {
        // Swap X and Y, then shift X in the swapped tree
        let t = Tree::x() * 10.0 + Tree::y();
        let swapped = t.remap_xyz(Tree::y(), Tree::x(), Tree::z());
        let shifted = swapped.substitute(Var::X, Tree::x() + 1.0);
        assert_eq!(swapped.eval_xyz(1.0, 2.0, 0.0).unwrap(), 21.0);
        assert_eq!(shifted.eval_xyz(1.0, 2.0, 0.0).unwrap(), 22.0);
    }

    #[test]
    fn affine_maps_collapse() {
        let t = Tree::x()
            .remap_affine(rotation(30.0))
            .remap_affine(rotation(60.0));
        let TreeOp::Affine { target, .. } = &*t else {
            panic!("expected a single affine node");
        };
        assert!(matches!(**target, TreeOp::Input(Var::X)));

        // Evaluating x at rot(90°) * p gives -y
        let v = t.eval_xyz(0.0, 2.0, 0.0).unwrap();
        assert!((v + 2.0).abs() < 1e-12, "{v}");
    }

    #[test]
    fn reflect_then_rotate() {
        let mirror: Affine3<f64> =
            nalgebra::convert(nalgebra::Scale3::new(-1.0, 1.0, 1.0));
        let t = Tree::x() + 2.0 * Tree::y();

        // Mirroring twice is the identity
        let tt = t.remap_affine(mirror).remap_affine(mirror);
        assert_eq!(tt.eval_xyz(3.0, -1.0, 0.0).unwrap(), 1.0);

        // Composition order matters: the outer map applies to p first
        let a = t.remap_affine(mirror).remap_affine(rotation(90.0));
        let b = t.remap_affine(rotation(90.0)).remap_affine(mirror);
        let va = a.eval_xyz(1.0, 0.0, 0.0).unwrap();
        let vb = b.eval_xyz(1.0, 0.0, 0.0).unwrap();
        assert!((va - 2.0).abs() < 1e-12, "{va}");
        assert!((vb + 2.0).abs() < 1e-12, "{vb}");
    }

    #[test]
    fn long_chains() {
        let mut t = Tree::x();
        for i in 0..500_000 {
            t = if i % 2 == 0 { t + 1.0 } else { t - 0.5 };
        }
        let mut ctx = Context::new();
        let n = ctx.import(&t).unwrap();
        assert_eq!(ctx.eval_xyz(n, 0.0, 0.0, 0.0).unwrap(), 125_000.0);
        drop(t);
    }

    #[test]
    fn integer_powers() {
        let three = Tree::constant(3.0);
        assert_eq!(three.powi(5).eval_xyz(0.0, 0.0, 0.0).unwrap(), 243.0);
        let half = Tree::constant(2.0).powi(-3);
        assert_eq!(half.eval_xyz(0.0, 0.0, 0.0).unwrap(), 0.125);
        assert_eq!(three.powi(0).as_const(), Some(1.0));

        let x = Tree::x().powi(7);
        assert_eq!(x.eval_xyz(-2.0, 0.0, 0.0).unwrap(), -128.0);

        // Extreme exponents build a (short) tree without overflowing
        let tiny = Tree::constant(2.0).powi(i32::MIN);
        assert_eq!(tiny.eval_xyz(0.0, 0.0, 0.0).unwrap(), 0.0);
        let huge = Tree::constant(2.0).powi(i32::MAX);
        assert_eq!(huge.eval_xyz(0.0, 0.0, 0.0).unwrap(), f64::INFINITY);
    }

    #[test]
    fn domain_policy() {
        let t = (1.0 - Tree::x().square()).sqrt();
        assert_eq!(t.eval_xyz(0.0, 0.0, 0.0).unwrap(), 1.0);
        assert!(matches!(
            t.eval_xyz(2.0, 0.0, 0.0),
            Err(Error::NumericDomain { op: "sqrt", .. })
        ));

        // Undefined results without a domain check stay NaN through min/max
        let nan = Tree::x() / Tree::x();
        let u = nan.clone().min(-1.0).max(Tree::y());
        assert!(nan.eval_xyz(0.0, 0.0, 0.0).unwrap().is_nan());
        assert!(u.eval_xyz(0.0, -5.0, 0.0).unwrap().is_nan());
        assert_eq!(u.eval_xyz(1.0, -5.0, 0.0).unwrap(), -1.0);
    }
}
