//! Infrastructure for representing math expressions as graphs
//!
//! There are two representations of a math expression:
//! - A [`Tree`] is a standalone, reference-counted expression.  It is cheap to
//!   clone and to combine, and is the type passed around by
//!   [`Shape`](crate::shape::Shape).
//! - A [`Context`] is an arena which deduplicates and constant-folds
//!   operations.  Trees are imported into a context before evaluation.
mod indexed;
mod op;
mod tree;

use indexed::{define_index, Index, IndexMap, IndexVec};
pub use op::{BinaryOpcode, Op, UnaryOpcode};
pub use tree::{Tree, TreeOp};

use crate::{var::Var, Error};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use ordered_float::OrderedFloat;

define_index!(Node, "An index in the `Context::ops` map");

/// A `Context` holds a set of deduplicated constants, variables, and
/// operations.
///
/// It should be used like an arena allocator: it grows over time, then frees
/// all of its contents when dropped.
#[derive(Debug, Default)]
pub struct Context {
    ops: IndexMap<Op, Node>,
}

impl Context {
    /// Build a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the context
    ///
    /// All [`Node`] handles from this context are invalidated.
    ///
    /// ```
    /// # use isocsg::context::Context;
    /// let mut ctx = Context::new();
    /// let x = ctx.x();
    /// ctx.clear();
    /// assert!(ctx.eval_xyz(x, 1.0, 0.0, 0.0).is_err());
    /// ```
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Returns the number of [`Op`] nodes in the context
    ///
    /// ```
    /// # use isocsg::context::Context;
    /// let mut ctx = Context::new();
    /// let x = ctx.x();
    /// assert_eq!(ctx.len(), 1);
    /// let y = ctx.y();
    /// assert_eq!(ctx.len(), 2);
    /// ctx.clear();
    /// assert_eq!(ctx.len(), 0);
    /// ```
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Checks whether the context is empty
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Checks whether the given [`Node`] is valid in this context
    fn check_node(&self, node: Node) -> Result<(), Error> {
        self.get_op(node).ok_or(Error::BadNode).map(|_| ())
    }

    /// Looks up the constant associated with the given node.
    ///
    /// If the node is invalid for this tree, returns an error; if the node is
    /// not a constant, returns `Ok(None)`.
    pub fn const_value(&self, n: Node) -> Result<Option<f64>, Error> {
        match self.get_op(n) {
            Some(Op::Const(c)) => Ok(Some(c.0)),
            Some(_) => Ok(None),
            _ => Err(Error::BadNode),
        }
    }

    /// Looks up the variable associated with the given node.
    ///
    /// If the node is invalid for this tree, returns an error; if the node is
    /// not an `Op::Input`, returns `Ok(None)`.
    pub fn get_var(&self, n: Node) -> Result<Option<Var>, Error> {
        match self.get_op(n) {
            Some(Op::Input(v)) => Ok(Some(*v)),
            Some(_) => Ok(None),
            _ => Err(Error::BadNode),
        }
    }

    /// Looks up an operation by `Node` handle
    pub fn get_op(&self, node: Node) -> Option<&Op> {
        self.ops.get_by_index(node)
    }

    ////////////////////////////////////////////////////////////////////////////
    // Primitives
    /// Constructs or finds a variable node for the given axis
    pub fn var(&mut self, v: Var) -> Node {
        self.ops.insert(Op::Input(v))
    }

    /// Constructs or finds the `X` input node
    /// ```
    /// # use isocsg::context::Context;
    /// let mut ctx = Context::new();
    /// let x = ctx.x();
    /// let v = ctx.eval_xyz(x, 1.0, 0.0, 0.0).unwrap();
    /// assert_eq!(v, 1.0);
    /// ```
    pub fn x(&mut self) -> Node {
        self.var(Var::X)
    }

    /// Constructs or finds the `Y` input node
    pub fn y(&mut self) -> Node {
        self.var(Var::Y)
    }

    /// Constructs or finds the `Z` input node
    pub fn z(&mut self) -> Node {
        self.var(Var::Z)
    }

    /// Returns a node representing the given constant value.
    /// ```
    /// # let mut ctx = isocsg::context::Context::new();
    /// let v = ctx.constant(3.0);
    /// assert_eq!(ctx.eval_xyz(v, 0.0, 0.0, 0.0).unwrap(), 3.0);
    /// ```
    pub fn constant(&mut self, f: f64) -> Node {
        self.ops.insert(Op::Const(OrderedFloat(f)))
    }

    ////////////////////////////////////////////////////////////////////////////
    // Generic builders, with constant folding and exact simplification

    /// Find or create a [`Node`] for the given unary operation
    ///
    /// If the argument is a constant, the result is folded into a new
    /// constant; folding uses the same domain checks as evaluation, so (for
    /// example) `sqrt(-1)` returns [`Error::NumericDomain`].
    pub fn unary<A: IntoNode>(
        &mut self,
        op: UnaryOpcode,
        a: A,
    ) -> Result<Node, Error> {
        let a = a.into_node(self)?;
        let op_a = *self.get_op(a).ok_or(Error::BadNode)?;
        match (op, op_a) {
            (_, Op::Const(c)) => Ok(self.constant(op.apply(c.0)?)),
            (UnaryOpcode::Neg, Op::Unary(UnaryOpcode::Neg, inner)) => Ok(inner),
            _ => Ok(self.ops.insert(Op::Unary(op, a))),
        }
    }

    /// Find or create a [`Node`] for the given binary operation
    ///
    /// Only identities which are exact under IEEE-754 arithmetic are applied;
    /// for example, `x * 1` becomes `x`, but `x * 0` is kept as-is (because
    /// it is NaN when `x` is infinite).
    pub fn binary<A: IntoNode, B: IntoNode>(
        &mut self,
        op: BinaryOpcode,
        a: A,
        b: B,
    ) -> Result<Node, Error> {
        let a = a.into_node(self)?;
        let b = b.into_node(self)?;
        let ca = self.const_value(a)?;
        let cb = self.const_value(b)?;
        if let (Some(ca), Some(cb)) = (ca, cb) {
            return Ok(self.constant(op.apply(ca, cb)?));
        }
        match op {
            BinaryOpcode::Min | BinaryOpcode::Max if a == b => return Ok(a),
            BinaryOpcode::Mul if a == b => {
                return self.unary(UnaryOpcode::Square, a);
            }
            BinaryOpcode::Add if a == b => {
                return self.binary(BinaryOpcode::Mul, a, 2.0);
            }
            BinaryOpcode::Mul => match (ca, cb) {
                (Some(one), _) if one == 1.0 => return Ok(b),
                (_, Some(one)) if one == 1.0 => return Ok(a),
                _ => (),
            },
            BinaryOpcode::Div | BinaryOpcode::Pow => {
                if cb == Some(1.0) {
                    return Ok(a);
                }
            }
            BinaryOpcode::Sub => {
                if let Some(zero) = cb {
                    if zero == 0.0 && zero.is_sign_positive() {
                        return Ok(a);
                    }
                }
            }
            _ => (),
        }
        let (a, b) = if op.is_commutative() {
            (a.min(b), a.max(b))
        } else {
            (a, b)
        };
        Ok(self.ops.insert(Op::Binary(op, a, b)))
    }
}

macro_rules! context_unary {
    ($($name:ident => $op:ident),* $(,)?) => {
        /// Named builders for unary operations
        ///
        /// See [`Context::unary`] for details on simplification.
        impl Context {
            $(
                #[doc = concat!("Builds a `", stringify!($name), "` node")]
                pub fn $name<A: IntoNode>(
                    &mut self,
                    a: A,
                ) -> Result<Node, Error> {
                    self.unary(UnaryOpcode::$op, a)
                }
            )*
        }
    };
}

macro_rules! context_binary {
    ($($name:ident => $op:ident),* $(,)?) => {
        /// Named builders for binary operations
        ///
        /// See [`Context::binary`] for details on simplification.
        impl Context {
            $(
                #[doc = concat!("Builds a `", stringify!($name), "` node")]
                pub fn $name<A: IntoNode, B: IntoNode>(
                    &mut self,
                    a: A,
                    b: B,
                ) -> Result<Node, Error> {
                    self.binary(BinaryOpcode::$op, a, b)
                }
            )*
        }
    };
}

context_unary!(
    neg => Neg,
    abs => Abs,
    recip => Recip,
    sqrt => Sqrt,
    square => Square,
    sin => Sin,
    cos => Cos,
    tan => Tan,
    asin => Asin,
    acos => Acos,
    atan => Atan,
    exp => Exp,
    ln => Ln,
);

context_binary!(
    add => Add,
    sub => Sub,
    mul => Mul,
    div => Div,
    pow => Pow,
    atan2 => Atan2,
    min => Min,
    max => Max,
    greater_than => GreaterThan,
    less_than => LessThan,
);

impl Context {
    ////////////////////////////////////////////////////////////////////////////

    /// Returns every node reachable from `root`, children before parents
    ///
    /// The walk is done on the heap, to protect against stack overflows.
    pub(crate) fn topo_order(&self, root: Node) -> Result<Vec<Node>, Error> {
        self.check_node(root)?;

        enum Action {
            Down,
            Up,
        }
        let mut seen = vec![false; self.len()];
        let mut todo = vec![(Action::Down, root)];
        let mut out = vec![];
        while let Some((action, node)) = todo.pop() {
            match action {
                Action::Down => {
                    if seen[node.get()] {
                        continue;
                    }
                    seen[node.get()] = true;
                    todo.push((Action::Up, node));
                    let op = self.get_op(node).ok_or(Error::BadNode)?;
                    todo.extend(op.iter_children().map(|c| (Action::Down, c)));
                }
                Action::Up => out.push(node),
            }
        }
        Ok(out)
    }

    /// Remaps the X, Y, Z nodes to the given values
    ///
    /// ```
    /// # use isocsg::context::Context;
    /// let mut ctx = Context::new();
    /// let x = ctx.x();
    /// let y = ctx.y();
    /// let z = ctx.z();
    /// let s = ctx.add(x, 1.0)?;
    /// let v = ctx.remap_xyz(s, [y, y, z])?;
    /// assert_eq!(ctx.eval_xyz(v, 0.0, 1.0, 0.0)?, 2.0);
    /// # Ok::<(), isocsg::Error>(())
    /// ```
    pub fn remap_xyz(
        &mut self,
        root: Node,
        xyz: [Node; 3],
    ) -> Result<Node, Error> {
        xyz.iter().try_for_each(|n| self.check_node(*n))?;
        let order = self.topo_order(root)?;

        let mut done: BTreeMap<Node, Node> = BTreeMap::new();
        for node in order {
            let op = *self.get_op(node).ok_or(Error::BadNode)?;
            let r = match op {
                Op::Binary(op, lhs, rhs) => {
                    self.binary(op, done[&lhs], done[&rhs])?
                }
                Op::Unary(op, arg) => self.unary(op, done[&arg])?,
                Op::Const(..) => node,
                Op::Input(v) => xyz[v.index()],
            };
            done.insert(node, r);
        }
        Ok(done[&root])
    }

    /// Imports the given tree, deduplicating and resolving lazy remappings
    ///
    /// Shared subtrees (by pointer) are only imported once, unless they sit
    /// beneath different remappings.
    ///
    /// ```
    /// # use isocsg::context::{Context, Tree};
    /// let t = Tree::x().square() + Tree::y().square();
    /// let mut ctx = Context::new();
    /// let n = ctx.import(&t)?;
    /// assert_eq!(ctx.eval_xyz(n, 3.0, 4.0, 0.0)?, 25.0);
    /// # Ok::<(), isocsg::Error>(())
    /// ```
    pub fn import(&mut self, tree: &Tree) -> Result<Node, Error> {
        enum Action<'a> {
            Down(&'a Arc<TreeOp>),
            Up(&'a Arc<TreeOp>),
        }
        let mut seen: HashMap<*const TreeOp, Node> = HashMap::new();
        let mut todo = vec![Action::Down(tree.arc())];

        while let Some(action) = todo.pop() {
            match action {
                Action::Down(t) => {
                    if seen.contains_key(&Arc::as_ptr(t)) {
                        continue;
                    }
                    todo.push(Action::Up(t));
                    todo.extend(t.children().into_iter().map(Action::Down));
                }
                Action::Up(t) => {
                    let ptr = Arc::as_ptr(t);
                    if seen.contains_key(&ptr) {
                        continue;
                    }
                    let get = |c: &Arc<TreeOp>| seen[&Arc::as_ptr(c)];
                    let node = match &**t {
                        TreeOp::Input(v) => self.var(*v),
                        TreeOp::Const(c) => self.constant(*c),
                        TreeOp::Unary(op, arg) => self.unary(*op, get(arg))?,
                        TreeOp::Binary(op, lhs, rhs) => {
                            self.binary(*op, get(lhs), get(rhs))?
                        }
                        TreeOp::Remap { target, axes } => {
                            let xyz = axes.each_ref().map(get);
                            self.remap_xyz(get(target), xyz)?
                        }
                        TreeOp::Affine { target, mat } => {
                            let target = get(target);
                            let xyz = self.affine_axes(mat)?;
                            self.remap_xyz(target, xyz)?
                        }
                    };
                    seen.insert(ptr, node);
                }
            }
        }
        Ok(seen[&tree.as_ptr()])
    }

    /// Builds nodes for `mat * [x, y, z, 1]`, skipping zero coefficients
    fn affine_axes(
        &mut self,
        mat: &nalgebra::Affine3<f64>,
    ) -> Result<[Node; 3], Error> {
        let m = mat.matrix();
        let axes = [self.x(), self.y(), self.z()];
        let mut out = axes;
        for (i, o) in out.iter_mut().enumerate() {
            let mut sum: Option<Node> = None;
            for (j, a) in axes.iter().enumerate() {
                let k = m[(i, j)];
                if k == 0.0 {
                    continue;
                }
                let term = self.mul(*a, k)?;
                sum = Some(match sum {
                    Some(s) => self.add(s, term)?,
                    None => term,
                });
            }
            let offset = m[(i, 3)];
            *o = match sum {
                Some(s) if offset == 0.0 => s,
                Some(s) => self.add(s, offset)?,
                None => self.constant(offset),
            };
        }
        Ok(out)
    }

    /// Converts a node back into a standalone [`Tree`]
    pub fn export(&self, root: Node) -> Result<Tree, Error> {
        let order = self.topo_order(root)?;
        let mut done: BTreeMap<Node, Tree> = BTreeMap::new();
        for node in order {
            let t = match *self.get_op(node).ok_or(Error::BadNode)? {
                Op::Input(v) => Tree::var(v),
                Op::Const(c) => Tree::constant(c.0),
                Op::Unary(op, arg) => Tree::unary(op, done[&arg].clone()),
                Op::Binary(op, lhs, rhs) => {
                    Tree::binary(op, done[&lhs].clone(), done[&rhs].clone())
                }
            };
            done.insert(node, t);
        }
        done.remove(&root).ok_or(Error::BadNode)
    }

    ////////////////////////////////////////////////////////////////////////////
    /// Evaluates the given node with the provided values for X, Y, and Z.
    ///
    /// This is inefficient for many points; consider building a
    /// [`Tape`](crate::eval::Tape) and a
    /// [`FloatSliceEval`](crate::eval::FloatSliceEval) instead.
    ///
    /// ```
    /// # let mut ctx = isocsg::context::Context::new();
    /// let x = ctx.x();
    /// let y = ctx.y();
    /// let z = ctx.z();
    /// let op = ctx.mul(x, y).unwrap();
    /// let op = ctx.div(op, z).unwrap();
    /// let v = ctx.eval_xyz(op, 3.0, 5.0, 2.0).unwrap();
    /// assert_eq!(v, 7.5); // (3.0 * 5.0) / 2.0
    /// ```
    pub fn eval_xyz(
        &self,
        root: Node,
        x: f64,
        y: f64,
        z: f64,
    ) -> Result<f64, Error> {
        let order = self.topo_order(root)?;
        let mut values: IndexVec<f64, Node> = vec![0.0; self.len()].into();
        let xyz = [x, y, z];
        for node in order {
            values[node] = match *self.get_op(node).ok_or(Error::BadNode)? {
                Op::Input(v) => xyz[v.index()],
                Op::Const(c) => c.0,
                Op::Unary(op, a) => op.apply(values[a])?,
                Op::Binary(op, a, b) => op.apply(values[a], values[b])?,
            };
        }
        Ok(values[root])
    }
}

////////////////////////////////////////////////////////////////////////////////
/// Helper trait for things that can be converted into a [`Node`] given a
/// [`Context`].
///
/// This trait allows you to write
/// ```
/// # let mut ctx = isocsg::context::Context::new();
/// let x = ctx.x();
/// let sum = ctx.add(x, 1.0).unwrap();
/// ```
/// instead of the more verbose
/// ```
/// # let mut ctx = isocsg::context::Context::new();
/// let x = ctx.x();
/// let num = ctx.constant(1.0);
/// let sum = ctx.add(x, num).unwrap();
/// ```
pub trait IntoNode {
    /// Converts the given values into a node
    fn into_node(self, ctx: &mut Context) -> Result<Node, Error>;
}

impl IntoNode for Node {
    fn into_node(self, ctx: &mut Context) -> Result<Node, Error> {
        ctx.check_node(self)?;
        Ok(self)
    }
}

impl IntoNode for f32 {
    fn into_node(self, ctx: &mut Context) -> Result<Node, Error> {
        Ok(ctx.constant(self as f64))
    }
}

impl IntoNode for f64 {
    fn into_node(self, ctx: &mut Context) -> Result<Node, Error> {
        Ok(ctx.constant(self))
    }
}

////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_works() {
        let mut ctx = Context::new();
        let x1 = ctx.x();
        let x2 = ctx.x();
        assert_eq!(x1, x2);

        let a = ctx.constant(1.0);
        let b = ctx.constant(1.0);
        assert_eq!(a, b);
        assert_eq!(ctx.const_value(a).unwrap(), Some(1.0));
        assert_eq!(ctx.const_value(x1).unwrap(), None);

        let c = ctx.add(a, b).unwrap();
        assert_eq!(ctx.const_value(c).unwrap(), Some(2.0));

        let c = ctx.neg(c).unwrap();
        assert_eq!(ctx.const_value(c).unwrap(), Some(-2.0));
    }

    #[test]
    fn test_get_op() {
        let mut ctx = Context::new();
        let x = ctx.x();
        let op_x = ctx.get_op(x).unwrap();
        assert!(matches!(op_x, Op::Input(Var::X)));
        assert_eq!(ctx.get_var(x).unwrap(), Some(Var::X));
    }

    #[test]
    fn test_constant_folding() {
        let mut ctx = Context::new();
        let a = ctx.constant(1.0);
        assert_eq!(ctx.len(), 1);
        let b = ctx.constant(-1.0);
        assert_eq!(ctx.len(), 2);
        let _ = ctx.add(a, b);
        assert_eq!(ctx.len(), 3);
        let _ = ctx.add(a, b);
        assert_eq!(ctx.len(), 3);
        let _ = ctx.mul(a, b);
        assert_eq!(ctx.len(), 3);
    }

    #[test]
    fn test_folding_domain_error() {
        let mut ctx = Context::new();
        let r = ctx.sqrt(-1.0);
        assert!(matches!(r, Err(Error::NumericDomain { op: "sqrt", .. })));
        let r = ctx.acos(2.0);
        assert!(matches!(r, Err(Error::NumericDomain { op: "acos", .. })));
    }

    #[test]
    fn test_dedup_commutative() {
        let mut ctx = Context::new();
        let x = ctx.x();
        let y = ctx.y();
        let a = ctx.add(x, y).unwrap();
        let b = ctx.add(y, x).unwrap();
        assert_eq!(a, b);

        let a = ctx.sub(x, y).unwrap();
        let b = ctx.sub(y, x).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_exact_identities() {
        let mut ctx = Context::new();
        let x = ctx.x();
        assert_eq!(ctx.mul(x, 1.0).unwrap(), x);
        assert_eq!(ctx.div(x, 1.0).unwrap(), x);
        assert_eq!(ctx.sub(x, 0.0).unwrap(), x);
        assert_eq!(ctx.min(x, x).unwrap(), x);

        let n = ctx.neg(x).unwrap();
        assert_eq!(ctx.neg(n).unwrap(), x);

        // `x * 0` is NaN for infinite `x`, so it must not be folded
        let z = ctx.mul(x, 0.0).unwrap();
        assert!(ctx.const_value(z).unwrap().is_none());
        assert!(ctx.eval_xyz(z, f64::INFINITY, 0.0, 0.0).unwrap().is_nan());

        let sq = ctx.mul(x, x).unwrap();
        assert!(matches!(
            ctx.get_op(sq).unwrap(),
            Op::Unary(UnaryOpcode::Square, _)
        ));
    }

    #[test]
    fn test_eval() {
        let mut ctx = Context::new();
        let x = ctx.x();
        let y = ctx.y();
        let v = ctx.add(x, y).unwrap();
        assert_eq!(ctx.eval_xyz(v, 2.0, 3.0, 0.0).unwrap(), 5.0);

        let s = ctx.sqrt(x).unwrap();
        assert!(ctx.eval_xyz(s, -1.0, 0.0, 0.0).is_err());
        assert_eq!(ctx.eval_xyz(s, 4.0, 0.0, 0.0).unwrap(), 2.0);
    }

    #[test]
    fn test_remap_xyz() {
        let mut ctx = Context::new();
        let x = ctx.x();
        let y = ctx.y();
        let z = ctx.z();

        let s = ctx.add(x, 1.0).unwrap();

        let v = ctx.remap_xyz(s, [y, y, z]).unwrap();
        assert_eq!(ctx.eval_xyz(v, 0.0, 1.0, 0.0).unwrap(), 2.0);

        let one = ctx.constant(3.0);
        let v = ctx.remap_xyz(s, [one, y, z]).unwrap();
        assert_eq!(ctx.eval_xyz(v, 0.0, 1.0, 0.0).unwrap(), 4.0);
        assert_eq!(ctx.const_value(v).unwrap(), Some(4.0));
    }

    #[test]
    fn test_export_roundtrip() {
        let mut ctx = Context::new();
        let x = ctx.x();
        let y = ctx.y();
        let a = ctx.atan2(y, x).unwrap();
        let b = ctx.max(a, 0.25).unwrap();

        let t = ctx.export(b).unwrap();
        let mut ctx2 = Context::new();
        let b2 = ctx2.import(&t).unwrap();
        for (px, py) in [(1.0, 0.0), (0.0, 1.0), (-1.0, -1.0)] {
            assert_eq!(
                ctx.eval_xyz(b, px, py, 0.0).unwrap(),
                ctx2.eval_xyz(b2, px, py, 0.0).unwrap()
            );
        }
    }

    #[test]
    fn test_bad_node() {
        let mut ctx = Context::new();
        let x = ctx.x();
        let mut other = Context::new();
        assert!(matches!(other.neg(x), Err(Error::BadNode)));
    }
}
