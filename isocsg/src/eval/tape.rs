//! Straight-line instruction tapes
use crate::{
    context::{BinaryOpcode, Context, Node, Op, UnaryOpcode},
    var::Var,
    Error,
};

/// A single tape instruction
///
/// Registers are slots in the evaluator's scratch memory; each slot holds one
/// value per point in the batch being evaluated.
#[derive(Copy, Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum TapeOp {
    /// Copies an input coordinate into a register
    Input { out: u32, var: Var },
    /// Fills a register with a constant
    Const { out: u32, value: f64 },
    Unary {
        op: UnaryOpcode,
        out: u32,
        arg: u32,
    },
    Binary {
        op: BinaryOpcode,
        out: u32,
        lhs: u32,
        rhs: u32,
    },
}

/// Instruction tape, built from a [`Context`] node
///
/// The tape is in evaluation order: every instruction's arguments are written
/// by an earlier instruction.  Registers are reused once their value is dead,
/// so the register count is usually much smaller than the node count.
#[derive(Clone, Debug)]
pub struct Tape {
    ops: Vec<TapeOp>,
    reg_count: usize,
    output: u32,
}

impl Tape {
    /// Flattens a subtree of the graph into straight-line code.
    ///
    /// This should always succeed unless the `root` is from a different
    /// `Context`, in which case `Error::BadNode` will be returned.
    pub fn new(ctx: &Context, root: Node) -> Result<Self, Error> {
        let order = ctx.topo_order(root)?;

        // Position of each node in `order`, and its last use as an argument
        let mut position = vec![usize::MAX; ctx.len()];
        for (i, n) in order.iter().enumerate() {
            position[n.0] = i;
        }
        let mut last_use = vec![0; order.len()];
        for (i, n) in order.iter().enumerate() {
            let op = ctx.get_op(*n).ok_or(Error::BadNode)?;
            for c in op.iter_children() {
                last_use[position[c.0]] = i;
            }
        }

        // Cheap and cheerful single-pass register allocation
        let mut alloc = vec![u32::MAX; order.len()];
        let mut spare: Vec<u32> = vec![];
        let mut reg_count = 0u32;
        let mut ops = Vec::with_capacity(order.len());

        for (i, n) in order.iter().enumerate() {
            let op = *ctx.get_op(*n).ok_or(Error::BadNode)?;

            // Release registers whose last reader is this instruction, so that
            // the output can reuse one of them (evaluation is elementwise, so
            // in-place writes are safe).
            let mut args = [u32::MAX; 2];
            for (slot, c) in args.iter_mut().zip(op.iter_children()) {
                *slot = alloc[position[c.0]];
            }
            for c in op.iter_children() {
                let j = position[c.0];
                if last_use[j] == i && !spare.contains(&alloc[j]) {
                    spare.push(alloc[j]);
                }
            }
            let out = spare.pop().unwrap_or_else(|| {
                reg_count += 1;
                reg_count - 1
            });
            alloc[i] = out;

            ops.push(match op {
                Op::Input(var) => TapeOp::Input { out, var },
                Op::Const(c) => TapeOp::Const { out, value: c.0 },
                Op::Unary(op, _) => TapeOp::Unary {
                    op,
                    out,
                    arg: args[0],
                },
                Op::Binary(op, _, _) => TapeOp::Binary {
                    op,
                    out,
                    lhs: args[0],
                    rhs: args[1],
                },
            });
        }

        let output = alloc[position[root.0]];
        Ok(Self {
            ops,
            reg_count: reg_count as usize,
            output,
        })
    }

    /// Returns the number of instructions in the tape
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Checks whether the tape is empty (which never happens in practice)
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Returns the number of registers used by the tape
    pub fn reg_count(&self) -> usize {
        self.reg_count
    }

    /// Returns the register which holds the result after evaluation
    pub fn output(&self) -> u32 {
        self.output
    }

    /// Iterates over instructions in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = &TapeOp> {
        self.ops.iter()
    }
}
