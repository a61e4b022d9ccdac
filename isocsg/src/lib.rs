//! `isocsg` is a small engine for constructive solid geometry on implicit
//! surfaces.
//!
//! An **implicit surface** is a function `f(x, y, z)`, where `x`, `y`, and `z`
//! represent a position in space.  By convention, if `f(x, y, z) < 0`, then
//! that position is **inside** the shape; if it's `> 0`, then that position is
//! **outside** the shape; otherwise, it's on the boundary of the shape.
//!
//! # Expression construction
//! Expressions are built as [`Tree`](crate::context::Tree)s, which are cheap
//! to clone and share their subexpressions:
//! ```
//! use isocsg::context::Tree;
//!
//! let (x, y, _) = Tree::axes();
//! let circle = (x.square() + y.square()).sqrt() - 1.0;
//! assert_eq!(circle.eval_xyz(0.0, 0.0, 0.0)?, -1.0);
//! # Ok::<(), isocsg::Error>(())
//! ```
//!
//! Before evaluation, trees are imported into a
//! [`Context`](crate::context::Context).  A context serves as an arena-style
//! allocator, doing local deduplication and other simple optimizations (e.g.
//! constant folding).  Only simplifications which preserve results exactly
//! are applied.
//!
//! # Shapes
//! A [`Shape`](crate::shape::Shape) is a tree annotated with a bounding
//! region and a few other bits of metadata.  Shapes are combined with
//! boolean operations and transformed with affine maps; the
//! [`shapes`](crate::shapes) module provides common primitives.
//! ```
//! use isocsg::shapes::{circle, rectangle};
//!
//! let plate = rectangle(-2.0, 2.0, -1.0, 1.0);
//! let hole = circle(0.0, 0.0, 0.5);
//! let part = plate.difference(&hole).rotate(30.0);
//! assert!(part.eval([0.0, 0.0])? > 0.0);
//! # Ok::<(), isocsg::Error>(())
//! ```
//!
//! # Evaluation
//! The [`eval`](crate::eval) module flattens expressions into straight-line
//! tapes and evaluates them over batches of points.
//!
//! # Meshing
//! The [`mesh`](crate::mesh) module samples shapes on a regular lattice and
//! extracts their boundaries, as contours (in 2D) or triangle meshes (in 3D).
//! ```
//! use isocsg::{mesh::Settings, shapes::circle};
//!
//! let contour = circle(0.0, 0.0, 1.0).contour(32, &Settings::default())?;
//! assert_eq!(contour.polylines().len(), 1);
//! # Ok::<(), isocsg::Error>(())
//! ```
#![warn(missing_docs)]

pub mod context;
pub use context::Context;

pub mod eval;
pub mod mesh;
pub mod shape;
pub mod shapes;
pub mod var;

mod error;
pub use error::Error;
