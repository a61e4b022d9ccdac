//! Shapes: expression trees annotated with a bounding region
//!
//! A [`Shape`] wraps a [`Tree`] (whose sign gives inside / outside) together
//! with metadata that is used during meshing: an optional bounding
//! [`Region`], a flag distinguishing solids from intermediate scalar fields,
//! and an optional [`Tag`].
//!
//! Combinators never mutate their operands; they build new trees which share
//! the operands' subtrees.
//!
//! ```
//! use isocsg::{shapes, shape::Region};
//!
//! let a = shapes::circle(0.0, 0.0, 1.0);
//! let b = shapes::circle(1.0, 0.0, 1.0);
//! let u = a.union(&b);
//! assert_eq!(u.region(), Some(Region::new([-1.0, -1.0], [2.0, 1.0])));
//! assert_eq!(u.eval([1.5, 0.0])?, -0.5);
//! # Ok::<(), isocsg::Error>(())
//! ```
use crate::{context::Tree, var::Var, Error};
use nalgebra::{Affine3, Matrix4, Rotation3, SVector, Vector3};
use serde::{Deserialize, Serialize};

mod region;
pub use region::Region;

/// Opaque label attached to a shape (e.g. a colour or material name)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag(String);

impl Tag {
    /// Builds a new tag
    pub fn new<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }
    /// Returns the tag's text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Tag {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Tag {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An implicit shape in `N` dimensions (`N` is 2 or 3)
///
/// The tree is negative inside the shape and positive outside.  Two
/// dimensional shapes are evaluated on the `z = 0` plane.
///
/// Results of combinators and transforms inherit the tag and `is_shape` flag
/// of their left (or only) operand.
#[derive(Clone, Debug)]
pub struct Shape<const N: usize> {
    tree: Tree,
    region: Option<Region<N>>,
    is_shape: bool,
    tag: Option<Tag>,
}

/// Two-dimensional shape
pub type Shape2 = Shape<2>;

/// Three-dimensional shape
pub type Shape3 = Shape<3>;

impl<const N: usize> From<Tree> for Shape<N> {
    fn from(tree: Tree) -> Self {
        Self::new(tree)
    }
}

impl<const N: usize> Shape<N> {
    /// Builds a new unbounded, untagged solid from the given tree
    pub fn new(tree: Tree) -> Self {
        Self {
            tree,
            region: None,
            is_shape: true,
            tag: None,
        }
    }

    /// Borrows the inner tree
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Unwraps the inner tree, discarding metadata
    pub fn into_tree(self) -> Tree {
        self.tree
    }

    /// Returns the bounding region, or `None` if the shape is unbounded
    pub fn region(&self) -> Option<Region<N>> {
        self.region
    }

    /// Returns the tag, if present
    pub fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }

    /// Checks whether this is a solid (rather than a scalar field)
    pub fn is_shape(&self) -> bool {
        self.is_shape
    }

    /// Checks whether the shape's region is known to be empty
    pub fn is_empty(&self) -> bool {
        self.region.is_some_and(|r| r.is_empty())
    }

    /// Returns a copy of this shape with the given bounding region
    pub fn with_region(mut self, region: Region<N>) -> Self {
        self.region = Some(region);
        self
    }

    /// Returns a copy of this shape with no bounding region
    pub fn without_region(mut self) -> Self {
        self.region = None;
        self
    }

    /// Returns a copy of this shape with the given tag
    pub fn with_tag<T: Into<Tag>>(mut self, tag: T) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Marks this shape as an intermediate scalar field
    pub fn as_field(mut self) -> Self {
        self.is_shape = false;
        self
    }

    fn derive(&self, tree: Tree, region: Option<Region<N>>) -> Self {
        Self {
            tree,
            region,
            is_shape: self.is_shape,
            tag: self.tag.clone(),
        }
    }

    /// Evaluates the shape at a single point
    ///
    /// Missing coordinates (e.g. `z` for a 2D shape) are zero.
    pub fn eval(&self, p: [f64; N]) -> Result<f64, Error> {
        let mut xyz = [0.0; 3];
        for (o, v) in xyz.iter_mut().zip(p) {
            *o = v;
        }
        self.tree.eval_xyz(xyz[0], xyz[1], xyz[2])
    }

    /// Union of two shapes, `min(a, b)`
    ///
    /// The region is the bounding box of both regions, or `None` if either
    /// is unbounded.
    pub fn union(&self, other: &Self) -> Self {
        let region = match (self.region, other.region) {
            (Some(a), Some(b)) => Some(a.union(&b)),
            _ => None,
        };
        self.derive(self.tree.min(other.tree.clone()), region)
    }

    /// Intersection of two shapes, `max(a, b)`
    ///
    /// The region is the overlap of both regions (which may be empty); if
    /// one of them is unbounded, the other is used.
    pub fn intersection(&self, other: &Self) -> Self {
        let region = match (self.region, other.region) {
            (Some(a), Some(b)) => Some(a.intersection(&b)),
            (a, b) => a.or(b),
        };
        self.derive(self.tree.max(other.tree.clone()), region)
    }

    /// Subtracts `other` from this shape
    ///
    /// This is `intersection(a, negate(b))`, so the region is that of `a`.
    pub fn difference(&self, other: &Self) -> Self {
        self.intersection(&other.negate())
    }

    /// Inverts inside and outside
    ///
    /// The complement of a bounded solid is unbounded, so the result has no
    /// region.
    pub fn negate(&self) -> Self {
        self.derive(-self.tree.clone(), None)
    }

    /// Remaps the tree by `inverse` and the region by `forward`
    fn transform<F>(&self, inverse: Matrix4<f64>, forward: F) -> Self
    where
        F: Fn(SVector<f64, N>) -> SVector<f64, N>,
    {
        let tree = self
            .tree
            .remap_affine(Affine3::from_matrix_unchecked(inverse));
        let region = self.region.map(|r| r.map_corners(forward));
        self.derive(tree, region)
    }

    /// Moves the shape by the given offset
    pub fn translate(&self, offset: [f64; N]) -> Self {
        let offset = SVector::<f64, N>::from(offset);
        let mut v = Vector3::zeros();
        for i in 0..N.min(3) {
            v[i] = -offset[i];
        }
        self.transform(Matrix4::new_translation(&v), |p| p + offset)
    }

    /// Rotates the shape counter-clockwise about the Z axis
    ///
    /// The resulting region is the bounding box of the rotated corners.
    pub fn rotate(&self, angle_degrees: f64) -> Self {
        let angle = angle_degrees.to_radians();
        let inverse =
            Rotation3::from_axis_angle(&Vector3::z_axis(), -angle)
                .to_homogeneous();
        let (s, c) = angle.sin_cos();
        self.transform(inverse, |mut p| {
            if N >= 2 {
                let (x, y) = (p[0], p[1]);
                p[0] = c * x - s * y;
                p[1] = s * x + c * y;
            }
            p
        })
    }

    /// Mirrors the shape across the plane where `axis` is zero
    ///
    /// Returns [`Error::InvalidParameter`] if the axis is not one of the
    /// shape's dimensions (e.g. reflecting a 2D shape about Z).
    pub fn reflect(&self, axis: Var) -> Result<Self, Error> {
        let i = axis.index();
        if i >= N {
            return Err(Error::InvalidParameter(format!(
                "cannot reflect a {N}D shape about {axis}"
            )));
        }
        let mut flip = Vector3::repeat(1.0);
        flip[i] = -1.0;
        Ok(self.transform(Matrix4::new_nonuniform_scaling(&flip), |mut p| {
            p[i] = -p[i];
            p
        }))
    }

    /// Scales the shape uniformly about the origin
    ///
    /// Returns [`Error::InvalidParameter`] if the factor is zero or not
    /// finite.  Note that scaling does not preserve distance values.
    pub fn scale(&self, factor: f64) -> Result<Self, Error> {
        if factor == 0.0 || !factor.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "invalid scale factor {factor}"
            )));
        }
        Ok(self.transform(Matrix4::new_scaling(1.0 / factor), |p| p * factor))
    }
}

impl Shape<2> {
    /// Extrudes a 2D shape along Z, producing a 3D solid
    ///
    /// The resulting tree is `max(s, z_min - z, z - z_max)`; the region (if
    /// known) is extended to `[z_min, z_max]` on the Z axis.
    ///
    /// ```
    /// # use isocsg::shapes;
    /// let s = shapes::rectangle(-1.0, 1.0, -1.0, 1.0).extrude(0.0, 2.0)?;
    /// assert!(s.eval([0.0, 0.0, 1.0])? < 0.0);
    /// assert!(s.eval([0.0, 0.0, 3.0])? > 0.0);
    /// # Ok::<(), isocsg::Error>(())
    /// ```
    pub fn extrude(&self, z_min: f64, z_max: f64) -> Result<Shape<3>, Error> {
        if !z_min.is_finite() || !z_max.is_finite() || z_max <= z_min {
            return Err(Error::InvalidParameter(format!(
                "invalid extrusion range [{z_min}, {z_max}]"
            )));
        }
        let z = Tree::z();
        let tree = self.tree.max(z_min - z.clone()).max(z - z_max);
        let region = self.region.map(|r| {
            if r.is_empty() {
                Region::empty()
            } else {
                Region::new(
                    [r.lower.x, r.lower.y, z_min],
                    [r.upper.x, r.upper.y, z_max],
                )
            }
        });
        Ok(Shape {
            tree,
            region,
            is_shape: self.is_shape,
            tag: self.tag.clone(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shapes::{circle, rectangle, sphere};
    use approx::assert_relative_eq;

    #[test]
    fn region_propagation() {
        let a = circle(0.0, 0.0, 1.0);
        let b = circle(3.0, 0.0, 1.0);
        let open = Shape::<2>::new(Tree::x());

        let u = a.union(&b);
        assert_eq!(u.region(), Some(Region::new([-1.0, -1.0], [4.0, 1.0])));
        assert_eq!(a.union(&open).region(), None);

        let i = a.intersection(&b);
        assert!(i.is_empty());
        assert_eq!(a.intersection(&open).region(), a.region());
        assert_eq!(open.intersection(&b).region(), b.region());

        assert_eq!(a.negate().region(), None);
        assert_eq!(a.difference(&b).region(), a.region());
    }

    #[test]
    fn metadata() {
        let a = circle(0.0, 0.0, 1.0).with_tag("red");
        let b = circle(1.0, 0.0, 1.0).with_tag("blue").as_field();
        let u = a.union(&b);
        assert_eq!(u.tag().map(Tag::as_str), Some("red"));
        assert!(u.is_shape());
        assert!(!b.union(&a).is_shape());
        assert_eq!(b.tag(), Some(&Tag::new("blue")));

        // Builders return new shapes and leave the original in place
        let c = circle(0.0, 0.0, 1.0);
        let d = c.clone().without_region();
        assert!(c.region().is_some());
        assert!(d.region().is_none());
    }

    #[test]
    fn combinators() {
        let a = circle(0.0, 0.0, 1.0);
        let b = circle(1.0, 0.0, 1.0);
        for p in [[0.0, 0.0], [0.5, 0.5], [2.0, 0.0], [-3.0, 1.0]] {
            let va = a.eval(p).unwrap();
            let vb = b.eval(p).unwrap();
            assert_eq!(a.union(&b).eval(p).unwrap(), va.min(vb));
            assert_eq!(a.intersection(&b).eval(p).unwrap(), va.max(vb));
            assert_eq!(a.difference(&b).eval(p).unwrap(), va.max(-vb));
            assert_eq!(a.negate().negate().eval(p).unwrap(), va);
        }
    }

    #[test]
    fn translate() {
        let a = circle(0.0, 0.0, 1.0).translate([2.0, -1.0]);
        assert_relative_eq!(a.eval([2.0, -1.0]).unwrap(), -1.0);
        assert_relative_eq!(a.eval([3.0, -1.0]).unwrap(), 0.0);
        assert_eq!(a.region(), Some(Region::new([1.0, -2.0], [3.0, 0.0])));

        let s = sphere(0.0, 0.0, 0.0, 1.0).translate([0.0, 0.0, 5.0]);
        assert_relative_eq!(s.eval([0.0, 0.0, 5.0]).unwrap(), -1.0);
        assert_eq!(s.region().unwrap().lower.z, 4.0);
    }

    #[test]
    fn rotate() {
        // A thin bar along +X, rotated by 90° to lie along +Y
        let bar = rectangle(0.0, 4.0, -0.5, 0.5);
        let r = bar.rotate(90.0);
        assert!(r.eval([0.0, 3.0]).unwrap() < 0.0);
        assert!(r.eval([3.0, 0.0]).unwrap() > 0.0);

        let region = r.region().unwrap();
        assert_relative_eq!(region.lower.x, -0.5, epsilon = 1e-12);
        assert_relative_eq!(region.upper.x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(region.lower.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(region.upper.y, 4.0, epsilon = 1e-12);

        // 45° rotation of a unit square grows the bounding box
        let sq = rectangle(-1.0, 1.0, -1.0, 1.0).rotate(45.0);
        let region = sq.region().unwrap();
        assert_relative_eq!(region.upper.x, 2f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn reflect() {
        let a = circle(2.0, 1.0, 1.0);
        let r = a.reflect(Var::X).unwrap();
        assert_relative_eq!(r.eval([-2.0, 1.0]).unwrap(), -1.0);
        assert_eq!(r.region(), Some(Region::new([-3.0, 0.0], [-1.0, 2.0])));

        let rr = r.reflect(Var::X).unwrap();
        for p in [[0.0, 0.0], [2.0, 1.0], [-1.5, 0.25]] {
            assert_eq!(rr.eval(p).unwrap(), a.eval(p).unwrap());
        }
        assert_eq!(rr.region(), a.region());

        assert!(matches!(
            a.reflect(Var::Z),
            Err(Error::InvalidParameter(..))
        ));
    }

    #[test]
    fn scale() {
        let a = circle(1.0, 0.0, 1.0).scale(2.0).unwrap();
        assert!(a.eval([3.5, 0.0]).unwrap() < 0.0);
        assert!(a.eval([4.5, 0.0]).unwrap() > 0.0);
        assert_eq!(a.region(), Some(Region::new([0.0, -2.0], [4.0, 2.0])));

        let f = circle(1.0, 0.0, 1.0).scale(-1.0).unwrap();
        assert_eq!(f.region(), Some(Region::new([-2.0, -1.0], [0.0, 1.0])));

        assert!(circle(0.0, 0.0, 1.0).scale(0.0).is_err());
        assert!(circle(0.0, 0.0, 1.0).scale(f64::NAN).is_err());
    }

    #[test]
    fn extrude() {
        let r = rectangle(-1.0, 1.0, -1.0, 1.0).with_tag("box");
        let e = r.extrude(0.0, 2.0).unwrap();
        assert_eq!(
            e.region(),
            Some(Region::new([-1.0, -1.0, 0.0], [1.0, 1.0, 2.0]))
        );
        assert_eq!(e.tag(), Some(&Tag::new("box")));
        assert_eq!(e.eval([0.0, 0.0, 1.0]).unwrap(), -1.0);
        assert_eq!(e.eval([0.0, 0.0, -0.5]).unwrap(), 0.5);
        assert_eq!(e.eval([0.0, 0.0, 2.5]).unwrap(), 0.5);
        assert_eq!(e.eval([1.5, 0.0, 1.0]).unwrap(), 0.5);

        assert!(r.extrude(2.0, 2.0).is_err());
        assert!(r.extrude(2.0, 1.0).is_err());
        assert!(r.extrude(0.0, f64::INFINITY).is_err());

        let empty = circle(0.0, 0.0, 1.0)
            .intersection(&circle(5.0, 0.0, 1.0))
            .extrude(0.0, 1.0)
            .unwrap();
        assert!(empty.is_empty());
    }
}
