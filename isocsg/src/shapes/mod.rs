//! Standard library of primitive shapes and n-ary combinators
//!
//! Every primitive is negative inside and positive outside, and comes with a
//! tight bounding region (except for unbounded primitives like
//! [`half_plane`]).
use crate::{
    context::Tree,
    shape::{Region, Shape},
    Error,
};

/// 2D circle with the given center and radius
///
/// The tree is the exact Euclidean distance to the circle's boundary.
///
/// ```
/// # use isocsg::shapes::circle;
/// let c = circle(1.0, 0.0, 2.0);
/// assert_eq!(c.eval([1.0, 0.0])?, -2.0);
/// assert_eq!(c.eval([4.0, 0.0])?, 1.0);
/// # Ok::<(), isocsg::Error>(())
/// ```
pub fn circle(cx: f64, cy: f64, r: f64) -> Shape<2> {
    let (x, y, _) = Tree::axes();
    let tree = ((x - cx).square() + (y - cy).square()).sqrt() - r;
    Shape::new(tree).with_region(Region::new([cx - r, cy - r], [cx + r, cy + r]))
}

/// 2D axis-aligned rectangle
///
/// The tree is `max(x_min - x, x - x_max, y_min - y, y - y_max)`, which is
/// exact inside the rectangle and a lower bound on distance outside.
pub fn rectangle(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Shape<2> {
    let (x, y, _) = Tree::axes();
    let tree = (x_min - x.clone())
        .max(x - x_max)
        .max((y_min - y.clone()).max(y - y_max));
    Shape::new(tree).with_region(Region::new([x_min, y_min], [x_max, y_max]))
}

/// 3D sphere with the given center and radius
pub fn sphere(cx: f64, cy: f64, cz: f64, r: f64) -> Shape<3> {
    let (x, y, z) = Tree::axes();
    let tree =
        ((x - cx).square() + (y - cy).square() + (z - cz).square()).sqrt() - r;
    Shape::new(tree).with_region(Region::new(
        [cx - r, cy - r, cz - r],
        [cx + r, cy + r, cz + r],
    ))
}

/// 3D axis-aligned box, given as lower and upper corners
pub fn cuboid(lower: [f64; 3], upper: [f64; 3]) -> Shape<3> {
    let (x, y, z) = Tree::axes();
    let tree = (lower[0] - x.clone())
        .max(x - upper[0])
        .max((lower[1] - y.clone()).max(y - upper[1]))
        .max((lower[2] - z.clone()).max(z - upper[2]));
    Shape::new(tree).with_region(Region::new(lower, upper))
}

/// Unbounded 2D half-plane `{ p | dot(n, p) <= offset }`
///
/// The normal is normalized, so the tree is a signed distance.  Returns
/// [`Error::InvalidParameter`] if the normal is zero or not finite.
pub fn half_plane(normal: [f64; 2], offset: f64) -> Result<Shape<2>, Error> {
    let norm = normal[0].hypot(normal[1]);
    if !(norm > 0.0) || !norm.is_finite() || !offset.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "invalid half-plane (normal {normal:?}, offset {offset})"
        )));
    }
    let (x, y, _) = Tree::axes();
    let (nx, ny) = (normal[0] / norm, normal[1] / norm);
    Ok(Shape::new(x * nx + y * ny - offset))
}

/// Balanced pairwise reduction, keeping tree depth logarithmic
fn fold<const N: usize, F>(
    shapes: &[Shape<N>],
    f: &F,
) -> Result<Shape<N>, Error>
where
    F: Fn(&Shape<N>, &Shape<N>) -> Shape<N>,
{
    match shapes.len() {
        0 => Err(Error::EmptyInput),
        1 => Ok(shapes[0].clone()),
        n => {
            let a = fold(&shapes[..n / 2], f)?;
            let b = fold(&shapes[n / 2..], f)?;
            Ok(f(&a, &b))
        }
    }
}

/// Takes the union of a set of shapes
///
/// Returns [`Error::EmptyInput`] if the slice is empty.
///
/// ```
/// # use isocsg::shapes::{circle, union_all};
/// let dots: Vec<_> = (0..5).map(|i| circle(i as f64 * 3.0, 0.0, 1.0)).collect();
/// let u = union_all(&dots)?;
/// assert!(u.eval([12.0, 0.0])? < 0.0);
/// assert!(u.eval([1.5, 0.0])? > 0.0);
/// # Ok::<(), isocsg::Error>(())
/// ```
pub fn union_all<const N: usize>(
    shapes: &[Shape<N>],
) -> Result<Shape<N>, Error> {
    fold(shapes, &Shape::union)
}

/// Takes the intersection of a set of shapes
///
/// Returns [`Error::EmptyInput`] if the slice is empty.
pub fn intersection_all<const N: usize>(
    shapes: &[Shape<N>],
) -> Result<Shape<N>, Error> {
    fold(shapes, &Shape::intersection)
}
