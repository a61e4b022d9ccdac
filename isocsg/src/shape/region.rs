use crate::Error;
use nalgebra::SVector;
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding region in `N`-dimensional space
///
/// A region with `lower > upper` on any axis is **empty**; empty regions
/// come out of intersecting disjoint regions and are a valid (terminal)
/// state rather than an error.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region<const N: usize> {
    /// Lower corner
    pub lower: SVector<f64, N>,
    /// Upper corner
    pub upper: SVector<f64, N>,
}

impl<const N: usize> Region<N> {
    /// Builds a new region from lower and upper corners
    ///
    /// ```
    /// # use isocsg::shape::Region;
    /// let r = Region::new([-1.0, -2.0], [1.0, 2.0]);
    /// assert_eq!(r.size().as_slice(), &[2.0, 4.0]);
    /// ```
    pub fn new(lower: [f64; N], upper: [f64; N]) -> Self {
        Self {
            lower: lower.into(),
            upper: upper.into(),
        }
    }

    /// Returns the canonical empty region
    pub fn empty() -> Self {
        Self {
            lower: SVector::repeat(f64::INFINITY),
            upper: SVector::repeat(f64::NEG_INFINITY),
        }
    }

    /// Checks whether the region contains no points
    ///
    /// `NaN` bounds also make a region empty.
    pub fn is_empty(&self) -> bool {
        self.lower
            .iter()
            .zip(self.upper.iter())
            .any(|(lo, hi)| !(lo <= hi))
    }

    /// Returns the size of the region on each axis
    pub fn size(&self) -> SVector<f64, N> {
        self.upper - self.lower
    }

    /// Returns the center of the region
    pub fn center(&self) -> SVector<f64, N> {
        (self.lower + self.upper) / 2.0
    }

    /// Checks that every axis has a finite, strictly positive extent
    pub fn validate(&self) -> Result<(), Error> {
        for i in 0..N {
            let (lower, upper) = (self.lower[i], self.upper[i]);
            let extent = upper - lower;
            if !(extent > 0.0) || !extent.is_finite() {
                return Err(Error::InvalidRegion {
                    axis: i,
                    lower,
                    upper,
                });
            }
        }
        Ok(())
    }

    /// Checks whether the given point is within the region (inclusive)
    pub fn contains(&self, p: &SVector<f64, N>) -> bool {
        (0..N).all(|i| self.lower[i] <= p[i] && p[i] <= self.upper[i])
    }

    /// Returns the smallest region containing both inputs
    pub fn union(&self, other: &Self) -> Self {
        match (self.is_empty(), other.is_empty()) {
            (true, _) => *other,
            (_, true) => *self,
            _ => Self {
                lower: self.lower.inf(&other.lower),
                upper: self.upper.sup(&other.upper),
            },
        }
    }

    /// Returns the overlap of two regions, which may be empty
    ///
    /// Regions which only touch (with zero overlap on some axis) have an
    /// empty intersection.
    pub fn intersection(&self, other: &Self) -> Self {
        let lower = self.lower.sup(&other.lower);
        let upper = self.upper.inf(&other.upper);
        if lower.iter().zip(upper.iter()).all(|(lo, hi)| lo < hi) {
            Self { lower, upper }
        } else {
            Self::empty()
        }
    }

    /// Iterates over the `2^N` corners of the region
    pub fn corners(&self) -> impl Iterator<Item = SVector<f64, N>> + '_ {
        (0..1usize << N).map(move |mask| {
            SVector::from_fn(|i, _| {
                if mask & (1 << i) != 0 {
                    self.upper[i]
                } else {
                    self.lower[i]
                }
            })
        })
    }

    /// Returns the bounding box of the region's corners under `f`
    ///
    /// This is exact for axis-aligned maps (translation, reflection, scaling)
    /// and conservative for rotations.
    pub fn map_corners<F>(&self, f: F) -> Self
    where
        F: Fn(SVector<f64, N>) -> SVector<f64, N>,
    {
        if self.is_empty() {
            return *self;
        }
        let mut lower = SVector::<f64, N>::repeat(f64::INFINITY);
        let mut upper = SVector::<f64, N>::repeat(f64::NEG_INFINITY);
        for c in self.corners() {
            let p = f(c);
            lower = lower.inf(&p);
            upper = upper.sup(&p);
        }
        Self { lower, upper }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_regions() {
        assert!(Region::<2>::empty().is_empty());
        assert!(!Region::new([0.0, 0.0], [1.0, 1.0]).is_empty());
        assert!(!Region::new([0.0, 0.0], [0.0, 1.0]).is_empty());
        assert!(Region::new([0.0, 0.0], [-1.0, 1.0]).is_empty());
        assert!(Region::new([0.0, f64::NAN], [1.0, 1.0]).is_empty());
    }

    #[test]
    fn union_and_intersection() {
        let a = Region::new([-2.0, -2.0], [2.0, 2.0]);
        let b = Region::new([1.0, -2.0], [5.0, 2.0]);
        let u = a.union(&b);
        assert_eq!(u, Region::new([-2.0, -2.0], [5.0, 2.0]));
        let i = a.intersection(&b);
        assert_eq!(i, Region::new([1.0, -2.0], [2.0, 2.0]));

        let c = Region::new([10.0, 10.0], [11.0, 11.0]);
        let i = a.intersection(&c);
        assert!(i.is_empty());

        // Touching regions share no area
        let d = Region::new([2.0, -1.0], [3.0, 1.0]);
        assert_eq!(a.intersection(&d), Region::empty());
        assert_eq!(d.intersection(&a), Region::empty());

        // Empty regions are absorbed by union
        assert_eq!(i.union(&b), b);
        assert_eq!(b.union(&i), b);
    }

    #[test]
    fn validate() {
        assert!(Region::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0])
            .validate()
            .is_ok());
        assert_eq!(
            Region::new([0.0, 0.0], [1.0, 0.0]).validate(),
            Err(Error::InvalidRegion {
                axis: 1,
                lower: 0.0,
                upper: 0.0
            })
        );
        assert!(Region::new([0.0], [f64::INFINITY]).validate().is_err());
        assert!(Region::new([3.0], [-3.0]).validate().is_err());
    }

    #[test]
    fn corners() {
        let r = Region::new([0.0, 0.0, 0.0], [1.0, 2.0, 3.0]);
        let cs: Vec<_> = r.corners().collect();
        assert_eq!(cs.len(), 8);
        assert_eq!(cs[0].as_slice(), &[0.0, 0.0, 0.0]);
        assert_eq!(cs[7].as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(cs[5].as_slice(), &[1.0, 0.0, 3.0]);
    }

    #[test]
    fn map_corners() {
        let r = Region::new([0.0, 0.0], [1.0, 2.0]);
        let m = r.map_corners(|p| -p);
        assert_eq!(m, Region::new([-1.0, -2.0], [0.0, 0.0]));
        assert!(Region::<2>::empty().map_corners(|p| p * 2.0).is_empty());
    }
}
