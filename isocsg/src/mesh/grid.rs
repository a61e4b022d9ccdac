//! Sampling of shapes on a regular lattice
use super::Settings;
use crate::{
    eval::{FloatSliceEval, Tape},
    shape::{Region, Shape},
    Context, Error,
};
use nalgebra::SVector;

/// Values of a shape sampled on a regular lattice over a region
///
/// Values are stored in row-major order with X varying fastest.  The position
/// of every sample is determined by the region and per-axis sample counts;
/// see [`SampleGrid::position`].
#[derive(Clone, Debug, PartialEq)]
pub struct SampleGrid<const N: usize> {
    region: Region<N>,
    counts: [usize; N],
    values: Vec<f64>,
}

impl<const N: usize> SampleGrid<N> {
    /// Returns the sampled region
    pub fn region(&self) -> &Region<N> {
        &self.region
    }

    /// Returns the number of samples along each axis
    pub fn counts(&self) -> [usize; N] {
        self.counts
    }

    /// Returns all sample values, X fastest
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Returns the number of cells along each axis
    pub fn cell_counts(&self) -> [usize; N] {
        self.counts.map(|c| c.saturating_sub(1))
    }

    /// Returns the flat index of a lattice point
    pub fn index(&self, pos: [usize; N]) -> usize {
        let mut index = 0;
        for i in (0..N).rev() {
            index = index * self.counts[i] + pos[i];
        }
        index
    }

    /// Returns the sample value at a lattice point
    pub fn get(&self, pos: [usize; N]) -> f64 {
        self.values[self.index(pos)]
    }

    /// Returns the coordinate of lattice row `i` along `axis`
    pub fn coord(&self, axis: usize, i: usize) -> f64 {
        coord(&self.region, self.counts[axis], axis, i)
    }

    /// Returns the position of a lattice point
    pub fn position(&self, pos: [usize; N]) -> SVector<f64, N> {
        SVector::from_fn(|axis, _| self.coord(axis, pos[axis]))
    }
}

fn coord<const N: usize>(
    region: &Region<N>,
    count: usize,
    axis: usize,
    i: usize,
) -> f64 {
    let (lo, hi) = (region.lower[axis], region.upper[axis]);
    if count == 1 {
        (lo + hi) / 2.0
    } else {
        lo + (hi - lo) * (i as f64) / ((count - 1) as f64)
    }
}

/// Samples a shape at `resolution` points per axis over the given region
///
/// Two-dimensional shapes are sampled on the `z = 0` plane.  With a
/// resolution of 1, the single sample is taken at the center of the region.
///
/// # Errors
/// - [`Error::InvalidRegion`] if any axis of `region` has a non-positive or
///   non-finite extent
/// - [`Error::InvalidParameter`] if `resolution` or `settings.chunk_size` is
///   zero
/// - any evaluation error (e.g. [`Error::NumericDomain`])
pub fn sample<const N: usize>(
    shape: &Shape<N>,
    region: &Region<N>,
    resolution: usize,
    settings: &Settings,
) -> Result<SampleGrid<N>, Error> {
    region.validate()?;
    if resolution == 0 {
        return Err(Error::InvalidParameter(
            "resolution must be at least 1".to_owned(),
        ));
    }
    if settings.chunk_size == 0 {
        return Err(Error::InvalidParameter(
            "chunk size must be at least 1".to_owned(),
        ));
    }
    let counts = [resolution; N];
    let total = resolution
        .checked_pow(N as u32)
        .ok_or_else(|| Error::InvalidParameter(format!(
            "resolution {resolution} is too large"
        )))?;

    let start = std::time::Instant::now();
    let mut ctx = Context::new();
    let root = ctx.import(shape.tree())?;
    let tape = Tape::new(&ctx, root)?;
    log::trace!(
        "built tape with {} instructions and {} registers",
        tape.len(),
        tape.reg_count()
    );

    // Per-axis coordinates, shared by every chunk
    let axes: [Vec<f64>; N] = std::array::from_fn(|axis| {
        (0..resolution)
            .map(|i| coord(region, resolution, axis, i))
            .collect()
    });

    let chunks: Vec<(usize, usize)> = (0..total)
        .step_by(settings.chunk_size)
        .map(|i| (i, (i + settings.chunk_size).min(total)))
        .collect();

    let run_chunk = |eval: &mut FloatSliceEval,
                     (lo, hi): (usize, usize)|
     -> Result<Vec<f64>, Error> {
        let mut xyz = [vec![], vec![], vec![]];
        for c in &mut xyz {
            c.reserve(hi - lo);
        }
        for index in lo..hi {
            let mut rem = index;
            for (axis, c) in xyz.iter_mut().enumerate() {
                if axis < N {
                    c.push(axes[axis][rem % resolution]);
                    rem /= resolution;
                } else {
                    c.push(0.0);
                }
            }
        }
        let [xs, ys, zs] = &xyz;
        Ok(eval.eval(&tape, xs, ys, zs)?.to_vec())
    };

    let out = settings.run(|parallel| {
        if parallel {
            use rayon::prelude::*;
            chunks
                .into_par_iter()
                .map_init(FloatSliceEval::new, |eval, c| run_chunk(eval, c))
                .collect::<Result<Vec<_>, Error>>()
        } else {
            let mut eval = FloatSliceEval::new();
            chunks
                .into_iter()
                .map(|c| run_chunk(&mut eval, c))
                .collect::<Result<Vec<_>, Error>>()
        }
    })?;
    let values = out.concat();
    debug_assert_eq!(values.len(), total);

    log::debug!(
        "sampled {total} points in {} chunks ({} threads) in {:?}",
        out.len(),
        settings.threads,
        start.elapsed()
    );
    Ok(SampleGrid {
        region: *region,
        counts,
        values,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        context::Tree,
        mesh::ThreadCount,
        shapes::{circle, sphere},
    };
    use std::num::NonZeroUsize;

    fn settings(threads: usize, chunk_size: usize) -> Settings {
        Settings {
            threads: NonZeroUsize::new(threads).unwrap().into(),
            chunk_size,
        }
    }

    #[test]
    fn lattice_positions() {
        let s = Shape::<2>::new(Tree::x() + Tree::y() * 10.0);
        let region = Region::new([-1.0, 0.0], [1.0, 4.0]);
        let grid = sample(&s, &region, 5, &settings(1, 3)).unwrap();
        assert_eq!(grid.counts(), [5, 5]);
        assert_eq!(grid.cell_counts(), [4, 4]);
        assert_eq!(grid.values().len(), 25);
        assert_eq!(grid.coord(0, 0), -1.0);
        assert_eq!(grid.coord(0, 4), 1.0);
        assert_eq!(grid.coord(1, 2), 2.0);
        assert_eq!(grid.index([1, 2]), 11);
        assert_eq!(grid.get([0, 0]), -1.0);
        assert_eq!(grid.get([4, 0]), 1.0);
        assert_eq!(grid.get([2, 1]), 10.0);
        assert_eq!(grid.position([4, 4]).as_slice(), &[1.0, 4.0]);
    }

    #[test]
    fn three_dimensional() {
        let s = Shape::<3>::new(Tree::z());
        let region = Region::new([0.0, 0.0, -1.0], [1.0, 1.0, 1.0]);
        let grid = sample(&s, &region, 3, &settings(1, 7)).unwrap();
        assert_eq!(grid.get([2, 1, 0]), -1.0);
        assert_eq!(grid.get([0, 2, 2]), 1.0);
        assert_eq!(grid.get([1, 1, 1]), 0.0);
    }

    #[test]
    fn threads_agree() {
        let s = sphere(0.1, 0.2, 0.3, 0.7);
        let region = Region::new([-1.0; 3], [1.0; 3]);
        let a = sample(&s, &region, 17, &settings(1, 64)).unwrap();
        let b = sample(&s, &region, 17, &settings(4, 5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn single_sample() {
        let c = circle(0.0, 0.0, 1.0);
        let region = Region::new([-2.0, -2.0], [2.0, 4.0]);
        let grid = sample(&c, &region, 1, &Settings::default()).unwrap();
        assert_eq!(grid.values(), &[0.0]);
        assert_eq!(grid.position([0, 0]).as_slice(), &[0.0, 1.0]);
        assert_eq!(grid.cell_counts(), [0, 0]);
    }

    #[test]
    fn bad_parameters() {
        let c = circle(0.0, 0.0, 1.0);
        let region = Region::new([-2.0, -2.0], [2.0, 2.0]);
        assert!(matches!(
            sample(&c, &region, 0, &Settings::default()),
            Err(Error::InvalidParameter(..))
        ));
        let bad = Settings {
            threads: ThreadCount::One,
            chunk_size: 0,
        };
        assert!(matches!(
            sample(&c, &region, 4, &bad),
            Err(Error::InvalidParameter(..))
        ));

        let flat = Region::new([-2.0, 1.0], [2.0, 1.0]);
        assert!(matches!(
            sample(&c, &flat, 4, &Settings::default()),
            Err(Error::InvalidRegion { axis: 1, .. })
        ));
        let inverted = Region::new([2.0, -2.0], [-2.0, 2.0]);
        assert!(matches!(
            sample(&c, &inverted, 4, &Settings::default()),
            Err(Error::InvalidRegion { axis: 0, .. })
        ));
    }

    #[test]
    fn domain_error() {
        let s = Shape::<2>::new(Tree::x().sqrt());
        let region = Region::new([-1.0, -1.0], [1.0, 1.0]);
        assert!(matches!(
            sample(&s, &region, 4, &settings(2, 3)),
            Err(Error::NumericDomain { op: "sqrt", .. })
        ));
    }
}
