//! Sampling and boundary extraction
//!
//! Extraction is a two-step process: a shape is first sampled on a regular
//! lattice with [`sample`], then its zero boundary is pulled out of the
//! resulting [`SampleGrid`] with [`extract_contour`] (2D, marching squares)
//! or [`extract_mesh`] (3D, marching tetrahedra).
//!
//! ```
//! use isocsg::{mesh::Settings, shapes};
//!
//! let settings = Settings::default();
//! let s = shapes::rectangle(-1.0, 1.0, -1.0, 1.0).extrude(0.0, 2.0)?;
//! let mesh = s.mesh(16, &settings)?;
//! assert!(!mesh.is_empty());
//! # Ok::<(), isocsg::Error>(())
//! ```
//!
//! Output vertices are deduplicated: a vertex is identified by the lattice
//! edge (or lattice point) that it lies on, and its position is always
//! computed from that edge's endpoints in the same order, so neighboring
//! cells agree exactly.  Primitives that collapse (because several vertices
//! snapped to the same lattice point) are dropped.
use crate::{
    shape::{Region, Shape},
    Error,
};
use nalgebra::{Point2, Point3, SVector};

mod builder;
mod config;
mod contour;
mod grid;
mod surface;

use builder::{Keyed, VertexKey};

pub use config::{Settings, ThreadCount};
pub use contour::extract_contour;
pub use grid::{sample, SampleGrid};
pub use surface::extract_mesh;

/// A set of line segments in 2D
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Contour {
    /// Contour vertices
    pub vertices: Vec<Point2<f64>>,
    /// Segments, as pairs of indices into `vertices`
    ///
    /// Each segment has the inside of the shape on its left.
    pub segments: Vec<[usize; 2]>,
}

impl Contour {
    /// Checks whether the contour has no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Chains segments into polylines of vertex indices
    ///
    /// Closed loops repeat their first index at the end.  Open polylines
    /// (which occur when the boundary leaves the sampled region) are
    /// returned first, each starting at a vertex with no incoming segment.
    pub fn polylines(&self) -> Vec<Vec<usize>> {
        let mut outgoing = vec![vec![]; self.vertices.len()];
        let mut has_incoming = vec![false; self.vertices.len()];
        for (i, &[a, b]) in self.segments.iter().enumerate() {
            outgoing[a].push(i);
            has_incoming[b] = true;
        }
        let mut used = vec![false; self.segments.len()];

        let follow = |start: usize, used: &mut [bool]| {
            let mut line = vec![self.segments[start][0]];
            let mut seg = Some(start);
            while let Some(s) = seg {
                used[s] = true;
                let next = self.segments[s][1];
                line.push(next);
                seg = outgoing[next].iter().copied().find(|&s| !used[s]);
            }
            line
        };

        let mut out = vec![];
        let open_starts = (0..self.segments.len())
            .filter(|&i| !has_incoming[self.segments[i][0]]);
        for i in open_starts.collect::<Vec<_>>() {
            if !used[i] {
                out.push(follow(i, &mut used));
            }
        }
        for i in 0..self.segments.len() {
            if !used[i] {
                out.push(follow(i, &mut used));
            }
        }
        out
    }
}

/// An indexed triangle mesh
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    /// Mesh vertices
    pub vertices: Vec<Point3<f64>>,
    /// Triangles, as triples of indices into `vertices`
    ///
    /// Triangles are wound counter-clockwise when seen from outside.
    pub triangles: Vec<[usize; 3]>,
}

impl Mesh {
    /// Checks whether the mesh has no triangles
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Returns the triangle's unnormalized normal (twice its area vector)
    pub fn normal(&self, tri: [usize; 3]) -> SVector<f64, 3> {
        let [a, b, c] = tri.map(|i| self.vertices[i]);
        (b - a).cross(&(c - a))
    }

    /// Returns the total surface area
    pub fn area(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| self.normal(*t).norm() / 2.0)
            .sum()
    }

    /// Returns the signed volume enclosed by the mesh
    ///
    /// This is only meaningful for closed meshes, and is positive when
    /// normals point outwards.
    pub fn volume(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = t.map(|i| self.vertices[i].coords);
                a.dot(&b.cross(&c)) / 6.0
            })
            .sum()
    }

    /// Returns the bounding box of all vertices
    ///
    /// The result is empty if the mesh has no vertices.
    pub fn bounds(&self) -> Region<3> {
        let mut out = Region::<3>::empty();
        for v in &self.vertices {
            out.lower = out.lower.inf(&v.coords);
            out.upper = out.upper.sup(&v.coords);
        }
        out
    }
}

/// Builds the keyed vertex on the lattice edge from `a` to `a + mask`
///
/// The edge must have a sign change, with exactly one endpoint inside.
fn edge_vertex<const N: usize>(
    grid: &SampleGrid<N>,
    a: [usize; N],
    mask: u8,
) -> Keyed<SVector<f64, N>> {
    let b: [usize; N] =
        std::array::from_fn(|i| a[i] + ((mask >> i) & 1) as usize);
    let (ia, ib) = (grid.index(a), grid.index(b));
    let (va, vb) = (grid.values()[ia], grid.values()[ib]);
    if va == 0.0 {
        (VertexKey::Point(ia), grid.position(a))
    } else if vb == 0.0 {
        (VertexKey::Point(ib), grid.position(b))
    } else {
        let (pa, pb) = (grid.position(a), grid.position(b));
        let t = va / (va - vb);
        (VertexKey::Edge(ia, mask), pa + (pb - pa) * t)
    }
}

impl Shape<2> {
    /// Samples and contours the shape over its own region
    ///
    /// Returns [`Error::MissingRegion`] if the shape is unbounded, and an
    /// empty contour if its region is empty.
    pub fn contour(
        &self,
        resolution: usize,
        settings: &Settings,
    ) -> Result<Contour, Error> {
        let region = self.region().ok_or(Error::MissingRegion)?;
        if region.is_empty() {
            return Ok(Contour::default());
        }
        let grid = sample(self, &region, resolution, settings)?;
        Ok(extract_contour(&grid, settings))
    }
}

impl Shape<3> {
    /// Samples and meshes the shape over its own region
    ///
    /// Returns [`Error::MissingRegion`] if the shape is unbounded, and an
    /// empty mesh if its region is empty.
    pub fn mesh(
        &self,
        resolution: usize,
        settings: &Settings,
    ) -> Result<Mesh, Error> {
        let region = self.region().ok_or(Error::MissingRegion)?;
        if region.is_empty() {
            return Ok(Mesh::default());
        }
        let grid = sample(self, &region, resolution, settings)?;
        Ok(extract_mesh(&grid, settings))
    }
}
