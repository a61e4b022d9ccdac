//! Marching squares
use super::{
    builder::{Keyed, MeshBuilder},
    edge_vertex, Contour, SampleGrid, Settings,
};
use arrayvec::ArrayVec;
use nalgebra::{Point2, SVector};

/// Cell corners in counter-clockwise order, as `(x, y)` bitmasks
///
/// Edge `k` runs from `CORNERS[k]` to `CORNERS[(k + 1) % 4]`.
const CORNERS: [u8; 4] = [0b00, 0b01, 0b11, 0b10];

type Segment = [Keyed<SVector<f64, 2>>; 2];

/// Extracts the zero contour of a 2D sample grid
///
/// Samples with `v < 0` are inside.  Segments are oriented with the inside
/// on their left, so closed loops around solids run counter-clockwise.
///
/// Saddle cells (two diagonally opposite inside corners) are disambiguated
/// using the mean of the four corners: if it is inside, the two inside
/// corners are connected and the segments cut off the outside corners;
/// otherwise, the segments cut off the inside corners.
///
/// Rows of cells are processed in parallel (per `settings`), then merged in
/// order, so the output does not depend on the thread count.
pub fn extract_contour(grid: &SampleGrid<2>, settings: &Settings) -> Contour {
    let start = std::time::Instant::now();
    let [nx, ny] = grid.cell_counts();
    let rows = settings.run(|parallel| {
        if parallel {
            use rayon::prelude::*;
            (0..ny)
                .into_par_iter()
                .map(|j| contour_row(grid, j, nx))
                .collect::<Vec<_>>()
        } else {
            (0..ny).map(|j| contour_row(grid, j, nx)).collect()
        }
    });

    let mut builder = MeshBuilder::default();
    for seg in rows.into_iter().flatten() {
        builder.push(seg);
    }
    let (vertices, segments) = builder.take();
    let out = Contour {
        vertices: vertices.into_iter().map(Point2::from).collect(),
        segments,
    };
    log::debug!(
        "extracted contour with {} vertices and {} segments in {:?}",
        out.vertices.len(),
        out.segments.len(),
        start.elapsed()
    );
    out
}

fn contour_row(grid: &SampleGrid<2>, j: usize, nx: usize) -> Vec<Segment> {
    let mut out = vec![];
    for i in 0..nx {
        let corner = |c: u8| [i + (c & 1) as usize, j + (c >> 1) as usize];
        let values = CORNERS.map(|c| grid.get(corner(c)));
        let inside = values.map(|v| v < 0.0);
        if inside.iter().all(|b| *b) || !inside.iter().any(|b| *b) {
            continue;
        }
        let edge = |k: usize| {
            let (a, b) = (CORNERS[k], CORNERS[(k + 1) % 4]);
            edge_vertex(grid, corner(a & b), a ^ b)
        };

        // Edges where the boundary leaves / enters the inside, walking CCW
        let starts: ArrayVec<usize, 2> =
            (0..4).filter(|&k| inside[k] && !inside[(k + 1) % 4]).collect();
        let ends: ArrayVec<usize, 2> =
            (0..4).filter(|&k| !inside[k] && inside[(k + 1) % 4]).collect();

        if starts.len() == 1 {
            out.push([edge(starts[0]), edge(ends[0])]);
        } else {
            let center = values.iter().sum::<f64>() / 4.0;
            for &s in &starts {
                let e = if center < 0.0 { (s + 1) % 4 } else { (s + 3) % 4 };
                out.push([edge(s), edge(e)]);
            }
        }
    }
    out
}
