//! Marching tetrahedra
//!
//! Each lattice cube is split into six tetrahedra which share the cube's main
//! diagonal (corner 0 to corner 7).  Neighboring cubes split their shared
//! faces along the same diagonal, so the resulting surface is watertight, and
//! every tetrahedron has exactly one triangulation for each sign pattern.
use super::{
    builder::{Keyed, MeshBuilder},
    edge_vertex, Mesh, SampleGrid, Settings,
};
use arrayvec::ArrayVec;
use nalgebra::{Point3, SVector};

/// Tetrahedra as cube corner bitmasks (`x = 1`, `y = 2`, `z = 4`)
///
/// Each tetrahedron walks from corner 0 to corner 7 along one axis at a time,
/// so every edge joins a corner to one of its supersets.
const TETS: [[u8; 4]; 6] = [
    [0, 1, 3, 7],
    [0, 1, 5, 7],
    [0, 2, 3, 7],
    [0, 2, 6, 7],
    [0, 4, 5, 7],
    [0, 4, 6, 7],
];

/// Whether the corresponding tetrahedron in [`TETS`] is positively oriented
///
/// This is the parity of the axis order walked by the tetrahedron.
const POSITIVE: [bool; 6] = [true, false, false, true, true, false];

static_assertions::const_assert_eq!(TETS.len(), POSITIVE.len());

type Triangle = [Keyed<SVector<f64, 3>>; 3];

/// Extracts the zero isosurface of a 3D sample grid
///
/// Samples with `v < 0` are inside; triangles are wound counter-clockwise
/// when seen from outside (i.e. their normals point outwards).
///
/// Slabs of cells (one per Z layer) are processed in parallel (per
/// `settings`), then merged in order, so the output does not depend on the
/// thread count.
pub fn extract_mesh(grid: &SampleGrid<3>, settings: &Settings) -> Mesh {
    let start = std::time::Instant::now();
    let [nx, ny, nz] = grid.cell_counts();
    let slabs = settings.run(|parallel| {
        if parallel {
            use rayon::prelude::*;
            (0..nz)
                .into_par_iter()
                .map(|k| mesh_slab(grid, k, nx, ny))
                .collect::<Vec<_>>()
        } else {
            (0..nz).map(|k| mesh_slab(grid, k, nx, ny)).collect()
        }
    });

    let mut builder = MeshBuilder::default();
    for tri in slabs.into_iter().flatten() {
        builder.push(tri);
    }
    let (vertices, triangles) = builder.take();
    let out = Mesh {
        vertices: vertices.into_iter().map(Point3::from).collect(),
        triangles,
    };
    log::debug!(
        "extracted mesh with {} vertices and {} triangles in {:?}",
        out.vertices.len(),
        out.triangles.len(),
        start.elapsed()
    );
    out
}

fn mesh_slab(
    grid: &SampleGrid<3>,
    k: usize,
    nx: usize,
    ny: usize,
) -> Vec<Triangle> {
    let mut out = vec![];
    for j in 0..ny {
        for i in 0..nx {
            let corner = |c: u8| {
                [
                    i + (c & 1) as usize,
                    j + ((c >> 1) & 1) as usize,
                    k + (c >> 2) as usize,
                ]
            };
            let values: [f64; 8] =
                std::array::from_fn(|c| grid.get(corner(c as u8)));
            let inside = values.map(|v| v < 0.0);
            if inside.iter().all(|b| *b) || !inside.iter().any(|b| *b) {
                continue;
            }
            for (tet, positive) in TETS.iter().zip(POSITIVE) {
                for tri in tet_triangles(tet, positive, &inside) {
                    out.push(tri.map(|(a, b)| {
                        edge_vertex(grid, corner(a & b), a ^ b)
                    }));
                }
            }
        }
    }
    out
}

/// Returns triangles for a single tetrahedron as triples of corner pairs
///
/// Each corner pair names the tetrahedron edge on which a vertex lies.
fn tet_triangles(
    tet: &[u8; 4],
    positive: bool,
    inside: &[bool; 8],
) -> ArrayVec<[(u8, u8); 3], 2> {
    // Reorder vertices with inside corners first, tracking parity
    let mut order = [0usize; 4];
    let mut n = 0;
    for pass in [true, false] {
        for (i, c) in tet.iter().enumerate() {
            if inside[*c as usize] == pass {
                order[n] = i;
                n += 1;
            }
        }
    }
    let n_inside = tet.iter().filter(|c| inside[**c as usize]).count();
    let mut inversions = 0;
    for i in 0..4 {
        for j in i + 1..4 {
            if order[i] > order[j] {
                inversions += 1;
            }
        }
    }
    let positive = positive == (inversions % 2 == 0);

    let p = order.map(|i| tet[i]);
    let e = |a: usize, b: usize| (p[a], p[b]);
    let mut out = ArrayVec::new();
    match n_inside {
        1 => out.push([e(0, 1), e(0, 2), e(0, 3)]),
        2 => {
            out.push([e(0, 2), e(0, 3), e(1, 3)]);
            out.push([e(0, 2), e(1, 3), e(1, 2)]);
        }
        3 => out.push([e(0, 3), e(1, 3), e(2, 3)]),
        _ => (),
    }
    if !positive {
        for t in &mut out {
            t.swap(1, 2);
        }
    }
    out
}
