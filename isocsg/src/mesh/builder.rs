use std::collections::HashMap;

/// Identifies the lattice feature on which an output vertex lies
///
/// Vertices are shared between neighboring cells by key, so the same key
/// must always produce the same position.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum VertexKey {
    /// Vertex snapped to a lattice point (where the sample was exactly zero)
    Point(usize),
    /// Vertex on a lattice edge, given as the flat index of its lower
    /// endpoint and a bitmask of the axes along which the edge runs
    Edge(usize, u8),
}

/// A vertex with its deduplication key
pub(crate) type Keyed<P> = (VertexKey, P);

/// Container used during construction of contours and meshes
///
/// Primitives (segments or triangles) are pushed with keyed vertices; each
/// distinct key is assigned an output index on first use.
pub(crate) struct MeshBuilder<P, const K: usize> {
    map: HashMap<VertexKey, usize>,
    vertices: Vec<P>,
    prims: Vec<[usize; K]>,
}

impl<P: Copy, const K: usize> Default for MeshBuilder<P, K> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
            vertices: vec![],
            prims: vec![],
        }
    }
}

impl<P: Copy, const K: usize> MeshBuilder<P, K> {
    /// Looks up the given vertex, adding it if it's not yet present
    fn get(&mut self, (key, pos): Keyed<P>) -> usize {
        *self.map.entry(key).or_insert_with(|| {
            self.vertices.push(pos);
            self.vertices.len() - 1
        })
    }

    /// Adds a primitive, dropping it if any two of its vertices coincide
    ///
    /// Vertices of a dropped primitive are not added.
    pub fn push(&mut self, prim: [Keyed<P>; K]) {
        let degenerate =
            (0..K).any(|i| (i + 1..K).any(|j| prim[i].0 == prim[j].0));
        if !degenerate {
            let out = prim.map(|v| self.get(v));
            self.prims.push(out);
        }
    }

    /// Returns the deduplicated vertices and primitives
    pub fn take(self) -> (Vec<P>, Vec<[usize; K]>) {
        (self.vertices, self.prims)
    }
}
