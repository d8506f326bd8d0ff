//! Compiled diffusion-boundary definition.

use tetkin_core::{CompGIdx, DiffBndGIdx, TriIdx};

/// A diffusion boundary: the two compartments it connects and the mesh
/// triangles it is made of.
///
/// Which tetrahedron crosses the boundary through which of its faces is
/// derived by the solver during construction, once tetrahedra exist.
#[derive(Clone, Debug)]
pub struct DiffBoundaryDef {
    gidx: DiffBndGIdx,
    name: String,
    comp_a: CompGIdx,
    comp_b: CompGIdx,
    tris: Vec<TriIdx>,
}

impl DiffBoundaryDef {
    pub(crate) fn new(
        gidx: DiffBndGIdx,
        name: String,
        comp_a: CompGIdx,
        comp_b: CompGIdx,
        tris: Vec<TriIdx>,
    ) -> Self {
        Self {
            gidx,
            name,
            comp_a,
            comp_b,
            tris,
        }
    }

    /// Global index.
    pub fn gidx(&self) -> DiffBndGIdx {
        self.gidx
    }

    /// Boundary name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// First connected compartment.
    pub fn comp_a(&self) -> CompGIdx {
        self.comp_a
    }

    /// Second connected compartment.
    pub fn comp_b(&self) -> CompGIdx {
        self.comp_b
    }

    /// The boundary's mesh triangles.
    pub fn tris(&self) -> &[TriIdx] {
        &self.tris
    }
}
