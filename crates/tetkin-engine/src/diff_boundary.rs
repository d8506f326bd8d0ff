//! Diffusion-boundary registry.

use tetkin_core::TetIdx;

/// Runtime record of one diffusion boundary: every tetrahedron
/// adjacent to the boundary together with the local face (0..4)
/// through which the boundary is crossed.
///
/// Stored in boundary-definition order. Both sides are recorded, so
/// activating species transport walks each adjacent tetrahedron once
/// and flips the matching face of its diffusion processes.
#[derive(Clone, Debug)]
pub(crate) struct DiffBoundary {
    tets: Vec<TetIdx>,
    tet_direction: Vec<usize>,
}

impl DiffBoundary {
    pub(crate) fn new() -> Self {
        Self {
            tets: Vec::new(),
            tet_direction: Vec::new(),
        }
    }

    /// Record that `tet` crosses the boundary through face `direction`.
    pub(crate) fn add_tet_direction(&mut self, tet: TetIdx, direction: usize) {
        debug_assert!(direction < 4);
        self.tets.push(tet);
        self.tet_direction.push(direction);
    }

    /// Adjacent tetrahedra with their crossing faces.
    pub(crate) fn tet_directions(&self) -> impl Iterator<Item = (TetIdx, usize)> + '_ {
        self.tets
            .iter()
            .copied()
            .zip(self.tet_direction.iter().copied())
    }
}
