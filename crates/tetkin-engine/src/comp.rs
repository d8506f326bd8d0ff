//! Compartment registry: the tetrahedra of one compartment and the
//! volume-weighted voxel picker.

use tetkin_core::TetIdx;

/// Aggregation of the tetrahedra assigned to one compartment.
///
/// The solver stores these registries in compartment-definition order,
/// so registry `i` instantiates compartment definition `i`. Holds a
/// cumulative-volume table so that population injection can pick a
/// member tetrahedron with probability proportional to its volume.
/// Volumes are immutable, so the table is built once.
#[derive(Clone, Debug)]
pub(crate) struct Comp {
    tets: Vec<TetIdx>,
    cum_vol: Vec<f64>,
    vol: f64,
}

impl Comp {
    pub(crate) fn new() -> Self {
        Self {
            tets: Vec::new(),
            cum_vol: Vec::new(),
            vol: 0.0,
        }
    }

    pub(crate) fn add_tet(&mut self, tet: TetIdx, vol: f64) {
        self.vol += vol;
        self.tets.push(tet);
        self.cum_vol.push(self.vol);
    }

    /// Total volume of the member tetrahedra, in cubic metres.
    pub(crate) fn vol(&self) -> f64 {
        self.vol
    }

    /// Member tetrahedra, in insertion order.
    pub(crate) fn tets(&self) -> &[TetIdx] {
        &self.tets
    }

    /// Pick a member with probability proportional to volume.
    ///
    /// `rand01` is a uniform draw on [0, 1). Returns `None` for an
    /// empty compartment.
    pub(crate) fn pick_tet_by_vol(&self, rand01: f64) -> Option<TetIdx> {
        if self.tets.is_empty() {
            return None;
        }
        let target = rand01 * self.vol;
        let pos = self.cum_vol.partition_point(|&cv| cv <= target);
        Some(self.tets[pos.min(self.tets.len() - 1)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picker_is_volume_weighted() {
        let mut comp = Comp::new();
        comp.add_tet(TetIdx(10), 1.0);
        comp.add_tet(TetIdx(11), 3.0);
        // First quarter of the measure belongs to tet 10.
        assert_eq!(comp.pick_tet_by_vol(0.0), Some(TetIdx(10)));
        assert_eq!(comp.pick_tet_by_vol(0.24), Some(TetIdx(10)));
        assert_eq!(comp.pick_tet_by_vol(0.25), Some(TetIdx(11)));
        assert_eq!(comp.pick_tet_by_vol(0.999), Some(TetIdx(11)));
    }

    #[test]
    fn empty_compartment_picks_nothing() {
        let comp = Comp::new();
        assert_eq!(comp.pick_tet_by_vol(0.5), None);
    }
}
