//! Patch registry: the triangles of one patch and the area-weighted
//! facet picker.

use tetkin_core::TriIdx;

/// Aggregation of the triangles assigned to one patch.
///
/// Stored in patch-definition order, like the compartment registries.
#[derive(Clone, Debug)]
pub(crate) struct Patch {
    tris: Vec<TriIdx>,
    cum_area: Vec<f64>,
    area: f64,
}

impl Patch {
    pub(crate) fn new() -> Self {
        Self {
            tris: Vec::new(),
            cum_area: Vec::new(),
            area: 0.0,
        }
    }

    pub(crate) fn add_tri(&mut self, tri: TriIdx, area: f64) {
        self.area += area;
        self.tris.push(tri);
        self.cum_area.push(self.area);
    }

    /// Total area of the member triangles, in square metres.
    pub(crate) fn area(&self) -> f64 {
        self.area
    }

    /// Member triangles, in insertion order.
    pub(crate) fn tris(&self) -> &[TriIdx] {
        &self.tris
    }

    /// Pick a member with probability proportional to area.
    ///
    /// `rand01` is a uniform draw on [0, 1). Returns `None` for an
    /// empty patch.
    pub(crate) fn pick_tri_by_area(&self, rand01: f64) -> Option<TriIdx> {
        if self.tris.is_empty() {
            return None;
        }
        let target = rand01 * self.area;
        let pos = self.cum_area.partition_point(|&ca| ca <= target);
        Some(self.tris[pos.min(self.tris.len() - 1)])
    }
}
