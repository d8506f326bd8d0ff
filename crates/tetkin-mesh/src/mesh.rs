//! The immutable mesh description and its named regions.

use indexmap::IndexMap;
use tetkin_core::{TetIdx, TriIdx};

use crate::error::MeshError;

/// Geometry of one tetrahedron.
///
/// Face slots are indexed 0..4 in a fixed per-tet order. The same slot
/// `i` indexes the face area `areas[i]`, the barycenter distance to the
/// neighbour behind that face `dists[i]`, the neighbour itself
/// `neighbours[i]`, and the mesh triangle forming the face `faces[i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct TetData {
    /// Volume, in cubic metres.
    pub vol: f64,
    /// Areas of the four faces, in square metres.
    pub areas: [f64; 4],
    /// Barycenter-to-barycenter distances to the four neighbours, in
    /// metres. Meaningful only where the neighbour exists.
    pub dists: [f64; 4],
    /// Neighbouring tetrahedra behind the four faces. `None` on the
    /// mesh surface.
    pub neighbours: [Option<TetIdx>; 4],
    /// Mesh triangles forming the four faces, where the triangle is
    /// part of the mesh's triangle list.
    pub faces: [Option<TriIdx>; 4],
}

/// Geometry of one triangle.
#[derive(Clone, Debug, PartialEq)]
pub struct TriData {
    /// Area, in square metres.
    pub area: f64,
    /// The tetrahedron on the inner side, by the mesh's orientation
    /// convention. Patch triangles must have one.
    pub inner: Option<TetIdx>,
    /// The tetrahedron on the outer side, if any.
    pub outer: Option<TetIdx>,
}

/// A validated tetrahedral mesh with named regions.
///
/// Regions give meaning to mesh elements: compartments are sets of
/// tetrahedra sharing chemistry, patches are sets of triangles carrying
/// surface chemistry, diffusion boundaries are sets of interior
/// triangles across which diffusion can be selectively enabled. Region
/// names are matched against the chemistry model when the solver is
/// built.
#[derive(Clone, Debug)]
pub struct TetMesh {
    tets: Vec<TetData>,
    tris: Vec<TriData>,
    comps: IndexMap<String, Vec<TetIdx>>,
    patches: IndexMap<String, Vec<TriIdx>>,
    boundaries: IndexMap<String, Vec<TriIdx>>,
    tet_assigned: Vec<bool>,
    tri_assigned: Vec<bool>,
}

impl TetMesh {
    /// Build a mesh from element lists, validating every cross-reference.
    pub fn new(tets: Vec<TetData>, tris: Vec<TriData>) -> Result<Self, MeshError> {
        let ntets = tets.len();
        let ntris = tris.len();

        for (i, tet) in tets.iter().enumerate() {
            let tidx = TetIdx::from(i);
            if tet.vol <= 0.0 {
                return Err(MeshError::NonPositiveMeasure {
                    what: format!("tetrahedron {tidx} volume"),
                    value: tet.vol,
                });
            }
            for f in 0..4 {
                if tet.areas[f] <= 0.0 {
                    return Err(MeshError::NonPositiveMeasure {
                        what: format!("tetrahedron {tidx} face {f} area"),
                        value: tet.areas[f],
                    });
                }
                if let Some(n) = tet.neighbours[f] {
                    if n.index() >= ntets {
                        return Err(MeshError::TetNeighbourOutOfRange {
                            tet: tidx,
                            neighbour: n,
                        });
                    }
                }
                if let Some(t) = tet.faces[f] {
                    if t.index() >= ntris {
                        return Err(MeshError::TriOutOfRange { tri: t });
                    }
                }
            }
        }

        for (i, tri) in tris.iter().enumerate() {
            let tidx = TriIdx::from(i);
            if tri.area <= 0.0 {
                return Err(MeshError::NonPositiveMeasure {
                    what: format!("triangle {tidx} area"),
                    value: tri.area,
                });
            }
            for tet in [tri.inner, tri.outer].into_iter().flatten() {
                if tet.index() >= ntets {
                    return Err(MeshError::TriTetOutOfRange { tri: tidx, tet });
                }
            }
        }

        Ok(Self {
            tet_assigned: vec![false; ntets],
            tri_assigned: vec![false; ntris],
            tets,
            tris,
            comps: IndexMap::new(),
            patches: IndexMap::new(),
            boundaries: IndexMap::new(),
        })
    }

    /// Assign tetrahedra to a named compartment.
    ///
    /// Each tetrahedron may belong to at most one compartment.
    pub fn add_compartment(&mut self, name: &str, tets: Vec<TetIdx>) -> Result<(), MeshError> {
        if self.comps.contains_key(name) {
            return Err(MeshError::DuplicateRegion { name: name.into() });
        }
        for &t in &tets {
            if t.index() >= self.tets.len() {
                return Err(MeshError::RegionTetOutOfRange {
                    region: name.into(),
                    tet: t,
                });
            }
            if self.tet_assigned[t.index()] {
                return Err(MeshError::TetInTwoCompartments { tet: t });
            }
        }
        for &t in &tets {
            self.tet_assigned[t.index()] = true;
        }
        self.comps.insert(name.to_owned(), tets);
        Ok(())
    }

    /// Assign triangles to a named patch.
    ///
    /// Each triangle may belong to at most one patch, and every patch
    /// triangle must have an inner tetrahedron.
    pub fn add_patch(&mut self, name: &str, tris: Vec<TriIdx>) -> Result<(), MeshError> {
        if self.patches.contains_key(name) {
            return Err(MeshError::DuplicateRegion { name: name.into() });
        }
        for &t in &tris {
            if t.index() >= self.tris.len() {
                return Err(MeshError::RegionTriOutOfRange {
                    region: name.into(),
                    tri: t,
                });
            }
            if self.tri_assigned[t.index()] {
                return Err(MeshError::TriInTwoPatches { tri: t });
            }
            if self.tris[t.index()].inner.is_none() {
                return Err(MeshError::PatchTriNoInnerTet {
                    region: name.into(),
                    tri: t,
                });
            }
        }
        for &t in &tris {
            self.tri_assigned[t.index()] = true;
        }
        self.patches.insert(name.to_owned(), tris);
        Ok(())
    }

    /// Declare a diffusion boundary over a set of interior triangles.
    ///
    /// Every boundary triangle must have tetrahedra on both sides and
    /// may not belong to a patch; declare patches first.
    pub fn add_diff_boundary(&mut self, name: &str, tris: Vec<TriIdx>) -> Result<(), MeshError> {
        if self.boundaries.contains_key(name) {
            return Err(MeshError::DuplicateRegion { name: name.into() });
        }
        for &t in &tris {
            if t.index() >= self.tris.len() {
                return Err(MeshError::RegionTriOutOfRange {
                    region: name.into(),
                    tri: t,
                });
            }
            if self.tri_assigned[t.index()] {
                return Err(MeshError::BoundaryTriInPatch {
                    region: name.into(),
                    tri: t,
                });
            }
            let tri = &self.tris[t.index()];
            if tri.inner.is_none() || tri.outer.is_none() {
                return Err(MeshError::BoundaryTriNotInterior {
                    region: name.into(),
                    tri: t,
                });
            }
        }
        for &t in &tris {
            self.tri_assigned[t.index()] = true;
        }
        self.boundaries.insert(name.to_owned(), tris);
        Ok(())
    }

    /// Number of tetrahedra in the mesh.
    pub fn tet_count(&self) -> usize {
        self.tets.len()
    }

    /// Number of triangles in the mesh.
    pub fn tri_count(&self) -> usize {
        self.tris.len()
    }

    /// Geometry of one tetrahedron.
    pub fn tet(&self, idx: TetIdx) -> Option<&TetData> {
        self.tets.get(idx.index())
    }

    /// Geometry of one triangle.
    pub fn tri(&self, idx: TriIdx) -> Option<&TriData> {
        self.tris.get(idx.index())
    }

    /// Tetrahedra of a named compartment.
    pub fn compartment(&self, name: &str) -> Option<&[TetIdx]> {
        self.comps.get(name).map(Vec::as_slice)
    }

    /// Triangles of a named patch.
    pub fn patch(&self, name: &str) -> Option<&[TriIdx]> {
        self.patches.get(name).map(Vec::as_slice)
    }

    /// Triangles of a named diffusion boundary.
    pub fn diff_boundary(&self, name: &str) -> Option<&[TriIdx]> {
        self.boundaries.get(name).map(Vec::as_slice)
    }

    /// All compartments, in declaration order.
    pub fn compartments(&self) -> impl Iterator<Item = (&str, &[TetIdx])> {
        self.comps.iter().map(|(n, t)| (n.as_str(), t.as_slice()))
    }

    /// All patches, in declaration order.
    pub fn patches(&self) -> impl Iterator<Item = (&str, &[TriIdx])> {
        self.patches.iter().map(|(n, t)| (n.as_str(), t.as_slice()))
    }

    /// All diffusion boundaries, in declaration order.
    pub fn diff_boundaries(&self) -> impl Iterator<Item = (&str, &[TriIdx])> {
        self.boundaries
            .iter()
            .map(|(n, t)| (n.as_str(), t.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lone_tet() -> TetData {
        TetData {
            vol: 1.0e-18,
            areas: [1.0e-12; 4],
            dists: [1.0e-6; 4],
            neighbours: [None; 4],
            faces: [None; 4],
        }
    }

    #[test]
    fn rejects_non_positive_volume() {
        let mut tet = lone_tet();
        tet.vol = 0.0;
        let err = TetMesh::new(vec![tet], vec![]).unwrap_err();
        assert!(matches!(err, MeshError::NonPositiveMeasure { .. }));
    }

    #[test]
    fn rejects_dangling_neighbour() {
        let mut tet = lone_tet();
        tet.neighbours[2] = Some(TetIdx(5));
        let err = TetMesh::new(vec![tet], vec![]).unwrap_err();
        assert!(matches!(err, MeshError::TetNeighbourOutOfRange { .. }));
    }

    #[test]
    fn compartment_membership_is_exclusive() {
        let mut mesh = TetMesh::new(vec![lone_tet(), lone_tet()], vec![]).unwrap();
        mesh.add_compartment("a", vec![TetIdx(0)]).unwrap();
        let err = mesh.add_compartment("b", vec![TetIdx(0)]).unwrap_err();
        assert_eq!(err, MeshError::TetInTwoCompartments { tet: TetIdx(0) });
    }

    #[test]
    fn boundary_tri_needs_both_sides() {
        let tri = TriData {
            area: 1.0e-12,
            inner: Some(TetIdx(0)),
            outer: None,
        };
        let mut mesh = TetMesh::new(vec![lone_tet()], vec![tri]).unwrap();
        let err = mesh.add_diff_boundary("b", vec![TriIdx(0)]).unwrap_err();
        assert!(matches!(err, MeshError::BoundaryTriNotInterior { .. }));
    }

    #[test]
    fn regions_iterate_in_declaration_order() {
        let mut mesh = TetMesh::new(vec![lone_tet(), lone_tet()], vec![]).unwrap();
        mesh.add_compartment("outer", vec![TetIdx(1)]).unwrap();
        mesh.add_compartment("inner", vec![TetIdx(0)]).unwrap();
        let names: Vec<&str> = mesh.compartments().map(|(n, _)| n).collect();
        assert_eq!(names, ["outer", "inner"]);
    }
}
