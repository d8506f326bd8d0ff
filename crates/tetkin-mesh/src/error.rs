//! Structural validation failures for mesh construction.

use std::error::Error;
use std::fmt;

use tetkin_core::{TetIdx, TriIdx};

/// A rejected mesh element or region.
#[derive(Clone, Debug, PartialEq)]
pub enum MeshError {
    /// A tetrahedron referenced a tetrahedron index outside the mesh.
    TetNeighbourOutOfRange {
        /// The referencing tetrahedron.
        tet: TetIdx,
        /// The out-of-range neighbour index.
        neighbour: TetIdx,
    },
    /// A tetrahedron or triangle referenced a triangle index outside
    /// the mesh.
    TriOutOfRange {
        /// The out-of-range triangle index.
        tri: TriIdx,
    },
    /// A triangle referenced a tetrahedron index outside the mesh.
    TriTetOutOfRange {
        /// The referencing triangle.
        tri: TriIdx,
        /// The out-of-range tetrahedron index.
        tet: TetIdx,
    },
    /// A region referenced a tetrahedron index outside the mesh.
    RegionTetOutOfRange {
        /// Region name.
        region: String,
        /// The out-of-range index.
        tet: TetIdx,
    },
    /// A region referenced a triangle index outside the mesh.
    RegionTriOutOfRange {
        /// Region name.
        region: String,
        /// The out-of-range index.
        tri: TriIdx,
    },
    /// Two regions of the same kind share a name.
    DuplicateRegion {
        /// The repeated name.
        name: String,
    },
    /// A tetrahedron was assigned to more than one compartment.
    TetInTwoCompartments {
        /// The doubly-assigned tetrahedron.
        tet: TetIdx,
    },
    /// A triangle was assigned to more than one patch.
    TriInTwoPatches {
        /// The doubly-assigned triangle.
        tri: TriIdx,
    },
    /// A volume or area that must be positive was not.
    NonPositiveMeasure {
        /// Description of the element, e.g. `tetrahedron 3 volume`.
        what: String,
        /// The offending value.
        value: f64,
    },
    /// A diffusion-boundary triangle lacks a tetrahedron on one side.
    BoundaryTriNotInterior {
        /// Region name.
        region: String,
        /// The offending triangle.
        tri: TriIdx,
    },
    /// A diffusion-boundary triangle already belongs to a patch.
    BoundaryTriInPatch {
        /// Region name.
        region: String,
        /// The offending triangle.
        tri: TriIdx,
    },
    /// A patch triangle has no inner tetrahedron.
    PatchTriNoInnerTet {
        /// Region name.
        region: String,
        /// The offending triangle.
        tri: TriIdx,
    },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TetNeighbourOutOfRange { tet, neighbour } => {
                write!(f, "tetrahedron {tet} references neighbour {neighbour} outside the mesh")
            }
            Self::TriOutOfRange { tri } => {
                write!(f, "triangle index {tri} outside the mesh")
            }
            Self::TriTetOutOfRange { tri, tet } => {
                write!(f, "triangle {tri} references tetrahedron {tet} outside the mesh")
            }
            Self::RegionTetOutOfRange { region, tet } => {
                write!(f, "region '{region}' references tetrahedron {tet} outside the mesh")
            }
            Self::RegionTriOutOfRange { region, tri } => {
                write!(f, "region '{region}' references triangle {tri} outside the mesh")
            }
            Self::DuplicateRegion { name } => write!(f, "region '{name}' declared twice"),
            Self::TetInTwoCompartments { tet } => {
                write!(f, "tetrahedron {tet} assigned to two compartments")
            }
            Self::TriInTwoPatches { tri } => {
                write!(f, "triangle {tri} assigned to two patches")
            }
            Self::NonPositiveMeasure { what, value } => {
                write!(f, "{what} must be positive (got {value})")
            }
            Self::BoundaryTriNotInterior { region, tri } => {
                write!(
                    f,
                    "diffusion boundary '{region}' includes triangle {tri} without \
                     tetrahedra on both sides"
                )
            }
            Self::BoundaryTriInPatch { region, tri } => {
                write!(
                    f,
                    "diffusion boundary '{region}' includes triangle {tri}, which \
                     belongs to a patch"
                )
            }
            Self::PatchTriNoInnerTet { region, tri } => {
                write!(f, "patch '{region}' includes triangle {tri} without an inner tetrahedron")
            }
        }
    }
}

impl Error for MeshError {}
