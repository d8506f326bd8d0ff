//! Tetrahedral mesh contract consumed by the Tetkin solver.
//!
//! The solver does not load or generate geometry. It consumes a
//! [`TetMesh`]: per-tetrahedron volumes, face areas, barycenter
//! distances and neighbour links, per-triangle areas and inner/outer
//! tetrahedra, plus named regions assigning tetrahedra to compartments,
//! triangles to patches, and triangles to diffusion boundaries.
//!
//! A `TetMesh` is immutable once built. Structural validation happens
//! eagerly: every cross-reference is range-checked when the element or
//! region is added, so the solver can index without further checks.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod error;
mod mesh;

pub use error::MeshError;
pub use mesh::{TetData, TetMesh, TriData};
