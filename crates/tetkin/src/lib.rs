//! Tetkin: exact stochastic reaction-diffusion simulation on
//! tetrahedral meshes.
//!
//! This is the facade crate re-exporting the public API of the Tetkin
//! workspace. Most users need only this one dependency.
//!
//! # Quick start
//!
//! ```
//! use tetkin::prelude::*;
//!
//! // One tetrahedron of one femtolitre, species A decaying at 1/s.
//! let tet = TetData {
//!     vol: 1.0e-18,
//!     areas: [1.0e-12; 4],
//!     dists: [1.0e-6; 4],
//!     neighbours: [None; 4],
//!     faces: [None; 4],
//! };
//! let mut mesh = TetMesh::new(vec![tet], vec![]).unwrap();
//! mesh.add_compartment("cyt", vec![TetIdx(0)]).unwrap();
//!
//! let model = ModelSpec {
//!     species: ModelSpec::species_from_names(["A"]),
//!     compartments: vec![CompartmentSpec { name: "cyt".into(), species: vec![] }],
//!     reactions: vec![ReactionSpec {
//!         name: "decay".into(),
//!         comp: "cyt".into(),
//!         lhs: vec![("A".into(), 1)],
//!         rhs: vec![],
//!         kcst: 1.0,
//!     }],
//!     ..ModelSpec::default()
//! };
//!
//! let mut sim = Solver::new(&model, &mesh, SimRng::new(42)).unwrap();
//! let cyt = sim.statedef().comp_gidx("cyt").unwrap();
//! let a = sim.statedef().spec_gidx("A").unwrap();
//! sim.set_comp_count(cyt, a, 1000.0).unwrap();
//! sim.run(1.0).unwrap();
//! assert!(sim.comp_count(cyt, a).unwrap() < 1000.0);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub use tetkin_engine as engine;
pub use tetkin_mesh as mesh;
pub use tetkin_model as model;

pub use tetkin_core::{SimError, SimRng};
pub use tetkin_engine::{BuildError, CheckpointError, Solver};

/// The commonly used types, in one import.
pub mod prelude {
    pub use tetkin_core::{
        CompGIdx, DiffBndGIdx, DiffGIdx, PatchGIdx, ReacGIdx, SReacGIdx, SimError, SimRng,
        SpecGIdx, TetIdx, TriIdx,
    };
    pub use tetkin_engine::{BuildError, CheckpointError, Solver};
    pub use tetkin_mesh::{MeshError, TetData, TetMesh, TriData};
    pub use tetkin_model::{
        CompartmentSpec, DiffBoundarySpec, DiffusionSpec, ModelError, ModelSpec, PatchSpec,
        ReactionSpec, SpeciesSpec, StateDef, SurfaceReactionSpec,
    };
}
