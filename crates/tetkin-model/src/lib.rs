//! Chemistry model contract and compiled state definition.
//!
//! The solver consumes chemistry in two stages. A [`ModelSpec`] is the
//! declarative input: species, compartments and patches by name,
//! reactions and surface reactions with stoichiometry, diffusion rules,
//! diffusion boundaries. [`StateDef`] is the compiled form: every
//! definition gets a global index, every compartment and patch gets
//! frozen global-to-local index maps and dense local stoichiometry
//! tables, and surface reactions get their inner/outer volume vectors
//! resolved against the adjacent compartments.
//!
//! Compilation runs in a fixed order so that surface reactions can pull
//! species into their adjacent compartments before local indices
//! freeze:
//!
//! 1. resolve names and build raw defs,
//! 2. `setup` each reaction / surface reaction / diffusion def
//!    (orders, update vectors, update collections),
//! 3. `setup_references` on compartments then patches (species
//!    membership, including species a surface reaction needs in the
//!    inner or outer compartment),
//! 4. `setup_indices` on compartments then patches (freeze maps, build
//!    local tables),
//! 5. resolve diffusion boundaries.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod compdef;
mod diffboundarydef;
mod diffdef;
mod error;
mod model;
mod patchdef;
mod reacdef;
mod specdef;
mod sreacdef;
mod statedef;

pub use compdef::CompDef;
pub use diffboundarydef::DiffBoundaryDef;
pub use diffdef::DiffDef;
pub use error::ModelError;
pub use model::{
    CompartmentSpec, DiffBoundarySpec, DiffusionSpec, ModelSpec, PatchSpec, ReactionSpec,
    SpeciesSpec, SurfaceReactionSpec,
};
pub use patchdef::PatchDef;
pub use reacdef::ReacDef;
pub use specdef::SpecDef;
pub use sreacdef::SReacDef;
pub use statedef::StateDef;

/// Highest supported stoichiometric multiplicity on any left-hand side.
pub const MAX_LHS: u32 = 4;

/// Highest supported reaction order (sum of left-hand multiplicities).
pub const MAX_ORDER: u32 = 4;
