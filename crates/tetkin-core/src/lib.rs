//! Core types for the Tetkin stochastic reaction-diffusion simulator.
//!
//! This is the leaf crate with no internal Tetkin dependencies. It defines
//! the strongly-typed index families shared by the model compiler and the
//! solver, the error taxonomy, physical constants, and the [`SimRng`]
//! pseudo-random source that every stochastic draw in the engine goes
//! through.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod constants;
pub mod error;
pub mod ids;
pub mod rng;

pub use constants::{AVOGADRO, LITRE_PER_CUBIC_METRE};
pub use error::SimError;
pub use ids::{
    CompGIdx, DiffBndGIdx, DiffGIdx, DiffLIdx, KProcIdx, PatchGIdx, ReacGIdx, ReacLIdx, SReacGIdx,
    SReacLIdx, SpecGIdx, SpecLIdx, TetIdx, TriIdx,
};
pub use rng::{RngSnapshot, SimRng};
