//! The solver-facing error taxonomy.
//!
//! Precondition violations surface as [`SimError`] values: a species,
//! reaction or diffusion rule addressed in a container where it is not
//! defined, an unassigned voxel, a negative quantity, and so on. Every
//! variant names the offending identifier.
//!
//! Invariant violations (a count going negative inside an apply, the
//! event selector failing to locate an event while `A0 > 0`) are *not*
//! represented here: they leave the engine in an undefined state and
//! panic with a diagnostic payload instead.

use std::error::Error;
use std::fmt;

use crate::ids::{TetIdx, TriIdx};

/// A rejected operation on the solver's public surface.
#[derive(Clone, Debug, PartialEq)]
pub enum SimError {
    /// The species is not defined in the addressed compartment, patch,
    /// voxel or facet.
    SpecUndefined {
        /// Species name.
        spec: String,
        /// Human-readable container description, e.g. `compartment 'cyt'`.
        container: String,
    },
    /// The volume reaction is not defined in the addressed compartment.
    ReacUndefined {
        /// Reaction name.
        reac: String,
        /// Container description.
        container: String,
    },
    /// The surface reaction is not defined on the addressed patch.
    SReacUndefined {
        /// Surface-reaction name.
        sreac: String,
        /// Container description.
        container: String,
    },
    /// The diffusion rule is not defined in the addressed compartment.
    DiffUndefined {
        /// Diffusion-rule name.
        diff: String,
        /// Container description.
        container: String,
    },
    /// The tetrahedron exists in the mesh but belongs to no compartment.
    TetUnassigned {
        /// Mesh index of the tetrahedron.
        tet: TetIdx,
    },
    /// The triangle exists in the mesh but belongs to no patch.
    TriUnassigned {
        /// Mesh index of the triangle.
        tri: TriIdx,
    },
    /// An index was outside the registry it addresses.
    IndexOutOfRange {
        /// What kind of object was addressed.
        kind: &'static str,
        /// The offending index.
        index: u32,
        /// Number of objects in the registry.
        count: u32,
    },
    /// A population, concentration, rate constant or time span that
    /// must be non-negative was negative.
    NegativeValue {
        /// What the value was supposed to be.
        what: &'static str,
        /// The offending value.
        value: f64,
    },
    /// A requested population does not fit in an unsigned 32-bit count.
    CountTooLarge {
        /// The requested count.
        value: f64,
    },
    /// `run` was asked to stop before the current simulation time.
    EndTimeInPast {
        /// Requested end time, in seconds.
        end: f64,
        /// Current simulation time, in seconds.
        now: f64,
    },
    /// A diffusion-boundary operation named a species that is not
    /// defined in both connected compartments.
    BoundarySpecUndefined {
        /// Species name.
        spec: String,
        /// Diffusion-boundary name.
        boundary: String,
    },
    /// The operation is not supported on this solver.
    NotImplemented {
        /// The rejected operation.
        op: &'static str,
    },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpecUndefined { spec, container } => {
                write!(f, "species '{spec}' is not defined in {container}")
            }
            Self::ReacUndefined { reac, container } => {
                write!(f, "reaction '{reac}' is not defined in {container}")
            }
            Self::SReacUndefined { sreac, container } => {
                write!(f, "surface reaction '{sreac}' is not defined on {container}")
            }
            Self::DiffUndefined { diff, container } => {
                write!(f, "diffusion rule '{diff}' is not defined in {container}")
            }
            Self::TetUnassigned { tet } => {
                write!(f, "tetrahedron {tet} has not been assigned to a compartment")
            }
            Self::TriUnassigned { tri } => {
                write!(f, "triangle {tri} has not been assigned to a patch")
            }
            Self::IndexOutOfRange { kind, index, count } => {
                write!(f, "{kind} index {index} out of range (have {count})")
            }
            Self::NegativeValue { what, value } => {
                write!(f, "{what} cannot be negative (got {value})")
            }
            Self::CountTooLarge { value } => {
                write!(
                    f,
                    "cannot set count greater than maximum unsigned 32-bit integer (got {value})"
                )
            }
            Self::EndTimeInPast { end, now } => {
                write!(f, "end time {end} is before current simulation time {now}")
            }
            Self::BoundarySpecUndefined { spec, boundary } => {
                write!(
                    f,
                    "species '{spec}' is not defined in both compartments connected by \
                     diffusion boundary '{boundary}'"
                )
            }
            Self::NotImplemented { op } => write!(f, "{op} is not supported"),
        }
    }
}

impl Error for SimError {}
