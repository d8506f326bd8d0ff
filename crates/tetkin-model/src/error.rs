//! Model compilation failures.

use std::error::Error;
use std::fmt;

/// A rejected model description.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelError {
    /// The model declares no species.
    NoSpecies,
    /// Two declarations of the same kind share a name.
    DuplicateName {
        /// What kind of declaration.
        kind: &'static str,
        /// The repeated name.
        name: String,
    },
    /// A declaration referenced a species name that does not exist.
    UnknownSpecies {
        /// The unresolved name.
        name: String,
        /// The referencing declaration.
        referrer: String,
    },
    /// A declaration referenced a compartment name that does not exist.
    UnknownCompartment {
        /// The unresolved name.
        name: String,
        /// The referencing declaration.
        referrer: String,
    },
    /// A declaration referenced a patch name that does not exist.
    UnknownPatch {
        /// The unresolved name.
        name: String,
        /// The referencing declaration.
        referrer: String,
    },
    /// A model region has no counterpart of the same name in the mesh.
    MissingMeshRegion {
        /// What kind of region.
        kind: &'static str,
        /// The region name.
        name: String,
    },
    /// A surface reaction declared reactants in both the inner and the
    /// outer volume.
    InnerAndOuterReactants {
        /// The offending surface reaction.
        sreac: String,
    },
    /// A surface reaction or patch addressed the outer volume of a
    /// patch that has no outer compartment.
    NoOuterCompartment {
        /// The offending declaration.
        referrer: String,
    },
    /// A left-hand-side multiplicity exceeds the supported maximum.
    MultiplicityTooLarge {
        /// The offending declaration.
        name: String,
        /// Species whose multiplicity is too large.
        spec: String,
        /// The declared multiplicity.
        mult: u32,
    },
    /// A reaction order exceeds the supported maximum.
    OrderTooHigh {
        /// The offending declaration.
        name: String,
        /// The computed order.
        order: u32,
    },
    /// A rate or diffusion constant was negative.
    NegativeConstant {
        /// The offending declaration.
        name: String,
        /// The declared value.
        value: f64,
    },
    /// A diffusion boundary connects a compartment to itself.
    BoundarySelfConnection {
        /// The offending boundary.
        name: String,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSpecies => write!(f, "model declares no species"),
            Self::DuplicateName { kind, name } => {
                write!(f, "duplicate {kind} name '{name}'")
            }
            Self::UnknownSpecies { name, referrer } => {
                write!(f, "{referrer} references unknown species '{name}'")
            }
            Self::UnknownCompartment { name, referrer } => {
                write!(f, "{referrer} references unknown compartment '{name}'")
            }
            Self::UnknownPatch { name, referrer } => {
                write!(f, "{referrer} references unknown patch '{name}'")
            }
            Self::MissingMeshRegion { kind, name } => {
                write!(f, "mesh has no {kind} region named '{name}'")
            }
            Self::InnerAndOuterReactants { sreac } => {
                write!(
                    f,
                    "surface reaction '{sreac}' declares reactants in both the inner \
                     and the outer volume"
                )
            }
            Self::NoOuterCompartment { referrer } => {
                write!(f, "{referrer} addresses the outer volume of a patch without one")
            }
            Self::MultiplicityTooLarge { name, spec, mult } => {
                write!(
                    f,
                    "'{name}': multiplicity {mult} of species '{spec}' exceeds the \
                     supported maximum of {}",
                    crate::MAX_LHS
                )
            }
            Self::OrderTooHigh { name, order } => {
                write!(
                    f,
                    "'{name}': order {order} exceeds the supported maximum of {}",
                    crate::MAX_ORDER
                )
            }
            Self::NegativeConstant { name, value } => {
                write!(f, "'{name}': kinetic constant cannot be negative (got {value})")
            }
            Self::BoundarySelfConnection { name } => {
                write!(f, "diffusion boundary '{name}' connects a compartment to itself")
            }
        }
    }
}

impl Error for ModelError {}
