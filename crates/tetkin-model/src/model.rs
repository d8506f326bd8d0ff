//! Declarative model input.
//!
//! Plain data, checked only when compiled into a
//! [`StateDef`](crate::StateDef). Species, compartments, patches and
//! boundaries are referenced by name; stoichiometry is a list of
//! `(species name, multiplicity)` pairs.

/// One chemical species.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeciesSpec {
    /// Unique species name.
    pub name: String,
}

/// A compartment: a named volume with shared chemistry.
///
/// The name must match a compartment region in the mesh. Species used
/// by the compartment's reactions and diffusion rules are included
/// automatically; `species` lists any additional ones (for example a
/// product delivered only by a surface reaction, or a species only
/// injected externally).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompartmentSpec {
    /// Unique compartment name, matching a mesh region.
    pub name: String,
    /// Extra species defined in this compartment.
    pub species: Vec<String>,
}

/// A patch: a named surface bound to an inner and optionally an outer
/// compartment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchSpec {
    /// Unique patch name, matching a mesh region.
    pub name: String,
    /// Name of the inner compartment.
    pub inner: String,
    /// Name of the outer compartment, if the patch has one.
    pub outer: Option<String>,
    /// Extra surface species defined on this patch.
    pub species: Vec<String>,
}

/// A volume reaction within one compartment.
#[derive(Clone, Debug, PartialEq)]
pub struct ReactionSpec {
    /// Unique reaction name.
    pub name: String,
    /// Compartment the reaction is defined in.
    pub comp: String,
    /// Reactants: `(species, multiplicity)` pairs.
    pub lhs: Vec<(String, u32)>,
    /// Products: `(species, multiplicity)` pairs.
    pub rhs: Vec<(String, u32)>,
    /// Macroscopic rate constant, in s^-1 M^(1-order).
    pub kcst: f64,
}

/// A surface reaction on one patch.
///
/// Reactants may sit on the surface itself and in at most one adjacent
/// volume (inner or outer, not both). Products may be placed on the
/// surface and in either volume.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceReactionSpec {
    /// Unique surface-reaction name.
    pub name: String,
    /// Patch the reaction is defined on.
    pub patch: String,
    /// Surface reactants.
    pub slhs: Vec<(String, u32)>,
    /// Inner-volume reactants. Mutually exclusive with `olhs`.
    pub ilhs: Vec<(String, u32)>,
    /// Outer-volume reactants. Mutually exclusive with `ilhs`.
    pub olhs: Vec<(String, u32)>,
    /// Surface products.
    pub srhs: Vec<(String, u32)>,
    /// Inner-volume products.
    pub irhs: Vec<(String, u32)>,
    /// Outer-volume products.
    pub orhs: Vec<(String, u32)>,
    /// Macroscopic rate constant.
    pub kcst: f64,
}

/// A diffusion rule for one species within one compartment.
#[derive(Clone, Debug, PartialEq)]
pub struct DiffusionSpec {
    /// Unique diffusion-rule name.
    pub name: String,
    /// Compartment the rule applies in.
    pub comp: String,
    /// The diffusing species.
    pub ligand: String,
    /// Diffusion constant, in m^2/s.
    pub dcst: f64,
}

/// A diffusion boundary between two compartments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffBoundarySpec {
    /// Unique boundary name, matching a mesh region.
    pub name: String,
    /// First connected compartment.
    pub comp_a: String,
    /// Second connected compartment.
    pub comp_b: String,
}

/// The complete declarative model.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelSpec {
    /// All species.
    pub species: Vec<SpeciesSpec>,
    /// All compartments.
    pub compartments: Vec<CompartmentSpec>,
    /// All patches.
    pub patches: Vec<PatchSpec>,
    /// All volume reactions.
    pub reactions: Vec<ReactionSpec>,
    /// All surface reactions.
    pub surface_reactions: Vec<SurfaceReactionSpec>,
    /// All diffusion rules.
    pub diffusions: Vec<DiffusionSpec>,
    /// All diffusion boundaries.
    pub diff_boundaries: Vec<DiffBoundarySpec>,
}

impl ModelSpec {
    /// Convenience constructor for a species list from names.
    pub fn species_from_names<I, S>(names: I) -> Vec<SpeciesSpec>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .map(|n| SpeciesSpec { name: n.into() })
            .collect()
    }
}
