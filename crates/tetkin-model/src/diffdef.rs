//! Compiled diffusion-rule definition.

use tetkin_core::{CompGIdx, DiffGIdx, SpecGIdx};

/// A diffusion rule: one ligand species diffusing within one
/// compartment with a default diffusion constant.
#[derive(Clone, Debug)]
pub struct DiffDef {
    gidx: DiffGIdx,
    name: String,
    comp: CompGIdx,
    lig: SpecGIdx,
    dcst_default: f64,
}

impl DiffDef {
    pub(crate) fn new(
        gidx: DiffGIdx,
        name: String,
        comp: CompGIdx,
        lig: SpecGIdx,
        dcst_default: f64,
    ) -> Self {
        Self {
            gidx,
            name,
            comp,
            lig,
            dcst_default,
        }
    }

    /// Global index.
    pub fn gidx(&self) -> DiffGIdx {
        self.gidx
    }

    /// Diffusion-rule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The compartment this rule applies in.
    pub fn comp(&self) -> CompGIdx {
        self.comp
    }

    /// The diffusing species.
    pub fn lig(&self) -> SpecGIdx {
        self.lig
    }

    /// Default diffusion constant, in m^2/s.
    pub fn dcst_default(&self) -> f64 {
        self.dcst_default
    }
}
