//! Compiled species definition.

use tetkin_core::SpecGIdx;

/// A species with its global index.
#[derive(Clone, Debug)]
pub struct SpecDef {
    gidx: SpecGIdx,
    name: String,
}

impl SpecDef {
    pub(crate) fn new(gidx: SpecGIdx, name: String) -> Self {
        Self { gidx, name }
    }

    /// Global index.
    pub fn gidx(&self) -> SpecGIdx {
        self.gidx
    }

    /// Species name.
    pub fn name(&self) -> &str {
        &self.name
    }
}
