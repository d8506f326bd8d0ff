//! Compiled volume-reaction definition.

use smallvec::SmallVec;
use tetkin_core::{CompGIdx, ReacGIdx, SpecGIdx};

/// A volume reaction: stoichiometry over the global species axis, the
/// compartment it belongs to, and its default rate constant.
///
/// `setup` derives the order, the signed update vector and the update
/// collection (the species whose counts a firing changes). Local,
/// compartment-indexed copies of the stoichiometry are built by
/// [`CompDef::setup_indices`](crate::CompDef).
#[derive(Clone, Debug)]
pub struct ReacDef {
    gidx: ReacGIdx,
    name: String,
    comp: CompGIdx,
    kcst_default: f64,
    lhs: Vec<u32>,
    rhs: Vec<u32>,
    upd: Vec<i32>,
    upd_coll: SmallVec<[SpecGIdx; 4]>,
    order: u32,
}

impl ReacDef {
    pub(crate) fn new(
        gidx: ReacGIdx,
        name: String,
        comp: CompGIdx,
        lhs: Vec<u32>,
        rhs: Vec<u32>,
        kcst_default: f64,
    ) -> Self {
        let nspecs = lhs.len();
        Self {
            gidx,
            name,
            comp,
            kcst_default,
            lhs,
            rhs,
            upd: vec![0; nspecs],
            upd_coll: SmallVec::new(),
            order: 0,
        }
    }

    /// Derive order, update vector and update collection.
    pub(crate) fn setup(&mut self) {
        self.order = self.lhs.iter().sum();
        for (s, (&l, &r)) in self.lhs.iter().zip(&self.rhs).enumerate() {
            let delta = r as i32 - l as i32;
            self.upd[s] = delta;
            if delta != 0 {
                self.upd_coll.push(SpecGIdx::from(s));
            }
        }
    }

    /// Global index.
    pub fn gidx(&self) -> ReacGIdx {
        self.gidx
    }

    /// Reaction name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The compartment this reaction is defined in.
    pub fn comp(&self) -> CompGIdx {
        self.comp
    }

    /// Sum of left-hand-side multiplicities.
    pub fn order(&self) -> u32 {
        self.order
    }

    /// Default macroscopic rate constant.
    pub fn kcst_default(&self) -> f64 {
        self.kcst_default
    }

    /// Reactant multiplicities over the global species axis.
    pub fn lhs(&self) -> &[u32] {
        &self.lhs
    }

    /// Signed stoichiometric change over the global species axis.
    pub fn upd(&self) -> &[i32] {
        &self.upd
    }

    /// Whether this reaction's rate reads the count of `spec`.
    pub fn dep(&self, spec: SpecGIdx) -> bool {
        self.lhs[spec.index()] != 0
    }

    /// Species whose counts a firing changes.
    pub fn upd_coll(&self) -> &[SpecGIdx] {
        &self.upd_coll
    }

    /// Species this reaction mentions on either side.
    pub(crate) fn involved_specs(&self) -> impl Iterator<Item = SpecGIdx> + '_ {
        self.lhs
            .iter()
            .zip(&self.rhs)
            .enumerate()
            .filter(|(_, (&l, &r))| l != 0 || r != 0)
            .map(|(s, _)| SpecGIdx::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_derives_order_and_updates() {
        // 2A + B -> C over species axis [A, B, C].
        let mut def = ReacDef::new(
            ReacGIdx(0),
            "assoc".into(),
            CompGIdx(0),
            vec![2, 1, 0],
            vec![0, 0, 1],
            1.0e6,
        );
        def.setup();
        assert_eq!(def.order(), 3);
        assert_eq!(def.upd(), &[-2, -1, 1]);
        assert_eq!(
            def.upd_coll(),
            &[SpecGIdx(0), SpecGIdx(1), SpecGIdx(2)]
        );
        assert!(def.dep(SpecGIdx(0)));
        assert!(!def.dep(SpecGIdx(2)));
    }
}
