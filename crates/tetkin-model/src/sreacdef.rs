//! Compiled surface-reaction definition.

use smallvec::SmallVec;
use tetkin_core::{PatchGIdx, SReacGIdx, SpecGIdx};

/// A surface reaction: surface stoichiometry plus at most one volume
/// side contributing reactants.
///
/// The three stoichiometric axes (surface, inner volume, outer volume)
/// are kept over the global species axis here; patch-local and
/// compartment-local copies are built by
/// [`PatchDef::setup_indices`](crate::PatchDef).
///
/// Orientation flags derive from the reactant vectors: `inside` when
/// the inner volume contributes reactants, `outside` when the outer
/// volume does (the two are mutually exclusive), `surf_surf` when
/// neither does. Products may be placed on any side regardless.
#[derive(Clone, Debug)]
pub struct SReacDef {
    gidx: SReacGIdx,
    name: String,
    patch: PatchGIdx,
    kcst_default: f64,
    lhs_s: Vec<u32>,
    lhs_i: Vec<u32>,
    lhs_o: Vec<u32>,
    rhs_s: Vec<u32>,
    rhs_i: Vec<u32>,
    rhs_o: Vec<u32>,
    upd_s: Vec<i32>,
    upd_i: Vec<i32>,
    upd_o: Vec<i32>,
    upd_coll_s: SmallVec<[SpecGIdx; 4]>,
    upd_coll_i: SmallVec<[SpecGIdx; 4]>,
    upd_coll_o: SmallVec<[SpecGIdx; 4]>,
    order: u32,
}

impl SReacDef {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        gidx: SReacGIdx,
        name: String,
        patch: PatchGIdx,
        lhs_s: Vec<u32>,
        lhs_i: Vec<u32>,
        lhs_o: Vec<u32>,
        rhs_s: Vec<u32>,
        rhs_i: Vec<u32>,
        rhs_o: Vec<u32>,
        kcst_default: f64,
    ) -> Self {
        let nspecs = lhs_s.len();
        Self {
            gidx,
            name,
            patch,
            kcst_default,
            lhs_s,
            lhs_i,
            lhs_o,
            rhs_s,
            rhs_i,
            rhs_o,
            upd_s: vec![0; nspecs],
            upd_i: vec![0; nspecs],
            upd_o: vec![0; nspecs],
            upd_coll_s: SmallVec::new(),
            upd_coll_i: SmallVec::new(),
            upd_coll_o: SmallVec::new(),
            order: 0,
        }
    }

    /// Derive order, update vectors and update collections.
    pub(crate) fn setup(&mut self) {
        self.order = self.lhs_s.iter().sum::<u32>()
            + self.lhs_i.iter().sum::<u32>()
            + self.lhs_o.iter().sum::<u32>();
        for s in 0..self.lhs_s.len() {
            let g = SpecGIdx::from(s);
            let ds = self.rhs_s[s] as i32 - self.lhs_s[s] as i32;
            let di = self.rhs_i[s] as i32 - self.lhs_i[s] as i32;
            let do_ = self.rhs_o[s] as i32 - self.lhs_o[s] as i32;
            self.upd_s[s] = ds;
            self.upd_i[s] = di;
            self.upd_o[s] = do_;
            if ds != 0 {
                self.upd_coll_s.push(g);
            }
            if di != 0 {
                self.upd_coll_i.push(g);
            }
            if do_ != 0 {
                self.upd_coll_o.push(g);
            }
        }
    }

    /// Global index.
    pub fn gidx(&self) -> SReacGIdx {
        self.gidx
    }

    /// Surface-reaction name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The patch this reaction is defined on.
    pub fn patch(&self) -> PatchGIdx {
        self.patch
    }

    /// Sum of left-hand-side multiplicities over all three axes.
    pub fn order(&self) -> u32 {
        self.order
    }

    /// Default macroscopic rate constant.
    pub fn kcst_default(&self) -> f64 {
        self.kcst_default
    }

    /// Whether the inner volume contributes reactants.
    pub fn inside(&self) -> bool {
        self.lhs_i.iter().any(|&m| m != 0)
    }

    /// Whether the outer volume contributes reactants.
    pub fn outside(&self) -> bool {
        self.lhs_o.iter().any(|&m| m != 0)
    }

    /// Whether this is a pure surface-surface reaction.
    pub fn surf_surf(&self) -> bool {
        !self.inside() && !self.outside()
    }

    /// Surface reactant multiplicities over the global species axis.
    pub fn lhs_s(&self) -> &[u32] {
        &self.lhs_s
    }

    /// Inner-volume reactant multiplicities.
    pub fn lhs_i(&self) -> &[u32] {
        &self.lhs_i
    }

    /// Outer-volume reactant multiplicities.
    pub fn lhs_o(&self) -> &[u32] {
        &self.lhs_o
    }

    /// Surface update vector over the global species axis.
    pub fn upd_s(&self) -> &[i32] {
        &self.upd_s
    }

    /// Inner-volume update vector.
    pub fn upd_i(&self) -> &[i32] {
        &self.upd_i
    }

    /// Outer-volume update vector.
    pub fn upd_o(&self) -> &[i32] {
        &self.upd_o
    }

    /// Whether the rate reads the count of `spec` on the surface.
    pub fn dep_s(&self, spec: SpecGIdx) -> bool {
        self.lhs_s[spec.index()] != 0
    }

    /// Whether the rate reads the count of `spec` in the inner volume.
    pub fn dep_i(&self, spec: SpecGIdx) -> bool {
        self.lhs_i[spec.index()] != 0
    }

    /// Whether the rate reads the count of `spec` in the outer volume.
    pub fn dep_o(&self, spec: SpecGIdx) -> bool {
        self.lhs_o[spec.index()] != 0
    }

    /// Surface species whose counts a firing changes.
    pub fn upd_coll_s(&self) -> &[SpecGIdx] {
        &self.upd_coll_s
    }

    /// Inner-volume species whose counts a firing changes.
    pub fn upd_coll_i(&self) -> &[SpecGIdx] {
        &self.upd_coll_i
    }

    /// Outer-volume species whose counts a firing changes.
    pub fn upd_coll_o(&self) -> &[SpecGIdx] {
        &self.upd_coll_o
    }

    /// Species mentioned on the surface axis, either side.
    pub(crate) fn involved_s(&self) -> impl Iterator<Item = SpecGIdx> + '_ {
        Self::involved(&self.lhs_s, &self.rhs_s)
    }

    /// Species mentioned on the inner-volume axis, either side.
    pub(crate) fn involved_i(&self) -> impl Iterator<Item = SpecGIdx> + '_ {
        Self::involved(&self.lhs_i, &self.rhs_i)
    }

    /// Species mentioned on the outer-volume axis, either side.
    pub(crate) fn involved_o(&self) -> impl Iterator<Item = SpecGIdx> + '_ {
        Self::involved(&self.lhs_o, &self.rhs_o)
    }

    fn involved<'a>(lhs: &'a [u32], rhs: &'a [u32]) -> impl Iterator<Item = SpecGIdx> + 'a {
        lhs.iter()
            .zip(rhs)
            .enumerate()
            .filter(|(_, (&l, &r))| l != 0 || r != 0)
            .map(|(s, _)| SpecGIdx::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A_surf + B_outer -> C_surf over species axis [A, B, C].
    fn binding() -> SReacDef {
        let mut def = SReacDef::new(
            SReacGIdx(0),
            "bind".into(),
            PatchGIdx(0),
            vec![1, 0, 0],
            vec![0, 0, 0],
            vec![0, 1, 0],
            vec![0, 0, 1],
            vec![0, 0, 0],
            vec![0, 0, 0],
            1.0e7,
        );
        def.setup();
        def
    }

    #[test]
    fn orientation_flags() {
        let def = binding();
        assert!(def.outside());
        assert!(!def.inside());
        assert!(!def.surf_surf());
        assert_eq!(def.order(), 2);
    }

    #[test]
    fn update_collections_split_by_side() {
        let def = binding();
        assert_eq!(def.upd_coll_s(), &[SpecGIdx(0), SpecGIdx(2)]);
        assert_eq!(def.upd_coll_i(), &[] as &[SpecGIdx]);
        assert_eq!(def.upd_coll_o(), &[SpecGIdx(1)]);
        assert!(def.dep_s(SpecGIdx(0)));
        assert!(def.dep_o(SpecGIdx(1)));
        assert!(!def.dep_i(SpecGIdx(1)));
    }
}
