//! Compiled patch definition.

use tetkin_core::{CompGIdx, PatchGIdx, SReacGIdx, SReacLIdx, SpecGIdx, SpecLIdx};

use crate::compdef::CompDef;
use crate::sreacdef::SReacDef;

/// A patch: local index maps for its surface species and surface
/// reactions, plus, per surface reaction, volume stoichiometry rows
/// resolved against the inner and outer compartments' local species.
///
/// The inner/outer rows are indexed by the *compartment's* local
/// species indices, which is why patch index maps freeze only after
/// every compartment's maps have frozen.
#[derive(Clone, Debug)]
pub struct PatchDef {
    gidx: PatchGIdx,
    name: String,
    area: f64,
    icomp: CompGIdx,
    ocomp: Option<CompGIdx>,

    spec_member: Vec<bool>,
    spec_g2l: Vec<Option<SpecLIdx>>,
    spec_l2g: Vec<SpecGIdx>,
    sreac_g2l: Vec<Option<SReacLIdx>>,
    sreac_l2g: Vec<SReacGIdx>,

    // Flat [local sreac][patch-local species] rows.
    lhs_s: Vec<u32>,
    upd_s: Vec<i32>,
    // Flat [local sreac][icomp-local species] rows.
    lhs_i: Vec<u32>,
    upd_i: Vec<i32>,
    // Flat [local sreac][ocomp-local species] rows (empty without ocomp).
    lhs_o: Vec<u32>,
    upd_o: Vec<i32>,
    nspecs_i: usize,
    nspecs_o: usize,

    kcst: Vec<f64>,
    kcst_default: Vec<f64>,

    pools: Vec<f64>,
    clamped: Vec<bool>,
}

impl PatchDef {
    pub(crate) fn new(
        gidx: PatchGIdx,
        name: String,
        area: f64,
        icomp: CompGIdx,
        ocomp: Option<CompGIdx>,
        nspecs_global: usize,
    ) -> Self {
        Self {
            gidx,
            name,
            area,
            icomp,
            ocomp,
            spec_member: vec![false; nspecs_global],
            spec_g2l: vec![None; nspecs_global],
            spec_l2g: Vec::new(),
            sreac_g2l: Vec::new(),
            sreac_l2g: Vec::new(),
            lhs_s: Vec::new(),
            upd_s: Vec::new(),
            lhs_i: Vec::new(),
            upd_i: Vec::new(),
            lhs_o: Vec::new(),
            upd_o: Vec::new(),
            nspecs_i: 0,
            nspecs_o: 0,
            kcst: Vec::new(),
            kcst_default: Vec::new(),
            pools: Vec::new(),
            clamped: Vec::new(),
        }
    }

    /// Record that `spec` lives on this patch's surface.
    ///
    /// Legal only before `setup_indices`.
    pub(crate) fn add_spec(&mut self, spec: SpecGIdx) {
        debug_assert!(self.spec_l2g.is_empty(), "species maps already frozen");
        self.spec_member[spec.index()] = true;
    }

    /// Freeze index maps and build the local stoichiometry rows.
    ///
    /// `icomp` and `ocomp` must already have frozen species maps.
    pub(crate) fn setup_indices(
        &mut self,
        sreacdefs: &[SReacDef],
        icomp: &CompDef,
        ocomp: Option<&CompDef>,
    ) {
        for (g, &member) in self.spec_member.iter().enumerate() {
            if member {
                let l = SpecLIdx::from(self.spec_l2g.len());
                self.spec_g2l[g] = Some(l);
                self.spec_l2g.push(SpecGIdx::from(g));
            }
        }
        let nspecs = self.spec_l2g.len();
        self.pools = vec![0.0; nspecs];
        self.clamped = vec![false; nspecs];
        self.nspecs_i = icomp.n_specs();
        self.nspecs_o = ocomp.map_or(0, CompDef::n_specs);

        let gidx = self.gidx;
        self.sreac_g2l = vec![None; sreacdefs.len()];
        for srdef in sreacdefs.iter().filter(|sr| sr.patch() == gidx) {
            let l = SReacLIdx::from(self.sreac_l2g.len());
            self.sreac_g2l[srdef.gidx().index()] = Some(l);
            self.sreac_l2g.push(srdef.gidx());
            self.kcst_default.push(srdef.kcst_default());
            self.kcst.push(srdef.kcst_default());

            let row = self.lhs_s.len();
            self.lhs_s.resize(row + nspecs, 0);
            self.upd_s.resize(row + nspecs, 0);
            for (l_s, &g_s) in self.spec_l2g.iter().enumerate() {
                self.lhs_s[row + l_s] = srdef.lhs_s()[g_s.index()];
                self.upd_s[row + l_s] = srdef.upd_s()[g_s.index()];
            }

            let row_i = self.lhs_i.len();
            self.lhs_i.resize(row_i + self.nspecs_i, 0);
            self.upd_i.resize(row_i + self.nspecs_i, 0);
            for l_s in 0..self.nspecs_i {
                let g_s = icomp.spec_l2g(SpecLIdx::from(l_s));
                self.lhs_i[row_i + l_s] = srdef.lhs_i()[g_s.index()];
                self.upd_i[row_i + l_s] = srdef.upd_i()[g_s.index()];
            }

            if let Some(oc) = ocomp {
                let row_o = self.lhs_o.len();
                self.lhs_o.resize(row_o + self.nspecs_o, 0);
                self.upd_o.resize(row_o + self.nspecs_o, 0);
                for l_s in 0..self.nspecs_o {
                    let g_s = oc.spec_l2g(SpecLIdx::from(l_s));
                    self.lhs_o[row_o + l_s] = srdef.lhs_o()[g_s.index()];
                    self.upd_o[row_o + l_s] = srdef.upd_o()[g_s.index()];
                }
            }
        }
    }

    /// Global index.
    pub fn gidx(&self) -> PatchGIdx {
        self.gidx
    }

    /// Patch name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total area, in square metres.
    pub fn area(&self) -> f64 {
        self.area
    }

    /// The inner compartment.
    pub fn icomp(&self) -> CompGIdx {
        self.icomp
    }

    /// The outer compartment, if the patch has one.
    pub fn ocomp(&self) -> Option<CompGIdx> {
        self.ocomp
    }

    /// Number of surface species defined here.
    pub fn n_specs(&self) -> usize {
        self.spec_l2g.len()
    }

    /// Number of surface reactions defined here.
    pub fn n_sreacs(&self) -> usize {
        self.sreac_l2g.len()
    }

    /// Local index of a surface species, if defined here.
    pub fn spec_g2l(&self, spec: SpecGIdx) -> Option<SpecLIdx> {
        self.spec_g2l[spec.index()]
    }

    /// Global index of a local surface species.
    pub fn spec_l2g(&self, spec: SpecLIdx) -> SpecGIdx {
        self.spec_l2g[spec.index()]
    }

    /// Local index of a surface reaction, if defined here.
    pub fn sreac_g2l(&self, sreac: SReacGIdx) -> Option<SReacLIdx> {
        self.sreac_g2l[sreac.index()]
    }

    /// Global index of a local surface reaction.
    pub fn sreac_l2g(&self, sreac: SReacLIdx) -> SReacGIdx {
        self.sreac_l2g[sreac.index()]
    }

    /// Surface reactant row of a local surface reaction.
    pub fn sreac_lhs_s(&self, sreac: SReacLIdx) -> &[u32] {
        let n = self.n_specs();
        &self.lhs_s[sreac.index() * n..(sreac.index() + 1) * n]
    }

    /// Surface update row of a local surface reaction.
    pub fn sreac_upd_s(&self, sreac: SReacLIdx) -> &[i32] {
        let n = self.n_specs();
        &self.upd_s[sreac.index() * n..(sreac.index() + 1) * n]
    }

    /// Inner-volume reactant row, over the inner compartment's local
    /// species.
    pub fn sreac_lhs_i(&self, sreac: SReacLIdx) -> &[u32] {
        let n = self.nspecs_i;
        &self.lhs_i[sreac.index() * n..(sreac.index() + 1) * n]
    }

    /// Inner-volume update row.
    pub fn sreac_upd_i(&self, sreac: SReacLIdx) -> &[i32] {
        let n = self.nspecs_i;
        &self.upd_i[sreac.index() * n..(sreac.index() + 1) * n]
    }

    /// Outer-volume reactant row, over the outer compartment's local
    /// species. Empty when the patch has no outer compartment.
    pub fn sreac_lhs_o(&self, sreac: SReacLIdx) -> &[u32] {
        let n = self.nspecs_o;
        &self.lhs_o[sreac.index() * n..(sreac.index() + 1) * n]
    }

    /// Outer-volume update row.
    pub fn sreac_upd_o(&self, sreac: SReacLIdx) -> &[i32] {
        let n = self.nspecs_o;
        &self.upd_o[sreac.index() * n..(sreac.index() + 1) * n]
    }

    /// Current default rate constant of a local surface reaction.
    pub fn kcst(&self, sreac: SReacLIdx) -> f64 {
        self.kcst[sreac.index()]
    }

    /// Set the default rate constant of a local surface reaction.
    pub fn set_kcst(&mut self, sreac: SReacLIdx, kcst: f64) {
        self.kcst[sreac.index()] = kcst;
    }

    /// Def-level aggregate pools, over local surface species.
    pub fn pools(&self) -> &[f64] {
        &self.pools
    }

    /// Add `delta` molecules to the aggregate pool of a local species.
    pub fn mod_count(&mut self, spec: SpecLIdx, delta: f64) {
        self.pools[spec.index()] += delta;
    }

    /// Overwrite the aggregate pool of a local species.
    pub fn set_pool(&mut self, spec: SpecLIdx, count: f64) {
        self.pools[spec.index()] = count;
    }

    /// Default clamp flag of a local species.
    pub fn clamped(&self, spec: SpecLIdx) -> bool {
        self.clamped[spec.index()]
    }

    /// Set the default clamp flag of a local species.
    pub fn set_clamped(&mut self, spec: SpecLIdx, clamp: bool) {
        self.clamped[spec.index()] = clamp;
    }

    /// Restore default constants, zero pools, clear clamp flags.
    pub fn reset(&mut self) {
        self.pools.fill(0.0);
        self.clamped.fill(false);
        self.kcst.copy_from_slice(&self.kcst_default);
    }
}
