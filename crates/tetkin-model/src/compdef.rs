//! Compiled compartment definition.

use tetkin_core::{CompGIdx, DiffGIdx, DiffLIdx, ReacGIdx, ReacLIdx, SpecGIdx, SpecLIdx};

use crate::diffdef::DiffDef;
use crate::reacdef::ReacDef;

/// A compartment: local index maps for its species, reactions and
/// diffusion rules, dense local stoichiometry tables, current and
/// default kinetic constants, and def-level aggregate pools.
///
/// Species membership accumulates during `setup_references` (from the
/// compartment's own reactions and diffusion rules, from its explicit
/// species list, and from surface reactions on adjacent patches that
/// place species here). `setup_indices` then freezes the maps: local
/// indices are assigned in ascending global order and never change.
#[derive(Clone, Debug)]
pub struct CompDef {
    gidx: CompGIdx,
    name: String,
    vol: f64,

    spec_member: Vec<bool>,
    spec_g2l: Vec<Option<SpecLIdx>>,
    spec_l2g: Vec<SpecGIdx>,
    reac_g2l: Vec<Option<ReacLIdx>>,
    reac_l2g: Vec<ReacGIdx>,
    diff_g2l: Vec<Option<DiffLIdx>>,
    diff_l2g: Vec<DiffGIdx>,

    // Flat [local reaction][local species] stoichiometry tables.
    reac_lhs: Vec<u32>,
    reac_upd: Vec<i32>,

    kcst: Vec<f64>,
    kcst_default: Vec<f64>,
    dcst: Vec<f64>,
    dcst_default: Vec<f64>,

    pools: Vec<f64>,
    clamped: Vec<bool>,
}

impl CompDef {
    pub(crate) fn new(gidx: CompGIdx, name: String, vol: f64, nspecs_global: usize) -> Self {
        Self {
            gidx,
            name,
            vol,
            spec_member: vec![false; nspecs_global],
            spec_g2l: vec![None; nspecs_global],
            spec_l2g: Vec::new(),
            reac_g2l: Vec::new(),
            reac_l2g: Vec::new(),
            diff_g2l: Vec::new(),
            diff_l2g: Vec::new(),
            reac_lhs: Vec::new(),
            reac_upd: Vec::new(),
            kcst: Vec::new(),
            kcst_default: Vec::new(),
            dcst: Vec::new(),
            dcst_default: Vec::new(),
            pools: Vec::new(),
            clamped: Vec::new(),
        }
    }

    /// Record that `spec` is defined in this compartment.
    ///
    /// Legal only before `setup_indices`.
    pub(crate) fn add_spec(&mut self, spec: SpecGIdx) {
        debug_assert!(self.spec_l2g.is_empty(), "species maps already frozen");
        self.spec_member[spec.index()] = true;
    }

    /// Freeze index maps and build the local stoichiometry tables.
    pub(crate) fn setup_indices(&mut self, reacdefs: &[ReacDef], diffdefs: &[DiffDef]) {
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

        let gidx = self.gidx;
        self.reac_g2l = vec![None; reacdefs.len()];
        for rdef in reacdefs.iter().filter(|r| r.comp() == gidx) {
            let l = ReacLIdx::from(self.reac_l2g.len());
            self.reac_g2l[rdef.gidx().index()] = Some(l);
            self.reac_l2g.push(rdef.gidx());
            self.kcst_default.push(rdef.kcst_default());
            self.kcst.push(rdef.kcst_default());

            let row = self.reac_lhs.len();
            self.reac_lhs.resize(row + nspecs, 0);
            self.reac_upd.resize(row + nspecs, 0);
            for (l_s, &g_s) in self.spec_l2g.iter().enumerate() {
                self.reac_lhs[row + l_s] = rdef.lhs()[g_s.index()];
                self.reac_upd[row + l_s] = rdef.upd()[g_s.index()];
            }
        }

        self.diff_g2l = vec![None; diffdefs.len()];
        for ddef in diffdefs.iter().filter(|d| d.comp() == gidx) {
            let l = DiffLIdx::from(self.diff_l2g.len());
            self.diff_g2l[ddef.gidx().index()] = Some(l);
            self.diff_l2g.push(ddef.gidx());
            self.dcst_default.push(ddef.dcst_default());
            self.dcst.push(ddef.dcst_default());
        }
    }

    /// Global index.
    pub fn gidx(&self) -> CompGIdx {
        self.gidx
    }

    /// Compartment name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total volume, in cubic metres.
    pub fn vol(&self) -> f64 {
        self.vol
    }

    /// Number of species defined here.
    pub fn n_specs(&self) -> usize {
        self.spec_l2g.len()
    }

    /// Number of reactions defined here.
    pub fn n_reacs(&self) -> usize {
        self.reac_l2g.len()
    }

    /// Number of diffusion rules defined here.
    pub fn n_diffs(&self) -> usize {
        self.diff_l2g.len()
    }

    /// Local index of a species, if defined here.
    pub fn spec_g2l(&self, spec: SpecGIdx) -> Option<SpecLIdx> {
        self.spec_g2l[spec.index()]
    }

    /// Global index of a local species.
    pub fn spec_l2g(&self, spec: SpecLIdx) -> SpecGIdx {
        self.spec_l2g[spec.index()]
    }

    /// Local index of a reaction, if defined here.
    pub fn reac_g2l(&self, reac: ReacGIdx) -> Option<ReacLIdx> {
        self.reac_g2l[reac.index()]
    }

    /// Global index of a local reaction.
    pub fn reac_l2g(&self, reac: ReacLIdx) -> ReacGIdx {
        self.reac_l2g[reac.index()]
    }

    /// Local index of a diffusion rule, if defined here.
    pub fn diff_g2l(&self, diff: DiffGIdx) -> Option<DiffLIdx> {
        self.diff_g2l[diff.index()]
    }

    /// Global index of a local diffusion rule.
    pub fn diff_l2g(&self, diff: DiffLIdx) -> DiffGIdx {
        self.diff_l2g[diff.index()]
    }

    /// Reactant multiplicities of a local reaction, over local species.
    pub fn reac_lhs(&self, reac: ReacLIdx) -> &[u32] {
        let n = self.n_specs();
        &self.reac_lhs[reac.index() * n..(reac.index() + 1) * n]
    }

    /// Update vector of a local reaction, over local species.
    pub fn reac_upd(&self, reac: ReacLIdx) -> &[i32] {
        let n = self.n_specs();
        &self.reac_upd[reac.index() * n..(reac.index() + 1) * n]
    }

    /// Current default rate constant of a local reaction.
    pub fn kcst(&self, reac: ReacLIdx) -> f64 {
        self.kcst[reac.index()]
    }

    /// Set the default rate constant of a local reaction.
    pub fn set_kcst(&mut self, reac: ReacLIdx, kcst: f64) {
        self.kcst[reac.index()] = kcst;
    }

    /// Current default diffusion constant of a local rule.
    pub fn dcst(&self, diff: DiffLIdx) -> f64 {
        self.dcst[diff.index()]
    }

    /// Set the default diffusion constant of a local rule.
    pub fn set_dcst(&mut self, diff: DiffLIdx, dcst: f64) {
        self.dcst[diff.index()] = dcst;
    }

    /// Def-level aggregate pools, over local species.
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
        self.dcst.copy_from_slice(&self.dcst_default);
    }
}
