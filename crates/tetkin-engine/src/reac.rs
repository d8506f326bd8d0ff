//! Volume reaction in one tetrahedron.

use tetkin_core::{KProcIdx, ReacGIdx, ReacLIdx, TetIdx, AVOGADRO, LITRE_PER_CUBIC_METRE};
use tetkin_model::CompDef;

use crate::kproc::comb_factor;
use crate::tet::Tet;

/// Mesoscopic rate constant: the macroscopic constant rescaled to
/// integer-count kinetics in a voxel of volume `vol`.
///
/// `c = k * (1000 * vol * N_A)^-(order-1)`; the factor 1000 converts
/// cubic metres to litres so zero- and higher-order constants keep
/// their bulk molar units.
pub(crate) fn comp_ccst(kcst: f64, vol: f64, order: u32) -> f64 {
    let vscale = LITRE_PER_CUBIC_METRE * vol * AVOGADRO;
    let o1 = i32::try_from(order).expect("order fits i32") - 1;
    kcst * vscale.powi(-o1)
}

/// One reaction channel in one tetrahedron.
///
/// Holds the precomputed mesoscopic constant and the dependency list
/// materialised at setup: every kinetic process whose propensity reads
/// a species this reaction changes.
#[derive(Clone, Debug)]
pub(crate) struct Reac {
    rdef: ReacGIdx,
    lidx: ReacLIdx,
    tet: TetIdx,
    order: u32,
    kcst: f64,
    ccst: f64,
    upd: Vec<KProcIdx>,
}

impl Reac {
    pub(crate) fn new(rdef: ReacGIdx, lidx: ReacLIdx, tet: TetIdx, vol: f64, kcst: f64, order: u32) -> Self {
        let ccst = comp_ccst(kcst, vol, order);
        debug_assert!(ccst >= 0.0);
        Self {
            rdef,
            lidx,
            tet,
            order,
            kcst,
            ccst,
            upd: Vec::new(),
        }
    }

    pub(crate) fn rdef(&self) -> ReacGIdx {
        self.rdef
    }

    pub(crate) fn lidx(&self) -> ReacLIdx {
        self.lidx
    }

    pub(crate) fn tet(&self) -> TetIdx {
        self.tet
    }

    pub(crate) fn kcst(&self) -> f64 {
        self.kcst
    }

    pub(crate) fn ccst(&self) -> f64 {
        self.ccst
    }

    pub(crate) fn set_kcst(&mut self, kcst: f64, vol: f64) {
        self.kcst = kcst;
        self.ccst = comp_ccst(kcst, vol, self.order);
    }

    pub(crate) fn set_ccst_checkpointed(&mut self, ccst: f64, kcst: f64) {
        self.ccst = ccst;
        self.kcst = kcst;
    }

    pub(crate) fn set_upd(&mut self, upd: Vec<KProcIdx>) {
        self.upd = upd;
    }

    pub(crate) fn upd(&self) -> &[KProcIdx] {
        &self.upd
    }

    /// Combinatorial part of the propensity: the product of falling
    /// factorials over the reactant species.
    pub(crate) fn h(&self, tet: &Tet, cdef: &CompDef) -> f64 {
        let lhs = cdef.reac_lhs(self.lidx);
        let mut h_mu = 1.0;
        for (&l, &cnt) in lhs.iter().zip(tet.pools()) {
            if l == 0 {
                continue;
            }
            let f = comb_factor(cnt, l);
            if f == 0.0 {
                return 0.0;
            }
            h_mu *= f;
        }
        h_mu
    }

    /// Propensity: `h * c`, or 0 while inactive.
    pub(crate) fn rate(&self, active: bool, tet: &Tet, cdef: &CompDef) -> f64 {
        if !active {
            return 0.0;
        }
        self.h(tet, cdef) * self.ccst
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tetkin_core::AVOGADRO;

    #[test]
    fn first_order_ccst_is_kcst() {
        // Unimolecular constants need no volume scaling.
        assert_eq!(comp_ccst(3.5, 1.0e-18, 1), 3.5);
    }

    #[test]
    fn second_order_ccst_scales_inverse_volume() {
        let vol = 1.0e-18;
        let c = comp_ccst(1.0e6, vol, 2);
        let expected = 1.0e6 / (1.0e3 * vol * AVOGADRO);
        assert!((c - expected).abs() <= 1.0e-12 * expected);
    }

    #[test]
    fn zero_order_ccst_scales_with_volume() {
        let vol = 1.0e-18;
        let c = comp_ccst(1.0e-8, vol, 0);
        let expected = 1.0e-8 * (1.0e3 * vol * AVOGADRO);
        assert!((c - expected).abs() <= 1.0e-12 * expected);
    }
}
