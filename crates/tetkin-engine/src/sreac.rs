//! Surface reaction on one triangle.

use tetkin_core::{KProcIdx, SReacGIdx, SReacLIdx, TriIdx, AVOGADRO, LITRE_PER_CUBIC_METRE};
use tetkin_model::{PatchDef, SReacDef};

use crate::kproc::comb_factor;
use crate::tet::Tet;
use crate::tri::Tri;

/// Mesoscopic constant for a surface reaction with volume reactants:
/// scaled by the adjacent voxel's volume, like a volume reaction.
pub(crate) fn comp_ccst_vol(kcst: f64, vol: f64, order: u32) -> f64 {
    let vscale = LITRE_PER_CUBIC_METRE * vol * AVOGADRO;
    let o1 = i32::try_from(order).expect("order fits i32") - 1;
    kcst * vscale.powi(-o1)
}

/// Mesoscopic constant for a pure surface-surface reaction: scaled by
/// the facet's area instead of a volume.
pub(crate) fn comp_ccst_area(kcst: f64, area: f64, order: u32) -> f64 {
    let ascale = area * AVOGADRO;
    let o1 = i32::try_from(order).expect("order fits i32") - 1;
    kcst * ascale.powi(-o1)
}

/// One surface-reaction channel on one triangle.
///
/// The combinatorial part multiplies over the surface pools and, when
/// the reaction has volume reactants, over the pools of the inner or
/// outer tetrahedron. The mesoscopic constant is scaled by that same
/// tetrahedron's volume, or by the facet area for surface-surface
/// reactions.
#[derive(Clone, Debug)]
pub(crate) struct SReac {
    srdef: SReacGIdx,
    lidx: SReacLIdx,
    tri: TriIdx,
    kcst: f64,
    ccst: f64,
    upd: Vec<KProcIdx>,
}

impl SReac {
    pub(crate) fn new(
        srdef: &SReacDef,
        lidx: SReacLIdx,
        tri: TriIdx,
        area: f64,
        ivol: Option<f64>,
        ovol: Option<f64>,
        kcst: f64,
    ) -> Self {
        let mut sreac = Self {
            srdef: srdef.gidx(),
            lidx,
            tri,
            kcst,
            ccst: 0.0,
            upd: Vec::new(),
        };
        sreac.set_kcst(kcst, srdef, area, ivol, ovol);
        sreac
    }

    pub(crate) fn srdef(&self) -> SReacGIdx {
        self.srdef
    }

    pub(crate) fn lidx(&self) -> SReacLIdx {
        self.lidx
    }

    pub(crate) fn tri(&self) -> TriIdx {
        self.tri
    }

    pub(crate) fn kcst(&self) -> f64 {
        self.kcst
    }

    pub(crate) fn ccst(&self) -> f64 {
        self.ccst
    }

    /// Set the rate constant and rebuild the mesoscopic constant.
    ///
    /// `ivol` / `ovol` are the adjacent tetrahedron volumes; the one
    /// the reaction's orientation selects must be present.
    pub(crate) fn set_kcst(
        &mut self,
        kcst: f64,
        srdef: &SReacDef,
        area: f64,
        ivol: Option<f64>,
        ovol: Option<f64>,
    ) {
        self.kcst = kcst;
        self.ccst = if srdef.surf_surf() {
            comp_ccst_area(kcst, area, srdef.order())
        } else {
            let vol = if srdef.inside() {
                ivol.expect("inner-oriented surface reaction without inner tet")
            } else {
                ovol.expect("outer-oriented surface reaction without outer tet")
            };
            comp_ccst_vol(kcst, vol, srdef.order())
        };
        debug_assert!(self.ccst >= 0.0);
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

    /// Combinatorial part of the propensity, over surface pools and the
    /// orientation-selected volume pools.
    pub(crate) fn h(
        &self,
        srdef: &SReacDef,
        pdef: &PatchDef,
        tri: &Tri,
        itet: &Tet,
        otet: Option<&Tet>,
    ) -> f64 {
        let mut h_mu = 1.0;

        for (&l, &cnt) in pdef.sreac_lhs_s(self.lidx).iter().zip(tri.pools()) {
            if l == 0 {
                continue;
            }
            let f = comb_factor(cnt, l);
            if f == 0.0 {
                return 0.0;
            }
            h_mu *= f;
        }

        if srdef.inside() {
            for (&l, &cnt) in pdef.sreac_lhs_i(self.lidx).iter().zip(itet.pools()) {
                if l == 0 {
                    continue;
                }
                let f = comb_factor(cnt, l);
                if f == 0.0 {
                    return 0.0;
                }
                h_mu *= f;
            }
        } else if srdef.outside() {
            let otet = otet.expect("outer-oriented surface reaction without outer tet");
            for (&l, &cnt) in pdef.sreac_lhs_o(self.lidx).iter().zip(otet.pools()) {
                if l == 0 {
                    continue;
                }
                let f = comb_factor(cnt, l);
                if f == 0.0 {
                    return 0.0;
                }
                h_mu *= f;
            }
        }

        h_mu
    }

    /// Propensity: `h * c`, or 0 while inactive.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn rate(
        &self,
        active: bool,
        srdef: &SReacDef,
        pdef: &PatchDef,
        tri: &Tri,
        itet: &Tet,
        otet: Option<&Tet>,
    ) -> f64 {
        if !active {
            return 0.0;
        }
        self.h(srdef, pdef, tri, itet, otet) * self.ccst
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_scaling_for_surface_surface() {
        let area = 2.0e-12;
        let c = comp_ccst_area(1.0e-2, area, 2);
        let expected = 1.0e-2 / (area * AVOGADRO);
        assert!((c - expected).abs() <= 1.0e-12 * expected);
    }

    #[test]
    fn volume_scaling_halves_with_doubled_volume() {
        // Second order: c ~ 1/V, the basis of the outer-volume scaling law.
        let c1 = comp_ccst_vol(1.0e7, 1.0e-18, 2);
        let c2 = comp_ccst_vol(1.0e7, 2.0e-18, 2);
        assert!((c1 / c2 - 2.0).abs() < 1.0e-12);
    }
}
