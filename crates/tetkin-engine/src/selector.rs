//! Composition-rejection event selector.
//!
//! Events are grouped by the power-of-two bucket of their propensity:
//! positive groups hold rates of at least 0.5, negative groups hold
//! rates down to 1e-20, and anything smaller is left unrecorded (it
//! cannot win a draw against rates twenty orders of magnitude larger,
//! and keeping it out of the structure bounds the group count).
//!
//! Selection walks the groups once to find the one containing the
//! drawn point, then samples inside the group by rejection: draw a
//! uniform position and a uniform rate below the group's power-of-two
//! ceiling, accept when the candidate's rate exceeds the drawn rate.
//! All members share the ceiling, so acceptance probability is
//! `rate / max` and the accepted event has the exact SSA distribution.
//! Every member's rate is at least half its bucket's ceiling, so the
//! expected number of rejections per draw stays below two.
//!
//! The total propensity is recomputed from the group sums after every
//! batch of updates rather than nudged per event, which bounds
//! floating-point drift.

use log::{debug, trace};
use tetkin_core::{KProcIdx, SimRng};

use crate::kproc::KProc;

/// Rates below this are kept out of the selector entirely.
const UNRECORDED_THRESHOLD: f64 = 1.0e-20;

/// Boundary between the negative and positive group families.
const POSITIVE_THRESHOLD: f64 = 0.5;

/// Initial per-group storage.
const GROUP_CAPACITY: usize = 1024;

/// The binary exponent of a positive, normal `f64`, as `frexp` returns
/// it: `x = m * 2^e` with `m` in [0.5, 1).
#[inline]
fn frexp_exp(x: f64) -> i32 {
    debug_assert!(x.is_finite() && x > 0.0);
    (((x.to_bits() >> 52) & 0x7ff) as i32) - 1022
}

/// One power-of-two bucket of events.
struct CrGroup {
    /// Upper bound `2^pow` on members' rates; the rejection ceiling.
    max: f64,
    /// Running sum of members' recorded rates.
    sum: f64,
    indices: Vec<KProcIdx>,
}

impl CrGroup {
    fn new(power: i32) -> Self {
        Self {
            max: (2.0f64).powi(power),
            sum: 0.0,
            indices: Vec::with_capacity(GROUP_CAPACITY),
        }
    }
}

/// The grouped event index plus the cached total propensity.
pub(crate) struct CrSelector {
    /// Groups for rates in (1e-20, 0.5); group `i` has ceiling `2^-i`.
    n_groups: Vec<CrGroup>,
    /// Groups for rates >= 0.5; group `i` has ceiling `2^i`.
    p_groups: Vec<CrGroup>,
    a0: f64,
}

impl CrSelector {
    pub(crate) fn new() -> Self {
        Self {
            n_groups: Vec::new(),
            p_groups: Vec::new(),
            a0: 0.0,
        }
    }

    /// Total propensity, as of the last [`recompute_total`](Self::recompute_total).
    pub(crate) fn a0(&self) -> f64 {
        self.a0
    }

    /// Recompute the total from the group sums.
    pub(crate) fn recompute_total(&mut self) {
        let neg: f64 = self.n_groups.iter().map(|g| g.sum).sum();
        let pos: f64 = self.p_groups.iter().map(|g| g.sum).sum();
        self.a0 = neg + pos;
    }

    /// Drop all groups and zero the total.
    pub(crate) fn reset(&mut self) {
        self.n_groups.clear();
        self.p_groups.clear();
        self.a0 = 0.0;
    }

    /// Absorb a propensity change for one event.
    ///
    /// Moves the event between groups when the new rate lands in a
    /// different bucket, adjusts the group sum in place when it does
    /// not, and unrecords the event when the rate falls below the
    /// recording threshold. O(1) amortised.
    pub(crate) fn update_element(&mut self, kprocs: &mut [KProc], kidx: KProcIdx, new_rate: f64) {
        let kp = &mut kprocs[kidx.index()];
        let old_rate = kp.cr.rate;
        kp.cr.rate = new_rate;
        if old_rate == new_rate {
            return;
        }
        let recorded = kp.cr.recorded;
        let old_pow = kp.cr.pow;
        let old_pos = kp.cr.pos;

        if new_rate >= POSITIVE_THRESHOLD {
            let new_pow = frexp_exp(new_rate);
            if recorded && old_pow == new_pow {
                self.group_mut(old_pow).sum += new_rate - old_rate;
            } else {
                if recorded {
                    self.remove(kprocs, old_pow, old_pos, old_rate);
                }
                if self.p_groups.len() <= new_pow as usize {
                    self.extend_p_groups(new_pow as usize + 1);
                }
                let group = &mut self.p_groups[new_pow as usize];
                group.indices.push(kidx);
                group.sum += new_rate;
                let kp = &mut kprocs[kidx.index()];
                kp.cr.pow = new_pow;
                kp.cr.pos = (group.indices.len() - 1) as u32;
            }
            kprocs[kidx.index()].cr.recorded = true;
        } else if new_rate > UNRECORDED_THRESHOLD {
            let new_pow = frexp_exp(new_rate);
            if recorded && old_pow == new_pow {
                self.group_mut(old_pow).sum += new_rate - old_rate;
            } else {
                if recorded {
                    self.remove(kprocs, old_pow, old_pos, old_rate);
                }
                let slot = (-new_pow) as usize;
                if self.n_groups.len() <= slot {
                    self.extend_n_groups(slot + 1);
                }
                let group = &mut self.n_groups[slot];
                group.indices.push(kidx);
                group.sum += new_rate;
                let kp = &mut kprocs[kidx.index()];
                kp.cr.pow = new_pow;
                kp.cr.pos = (group.indices.len() - 1) as u32;
            }
            kprocs[kidx.index()].cr.recorded = true;
        } else {
            if recorded {
                self.remove(kprocs, old_pow, old_pos, old_rate);
            }
            kprocs[kidx.index()].cr.recorded = false;
        }
    }

    /// Draw the next event, or `None` when the total propensity is 0.
    ///
    /// Panics if no group contains the drawn point while `a0 > 0`:
    /// that means the group sums and the total have diverged, which is
    /// an unrecoverable internal error, and the message carries the
    /// full sum distribution for diagnosis.
    pub(crate) fn select(&self, rng: &mut SimRng, kprocs: &[KProc]) -> Option<KProcIdx> {
        debug_assert!(self.a0 >= 0.0);
        if self.a0 == 0.0 {
            return None;
        }

        let selector = self.a0 * rng.unf_ii();
        let mut partial_sum = 0.0;

        for group in self.n_groups.iter().chain(&self.p_groups) {
            if group.indices.is_empty() {
                continue;
            }
            if selector > partial_sum + group.sum {
                partial_sum += group.sum;
                continue;
            }
            return Some(Self::sample_group(group, rng, kprocs));
        }

        let n_sums: Vec<f64> = self.n_groups.iter().map(|g| g.sum).collect();
        let p_sums: Vec<f64> = self.p_groups.iter().map(|g| g.sum).collect();
        panic!(
            "composition-rejection selector found no event: A0 {:.15e}, selector {:.15e}, \
             partial sum {:.15e}, negative group sums {:?}, positive group sums {:?}",
            self.a0, selector, partial_sum, n_sums, p_sums,
        );
    }

    /// Rejection sampling inside one group.
    fn sample_group(group: &CrGroup, rng: &mut SimRng, kprocs: &[KProc]) -> KProcIdx {
        let size = group.indices.len() as u32;
        let mut random_rate = group.max * rng.unf_ii();
        let mut random_pos = rng.get() % size;
        let mut candidate = group.indices[random_pos as usize];
        while kprocs[candidate.index()].cr.rate <= random_rate {
            random_rate = group.max * rng.unf_ii();
            random_pos = rng.get() % size;
            candidate = group.indices[random_pos as usize];
        }
        trace!(
            "selected event {} from group with ceiling {}",
            candidate,
            group.max
        );
        candidate
    }

    /// Swap-remove one event from its group, patching the displaced
    /// tail event's position record.
    fn remove(&mut self, kprocs: &mut [KProc], pow: i32, pos: u32, old_rate: f64) {
        let group = self.group_mut(pow);
        group.indices.swap_remove(pos as usize);
        if group.indices.is_empty() {
            // Empty group: pin the sum to exactly zero.
            group.sum = 0.0;
        } else {
            group.sum -= old_rate;
            if (pos as usize) < group.indices.len() {
                let displaced = group.indices[pos as usize];
                kprocs[displaced.index()].cr.pos = pos;
            }
        }
    }

    fn group_mut(&mut self, pow: i32) -> &mut CrGroup {
        if pow >= 0 {
            &mut self.p_groups[pow as usize]
        } else {
            &mut self.n_groups[(-pow) as usize]
        }
    }

    fn extend_p_groups(&mut self, new_size: usize) {
        debug!(
            "extending positive selector groups from {} to {}",
            self.p_groups.len(),
            new_size
        );
        while self.p_groups.len() < new_size {
            let power = self.p_groups.len() as i32;
            self.p_groups.push(CrGroup::new(power));
        }
    }

    fn extend_n_groups(&mut self, new_size: usize) {
        debug!(
            "extending negative selector groups from {} to {}",
            self.n_groups.len(),
            new_size
        );
        while self.n_groups.len() < new_size {
            let power = -(self.n_groups.len() as i32);
            self.n_groups.push(CrGroup::new(power));
        }
    }

    /// Check the stored sums against the members' recorded rates.
    ///
    /// Test support: returns the largest relative discrepancy over all
    /// groups and the total.
    #[cfg(test)]
    fn max_sum_discrepancy(&self, kprocs: &[KProc]) -> f64 {
        let mut worst = 0.0f64;
        let mut total = 0.0;
        for group in self.n_groups.iter().chain(&self.p_groups) {
            let expect: f64 = group
                .indices
                .iter()
                .map(|&k| kprocs[k.index()].cr.rate)
                .sum();
            total += group.sum;
            let scale = expect.abs().max(1.0);
            worst = worst.max((group.sum - expect).abs() / scale);
        }
        let scale = total.abs().max(1.0);
        worst.max((self.a0 - total).abs() / scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kproc::KProcKind;
    use crate::reac::Reac;
    use proptest::prelude::*;
    use tetkin_core::{ReacGIdx, ReacLIdx, TetIdx};

    fn dummy_kprocs(n: usize) -> Vec<KProc> {
        (0..n)
            .map(|_| {
                KProc::new(KProcKind::Reac(Reac::new(
                    ReacGIdx(0),
                    ReacLIdx(0),
                    TetIdx(0),
                    1.0e-18,
                    0.0,
                    1,
                )))
            })
            .collect()
    }

    #[test]
    fn frexp_exp_matches_reference_points() {
        assert_eq!(frexp_exp(0.5), 0);
        assert_eq!(frexp_exp(0.75), 0);
        assert_eq!(frexp_exp(1.0), 1);
        assert_eq!(frexp_exp(1.5), 1);
        assert_eq!(frexp_exp(2.0), 2);
        assert_eq!(frexp_exp(0.25), -1);
        assert_eq!(frexp_exp(0.3), -1);
        assert_eq!(frexp_exp(1.0e-6), -19);
    }

    #[test]
    fn recording_thresholds() {
        let mut kprocs = dummy_kprocs(3);
        let mut sel = CrSelector::new();
        sel.update_element(&mut kprocs, KProcIdx(0), 2.0);
        sel.update_element(&mut kprocs, KProcIdx(1), 0.3);
        sel.update_element(&mut kprocs, KProcIdx(2), 1.0e-30);
        sel.recompute_total();

        assert!(kprocs[0].cr.recorded);
        assert_eq!(kprocs[0].cr.pow, 2);
        assert!(kprocs[1].cr.recorded);
        assert_eq!(kprocs[1].cr.pow, -1);
        assert!(!kprocs[2].cr.recorded);
        assert!((sel.a0() - 2.3).abs() < 1.0e-12);
    }

    #[test]
    fn same_bucket_update_adjusts_sum_in_place() {
        let mut kprocs = dummy_kprocs(1);
        let mut sel = CrSelector::new();
        sel.update_element(&mut kprocs, KProcIdx(0), 1.25);
        let pos_before = kprocs[0].cr.pos;
        sel.update_element(&mut kprocs, KProcIdx(0), 1.75);
        sel.recompute_total();
        assert_eq!(kprocs[0].cr.pos, pos_before);
        assert!((sel.a0() - 1.75).abs() < 1.0e-12);
    }

    #[test]
    fn bucket_migration_patches_displaced_position() {
        let mut kprocs = dummy_kprocs(3);
        let mut sel = CrSelector::new();
        // All three in the 2^1 group.
        sel.update_element(&mut kprocs, KProcIdx(0), 1.0);
        sel.update_element(&mut kprocs, KProcIdx(1), 1.2);
        sel.update_element(&mut kprocs, KProcIdx(2), 1.4);
        // Move the first one out; the tail event takes its slot.
        sel.update_element(&mut kprocs, KProcIdx(0), 3.0);
        sel.recompute_total();
        assert_eq!(kprocs[2].cr.pos, 0);
        assert_eq!(kprocs[0].cr.pow, 2);
        assert!((sel.a0() - 5.6).abs() < 1.0e-12);
        assert_eq!(sel.max_sum_discrepancy(&kprocs), 0.0);
    }

    #[test]
    fn vanishing_rate_unrecords() {
        let mut kprocs = dummy_kprocs(2);
        let mut sel = CrSelector::new();
        sel.update_element(&mut kprocs, KProcIdx(0), 0.8);
        sel.update_element(&mut kprocs, KProcIdx(1), 0.9);
        sel.update_element(&mut kprocs, KProcIdx(0), 0.0);
        sel.recompute_total();
        assert!(!kprocs[0].cr.recorded);
        assert!((sel.a0() - 0.9).abs() < 1.0e-12);
    }

    #[test]
    fn selection_is_propensity_weighted() {
        let mut kprocs = dummy_kprocs(2);
        let mut sel = CrSelector::new();
        // 9:1 odds across two different buckets.
        sel.update_element(&mut kprocs, KProcIdx(0), 9.0);
        sel.update_element(&mut kprocs, KProcIdx(1), 1.0);
        sel.recompute_total();

        let mut rng = SimRng::new(42);
        let n = 20_000;
        let hits0 = (0..n)
            .filter(|_| sel.select(&mut rng, &kprocs) == Some(KProcIdx(0)))
            .count();
        let p = hits0 as f64 / n as f64;
        // 5 sigma around 0.9 with n = 20k is about 0.011.
        assert!((p - 0.9).abs() < 0.015, "observed {p}");
    }

    #[test]
    fn empty_selector_selects_nothing() {
        let kprocs = dummy_kprocs(1);
        let sel = CrSelector::new();
        let mut rng = SimRng::new(1);
        assert_eq!(sel.select(&mut rng, &kprocs), None);
    }

    proptest! {
        #[test]
        fn sums_track_members_under_random_updates(
            updates in proptest::collection::vec((0usize..16, 0.0f64..4.0), 1..200)
        ) {
            let mut kprocs = dummy_kprocs(16);
            let mut sel = CrSelector::new();
            for (k, rate) in updates {
                sel.update_element(&mut kprocs, KProcIdx::from(k), rate);
                sel.recompute_total();
            }
            prop_assert!(sel.max_sum_discrepancy(&kprocs) < 1.0e-9);
        }
    }
}
