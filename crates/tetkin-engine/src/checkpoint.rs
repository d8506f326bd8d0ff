//! Binary checkpoint and restore.
//!
//! A sequential little-endian stream with no self-describing schema:
//! magic bytes, a version byte, then def-level aggregate pools and
//! clamp defaults per compartment and patch, per-voxel and per-facet
//! counts and clamp bits in mesh order, per-process constants in
//! scheduler order, the clock, and the generator state. The layout is
//! fully determined by the compiled model, so restore reads exactly
//! the bytes checkpoint wrote. The format is internal and carries no
//! compatibility guarantee across versions; the version byte exists to
//! fail fast on mismatch.
//!
//! Restore finishes with a full propensity refresh, so the total
//! propensity immediately after restore equals the total immediately
//! before checkpoint.

use std::error::Error;
use std::fmt;
use std::io::{self, Read, Write};

use log::debug;
use tetkin_core::{CompGIdx, PatchGIdx, RngSnapshot, SimRng, SpecLIdx};

use crate::kproc::KProcKind;
use crate::solver::Solver;

/// Magic bytes at the start of every checkpoint stream.
const MAGIC: [u8; 4] = *b"TKIN";

/// Current checkpoint format version.
const VERSION: u8 = 1;

/// Errors reading or writing a checkpoint stream.
#[derive(Debug)]
pub enum CheckpointError {
    /// An I/O error from the underlying reader or writer.
    Io(io::Error),
    /// The stream does not start with the expected magic bytes.
    BadMagic,
    /// The stream was written by an incompatible format version.
    UnsupportedVersion {
        /// The version byte found in the stream.
        found: u8,
    },
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::BadMagic => write!(f, "invalid magic bytes (expected b\"TKIN\")"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported checkpoint version {found}")
            }
        }
    }
}

impl Error for CheckpointError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CheckpointError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

// ── Primitive writers and readers ───────────────────────────────

fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), CheckpointError> {
    w.write_all(&[v])?;
    Ok(())
}

fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), CheckpointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), CheckpointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_u128_le(w: &mut dyn Write, v: u128) -> Result<(), CheckpointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), CheckpointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn read_u8(r: &mut dyn Read) -> Result<u8, CheckpointError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32_le(r: &mut dyn Read) -> Result<u32, CheckpointError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64_le(r: &mut dyn Read) -> Result<u64, CheckpointError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_u128_le(r: &mut dyn Read) -> Result<u128, CheckpointError> {
    let mut buf = [0u8; 16];
    r.read_exact(&mut buf)?;
    Ok(u128::from_le_bytes(buf))
}

fn read_f64_le(r: &mut dyn Read) -> Result<f64, CheckpointError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

// ── Solver checkpoint surface ───────────────────────────────────

impl Solver {
    /// Write the full mutable state to `w`.
    pub fn checkpoint(&self, w: &mut dyn Write) -> Result<(), CheckpointError> {
        w.write_all(&MAGIC)?;
        write_u8(w, VERSION)?;

        for c in 0..self.statedef.n_comps() {
            let cdef = self.statedef.compdef(CompGIdx::from(c));
            for s in 0..cdef.n_specs() {
                let l = SpecLIdx::from(s);
                write_f64_le(w, cdef.pools()[s])?;
                write_u8(w, u8::from(cdef.clamped(l)))?;
            }
        }
        for p in 0..self.statedef.n_patches() {
            let pdef = self.statedef.patchdef(PatchGIdx::from(p));
            for s in 0..pdef.n_specs() {
                let l = SpecLIdx::from(s);
                write_f64_le(w, pdef.pools()[s])?;
                write_u8(w, u8::from(pdef.clamped(l)))?;
            }
        }

        for tet in self.tets.iter().flatten() {
            for s in 0..tet.pools().len() {
                let l = SpecLIdx::from(s);
                write_u32_le(w, tet.pool(l))?;
                write_u8(w, u8::from(tet.clamped(l)))?;
            }
        }
        for tri in self.tris.iter().flatten() {
            for s in 0..tri.pools().len() {
                let l = SpecLIdx::from(s);
                write_u32_le(w, tri.pool(l))?;
                write_u8(w, u8::from(tri.clamped(l)))?;
            }
        }

        for kp in &self.kprocs {
            match &kp.kind {
                KProcKind::Reac(r) => {
                    write_f64_le(w, r.ccst())?;
                    write_f64_le(w, r.kcst())?;
                }
                KProcKind::SReac(sr) => {
                    write_f64_le(w, sr.ccst())?;
                    write_f64_le(w, sr.kcst())?;
                }
                KProcKind::Diff(d) => {
                    write_f64_le(w, d.scaled_dcst())?;
                    write_f64_le(w, d.dcst())?;
                    for v in d.cdf() {
                        write_f64_le(w, v)?;
                    }
                    for i in 0..4 {
                        let active = d.bnd_direction(i) && d.bnd_active(i);
                        write_u8(w, u8::from(active))?;
                    }
                }
            }
        }

        write_f64_le(w, self.time)?;
        write_u64_le(w, self.nsteps)?;

        let snap = self.rng.snapshot();
        w.write_all(&snap.seed)?;
        write_u128_le(w, snap.word_pos)?;

        debug!("checkpoint written at t = {}, {} steps", self.time, self.nsteps);
        Ok(())
    }

    /// Read state previously written by [`checkpoint`](Self::checkpoint)
    /// into this solver, then refresh every propensity.
    ///
    /// The solver must have been built from the same model and mesh;
    /// the stream layout carries no structure of its own.
    pub fn restore(&mut self, r: &mut dyn Read) -> Result<(), CheckpointError> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(CheckpointError::BadMagic);
        }
        let version = read_u8(r)?;
        if version != VERSION {
            return Err(CheckpointError::UnsupportedVersion { found: version });
        }

        for c in 0..self.statedef.n_comps() {
            let cgidx = CompGIdx::from(c);
            let nspecs = self.statedef.compdef(cgidx).n_specs();
            for s in 0..nspecs {
                let l = SpecLIdx::from(s);
                let pool = read_f64_le(r)?;
                let clamped = read_u8(r)? != 0;
                let cdef = self.statedef.compdef_mut(cgidx);
                cdef.set_pool(l, pool);
                cdef.set_clamped(l, clamped);
            }
        }
        for p in 0..self.statedef.n_patches() {
            let pgidx = PatchGIdx::from(p);
            let nspecs = self.statedef.patchdef(pgidx).n_specs();
            for s in 0..nspecs {
                let l = SpecLIdx::from(s);
                let pool = read_f64_le(r)?;
                let clamped = read_u8(r)? != 0;
                let pdef = self.statedef.patchdef_mut(pgidx);
                pdef.set_pool(l, pool);
                pdef.set_clamped(l, clamped);
            }
        }

        for tet in self.tets.iter_mut().flatten() {
            for s in 0..tet.pools().len() {
                let l = SpecLIdx::from(s);
                let count = read_u32_le(r)?;
                let clamped = read_u8(r)? != 0;
                tet.set_count(l, count);
                tet.set_clamped(l, clamped);
            }
        }
        for tri in self.tris.iter_mut().flatten() {
            for s in 0..tri.pools().len() {
                let l = SpecLIdx::from(s);
                let count = read_u32_le(r)?;
                let clamped = read_u8(r)? != 0;
                tri.set_count(l, count);
                tri.set_clamped(l, clamped);
            }
        }

        for kp in &mut self.kprocs {
            match &mut kp.kind {
                KProcKind::Reac(reac) => {
                    let ccst = read_f64_le(r)?;
                    let kcst = read_f64_le(r)?;
                    reac.set_ccst_checkpointed(ccst, kcst);
                }
                KProcKind::SReac(sr) => {
                    let ccst = read_f64_le(r)?;
                    let kcst = read_f64_le(r)?;
                    sr.set_ccst_checkpointed(ccst, kcst);
                }
                KProcKind::Diff(d) => {
                    let scaled = read_f64_le(r)?;
                    let dcst = read_f64_le(r)?;
                    let cdf = [read_f64_le(r)?, read_f64_le(r)?, read_f64_le(r)?];
                    let mut active = [false; 4];
                    for a in &mut active {
                        *a = read_u8(r)? != 0;
                    }
                    let tet = self.tets[d.tet().index()].as_ref().expect("owner exists");
                    d.restore_checkpointed(scaled, dcst, cdf, active, tet);
                }
            }
        }

        self.time = read_f64_le(r)?;
        self.nsteps = read_u64_le(r)?;

        let mut seed = [0u8; 32];
        r.read_exact(&mut seed)?;
        let word_pos = read_u128_le(r)?;
        self.rng = SimRng::from_snapshot(RngSnapshot { seed, word_pos });

        self.update_all();
        debug!("checkpoint restored at t = {}, {} steps", self.time, self.nsteps);
        Ok(())
    }
}
