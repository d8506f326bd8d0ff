//! Physical constants used by mesoscopic rate scaling.

/// Avogadro's number, in 1/mol (CODATA 2018 exact value).
pub const AVOGADRO: f64 = 6.022_140_76e23;

/// Litres per cubic metre.
///
/// Macroscopic rate constants follow bulk conventions (molar
/// concentrations), so volume scale factors carry a factor of 1000 to
/// convert m^3 to litres.
pub const LITRE_PER_CUBIC_METRE: f64 = 1.0e3;
