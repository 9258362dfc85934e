//! Interpolation of systematic variations between the nominal and the ±1σ
//! templates.
//!
//! `normsys` uses code 4: exponential extrapolation beyond |α| = 1 and a
//! sixth-order polynomial inside, matched in value, first and second
//! derivative at α = ±1. `histosys` uses code 4p, the additive analogue.

/// Inverse of the linear system fixing the code-4 polynomial at α = ±1.
const CODE4_INV: [[f64; 6]; 6] = [
    [15.0 / 16.0, -15.0 / 16.0, -7.0 / 16.0, -7.0 / 16.0, 1.0 / 16.0, -1.0 / 16.0],
    [3.0 / 2.0, 3.0 / 2.0, -9.0 / 16.0, 9.0 / 16.0, 1.0 / 16.0, 1.0 / 16.0],
    [-5.0 / 8.0, 5.0 / 8.0, 5.0 / 8.0, 5.0 / 8.0, -1.0 / 8.0, 1.0 / 8.0],
    [-3.0 / 2.0, -3.0 / 2.0, 7.0 / 8.0, -7.0 / 8.0, -1.0 / 8.0, -1.0 / 8.0],
    [3.0 / 16.0, -3.0 / 16.0, -3.0 / 16.0, -3.0 / 16.0, 1.0 / 16.0, -1.0 / 16.0],
    [1.0 / 2.0, 1.0 / 2.0, -5.0 / 16.0, 5.0 / 16.0, 1.0 / 16.0, 1.0 / 16.0],
];

/// Multiplicative normalization factor at `alpha`.
///
/// Non-positive factors cannot be extrapolated exponentially; they fall back
/// to piecewise-linear interpolation.
pub(crate) fn normsys_factor(alpha: f64, hi: f64, lo: f64) -> f64 {
    if hi <= 0.0 || lo <= 0.0 {
        return if alpha >= 0.0 { 1.0 + alpha * (hi - 1.0) } else { 1.0 + alpha * (1.0 - lo) };
    }
    if alpha >= 1.0 {
        return hi.powf(alpha);
    }
    if alpha <= -1.0 {
        return lo.powf(-alpha);
    }

    let (ln_hi, ln_lo) = (hi.ln(), lo.ln());
    // Value, first and second derivative of the exponential branches at ±1.
    let rhs = [hi - 1.0, lo - 1.0, hi * ln_hi, -lo * ln_lo, hi * ln_hi * ln_hi, lo * ln_lo * ln_lo];

    // Horner over a_6..a_1, then the constant term.
    CODE4_INV
        .iter()
        .rev()
        .map(|row| row.iter().zip(&rhs).map(|(m, r)| m * r).sum::<f64>())
        .fold(0.0, |acc, a| (acc + a) * alpha)
        + 1.0
}

/// Additive shift of the nominal bin content at `alpha`.
pub(crate) fn histosys_delta(alpha: f64, down: f64, nominal: f64, up: f64) -> f64 {
    let up_shift = up - nominal;
    let down_shift = nominal - down;
    if alpha > 1.0 {
        return alpha * up_shift;
    }
    if alpha < -1.0 {
        return alpha * down_shift;
    }

    let mean = 0.5 * (up_shift + down_shift);
    let asym = 0.0625 * (up_shift - down_shift);
    let a2 = alpha * alpha;
    alpha * mean + asym * a2 * (15.0 + a2 * (3.0 * a2 - 10.0))
}
