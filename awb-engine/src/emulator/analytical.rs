//! Closed-form antenna models behind the emulated engine.
//!
//! These are textbook stand-ins, not field solutions: the induced-EMF
//! input impedance of a center-fed wire dipole, the finite-length dipole
//! pattern, and a single-resonance model for an edge-fed patch. They exist
//! so the workflow produces plausible curves without the vendor solver.

use std::f64::consts::PI;

use num::complex::Complex64;

pub const FREE_SPACE_IMPEDANCE_OHM: f64 = 376.730313668;
const EULER_GAMMA: f64 = 0.5772156649015329;

/// Si(x) = ∫₀ˣ sin(t)/t dt
pub fn sine_integral(x: f64) -> f64 {
    simpson(0.0, x, 256, |t| {
        if t.abs() < 1e-12 { 1.0 } else { t.sin() / t }
    })
}

/// Ci(x) = γ + ln(x) + ∫₀ˣ (cos(t) − 1)/t dt, for x > 0.
pub fn cosine_integral(x: f64) -> f64 {
    EULER_GAMMA
        + x.ln()
        + simpson(0.0, x, 256, |t| {
            if t.abs() < 1e-12 {
                0.0
            }
            else {
                (t.cos() - 1.0) / t
            }
        })
}

/// Induced-EMF input impedance of a center-fed dipole of total length `l`
/// and wire radius `a`, both in the same unit as `wavelength`.
pub fn dipole_input_impedance(
    total_length: f64,
    wire_radius: f64,
    wavelength: f64,
) -> Complex64 {
    let k = 2.0 * PI / wavelength;
    let kl = k * total_length;

    let si_kl = sine_integral(kl);
    let si_2kl = sine_integral(2.0 * kl);
    let ci_kl = cosine_integral(kl);
    let ci_2kl = cosine_integral(2.0 * kl);

    let r_m = FREE_SPACE_IMPEDANCE_OHM / (2.0 * PI)
        * (EULER_GAMMA + kl.ln() - ci_kl
            + 0.5 * kl.sin() * (si_2kl - 2.0 * si_kl)
            + 0.5 * kl.cos() * (EULER_GAMMA + (kl / 2.0).ln() + ci_2kl - 2.0 * ci_kl));

    let x_m = FREE_SPACE_IMPEDANCE_OHM / (4.0 * PI)
        * (2.0 * si_kl + kl.cos() * (2.0 * si_kl - si_2kl)
            - kl.sin()
                * (2.0 * ci_kl
                    - ci_2kl
                    - cosine_integral(2.0 * k * wire_radius * wire_radius / total_length)));

    // refer the current-maximum impedance to the feed point
    let sin_half = (kl / 2.0).sin();
    Complex64::new(r_m, x_m) / (sin_half * sin_half).max(1e-9)
}

/// |Γ| in dB against a real reference impedance.
pub fn reflection_db(input_impedance: Complex64, reference_ohm: f64) -> f64 {
    let z0 = Complex64::new(reference_ohm, 0.0);
    let gamma = (input_impedance - z0) / (input_impedance + z0);
    20.0 * gamma.norm().max(1e-9).log10()
}

/// Normalized total-gain pattern of a finite-length dipole along Z.
#[derive(Clone, Copy, Debug)]
pub struct DipolePattern {
    kl_half: f64,
    /// Pattern factor averaged over the sphere, for gain normalization.
    average: f64,
}

impl DipolePattern {
    pub fn new(total_length: f64, wavelength: f64) -> Self {
        let kl_half = PI * total_length / wavelength;
        // ⟨F⟩ = ½ ∫₀^π F(θ) sin(θ) dθ
        let average = 0.5
            * simpson(0.0, PI, 256, |theta| {
                pattern_factor(kl_half, theta) * theta.sin()
            });

        Self { kl_half, average }
    }

    pub fn gain(&self, theta_rad: f64) -> f64 {
        if self.average <= 0.0 {
            0.0
        }
        else {
            pattern_factor(self.kl_half, theta_rad) / self.average
        }
    }
}

fn pattern_factor(kl_half: f64, theta: f64) -> f64 {
    let sin_theta = theta.sin();
    if sin_theta.abs() < 1e-9 {
        // the pattern has a null on the wire axis
        0.0
    }
    else {
        let numerator = (kl_half * theta.cos()).cos() - kl_half.cos();
        (numerator / sin_theta).powi(2)
    }
}

/// TM₁₀ resonance of a rectangular patch of length `l` on a substrate with
/// relative permittivity `epsr`.
pub fn patch_resonant_frequency_ghz(patch_length_mm: f64, epsr: f64) -> f64 {
    300.0 / (2.0 * patch_length_mm * epsr.sqrt())
}

/// Single parallel-resonance impedance model for an edge-fed patch.
pub fn patch_input_impedance(frequency_ghz: f64, resonant_ghz: f64) -> Complex64 {
    // resonant resistance and quality factor of a typical edge feed
    let resistance = 65.0;
    let q = 25.0;

    let detune = frequency_ghz / resonant_ghz - resonant_ghz / frequency_ghz;
    Complex64::new(resistance, 0.0) / Complex64::new(1.0, q * detune)
}

/// Broad upward patch pattern with a small back lobe.
pub fn patch_gain(theta_rad: f64) -> f64 {
    let back_lobe = 0.05;
    if theta_rad <= PI / 2.0 {
        (1.5 * theta_rad.cos().powi(2)).max(back_lobe)
    }
    else {
        back_lobe
    }
}

fn simpson(a: f64, b: f64, n: usize, f: impl Fn(f64) -> f64) -> f64 {
    debug_assert!(n % 2 == 0);
    let h = (b - a) / n as f64;

    let mut sum = f(a) + f(b);
    for i in 1..n {
        let weight = if i % 2 == 0 { 2.0 } else { 4.0 };
        sum += weight * f(a + i as f64 * h);
    }

    sum * h / 3.0
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::{
        DipolePattern,
        cosine_integral,
        dipole_input_impedance,
        patch_input_impedance,
        patch_resonant_frequency_ghz,
        reflection_db,
        sine_integral,
    };

    #[test]
    fn it_evaluates_the_integral_functions() {
        assert!((sine_integral(PI) - 1.851937).abs() < 1e-5);
        assert!((sine_integral(2.0 * PI) - 1.418151).abs() < 1e-5);
        assert!((cosine_integral(1.0) - 0.337404).abs() < 1e-5);
        assert!(sine_integral(0.0).abs() < 1e-12);
    }

    #[test]
    fn it_reproduces_the_half_wave_dipole_impedance() {
        // thin half-wave dipole: ~73 + j42.5 Ω
        let z = dipole_input_impedance(150.0, 0.075, 300.0);
        assert!((z.re - 73.1).abs() < 2.0, "R = {}", z.re);
        assert!((z.im - 42.5).abs() < 8.0, "X = {}", z.im);
    }

    #[test]
    fn it_normalizes_the_dipole_gain() {
        let pattern = DipolePattern::new(150.0, 300.0);
        // half-wave dipole directivity ≈ 1.64, broadside
        assert!((pattern.gain(PI / 2.0) - 1.64).abs() < 0.05);
        assert_eq!(pattern.gain(0.0), 0.0);
        assert!(pattern.gain(PI / 4.0) < pattern.gain(PI / 2.0));
    }

    #[test]
    fn it_dips_at_the_patch_resonance() {
        let resonant = patch_resonant_frequency_ghz(101.13, 2.2);
        assert!((resonant - 1.0).abs() < 0.01);

        let at_resonance = reflection_db(patch_input_impedance(resonant, resonant), 50.0);
        let detuned = reflection_db(patch_input_impedance(resonant * 1.3, resonant), 50.0);
        assert!(at_resonance < -10.0);
        assert!(detuned > at_resonance);
    }
}
