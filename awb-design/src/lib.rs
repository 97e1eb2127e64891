#![warn(unused_qualifications)]

//! Antenna design parameter derivation.
//!
//! Turns a design frequency into the physical dimensions the geometry
//! builder needs. All lengths are in millimeters, frequencies in GHz, so
//! the speed of light is the convenient `300 mm·GHz`.

use thiserror::Error;

/// Speed of light in mm·GHz (propagation in air).
pub const SPEED_OF_LIGHT_MM_GHZ: f64 = 300.0;

/// The design frequency must be strictly positive.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
#[error("design frequency must be positive, got {frequency_ghz} GHz")]
pub struct NonPositiveFrequency {
    pub frequency_ghz: f64,
}

/// Dimensions of a center-fed wire dipole, derived from the design
/// frequency.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DipoleParameters {
    pub frequency_ghz: f64,
    pub wavelength_mm: f64,
    /// Total length of a resonant half-wave dipole. Kept for reference even
    /// when the arm length is overridden.
    pub dipole_total_length_mm: f64,
    /// Length of one arm. λ/4 by default, or the user's override.
    pub arm_length_mm: f64,
    pub wire_radius_mm: f64,
    /// Feed gap between the two arms.
    pub gap_mm: f64,
    /// Clearance between the antenna and the radiation boundary.
    pub boundary_offset_mm: f64,
}

impl DipoleParameters {
    /// Derives all dimensions from the design frequency.
    ///
    /// Pure and unvalidated: a non-positive frequency yields non-finite or
    /// negative lengths. Callers taking user input should go through
    /// [`DipoleParameters::for_frequency`] instead.
    pub fn derive(frequency_ghz: f64, arm_length_override_mm: Option<f64>) -> Self {
        let wavelength_mm = SPEED_OF_LIGHT_MM_GHZ / frequency_ghz;
        let dipole_total_length_mm = wavelength_mm / 2.0;

        Self {
            frequency_ghz,
            wavelength_mm,
            dipole_total_length_mm,
            arm_length_mm: arm_length_override_mm.unwrap_or(dipole_total_length_mm / 2.0),
            wire_radius_mm: wavelength_mm / 100.0,
            gap_mm: wavelength_mm / 50.0,
            boundary_offset_mm: wavelength_mm / 4.0,
        }
    }

    /// Checked variant of [`DipoleParameters::derive`].
    pub fn for_frequency(
        frequency_ghz: f64,
        arm_length_override_mm: Option<f64>,
    ) -> Result<Self, NonPositiveFrequency> {
        check_frequency(frequency_ghz)?;
        Ok(Self::derive(frequency_ghz, arm_length_override_mm))
    }

    /// Default arm length (λ/4) for a given frequency, e.g. to pre-fill an
    /// input field before the user decides to override it.
    pub fn default_arm_length_mm(frequency_ghz: f64) -> f64 {
        SPEED_OF_LIGHT_MM_GHZ / frequency_ghz / 4.0
    }
}

/// Dimensions of a rectangular microstrip patch on a grounded substrate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MicrostripParameters {
    pub frequency_ghz: f64,
    /// Substrate height in mm.
    pub substrate_height_mm: f64,
    /// Relative permittivity of the substrate.
    pub substrate_epsr: f64,
    pub patch_length_mm: f64,
    pub patch_width_mm: f64,
}

impl MicrostripParameters {
    /// Substrate defaults for a common PTFE laminate.
    pub const DEFAULT_SUBSTRATE_HEIGHT_MM: f64 = 1.6;
    pub const DEFAULT_SUBSTRATE_EPSR: f64 = 2.2;

    /// Derives patch dimensions from the design frequency, using the
    /// default substrate. Same purity caveats as
    /// [`DipoleParameters::derive`].
    pub fn derive(frequency_ghz: f64) -> Self {
        let epsr = Self::DEFAULT_SUBSTRATE_EPSR;
        let lambda0_mm = SPEED_OF_LIGHT_MM_GHZ / frequency_ghz;

        let patch_length_mm = lambda0_mm / (2.0 * epsr.sqrt());
        let patch_width_mm = lambda0_mm / (2.0 * (epsr + 1.0) / 2.0).sqrt();

        Self {
            frequency_ghz,
            substrate_height_mm: Self::DEFAULT_SUBSTRATE_HEIGHT_MM,
            substrate_epsr: epsr,
            patch_length_mm: round_to_hundredth(patch_length_mm),
            patch_width_mm: round_to_hundredth(patch_width_mm),
        }
    }

    /// Checked variant of [`MicrostripParameters::derive`].
    pub fn for_frequency(frequency_ghz: f64) -> Result<Self, NonPositiveFrequency> {
        check_frequency(frequency_ghz)?;
        Ok(Self::derive(frequency_ghz))
    }
}

fn check_frequency(frequency_ghz: f64) -> Result<(), NonPositiveFrequency> {
    if frequency_ghz > 0.0 {
        Ok(())
    }
    else {
        Err(NonPositiveFrequency { frequency_ghz })
    }
}

// displayed dimensions are rounded to 0.01 mm
fn round_to_hundredth(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::{
        DipoleParameters,
        MicrostripParameters,
        NonPositiveFrequency,
    };

    #[test]
    fn it_derives_wavelength_and_default_arm_length() {
        for frequency_ghz in [0.5, 1.0, 2.4, 5.8, 28.0] {
            let params = DipoleParameters::derive(frequency_ghz, None);
            assert_eq!(params.wavelength_mm, 300.0 / frequency_ghz);
            assert_eq!(params.dipole_total_length_mm, params.wavelength_mm / 2.0);
            assert_eq!(params.arm_length_mm, params.wavelength_mm / 4.0);
            assert_eq!(params.wire_radius_mm, params.wavelength_mm / 100.0);
            assert_eq!(params.gap_mm, params.wavelength_mm / 50.0);
            assert_eq!(params.boundary_offset_mm, params.wavelength_mm / 4.0);
        }
    }

    #[test]
    fn it_prefers_the_arm_length_override() {
        let params = DipoleParameters::derive(1.0, Some(68.5));
        assert_eq!(params.arm_length_mm, 68.5);
        // the reference value is still the derived one
        assert_eq!(params.dipole_total_length_mm, 150.0);
    }

    #[test]
    fn it_rejects_non_positive_frequencies() {
        assert_eq!(
            DipoleParameters::for_frequency(0.0, None),
            Err(NonPositiveFrequency { frequency_ghz: 0.0 })
        );
        assert_eq!(
            DipoleParameters::for_frequency(-2.4, None),
            Err(NonPositiveFrequency {
                frequency_ghz: -2.4
            })
        );
        assert!(DipoleParameters::for_frequency(1.0, None).is_ok());
        assert!(MicrostripParameters::for_frequency(f64::NAN).is_err());
    }

    #[test]
    fn it_derives_microstrip_patch_dimensions() {
        let params = MicrostripParameters::derive(1.0);
        assert_eq!(params.substrate_height_mm, 1.6);
        assert_eq!(params.substrate_epsr, 2.2);
        // λ0 = 300mm, L = λ0 / (2·√2.2), W = λ0 / √3.2, rounded to 0.01mm
        assert_eq!(params.patch_length_mm, 101.13);
        assert_eq!(params.patch_width_mm, 167.71);
    }
}
