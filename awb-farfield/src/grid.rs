use nalgebra::Point3;
use thiserror::Error;

/// No far-field sample matched the requested frequency.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
#[error("no usable far-field data for the requested frequency ({frequency_ghz} GHz)")]
pub struct EmptyResultError {
    pub frequency_ghz: f64,
}

/// One gain sample from the solver's sparse result table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FarFieldSample {
    pub frequency_ghz: f64,
    pub phi_deg: f64,
    pub theta_deg: f64,
    /// Total gain, linear and unitless.
    pub gain: f64,
}

/// Approximate equality for values reconstructed from rounded text.
///
/// Angle and frequency values arrive as rounded labels, so exact float
/// comparison would systematically miss valid matches. The tolerance is
/// relative with an absolute floor (so axes containing 0.0 still match),
/// and deliberately explicit rather than baked in: it has to stay well
/// below the axis spacing of the dataset at hand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerance {
    pub relative: f64,
    pub absolute: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            relative: 1e-6,
            absolute: 1e-9,
        }
    }
}

impl Tolerance {
    pub fn relative(relative: f64) -> Self {
        Self {
            relative,
            ..Default::default()
        }
    }

    pub fn matches(&self, a: f64, b: f64) -> bool {
        (a - b).abs() <= f64::max(self.relative * f64::max(a.abs(), b.abs()), self.absolute)
    }
}

/// Dense far-field gain grid, indexed `[theta][phi]`.
#[derive(Clone, Debug, PartialEq)]
pub struct FarFieldGrid {
    theta_deg: Vec<f64>,
    phi_deg: Vec<f64>,
    /// Row-major, theta-major: `gain[theta_index * phi_len + phi_index]`.
    gain: Vec<f64>,
}

impl FarFieldGrid {
    /// Reconstructs the dense grid from sparse samples.
    ///
    /// A sample is placed iff its frequency matches `target_frequency_ghz`
    /// and both angles match an axis entry, all within `tolerance`. When
    /// several axis entries match, the first in axis order wins. Cells no
    /// sample covered are filled with the minimum placed gain — a plotting
    /// convenience that keeps the surface closed, not an interpolation.
    pub fn build(
        samples: impl IntoIterator<Item = FarFieldSample>,
        target_frequency_ghz: f64,
        theta_axis_deg: Vec<f64>,
        phi_axis_deg: Vec<f64>,
        tolerance: Tolerance,
    ) -> Result<Self, EmptyResultError> {
        let phi_len = phi_axis_deg.len();
        let mut cells: Vec<Option<f64>> = vec![None; theta_axis_deg.len() * phi_len];

        for sample in samples {
            if !tolerance.matches(sample.frequency_ghz, target_frequency_ghz) {
                continue;
            }

            let theta_index = find_axis_index(&theta_axis_deg, sample.theta_deg, tolerance);
            let phi_index = find_axis_index(&phi_axis_deg, sample.phi_deg, tolerance);

            if let (Some(theta_index), Some(phi_index)) = (theta_index, phi_index) {
                cells[theta_index * phi_len + phi_index] = Some(sample.gain);
            }
        }

        let minimum = cells
            .iter()
            .flatten()
            .copied()
            .min_by(f64::total_cmp)
            .ok_or(EmptyResultError {
                frequency_ghz: target_frequency_ghz,
            })?;

        let gain = cells
            .into_iter()
            .map(|cell| cell.unwrap_or(minimum))
            .collect();

        Ok(Self {
            theta_deg: theta_axis_deg,
            phi_deg: phi_axis_deg,
            gain,
        })
    }

    pub fn theta_axis_deg(&self) -> &[f64] {
        &self.theta_deg
    }

    pub fn phi_axis_deg(&self) -> &[f64] {
        &self.phi_deg
    }

    pub fn gain(&self, theta_index: usize, phi_index: usize) -> f64 {
        self.gain[theta_index * self.phi_deg.len() + phi_index]
    }

    pub fn min_gain(&self) -> f64 {
        self.gain.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max_gain(&self) -> f64 {
        self.gain.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Projects every cell to Cartesian coordinates, using the gain as the
    /// radius. Pure and separate from grid construction.
    pub fn to_cartesian(&self) -> CartesianSurface {
        let points = self
            .theta_deg
            .iter()
            .enumerate()
            .flat_map(|(theta_index, theta_deg)| {
                self.phi_deg.iter().enumerate().map(move |(phi_index, phi_deg)| {
                    spherical_to_cartesian(
                        self.gain(theta_index, phi_index),
                        theta_deg.to_radians(),
                        phi_deg.to_radians(),
                    )
                })
            })
            .collect();

        CartesianSurface {
            points,
            theta_len: self.theta_deg.len(),
            phi_len: self.phi_deg.len(),
        }
    }
}

/// Standard spherical-to-Cartesian mapping with the gain as radius.
pub fn spherical_to_cartesian(gain: f64, theta_rad: f64, phi_rad: f64) -> Point3<f64> {
    Point3::new(
        gain * theta_rad.sin() * phi_rad.cos(),
        gain * theta_rad.sin() * phi_rad.sin(),
        gain * theta_rad.cos(),
    )
}

/// Cartesian rendering of a [`FarFieldGrid`], in the grid's cell order.
#[derive(Clone, Debug, PartialEq)]
pub struct CartesianSurface {
    points: Vec<Point3<f64>>,
    theta_len: usize,
    phi_len: usize,
}

impl CartesianSurface {
    pub fn point(&self, theta_index: usize, phi_index: usize) -> Point3<f64> {
        self.points[theta_index * self.phi_len + phi_index]
    }

    pub fn theta_len(&self) -> usize {
        self.theta_len
    }

    pub fn phi_len(&self) -> usize {
        self.phi_len
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }
}

fn find_axis_index(axis: &[f64], value: f64, tolerance: Tolerance) -> Option<usize> {
    axis.iter()
        .position(|entry| tolerance.matches(*entry, value))
}

#[cfg(test)]
mod tests {
    use nalgebra::Point3;

    use super::{
        EmptyResultError,
        FarFieldGrid,
        FarFieldSample,
        Tolerance,
        spherical_to_cartesian,
    };

    fn sample(frequency_ghz: f64, phi_deg: f64, theta_deg: f64, gain: f64) -> FarFieldSample {
        FarFieldSample {
            frequency_ghz,
            phi_deg,
            theta_deg,
            gain,
        }
    }

    #[test]
    fn it_places_each_sample_in_its_own_cell() {
        let theta = vec![0.0, 90.0, 180.0];
        let phi = vec![0.0, 180.0];

        let samples = [
            sample(1.0, 0.0, 0.0, 1.0),
            sample(1.0, 180.0, 0.0, 2.0),
            sample(1.0, 0.0, 90.0, 3.0),
            sample(1.0, 180.0, 90.0, 4.0),
            sample(1.0, 0.0, 180.0, 5.0),
            sample(1.0, 180.0, 180.0, 6.0),
        ];

        let grid = FarFieldGrid::build(samples, 1.0, theta, phi, Tolerance::default()).unwrap();

        assert_eq!(grid.gain(0, 0), 1.0);
        assert_eq!(grid.gain(0, 1), 2.0);
        assert_eq!(grid.gain(1, 0), 3.0);
        assert_eq!(grid.gain(1, 1), 4.0);
        assert_eq!(grid.gain(2, 0), 5.0);
        assert_eq!(grid.gain(2, 1), 6.0);
    }

    #[test]
    fn it_matches_values_reconstructed_from_rounded_labels() {
        // label said "90deg", the table key carries float noise
        let samples = [sample(1.0 + 1e-9, 0.0, 90.0 + 1e-7, 7.0)];
        let grid = FarFieldGrid::build(
            samples,
            1.0,
            vec![0.0, 90.0],
            vec![0.0],
            Tolerance::default(),
        )
        .unwrap();

        assert_eq!(grid.gain(1, 0), 7.0);
    }

    #[test]
    fn it_tie_breaks_on_the_first_axis_match() {
        // absurdly loose tolerance: both axis entries match, first wins
        let samples = [sample(1.0, 0.0, 10.0, 3.5)];
        let grid = FarFieldGrid::build(
            samples,
            1.0,
            vec![10.0, 10.000001],
            vec![0.0],
            Tolerance::relative(1e-3),
        )
        .unwrap();

        assert_eq!(grid.gain(0, 0), 3.5);
        // the second entry got the min-fill, i.e. the same value here
        assert_eq!(grid.gain(1, 0), 3.5);
    }

    #[test]
    fn it_fails_when_no_sample_matches_the_frequency() {
        let samples = [sample(2.0, 0.0, 0.0, 1.0), sample(2.0, 0.0, 90.0, 2.0)];
        let result = FarFieldGrid::build(
            samples,
            1.0,
            vec![0.0, 90.0],
            vec![0.0],
            Tolerance::default(),
        );

        assert_eq!(result, Err(EmptyResultError { frequency_ghz: 1.0 }));
    }

    #[test]
    fn it_fills_missing_cells_with_the_minimum_gain() {
        let theta = vec![0.0, 90.0, 180.0];
        let phi = vec![0.0, 180.0];

        // 5 of 6 cells covered; (180, 180) is missing
        let samples = [
            sample(1.0, 0.0, 0.0, 4.0),
            sample(1.0, 180.0, 0.0, 2.0),
            sample(1.0, 0.0, 90.0, 9.0),
            sample(1.0, 180.0, 90.0, 8.0),
            sample(1.0, 0.0, 180.0, 3.0),
        ];

        let grid = FarFieldGrid::build(samples, 1.0, theta, phi, Tolerance::default()).unwrap();
        assert_eq!(grid.gain(2, 1), 2.0);
        assert_eq!(grid.min_gain(), 2.0);
        assert_eq!(grid.max_gain(), 9.0);
    }

    #[test]
    fn it_ignores_samples_off_the_axes() {
        let samples = [
            sample(1.0, 0.0, 45.0, 1.0),
            sample(1.0, 0.0, 90.0, 2.0),
        ];
        let grid = FarFieldGrid::build(
            samples,
            1.0,
            vec![0.0, 90.0],
            vec![0.0],
            Tolerance::default(),
        )
        .unwrap();

        // the 45° sample has no axis entry and must not leak anywhere
        assert_eq!(grid.gain(0, 0), 2.0);
        assert_eq!(grid.gain(1, 0), 2.0);
    }

    #[test]
    fn it_projects_spherical_to_cartesian() {
        let on_x = spherical_to_cartesian(1.0, 90f64.to_radians(), 0.0);
        assert!((on_x - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-12);

        let on_z = spherical_to_cartesian(2.5, 0.0, 123f64.to_radians());
        assert!((on_z - Point3::new(0.0, 0.0, 2.5)).norm() < 1e-12);

        let on_y = spherical_to_cartesian(1.0, 90f64.to_radians(), 90f64.to_radians());
        assert!((on_y - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn it_projects_the_whole_grid() {
        let samples = [
            sample(1.0, 0.0, 90.0, 1.0),
            sample(1.0, 90.0, 90.0, 2.0),
        ];
        let grid = FarFieldGrid::build(
            samples,
            1.0,
            vec![90.0],
            vec![0.0, 90.0],
            Tolerance::default(),
        )
        .unwrap();

        let surface = grid.to_cartesian();
        assert_eq!(surface.theta_len(), 1);
        assert_eq!(surface.phi_len(), 2);
        assert!((surface.point(0, 0) - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
        assert!((surface.point(0, 1) - Point3::new(0.0, 2.0, 0.0)).norm() < 1e-12);
    }
}
