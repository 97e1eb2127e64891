use std::path::Path;

use awb_design::{
    DipoleParameters,
    MicrostripParameters,
    NonPositiveFrequency,
};
use awb_farfield::{
    CartesianSurface,
    EmptyResultError,
    FarFieldGrid,
    ParseAngleError,
    Tolerance,
    parse_angle_degrees,
};
use nalgebra::Point3;
use thiserror::Error;

use crate::{
    engine::{
        AdaptivePass,
        Axis,
        BoxSpec,
        CylinderSpec,
        DesignInfo,
        Engine,
        EngineError,
        EngineSession,
        LumpedPortSpec,
        Material,
        ObjectRef,
        Plane,
        PortRef,
        RectangleSpec,
        SetupRef,
        SetupSpec,
        SweepKind,
        SweepRef,
        SweepSpec,
        SweepTrace,
    },
    settings::EngineSettings,
};

pub const SETUP_NAME: &str = "DrivenSetup";
pub const SWEEP_NAME: &str = "DrivenSweep";
pub const DEFAULT_PORT_IMPEDANCE_OHM: f64 = 50.0;
pub const DEFAULT_MAX_PASSES: u32 = 10;
pub const DEFAULT_MIN_CONVERGED_PASSES: u32 = 2;
/// Sweep span around the design frequency, 0.5× to 1.5×.
pub const SWEEP_SPAN_FACTORS: (f64, f64) = (0.5, 1.5);
pub const SWEEP_POINT_COUNT: usize = 101;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    InvalidFrequency(#[from] NonPositiveFrequency),

    #[error("far-field result has a malformed angle axis")]
    AngleLabel(#[from] ParseAngleError),

    #[error(transparent)]
    NoFarFieldData(#[from] EmptyResultError),

    #[error("workflow step out of order: {missing} missing")]
    StepOutOfOrder { missing: &'static str },
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum AntennaKind {
    #[default]
    Dipole,
    Microstrip,
}

/// Everything one click of "Simulate" needs.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationRequest {
    pub antenna: AntennaKind,
    pub frequency_ghz: f64,
    /// Dipole arm length override; `None` keeps the derived λ/4 default.
    pub arm_length_override_mm: Option<f64>,
    pub port_impedance_ohm: f64,
    /// Matching tolerance for far-field angle/frequency lookup.
    pub tolerance: Tolerance,
}

impl SimulationRequest {
    pub fn new(antenna: AntennaKind, frequency_ghz: f64) -> Self {
        Self {
            antenna,
            frequency_ghz,
            arm_length_override_mm: None,
            port_impedance_ohm: DEFAULT_PORT_IMPEDANCE_OHM,
            tolerance: Tolerance::default(),
        }
    }
}

/// Object handles of the antenna structure, per antenna kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AntennaRefs {
    Dipole {
        arm1: ObjectRef,
        arm2: ObjectRef,
        port_sheet: ObjectRef,
    },
    Microstrip {
        substrate: ObjectRef,
        ground: ObjectRef,
        patch: ObjectRef,
        feed_sheet: ObjectRef,
    },
}

/// One connected design session and everything created in it so far.
///
/// This is the explicit context object the workflow threads through its
/// steps; there is no ambient state surviving anywhere else. Dropping the
/// session releases nothing on the engine side — call
/// [`Session::release`].
#[derive(Debug)]
pub struct Session<S> {
    session: S,
    pub design: DesignInfo,
    pub antenna: Option<AntennaRefs>,
    pub port: Option<PortRef>,
    pub setup: Option<SetupRef>,
    pub sweep: Option<SweepRef>,
}

impl<S> Session<S>
where
    S: EngineSession,
{
    pub fn connect<E>(
        engine: &E,
        settings: &EngineSettings,
        design: DesignInfo,
    ) -> Result<Self, EngineError>
    where
        E: Engine<Session = S>,
    {
        tracing::info!(
            project = design.project_name,
            design = design.design_name,
            version = settings.version,
            "connecting to engine"
        );
        let session = engine.connect(settings, &design)?;

        Ok(Self {
            session,
            design,
            antenna: None,
            port: None,
            setup: None,
            sweep: None,
        })
    }

    /// Two PEC wire arms along Z with a feed gap, and the port sheet
    /// spanning the gap in the YZ plane.
    pub fn build_dipole(&mut self, params: &DipoleParameters) -> Result<(), EngineError> {
        let arm_length = params.arm_length_mm;
        let wire_radius = params.wire_radius_mm;
        let gap = params.gap_mm;

        let arm1 = self.session.create_cylinder(&CylinderSpec {
            name: "Dipole_Arm1".to_owned(),
            axis: Axis::Z,
            origin: Point3::new(0.0, 0.0, gap / 2.0),
            radius_mm: wire_radius,
            height_mm: arm_length,
            material: Material::Pec,
        })?;

        let arm2 = self.session.create_cylinder(&CylinderSpec {
            name: "Dipole_Arm2".to_owned(),
            axis: Axis::Z,
            origin: Point3::new(0.0, 0.0, -gap / 2.0 - arm_length),
            radius_mm: wire_radius,
            height_mm: arm_length,
            material: Material::Pec,
        })?;

        let port_sheet = self.session.create_rectangle(&RectangleSpec {
            name: "Port_Sheet".to_owned(),
            plane: Plane::Yz,
            origin: Point3::new(0.0, -wire_radius, -gap / 2.0),
            size_mm: [wire_radius * 2.0, gap],
        })?;

        tracing::info!(arm_length_mm = arm_length, gap_mm = gap, "dipole geometry created");

        self.antenna = Some(AntennaRefs::Dipole {
            arm1,
            arm2,
            port_sheet,
        });
        Ok(())
    }

    /// Rectangular patch over a grounded substrate, edge-fed through a
    /// sheet at the patch edge.
    pub fn build_microstrip(&mut self, params: &MicrostripParameters) -> Result<(), EngineError> {
        let length = params.patch_length_mm;
        let width = params.patch_width_mm;
        let height = params.substrate_height_mm;
        // substrate extends half a patch length beyond the patch
        let margin = length / 2.0;

        let substrate = self.session.create_box(&BoxSpec {
            name: "Substrate".to_owned(),
            origin: Point3::new(-length / 2.0 - margin, -width / 2.0 - margin, -height),
            size_mm: [length + 2.0 * margin, width + 2.0 * margin, height],
            material: Material::Substrate {
                relative_permittivity: params.substrate_epsr,
            },
        })?;

        let ground = self.session.create_rectangle(&RectangleSpec {
            name: "Ground".to_owned(),
            plane: Plane::Xy,
            origin: Point3::new(-length / 2.0 - margin, -width / 2.0 - margin, -height),
            size_mm: [length + 2.0 * margin, width + 2.0 * margin],
        })?;

        let patch = self.session.create_rectangle(&RectangleSpec {
            name: "Patch".to_owned(),
            plane: Plane::Xy,
            origin: Point3::new(-length / 2.0, -width / 2.0, 0.0),
            size_mm: [length, width],
        })?;

        self.session.assign_perfect_e(&[ground, patch])?;

        let feed_width = width / 5.0;
        let feed_sheet = self.session.create_rectangle(&RectangleSpec {
            name: "Feed_Sheet".to_owned(),
            plane: Plane::Yz,
            origin: Point3::new(-length / 2.0, -feed_width / 2.0, -height),
            size_mm: [feed_width, height],
        })?;

        tracing::info!(
            patch_length_mm = length,
            patch_width_mm = width,
            "microstrip geometry created"
        );

        self.antenna = Some(AntennaRefs::Microstrip {
            substrate,
            ground,
            patch,
            feed_sheet,
        });
        Ok(())
    }

    /// Open region with a radiation boundary at least `offset_mm` from the
    /// structure.
    pub fn assign_radiation_boundary(
        &mut self,
        frequency_ghz: f64,
        offset_mm: f64,
    ) -> Result<(), EngineError> {
        self.session.create_open_region(frequency_ghz, offset_mm)
    }

    /// Lumped port on the antenna's feed sheet, referencing its main
    /// conductor.
    pub fn create_port(&mut self, impedance_ohm: f64) -> Result<PortRef, WorkflowError> {
        let (sheet, reference) = match self.antenna {
            Some(AntennaRefs::Dipole {
                arm1, port_sheet, ..
            }) => (port_sheet, arm1),
            Some(AntennaRefs::Microstrip {
                patch, feed_sheet, ..
            }) => (feed_sheet, patch),
            None => {
                return Err(WorkflowError::StepOutOfOrder {
                    missing: "antenna geometry",
                });
            }
        };

        let port = self.session.create_lumped_port(&LumpedPortSpec {
            name: "Feed_LumpedPort".to_owned(),
            sheet,
            reference,
            impedance_ohm,
            renormalize: true,
        })?;

        self.port = Some(port);
        Ok(port)
    }

    pub fn setup_analysis(&mut self, frequency_ghz: f64) -> Result<SetupRef, EngineError> {
        let setup = self.session.create_setup(&SetupSpec {
            name: SETUP_NAME.to_owned(),
            frequency_ghz,
            max_passes: DEFAULT_MAX_PASSES,
            min_converged_passes: DEFAULT_MIN_CONVERGED_PASSES,
        })?;

        self.setup = Some(setup);
        Ok(setup)
    }

    pub fn setup_sweep(&mut self, frequency_ghz: f64) -> Result<SweepRef, WorkflowError> {
        let setup = self.require_setup()?;
        let (start_factor, stop_factor) = SWEEP_SPAN_FACTORS;

        let sweep = self.session.create_sweep(
            setup,
            &SweepSpec {
                name: SWEEP_NAME.to_owned(),
                start_ghz: frequency_ghz * start_factor,
                stop_ghz: frequency_ghz * stop_factor,
                point_count: SWEEP_POINT_COUNT,
                kind: SweepKind::Interpolating,
            },
        )?;

        self.sweep = Some(sweep);
        Ok(sweep)
    }

    pub fn analyze(
        &mut self,
        progress: &mut dyn FnMut(AdaptivePass),
    ) -> Result<(), WorkflowError> {
        let setup = self.require_setup()?;
        tracing::info!("starting analysis");
        self.session.analyze(setup, progress)?;
        tracing::info!("analysis completed");
        Ok(())
    }

    pub fn reflection_trace(&mut self) -> Result<SweepTrace, WorkflowError> {
        let setup = self.require_setup()?;
        let sweep = self.sweep.ok_or(WorkflowError::StepOutOfOrder {
            missing: "frequency sweep",
        })?;
        let port = self.port.ok_or(WorkflowError::StepOutOfOrder {
            missing: "lumped port",
        })?;

        Ok(self.session.reflection_trace(setup, sweep, port)?)
    }

    /// Fetches the far-field table and reconstructs the dense gain grid
    /// plus its Cartesian rendering.
    pub fn radiation_pattern(
        &mut self,
        frequency_ghz: f64,
        tolerance: Tolerance,
    ) -> Result<RadiationPattern, WorkflowError> {
        let setup = self.require_setup()?;
        let table = self.session.far_field_table(setup, frequency_ghz)?;

        let theta_axis_deg = parse_axis(&table.theta_labels)?;
        let phi_axis_deg = parse_axis(&table.phi_labels)?;

        let grid = FarFieldGrid::build(
            table.samples,
            frequency_ghz,
            theta_axis_deg,
            phi_axis_deg,
            tolerance,
        )?;
        let surface = grid.to_cartesian();

        Ok(RadiationPattern {
            frequency_ghz,
            grid,
            surface,
        })
    }

    /// The full workflow behind the "Simulate" button: geometry, boundary,
    /// port, setup, sweep, solve, result fetch.
    pub fn run_simulation(
        &mut self,
        request: &SimulationRequest,
        progress: &mut dyn FnMut(AdaptivePass),
    ) -> Result<SimulationResults, WorkflowError> {
        let frequency_ghz = request.frequency_ghz;

        let boundary_offset_mm = match request.antenna {
            AntennaKind::Dipole => {
                let params = DipoleParameters::for_frequency(
                    frequency_ghz,
                    request.arm_length_override_mm,
                )?;
                self.build_dipole(&params)?;
                params.boundary_offset_mm
            }
            AntennaKind::Microstrip => {
                let params = MicrostripParameters::for_frequency(frequency_ghz)?;
                self.build_microstrip(&params)?;
                // λ/4 clearance, same rule as the dipole
                awb_design::SPEED_OF_LIGHT_MM_GHZ / frequency_ghz / 4.0
            }
        };

        self.assign_radiation_boundary(frequency_ghz, boundary_offset_mm)?;
        self.create_port(request.port_impedance_ohm)?;
        self.setup_analysis(frequency_ghz)?;
        self.setup_sweep(frequency_ghz)?;
        self.analyze(progress)?;

        let trace = self.reflection_trace()?;
        let pattern = self.radiation_pattern(frequency_ghz, request.tolerance)?;

        Ok(SimulationResults { trace, pattern })
    }

    pub fn save_project(&mut self, path: &Path) -> Result<(), EngineError> {
        self.session.save_project(path)
    }

    /// Optionally saves, then releases the engine session.
    pub fn release(mut self, save_to: Option<&Path>) -> Result<(), EngineError> {
        if let Some(path) = save_to {
            self.session.save_project(path)?;
        }
        self.session.release()
    }

    fn require_setup(&self) -> Result<SetupRef, WorkflowError> {
        self.setup.ok_or(WorkflowError::StepOutOfOrder {
            missing: "analysis setup",
        })
    }
}

fn parse_axis(labels: &[String]) -> Result<Vec<f64>, ParseAngleError> {
    labels
        .iter()
        .map(|label| parse_angle_degrees(label))
        .collect()
}

/// Plot-ready far-field pattern at one frequency.
#[derive(Clone, Debug, PartialEq)]
pub struct RadiationPattern {
    pub frequency_ghz: f64,
    pub grid: FarFieldGrid,
    pub surface: CartesianSurface,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimulationResults {
    pub trace: SweepTrace,
    pub pattern: RadiationPattern,
}

#[cfg(all(test, feature = "emulator"))]
mod tests {
    use std::time::Duration;

    use super::{
        AntennaKind,
        Session,
        SimulationRequest,
        WorkflowError,
    };
    use crate::{
        emulator::EmulatedEngine,
        engine::{
            DesignInfo,
            SolutionType,
        },
        settings::EngineSettings,
    };

    fn test_session() -> Session<crate::emulator::EmulatedSession> {
        let engine = EmulatedEngine {
            pass_duration: Duration::ZERO,
        };
        Session::connect(
            &engine,
            &EngineSettings::default(),
            DesignInfo {
                project_name: "DipoleSimulation".to_owned(),
                design_name: "Dipole".to_owned(),
                solution_type: SolutionType::Terminal,
            },
        )
        .unwrap()
    }

    #[test]
    fn it_runs_the_dipole_workflow_end_to_end() {
        let mut session = test_session();
        let mut passes = Vec::new();

        let results = session
            .run_simulation(&SimulationRequest::new(AntennaKind::Dipole, 1.0), &mut |pass| {
                passes.push(pass)
            })
            .unwrap();

        // adaptive passes were reported and the last one converged
        assert!(!passes.is_empty());
        assert!(passes.last().unwrap().converged);

        // 101-point sweep, all reflection values physical
        assert_eq!(results.trace.len(), 101);
        assert_eq!(results.trace.frequency_ghz[0], 0.5);
        assert_eq!(results.trace.frequency_ghz[100], 1.5);
        assert!(results.trace.s11_db.iter().all(|db| *db < 0.0));
        // a half-wave dipole around 1 GHz has a visible dip
        assert!(results.trace.min_s11_db().unwrap() < -8.0);

        // dense grid over the full sphere
        let grid = &results.pattern.grid;
        assert_eq!(grid.theta_axis_deg().len(), 19);
        assert_eq!(grid.phi_axis_deg().len(), 37);
        // broadside gain beats near-axis gain for a dipole
        assert!(grid.gain(9, 0) > grid.gain(1, 0));

        session.release(None).unwrap();
    }

    #[test]
    fn it_runs_the_microstrip_workflow_end_to_end() {
        let mut session = test_session();

        let results = session
            .run_simulation(
                &SimulationRequest::new(AntennaKind::Microstrip, 2.4),
                &mut |_| {},
            )
            .unwrap();

        assert_eq!(results.trace.len(), 101);
        assert!(results.trace.s11_db.iter().all(|db| *db < 0.0));

        // patch radiates up: zenith gain above horizon gain
        let grid = &results.pattern.grid;
        assert!(grid.gain(0, 0) > grid.gain(9, 0));
    }

    #[test]
    fn it_rejects_non_positive_frequencies_before_touching_geometry() {
        let mut session = test_session();
        let error = session
            .run_simulation(&SimulationRequest::new(AntennaKind::Dipole, 0.0), &mut |_| {})
            .unwrap_err();

        assert!(matches!(error, WorkflowError::InvalidFrequency(_)));
        assert!(session.antenna.is_none());
    }

    #[test]
    fn it_requires_steps_in_order() {
        let mut session = test_session();

        let error = session.create_port(50.0).unwrap_err();
        assert!(matches!(
            error,
            WorkflowError::StepOutOfOrder {
                missing: "antenna geometry"
            }
        ));

        let error = session.reflection_trace().unwrap_err();
        assert!(matches!(
            error,
            WorkflowError::StepOutOfOrder {
                missing: "analysis setup"
            }
        ));
    }
}
