//! Emulated engine backend.
//!
//! Stands in for the vendor application so the whole workbench — workflow,
//! result massaging, plots — runs without an external install. Geometry and
//! setup calls are recorded; `analyze` infers an antenna model from the
//! recorded geometry and the closed forms in [`analytical`] provide the
//! curves. Result tables come out in the vendor shape: textual angle labels
//! and a sparse `(frequency, phi, theta)` gain table.

pub mod analytical;

use std::{
    collections::HashMap,
    fmt::Write as _,
    path::Path,
    time::Duration,
};

use awb_farfield::{
    FarFieldSample,
    Tolerance,
};

use crate::{
    emulator::analytical::{
        DipolePattern,
        dipole_input_impedance,
        patch_gain,
        patch_input_impedance,
        patch_resonant_frequency_ghz,
        reflection_db,
    },
    engine::{
        AdaptivePass,
        Axis,
        BoxSpec,
        CylinderSpec,
        DesignInfo,
        Engine,
        EngineError,
        EngineSession,
        FarFieldTable,
        LumpedPortSpec,
        Material,
        ObjectRef,
        PortRef,
        RectangleSpec,
        SetupRef,
        SetupSpec,
        SweepRef,
        SweepSpec,
        SweepTrace,
    },
    settings::EngineSettings,
};

/// Far-field sampling of the emulated result store: θ ∈ [0°, 180°],
/// φ ∈ [−180°, 180°], both in 10° steps.
const ANGLE_STEP_DEG: i32 = 10;

#[derive(Clone, Debug)]
pub struct EmulatedEngine {
    /// Simulated wall time per adaptive pass.
    pub pass_duration: Duration,
}

impl Default for EmulatedEngine {
    fn default() -> Self {
        Self {
            pass_duration: Duration::from_millis(120),
        }
    }
}

impl Engine for EmulatedEngine {
    type Session = EmulatedSession;

    fn connect(
        &self,
        settings: &EngineSettings,
        design: &DesignInfo,
    ) -> Result<Self::Session, EngineError> {
        if settings.version.is_empty() {
            return Err(EngineError::Connection {
                reason: "no engine version configured".to_owned(),
            });
        }

        if let Some(endpoint) = &settings.endpoint {
            // there is no remote process; the emulator pretends to attach
            tracing::debug!(
                address = endpoint.address,
                port = endpoint.port,
                "emulator ignoring remote endpoint"
            );
        }

        tracing::info!(
            version = settings.version,
            non_graphical = settings.non_graphical,
            "emulated engine session opened"
        );

        Ok(EmulatedSession {
            design: design.clone(),
            pass_duration: self.pass_duration,
            objects: Vec::new(),
            pec_sheets: Vec::new(),
            open_region: None,
            ports: Vec::new(),
            setups: Vec::new(),
            sweeps: Vec::new(),
            solved: HashMap::new(),
            next_id: 1,
            released: false,
        })
    }
}

#[derive(Clone, Debug)]
enum Shape {
    Cylinder(CylinderSpec),
    Box(BoxSpec),
    Rectangle(RectangleSpec),
}

impl Shape {
    fn name(&self) -> &str {
        match self {
            Shape::Cylinder(spec) => &spec.name,
            Shape::Box(spec) => &spec.name,
            Shape::Rectangle(spec) => &spec.name,
        }
    }
}

/// Antenna electrical model inferred from the recorded geometry.
#[derive(Clone, Copy, Debug)]
enum AntennaModel {
    Dipole {
        total_length_mm: f64,
        wire_radius_mm: f64,
    },
    Patch {
        resonant_ghz: f64,
    },
}

impl AntennaModel {
    fn s11_db(&self, frequency_ghz: f64, reference_ohm: f64) -> f64 {
        let impedance = match self {
            AntennaModel::Dipole {
                total_length_mm,
                wire_radius_mm,
            } => {
                dipole_input_impedance(
                    *total_length_mm,
                    *wire_radius_mm,
                    300.0 / frequency_ghz,
                )
            }
            AntennaModel::Patch { resonant_ghz } => {
                patch_input_impedance(frequency_ghz, *resonant_ghz)
            }
        };

        reflection_db(impedance, reference_ohm)
    }

    fn gain(&self, frequency_ghz: f64, theta_deg: f64) -> f64 {
        match self {
            AntennaModel::Dipole {
                total_length_mm, ..
            } => {
                DipolePattern::new(*total_length_mm, 300.0 / frequency_ghz)
                    .gain(theta_deg.to_radians())
            }
            AntennaModel::Patch { .. } => patch_gain(theta_deg.to_radians()),
        }
    }
}

#[derive(Debug)]
pub struct EmulatedSession {
    design: DesignInfo,
    pass_duration: Duration,
    objects: Vec<(ObjectRef, Shape)>,
    pec_sheets: Vec<ObjectRef>,
    /// (frequency_ghz, offset_mm) of the radiation boundary, once assigned.
    open_region: Option<(f64, f64)>,
    ports: Vec<(PortRef, LumpedPortSpec)>,
    setups: Vec<(SetupRef, SetupSpec)>,
    sweeps: Vec<(SweepRef, SetupRef, SweepSpec)>,
    solved: HashMap<SetupRef, AntennaModel>,
    next_id: u32,
    released: bool,
}

impl EmulatedSession {
    fn ensure_live(&self) -> Result<(), EngineError> {
        if self.released {
            Err(EngineError::Released)
        }
        else {
            Ok(())
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn record_object(&mut self, shape: Shape) -> Result<ObjectRef, EngineError> {
        self.ensure_live()?;

        let name = shape.name();
        if self.objects.iter().any(|(_, other)| other.name() == name) {
            return Err(EngineError::DuplicateName {
                name: name.to_owned(),
            });
        }

        let object = ObjectRef(self.next_id());
        tracing::debug!(name = shape.name(), ?object, "object created");
        self.objects.push((object, shape));
        Ok(object)
    }

    fn object(&self, object: ObjectRef) -> Result<&Shape, EngineError> {
        self.objects
            .iter()
            .find_map(|(other, shape)| (*other == object).then_some(shape))
            .ok_or(EngineError::InvalidHandle { what: "object" })
    }

    fn setup_spec(&self, setup: SetupRef) -> Result<&SetupSpec, EngineError> {
        self.setups
            .iter()
            .find_map(|(other, spec)| (*other == setup).then_some(spec))
            .ok_or(EngineError::InvalidHandle { what: "setup" })
    }

    /// Reads the antenna back out of the recorded geometry: two equal PEC
    /// cylinders along Z make a dipole, a substrate box with a PEC patch
    /// sheet makes a microstrip patch.
    fn infer_antenna(&self) -> Result<AntennaModel, EngineError> {
        let cylinders: Vec<&CylinderSpec> = self
            .objects
            .iter()
            .filter_map(|(_, shape)| {
                match shape {
                    Shape::Cylinder(spec) => Some(spec),
                    _ => None,
                }
            })
            .collect();

        if let [arm1, arm2] = cylinders[..]
            && arm1.axis == Axis::Z
            && arm2.axis == Axis::Z
            && arm1.material == Material::Pec
            && arm2.material == Material::Pec
        {
            // total length spans both arms plus the feed gap between them
            let top = (arm1.origin.z + arm1.height_mm).max(arm2.origin.z + arm2.height_mm);
            let bottom = arm1.origin.z.min(arm2.origin.z);
            let total_length_mm = top - bottom;

            return Ok(AntennaModel::Dipole {
                total_length_mm,
                wire_radius_mm: arm1.radius_mm,
            });
        }

        let substrate = self.objects.iter().find_map(|(_, shape)| {
            match shape {
                Shape::Box(spec) => {
                    match spec.material {
                        Material::Substrate {
                            relative_permittivity,
                        } => Some(relative_permittivity),
                        _ => None,
                    }
                }
                _ => None,
            }
        });

        let patch = self.objects.iter().find_map(|(object, shape)| {
            match shape {
                Shape::Rectangle(spec)
                    if self.pec_sheets.contains(object) && spec.origin.z >= 0.0 =>
                {
                    Some(spec)
                }
                _ => None,
            }
        });

        if let (Some(relative_permittivity), Some(patch)) = (substrate, patch) {
            return Ok(AntennaModel::Patch {
                resonant_ghz: patch_resonant_frequency_ghz(
                    patch.size_mm[0],
                    relative_permittivity,
                ),
            });
        }

        Err(EngineError::UnrecognizedGeometry)
    }
}

impl EngineSession for EmulatedSession {
    fn create_cylinder(&mut self, spec: &CylinderSpec) -> Result<ObjectRef, EngineError> {
        self.record_object(Shape::Cylinder(spec.clone()))
    }

    fn create_box(&mut self, spec: &BoxSpec) -> Result<ObjectRef, EngineError> {
        self.record_object(Shape::Box(spec.clone()))
    }

    fn create_rectangle(&mut self, spec: &RectangleSpec) -> Result<ObjectRef, EngineError> {
        self.record_object(Shape::Rectangle(spec.clone()))
    }

    fn assign_perfect_e(&mut self, sheets: &[ObjectRef]) -> Result<(), EngineError> {
        self.ensure_live()?;
        for sheet in sheets {
            self.object(*sheet)?;
            self.pec_sheets.push(*sheet);
        }
        Ok(())
    }

    fn create_open_region(
        &mut self,
        frequency_ghz: f64,
        offset_mm: f64,
    ) -> Result<(), EngineError> {
        self.ensure_live()?;
        tracing::debug!(frequency_ghz, offset_mm, "radiation boundary assigned");
        self.open_region = Some((frequency_ghz, offset_mm));
        Ok(())
    }

    fn create_lumped_port(&mut self, spec: &LumpedPortSpec) -> Result<PortRef, EngineError> {
        self.ensure_live()?;
        self.object(spec.sheet)?;
        self.object(spec.reference)?;

        let port = PortRef(self.next_id());
        self.ports.push((port, spec.clone()));
        Ok(port)
    }

    fn create_setup(&mut self, spec: &SetupSpec) -> Result<SetupRef, EngineError> {
        self.ensure_live()?;
        let setup = SetupRef(self.next_id());
        self.setups.push((setup, spec.clone()));
        Ok(setup)
    }

    fn create_sweep(&mut self, setup: SetupRef, spec: &SweepSpec) -> Result<SweepRef, EngineError> {
        self.ensure_live()?;
        self.setup_spec(setup)?;

        let sweep = SweepRef(self.next_id());
        self.sweeps.push((sweep, setup, spec.clone()));
        Ok(sweep)
    }

    fn analyze(
        &mut self,
        setup: SetupRef,
        progress: &mut dyn FnMut(AdaptivePass),
    ) -> Result<(), EngineError> {
        self.ensure_live()?;
        let spec = self.setup_spec(setup)?.clone();
        let model = self.infer_antenna()?;

        tracing::debug!(?model, setup = spec.name, "adaptive solve started");

        // a canned convergence history: ΔS shrinks geometrically
        let mut delta_s = 0.2;
        let mut converged_streak = 0;

        for pass in 1..=spec.max_passes {
            if !self.pass_duration.is_zero() {
                std::thread::sleep(self.pass_duration);
            }

            let reported_delta = (pass > 1).then_some(delta_s);
            let converged = reported_delta.is_some_and(|delta| delta < 0.02);
            converged_streak = if converged { converged_streak + 1 } else { 0 };

            progress(AdaptivePass {
                pass,
                max_passes: spec.max_passes,
                delta_s: reported_delta,
                converged,
            });

            delta_s *= 0.45;
            if converged_streak >= spec.min_converged_passes {
                break;
            }
        }

        self.solved.insert(setup, model);
        Ok(())
    }

    fn reflection_trace(
        &mut self,
        setup: SetupRef,
        sweep: SweepRef,
        port: PortRef,
    ) -> Result<SweepTrace, EngineError> {
        self.ensure_live()?;
        let model = *self
            .solved
            .get(&setup)
            .ok_or(EngineError::NotSolved)?;

        let (_, sweep_setup, sweep_spec) = self
            .sweeps
            .iter()
            .find(|(other, ..)| *other == sweep)
            .ok_or(EngineError::InvalidHandle { what: "sweep" })?;
        if *sweep_setup != setup {
            return Err(EngineError::InvalidHandle { what: "sweep" });
        }

        let (_, port_spec) = self
            .ports
            .iter()
            .find(|(other, _)| *other == port)
            .ok_or(EngineError::InvalidHandle { what: "port" })?;

        let point_count = sweep_spec.point_count.max(2);
        let span_ghz = sweep_spec.stop_ghz - sweep_spec.start_ghz;

        // endpoints land exactly on start and stop
        let frequency_ghz: Vec<f64> = (0..point_count)
            .map(|i| {
                sweep_spec.start_ghz + span_ghz * i as f64 / (point_count - 1) as f64
            })
            .collect();
        let s11_db = frequency_ghz
            .iter()
            .map(|frequency| model.s11_db(*frequency, port_spec.impedance_ohm))
            .collect();

        Ok(SweepTrace {
            frequency_ghz,
            s11_db,
        })
    }

    fn far_field_table(
        &mut self,
        setup: SetupRef,
        frequency_ghz: f64,
    ) -> Result<FarFieldTable, EngineError> {
        self.ensure_live()?;
        let model = *self
            .solved
            .get(&setup)
            .ok_or(EngineError::NotSolved)?;

        // the adaptive solution only exists at the setup frequency
        let solved_ghz = self.setup_spec(setup)?.frequency_ghz;
        if !Tolerance::default().matches(frequency_ghz, solved_ghz) {
            return Err(EngineError::NoSolutionAtFrequency { frequency_ghz });
        }

        let theta_deg: Vec<i32> = (0..=180).step_by(ANGLE_STEP_DEG as usize).collect();
        let phi_deg: Vec<i32> = (-180..=180)
            .step_by(ANGLE_STEP_DEG as usize)
            .collect();

        let mut samples = Vec::with_capacity(theta_deg.len() * phi_deg.len());
        for theta in &theta_deg {
            let gain = model.gain(solved_ghz, f64::from(*theta));
            for phi in &phi_deg {
                samples.push(FarFieldSample {
                    frequency_ghz: solved_ghz,
                    phi_deg: f64::from(*phi),
                    theta_deg: f64::from(*theta),
                    gain,
                });
            }
        }

        Ok(FarFieldTable {
            theta_labels: theta_deg.iter().map(|deg| format!("{deg}deg")).collect(),
            phi_labels: phi_deg.iter().map(|deg| format!("{deg}deg")).collect(),
            samples,
        })
    }

    fn save_project(&mut self, path: &Path) -> Result<(), EngineError> {
        self.ensure_live()?;

        let mut contents = format!(
            "# emulated project dump\nproject = {}\ndesign = {}\n",
            self.design.project_name, self.design.design_name
        );
        for (_, shape) in &self.objects {
            let _ = writeln!(contents, "object = {}", shape.name());
        }

        std::fs::write(path, contents).map_err(EngineError::SaveProject)?;
        tracing::info!(path = %path.display(), "project saved");
        Ok(())
    }

    fn release(&mut self) -> Result<(), EngineError> {
        self.ensure_live()?;
        self.released = true;
        tracing::info!("emulated engine session released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{
        EmulatedEngine,
        EmulatedSession,
    };
    use crate::{
        engine::{
            DesignInfo,
            Engine,
            EngineError,
            EngineSession,
            SetupRef,
            SetupSpec,
            SolutionType,
        },
        settings::EngineSettings,
    };

    fn open_session() -> EmulatedSession {
        EmulatedEngine {
            pass_duration: Duration::ZERO,
        }
        .connect(
            &EngineSettings::default(),
            &DesignInfo {
                project_name: "Test".to_owned(),
                design_name: "Test".to_owned(),
                solution_type: SolutionType::Terminal,
            },
        )
        .unwrap()
    }

    fn driven_setup(session: &mut EmulatedSession) -> SetupRef {
        session
            .create_setup(&SetupSpec {
                name: "Setup".to_owned(),
                frequency_ghz: 1.0,
                max_passes: 10,
                min_converged_passes: 2,
            })
            .unwrap()
    }

    fn half_wave_dipole(session: &mut EmulatedSession) {
        for (name, z) in [("Arm1", 3.0), ("Arm2", -78.0)] {
            session
                .create_cylinder(&crate::engine::CylinderSpec {
                    name: name.to_owned(),
                    axis: crate::engine::Axis::Z,
                    origin: nalgebra::Point3::new(0.0, 0.0, z),
                    radius_mm: 3.0,
                    height_mm: 75.0,
                    material: crate::engine::Material::Pec,
                })
                .unwrap();
        }
    }

    #[test]
    fn it_rejects_duplicate_object_names() {
        let mut session = open_session();
        let spec = crate::engine::RectangleSpec {
            name: "Sheet".to_owned(),
            plane: crate::engine::Plane::Yz,
            origin: nalgebra::Point3::origin(),
            size_mm: [1.0, 1.0],
        };

        session.create_rectangle(&spec).unwrap();
        assert!(matches!(
            session.create_rectangle(&spec),
            Err(EngineError::DuplicateName { .. })
        ));
    }

    #[test]
    fn it_refuses_to_solve_unrecognizable_geometry() {
        let mut session = open_session();
        let setup = driven_setup(&mut session);

        assert!(matches!(
            session.analyze(setup, &mut |_| {}),
            Err(EngineError::UnrecognizedGeometry)
        ));
    }

    #[test]
    fn it_refuses_results_before_the_solve() {
        let mut session = open_session();
        let setup = driven_setup(&mut session);

        assert!(matches!(
            session.far_field_table(setup, 1.0),
            Err(EngineError::NotSolved)
        ));
    }

    #[test]
    fn it_serves_far_field_data_only_at_the_solved_frequency() {
        let mut session = open_session();
        half_wave_dipole(&mut session);
        let setup = driven_setup(&mut session);
        session.analyze(setup, &mut |_| {}).unwrap();

        assert!(session.far_field_table(setup, 1.0).is_ok());
        assert!(matches!(
            session.far_field_table(setup, 2.0),
            Err(EngineError::NoSolutionAtFrequency { .. })
        ));
    }

    #[test]
    fn it_fails_every_call_after_release() {
        let mut session = open_session();
        session.release().unwrap();

        assert!(matches!(session.release(), Err(EngineError::Released)));
        assert!(matches!(
            session.create_open_region(1.0, 75.0),
            Err(EngineError::Released)
        ));
    }
}
