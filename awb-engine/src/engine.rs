use std::path::Path;

use awb_farfield::FarFieldSample;
use nalgebra::Point3;
use thiserror::Error;

use crate::settings::EngineSettings;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("connection to engine failed: {reason}")]
    Connection { reason: String },

    #[error("session was already released")]
    Released,

    #[error("duplicate object name: {name}")]
    DuplicateName { name: String },

    #[error("stale {what} handle")]
    InvalidHandle { what: &'static str },

    #[error("setup has not been solved yet")]
    NotSolved,

    #[error("no solved data at {frequency_ghz} GHz")]
    NoSolutionAtFrequency { frequency_ghz: f64 },

    #[error("geometry is not a recognizable antenna")]
    UnrecognizedGeometry,

    #[error("could not save project")]
    SaveProject(#[source] std::io::Error),
}

/// A backend able to open automation sessions.
///
/// Mirrors the desktop launch/attach step of the vendor application: the
/// engine is configured once, a session binds one project and design.
pub trait Engine {
    type Session: EngineSession;

    fn connect(
        &self,
        settings: &EngineSettings,
        design: &DesignInfo,
    ) -> Result<Self::Session, EngineError>;
}

/// The narrow automation surface the workflow drives.
///
/// Every method maps onto one call of the vendor automation API. Handles
/// are opaque and only valid for the session that returned them.
pub trait EngineSession {
    fn create_cylinder(&mut self, spec: &CylinderSpec) -> Result<ObjectRef, EngineError>;

    fn create_box(&mut self, spec: &BoxSpec) -> Result<ObjectRef, EngineError>;

    fn create_rectangle(&mut self, spec: &RectangleSpec) -> Result<ObjectRef, EngineError>;

    /// Assigns a perfect-electric-conductor boundary to sheet objects.
    fn assign_perfect_e(&mut self, sheets: &[ObjectRef]) -> Result<(), EngineError>;

    /// Open region (air volume) with a radiation boundary, `offset_mm` away
    /// from the structure.
    fn create_open_region(&mut self, frequency_ghz: f64, offset_mm: f64)
    -> Result<(), EngineError>;

    fn create_lumped_port(&mut self, spec: &LumpedPortSpec) -> Result<PortRef, EngineError>;

    fn create_setup(&mut self, spec: &SetupSpec) -> Result<SetupRef, EngineError>;

    fn create_sweep(&mut self, setup: SetupRef, spec: &SweepSpec) -> Result<SweepRef, EngineError>;

    /// Runs the adaptive solve for a setup. Blocks until converged or the
    /// pass limit is hit; `progress` is called once per adaptive pass.
    fn analyze(
        &mut self,
        setup: SetupRef,
        progress: &mut dyn FnMut(AdaptivePass),
    ) -> Result<(), EngineError>;

    /// Reflection coefficient at `port` over the sweep, in dB.
    fn reflection_trace(
        &mut self,
        setup: SetupRef,
        sweep: SweepRef,
        port: PortRef,
    ) -> Result<SweepTrace, EngineError>;

    /// Total-gain far-field table from the adaptive solution at the given
    /// frequency. This is the single typed accessor for gain data; if the
    /// result store has nothing usable the error says so, callers never
    /// probe alternative layouts.
    fn far_field_table(
        &mut self,
        setup: SetupRef,
        frequency_ghz: f64,
    ) -> Result<FarFieldTable, EngineError>;

    fn save_project(&mut self, path: &Path) -> Result<(), EngineError>;

    /// Releases the session. Further calls fail with
    /// [`EngineError::Released`].
    fn release(&mut self) -> Result<(), EngineError>;
}

/// Project and design a session binds to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DesignInfo {
    pub project_name: String,
    pub design_name: String,
    pub solution_type: SolutionType,
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
pub enum SolutionType {
    #[default]
    Terminal,
    Modal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectRef(pub(crate) u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PortRef(pub(crate) u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SetupRef(pub(crate) u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SweepRef(pub(crate) u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Coordinate plane a sheet lies in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Plane {
    Xy,
    Yz,
    Zx,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Material {
    Pec,
    Copper,
    Vacuum,
    Substrate { relative_permittivity: f64 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct CylinderSpec {
    pub name: String,
    pub axis: Axis,
    /// Center of the base face, in mm.
    pub origin: Point3<f64>,
    pub radius_mm: f64,
    pub height_mm: f64,
    pub material: Material,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoxSpec {
    pub name: String,
    /// Minimum corner, in mm.
    pub origin: Point3<f64>,
    pub size_mm: [f64; 3],
    pub material: Material,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RectangleSpec {
    pub name: String,
    pub plane: Plane,
    /// Corner of the sheet, in mm.
    pub origin: Point3<f64>,
    /// Extents along the plane's two axes, in axis order.
    pub size_mm: [f64; 2],
}

#[derive(Clone, Debug, PartialEq)]
pub struct LumpedPortSpec {
    pub name: String,
    pub sheet: ObjectRef,
    /// Conductor the port integration line references.
    pub reference: ObjectRef,
    pub impedance_ohm: f64,
    pub renormalize: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SetupSpec {
    pub name: String,
    pub frequency_ghz: f64,
    pub max_passes: u32,
    pub min_converged_passes: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SweepSpec {
    pub name: String,
    pub start_ghz: f64,
    pub stop_ghz: f64,
    pub point_count: usize,
    pub kind: SweepKind,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SweepKind {
    #[default]
    Interpolating,
    Discrete,
    Fast,
}

/// One iteration of the solver's mesh refinement loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdaptivePass {
    pub pass: u32,
    pub max_passes: u32,
    /// Maximum S-parameter change against the previous pass. `None` on the
    /// first pass.
    pub delta_s: Option<f64>,
    pub converged: bool,
}

/// Reflection coefficient versus frequency, ready for a line plot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SweepTrace {
    pub frequency_ghz: Vec<f64>,
    pub s11_db: Vec<f64>,
}

impl SweepTrace {
    pub fn len(&self) -> usize {
        self.frequency_ghz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequency_ghz.is_empty()
    }

    pub fn min_s11_db(&self) -> Option<f64> {
        self.s11_db.iter().copied().min_by(f64::total_cmp)
    }
}

/// Far-field gain data exactly as the result store hands it out: textual
/// angle axes and a sparse sample table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FarFieldTable {
    pub theta_labels: Vec<String>,
    pub phi_labels: Vec<String>,
    pub samples: Vec<FarFieldSample>,
}
