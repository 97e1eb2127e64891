use awb_engine::{
    AntennaKind,
    EngineSettings,
    SolutionType,
};
use serde::{
    Deserialize,
    Serialize,
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub plot: PlotConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_project_name")]
    pub project_name: String,

    #[serde(default = "default_design_name")]
    pub design_name: String,

    #[serde(default)]
    pub solution_type: SolutionType,

    #[serde(default)]
    pub antenna: AntennaKind,

    #[serde(default = "default_frequency_ghz")]
    pub frequency_ghz: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            design_name: default_design_name(),
            solution_type: Default::default(),
            antenna: Default::default(),
            frequency_ghz: default_frequency_ghz(),
        }
    }
}

fn default_project_name() -> String {
    "AntennaWorkbench".to_owned()
}

fn default_design_name() -> String {
    "Antenna".to_owned()
}

fn default_frequency_ghz() -> f64 {
    1.0
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Lower bound of the S11 plot's dB axis.
    #[serde(default = "default_s11_floor_db")]
    pub s11_floor_db: f64,

    /// Name of a colorgrad preset for the gain surface.
    #[serde(default = "default_gradient")]
    pub gradient: String,

    /// Vertical field of view of the pattern view, in degrees.
    #[serde(default = "default_fovy")]
    pub fovy: f32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            s11_floor_db: default_s11_floor_db(),
            gradient: default_gradient(),
            fovy: default_fovy(),
        }
    }
}

fn default_s11_floor_db() -> f64 {
    -40.0
}

fn default_gradient() -> String {
    "viridis".to_owned()
}

fn default_fovy() -> f32 {
    45.0
}
