use serde::{
    Deserialize,
    Serialize,
};

/// How to reach the engine: which installed version, and whether to launch
/// locally or attach to a remote automation endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_version")]
    pub version: String,

    /// Run the vendor application without its own UI.
    #[serde(default)]
    pub non_graphical: bool,

    #[serde(default = "default_to_true")]
    pub student_version: bool,

    /// Attach to a running remote session instead of launching locally.
    #[serde(default)]
    pub endpoint: Option<Endpoint>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            version: default_version(),
            non_graphical: false,
            student_version: true,
            endpoint: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub address: String,
    pub port: u16,
}

fn default_version() -> String {
    "2024.2".to_owned()
}

fn default_to_true() -> bool {
    true
}
