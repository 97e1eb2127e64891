use std::path::{
    Path,
    PathBuf,
};

use color_eyre::eyre::{
    Context,
    Error,
    OptionExt,
};
use directories::ProjectDirs;
use serde::{
    Serialize,
    de::DeserializeOwned,
};

/// The app's on-disk locations, resolved once at startup.
#[derive(Clone, Debug)]
pub struct AppFiles {
    config_path: PathBuf,
    /// egui UI state; the platform state dir, or local data where the
    /// platform defines none.
    state_dir: PathBuf,
    projects_dir: PathBuf,
}

impl AppFiles {
    /// Resolves the platform directories and creates them.
    pub fn open() -> Result<Self, Error> {
        let project_dirs = ProjectDirs::from("", "", std::env!("CARGO_PKG_NAME"))
            .ok_or_eyre("could not determine platform directories")?;

        let config_dir = project_dirs.config_local_dir();
        let state_dir = project_dirs
            .state_dir()
            .unwrap_or_else(|| project_dirs.data_local_dir())
            .to_owned();
        let projects_dir = project_dirs.data_local_dir().join("projects");

        std::fs::create_dir_all(config_dir)?;
        std::fs::create_dir_all(&state_dir)?;
        std::fs::create_dir_all(&projects_dir)?;

        Ok(Self {
            config_path: config_dir.join("config.toml"),
            state_dir,
            projects_dir,
        })
    }

    /// Where saved solver projects go.
    pub fn projects_dir(&self) -> &Path {
        &self.projects_dir
    }

    /// Returns path to file for egui's persistence.
    pub fn egui_persist_path(&self) -> PathBuf {
        self.state_dir.join("ui_state")
    }

    /// Read config file, or create one if it doesn't exist yet.
    pub fn read_config_or_create<T>(&self) -> Result<T, Error>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let path = &self.config_path;

        let config = if !path.exists() {
            tracing::info!(path = %path.display(), "Creating config file");
            let config = T::default();
            let toml = toml::to_string_pretty(&config)?;
            std::fs::write(path, &toml)
                .with_context(|| format!("Could not write config file: {}", path.display()))?;
            config
        }
        else {
            tracing::info!(path = %path.display(), "Reading config file");
            let toml = std::fs::read_to_string(path)
                .with_context(|| format!("Could not read config file: {}", path.display()))?;

            toml::from_str(&toml)
                .with_context(|| format!("Invalid config file: {}", path.display()))?
        };

        Ok(config)
    }
}
