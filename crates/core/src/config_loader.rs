use crate::config::CalibrationConfig;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Builds the layered figment: defaults, then each TOML file in order,
    /// then `EDGECAL_` environment variables (`__` separates nested keys).
    fn figment(files: &[&Path]) -> Figment {
        files
            .iter()
            .fold(
                Figment::from(Serialized::defaults(CalibrationConfig::default())),
                |figment, file| figment.merge(Toml::file(file)),
            )
            .merge(Env::prefixed("EDGECAL_").split("__"))
    }

    fn extract(files: &[&Path], context: impl FnOnce() -> String) -> Result<CalibrationConfig> {
        let config: CalibrationConfig = Self::figment(files).extract().with_context(context)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates run configuration.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or the result fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<CalibrationConfig> {
        let path = path.as_ref();
        Self::extract(&[path], || format!("failed to load config from {}", path.display()))
    }

    /// Loads configuration with a profile overlay (`Calibration.<profile>.toml`
    /// next to the base file). The overlay sits between the base file and the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be parsed or validation fails.
    pub fn load_with_profile(path: impl AsRef<Path>, profile: &str) -> Result<CalibrationConfig> {
        let path = path.as_ref();
        let overlay = Self::profile_path(path, profile);
        Self::extract(&[path, overlay.as_path()], || {
            format!("failed to load profile '{profile}' from {}", overlay.display())
        })
    }

    fn profile_path(path: &Path, profile: &str) -> PathBuf {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Calibration");
        path.with_file_name(format!("{stem}.{profile}.toml"))
    }
}
