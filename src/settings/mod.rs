use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use derivative::Derivative;
use directories::ProjectDirs;
use fs_err::{self as fs};
use serde::{Deserialize, Serialize};
use serde_inline_default::serde_inline_default;
use tracing::level_filters::LevelFilter;
use tracing::*;

use crate::errors::{AppResult, AutoSoundError};
use crate::reconcile::PinnedSelection;

pub const CONFIG_FILE_NAME: &str = "autosound.toml";

// Same double-default dance as everywhere else:
// - #[serde_inline_default] for when a _field_ is missing,
//   - Since #[serde(default)] gets the default for the field's _type_, and *not* the parent struct's `Default::default()` value for it
// - #[derivative(Default)] for properly setting up `Default::default()` for when a _struct_ is missing.

#[serde_inline_default]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
pub struct DeviceSettings {
    /// Pinned output device ID, empty for none
    #[serde(default)]
    pub output_device_id: String,
    /// Pinned input device ID, empty for none
    #[serde(default)]
    pub input_device_id: String,
    /// Auto Switch
    ///
    /// When true, any external change to the default devices gets reverted back to the pinned ones.
    #[serde_inline_default(true)]
    #[derivative(Default(value = "true"))]
    pub auto_switch: bool,
    /// How often to check the current defaults against the pinned ones, in milliseconds.
    #[serde_inline_default(2000)]
    #[derivative(Default(value = "2000"))]
    pub check_interval_ms: u64,
}

#[serde_inline_default]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Derivative)]
#[derivative(Default)]
pub struct MiscSettings {
    #[serde_inline_default(String::from("info"))]
    #[derivative(Default(value = "String::from(\"info\")"))]
    pub log_level: String,
    /// Whether the user has been told about autostart once already
    #[serde(default)]
    pub autostart_asked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub devices: DeviceSettings,
    #[serde(default)]
    pub misc: MiscSettings,
}

impl Settings {
    /// Loads from `path`, writing out the defaults first if the file doesn't exist.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            let default = Settings::default();
            default.save(path)?;
            return Ok(default);
        }
        let mut file = fs::File::open(path)?;
        let mut buffer = String::new();
        file.read_to_string(&mut buffer)?;
        drop(file);
        let config: Settings = toml::from_str(&buffer)?;
        Ok(config)
    }
    /// Atomically replaces the file at `config_path`.
    pub fn save(&self, config_path: &Path) -> AppResult<()> {
        let toml_config = toml::to_string(self)?;
        debug!("Serialized config length: {}", toml_config.len());
        let dir = match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_owned(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let mut file = tempfile::NamedTempFile::new_in(&dir)?;
        file.write_all(toml_config.as_bytes())?;
        file.flush()?;
        file.as_file().sync_all()?;
        file.persist(config_path)?;
        Ok(())
    }
    pub fn get_log_level(&self) -> LevelFilter {
        LevelFilter::from_str(&self.misc.log_level).unwrap_or(LevelFilter::INFO)
    }
    pub fn check_interval(&self) -> Duration {
        // Zero would spin the reconciler
        Duration::from_millis(self.devices.check_interval_ms.max(100))
    }
    pub fn pinned(&self) -> PinnedSelection {
        PinnedSelection {
            output_device_id: self.devices.output_device_id.clone(),
            input_device_id: self.devices.input_device_id.clone(),
            auto_switch: self.devices.auto_switch,
        }
    }
    pub fn set_pinned(&mut self, pinned: &PinnedSelection) {
        self.devices.output_device_id.clone_from(&pinned.output_device_id);
        self.devices.input_device_id.clone_from(&pinned.input_device_id);
        self.devices.auto_switch = pinned.auto_switch;
    }
}

/// Directory holding the config file (and logs).
///
/// Next to the executable with the `portable` feature, otherwise the user's config dir.
pub fn app_dir() -> AppResult<PathBuf> {
    if cfg!(feature = "portable") {
        let exe_path = std::env::current_exe()?;
        return exe_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or(AutoSoundError::ConfigDir);
    }
    ProjectDirs::from("", "", "AutoSound")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(AutoSoundError::ConfigDir)
}

pub fn default_config_path() -> AppResult<PathBuf> {
    Ok(app_dir()?.join(CONFIG_FILE_NAME))
}
