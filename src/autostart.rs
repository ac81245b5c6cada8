use auto_launch::{AutoLaunch, AutoLaunchBuilder};

use crate::errors::{AppResult, AutoSoundError};

pub const APP_NAME: &str = "AutoSound";

/// Launch-at-login entry for this executable (`HKCU\...\Run` on Windows), starting it in `run` mode.
pub struct Autostart {
    inner: AutoLaunch,
}

impl Autostart {
    pub fn for_current_exe() -> AppResult<Self> {
        let exe_path = std::env::current_exe()?;
        let exe_path = exe_path.to_str().ok_or(AutoSoundError::ExePath)?;
        let inner = AutoLaunchBuilder::new()
            .set_app_name(APP_NAME)
            .set_app_path(exe_path)
            .set_args(&["run"])
            .build()?;
        Ok(Self { inner })
    }
    pub fn is_enabled(&self) -> AppResult<bool> {
        Ok(self.inner.is_enabled()?)
    }
    pub fn set_enabled(&self, enabled: bool) -> AppResult<()> {
        // Disabling something that isn't there errors on some platforms
        match (enabled, self.is_enabled()?) {
            (true, false) => self.inner.enable()?,
            (false, true) => self.inner.disable()?,
            _ => (),
        }
        Ok(())
    }
}
