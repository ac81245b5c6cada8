use std::{
    path::PathBuf,
    sync::{
        mpsc::{Receiver, RecvTimeoutError, Sender},
        Arc, PoisonError, RwLock,
    },
    time::{Duration, Instant, SystemTime},
};

use tracing::*;

use crate::{
    autostart::Autostart,
    errors::{AppResult, AutoSoundError},
    platform::{AudioPlatform, Direction},
    reconcile::{ReconcileEvent, Reconciler, SharedPins},
    selection::{DeviceListing, SelectionState},
    settings::Settings,
    worker::EndpointWorker,
};

/// How often `run` looks for edits to the settings file.
const SETTINGS_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub enum AppEvent {
    ReconcilerReport(ReconcileEvent),
    ExitRequested,
}

pub struct App<P: AudioPlatform> {
    platform: P,
    pub settings: Settings,
    pub config_path: PathBuf,
    selection: SelectionState,
    /// What the reconciler enforces, only ever written from here
    pins: SharedPins,
    worker: EndpointWorker,
    config_modified: Option<SystemTime>,
}

impl<P> App<P>
where
    P: AudioPlatform + Clone + Send + 'static,
{
    pub fn build(platform: P, config_path: PathBuf) -> AppResult<Self> {
        let settings = Settings::load(&config_path)?;
        let config_modified = modified_time(&config_path);

        let committed = settings.pinned();
        let pins = Arc::new(RwLock::new(committed.clone()));
        let selection = SelectionState::new(committed);

        let worker = EndpointWorker::spawn(platform.clone())?;

        Ok(Self {
            platform,
            settings,
            config_path,
            selection,
            pins,
            worker,
            config_modified,
        })
    }
    pub fn device_listing(&self, direction: Direction) -> AppResult<Vec<DeviceListing>> {
        let endpoints = self.worker.list_endpoints(direction)?;
        Ok(self.selection.listing(endpoints))
    }
    pub fn current_default_id(&self, direction: Direction) -> AppResult<String> {
        self.worker.current_default_id(direction)
    }
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }
    pub fn select(&mut self, direction: Direction, endpoint_id: &str) {
        self.selection.select(direction, endpoint_id);
    }
    pub fn has_unsaved_changes(&self) -> bool {
        self.selection.has_unsaved_changes()
    }
    pub fn reset_changes(&mut self) {
        self.selection.reset();
    }
    /// Applies each pending choice (output first) and pins the ones that took.
    ///
    /// Stops at the first failure. Whatever was applied before it is still pinned and saved.
    pub fn commit(&mut self) -> AppResult<()> {
        let applied = self.apply_pending();
        self.publish_pins();
        if let Err(save_error) = self.save() {
            if let Err(apply_error) = &applied {
                error!("Selection was only partially applied: {apply_error}");
            }
            return Err(save_error);
        }
        applied
    }
    fn apply_pending(&mut self) -> AppResult<()> {
        for direction in Direction::ALL {
            let Some(endpoint_id) = self.selection.pending_change(direction) else {
                continue;
            };
            let endpoint_id = endpoint_id.to_owned();
            info!("Setting {direction} device -> {endpoint_id}");
            self.worker.set_default(&endpoint_id)?;
            self.selection.mark_committed(direction);
        }
        Ok(())
    }
    /// Stops enforcing a device for `direction`. Leaves the current default alone.
    pub fn unpin(&mut self, direction: Direction) -> AppResult<()> {
        info!("Unpinning {direction} device");
        self.selection.unpin(direction);
        self.publish_pins();
        self.save()
    }
    pub fn set_auto_switch(&mut self, enabled: bool) -> AppResult<()> {
        info!("Auto switch: {enabled}");
        self.selection.set_auto_switch(enabled);
        self.publish_pins();
        self.save()
    }
    /// True if autostart is off and we've never brought it up before.
    pub fn should_prompt_autostart(&self, autostart: &Autostart) -> AppResult<bool> {
        Ok(!self.settings.misc.autostart_asked && !autostart.is_enabled()?)
    }
    pub fn mark_autostart_asked(&mut self) -> AppResult<()> {
        self.settings.misc.autostart_asked = true;
        self.save()
    }
    /// Picks up edits made to the settings file by someone else (another `autosound` invocation).
    ///
    /// Returns whether anything was reloaded.
    pub fn reload_settings_if_changed(&mut self) -> AppResult<bool> {
        let modified = modified_time(&self.config_path);
        if modified == self.config_modified {
            return Ok(false);
        }
        debug!("Settings file changed, reloading");
        // A file that doesn't parse is reported once per edit, not once per poll
        self.config_modified = modified;
        let settings = Settings::load(&self.config_path)?;
        self.config_modified = modified_time(&self.config_path);
        self.selection.replace_committed(settings.pinned());
        self.settings = settings;
        self.publish_pins();
        Ok(true)
    }
    /// Enforces the pins until an [`AppEvent::ExitRequested`] arrives.
    ///
    /// `events_tx` must feed `events`; the reconciler reports through it.
    pub fn run(&mut self, events_tx: Sender<AppEvent>, events: Receiver<AppEvent>) -> AppResult<()> {
        let mut interval = self.settings.check_interval();
        let mut reconciler = self.spawn_reconciler(interval, events_tx.clone())?;
        info!(
            "Enforcing pins (output: {:?}, input: {:?}, auto switch: {})",
            self.settings.devices.output_device_id,
            self.settings.devices.input_device_id,
            self.settings.devices.auto_switch
        );

        // Fixed deadline, reports arriving faster than this must not push the poll back
        let mut next_poll = Instant::now() + SETTINGS_POLL_INTERVAL;
        loop {
            match events.recv_timeout(next_poll.saturating_duration_since(Instant::now())) {
                Ok(AppEvent::ExitRequested) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(AppEvent::ReconcilerReport(report)) => handle_reconciler_report(report),
                Err(RecvTimeoutError::Timeout) => (),
            }
            if Instant::now() >= next_poll {
                next_poll = Instant::now() + SETTINGS_POLL_INTERVAL;
                match self.reload_settings_if_changed() {
                    Ok(true) if self.settings.check_interval() != interval => {
                        interval = self.settings.check_interval();
                        info!("Check interval changed to {interval:?}, restarting reconciler");
                        reconciler.stop();
                        reconciler = self.spawn_reconciler(interval, events_tx.clone())?;
                    }
                    Ok(_) => (),
                    // Keep enforcing the last good settings
                    Err(e) => warn!("Failed to reload settings: {e}"),
                }
            }
            if !reconciler.is_running() {
                return Err(AutoSoundError::ReconcilerGone);
            }
        }

        reconciler.stop();
        Ok(())
    }
    fn spawn_reconciler(
        &self,
        interval: Duration,
        events_tx: Sender<AppEvent>,
    ) -> AppResult<Reconciler> {
        Reconciler::spawn(
            self.platform.clone(),
            Arc::clone(&self.pins),
            interval,
            move |report| {
                // If fails, app is shutting down
                let _ = events_tx.send(AppEvent::ReconcilerReport(report));
            },
        )
    }
    fn publish_pins(&self) {
        let committed = self.selection.committed().clone();
        *self.pins.write().unwrap_or_else(PoisonError::into_inner) = committed;
    }
    fn save(&mut self) -> AppResult<()> {
        self.settings.set_pinned(self.selection.committed());
        self.settings.save(&self.config_path)?;
        self.config_modified = modified_time(&self.config_path);
        Ok(())
    }
}

fn handle_reconciler_report(report: ReconcileEvent) {
    match report {
        ReconcileEvent::Corrected {
            direction,
            endpoint_id,
        } => info!("Restored pinned {direction} device {endpoint_id}"),
        ReconcileEvent::CorrectionFailed {
            direction,
            endpoint_id,
            error,
        } => warn!("Couldn't restore pinned {direction} device {endpoint_id}, will retry: {error}"),
    }
}

fn modified_time(path: &std::path::Path) -> Option<SystemTime> {
    fs_err::metadata(path).and_then(|m| m.modified()).ok()
}
