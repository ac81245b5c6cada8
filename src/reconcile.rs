//! Keeps the OS default devices pinned to the user's choice.
//!
//! Runs on its own thread with its own [`EndpointSession`], checking on a fixed interval. Every
//! tick is independent: a failed correction is reported and simply tried again next tick.

use std::{
    sync::{
        mpsc::{self, RecvTimeoutError, Sender},
        Arc, RwLock,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use takeable::Takeable;
use tracing::*;

use crate::{
    endpoints::{controller::set_default, directory::current_default_id, session::EndpointSession},
    errors::{AppResult, AutoSoundError},
    platform::{AudioPlatform, Direction},
};

/// The user's pin, as a snapshot. Empty IDs mean "not pinned".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinnedSelection {
    pub output_device_id: String,
    pub input_device_id: String,
    pub auto_switch: bool,
}

impl PinnedSelection {
    pub fn pinned(&self, direction: Direction) -> &str {
        match direction {
            Direction::Render => &self.output_device_id,
            Direction::Capture => &self.input_device_id,
        }
    }
    pub fn pinned_mut(&mut self, direction: Direction) -> &mut String {
        match direction {
            Direction::Render => &mut self.output_device_id,
            Direction::Capture => &mut self.input_device_id,
        }
    }
}

/// Where the loop gets the current pin from, once per tick.
pub trait PinSource: Send + 'static {
    fn snapshot(&self) -> PinnedSelection;
}

/// Pin shared between the interactive side (the only writer) and the loop.
pub type SharedPins = Arc<RwLock<PinnedSelection>>;

impl PinSource for SharedPins {
    fn snapshot(&self) -> PinnedSelection {
        // A writer can only panic between whole-value assignments, the value is still coherent
        self.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[derive(Debug)]
pub enum ReconcileEvent {
    /// The default had drifted and was put back.
    Corrected {
        direction: Direction,
        endpoint_id: String,
    },
    /// The default had drifted and couldn't be put back this tick.
    CorrectionFailed {
        direction: Direction,
        endpoint_id: String,
        error: AutoSoundError,
    },
}

/// One pass over both directions. Returns what it changed or failed to change.
pub fn reconcile_tick<P: AudioPlatform>(
    session: &EndpointSession<P>,
    pins: &PinnedSelection,
) -> AppResult<Vec<ReconcileEvent>> {
    let mut events = Vec::new();
    if !pins.auto_switch {
        return Ok(events);
    }

    for direction in Direction::ALL {
        let pinned = pins.pinned(direction);
        if pinned.is_empty() {
            continue;
        }
        let current = current_default_id(session, direction)?;
        if current == pinned {
            continue;
        }

        info!("{direction} device changed externally ({current:?}), restoring {pinned}");
        let endpoint_id = pinned.to_owned();
        match set_default(session, pinned) {
            Ok(()) => events.push(ReconcileEvent::Corrected {
                direction,
                endpoint_id,
            }),
            Err(error @ AutoSoundError::InvalidSession) => return Err(error),
            Err(error) => events.push(ReconcileEvent::CorrectionFailed {
                direction,
                endpoint_id,
                error,
            }),
        }
    }

    Ok(events)
}

/// Handle to the background reconciliation thread. Dropping it stops the loop.
pub struct Reconciler {
    stop_tx: Sender<()>,
    handle: Takeable<JoinHandle<()>>,
}

impl Reconciler {
    /// Starts the loop on a new thread, returning once its session is open.
    ///
    /// `report` is called on the loop's thread for every correction and failed correction.
    pub fn spawn<P, S, R>(platform: P, pins: S, interval: Duration, mut report: R) -> AppResult<Self>
    where
        P: AudioPlatform + Send + 'static,
        S: PinSource,
        R: FnMut(ReconcileEvent) + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::channel::<AppResult<()>>();

        let handle = thread::Builder::new()
            .name(String::from("reconciler"))
            .spawn(move || {
                // Opened and closed on this thread only
                let mut session = match EndpointSession::opened(platform) {
                    Ok(session) => session,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                debug!("Reconciler started, checking every {interval:?}");

                loop {
                    match stop_rx.recv_timeout(interval) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => (),
                    }
                    let pins = pins.snapshot();
                    match reconcile_tick(&session, &pins) {
                        Ok(events) => events.into_iter().for_each(&mut report),
                        Err(e) => {
                            error!("Reconciler session unusable, stopping: {e}");
                            break;
                        }
                    }
                }

                if let Err(e) = session.close() {
                    warn!("Reconciler session already closed: {e}");
                }
                debug!("Reconciler stopped");
            })?;

        ready_rx
            .recv()
            .map_err(|_| AutoSoundError::ReconcilerGone)??;

        Ok(Self {
            stop_tx,
            handle: Takeable::new(handle),
        })
    }
    /// Signals the loop and waits for it to close its session.
    pub fn stop(mut self) {
        self.shutdown();
    }
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
    fn shutdown(&mut self) {
        // Fails if the loop already quit by itself, fine either way
        let _ = self.stop_tx.send(());
        if self.handle.is_usable() && self.handle.take().join().is_err() {
            error!("Reconciler thread panicked");
        }
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
