use std::marker::PhantomData;

use tracing::*;

use crate::{
    errors::{AppResult, AutoSoundError},
    platform::{AudioPlatform, RuntimeInit},
};

enum SessionState<E> {
    Unopened,
    Open(E),
    Closed,
}

/// The audio runtime and root enumerator for the current thread.
///
/// `!Send` on purpose: the runtime is apartment-affine, so a session has to be opened, used, and
/// closed by the same thread. Anything that needs one on another thread opens its own there.
pub struct EndpointSession<P: AudioPlatform> {
    platform: P,
    state: SessionState<P::Enumerator>,
    _thread_bound: PhantomData<*const ()>,
}

impl<P: AudioPlatform> EndpointSession<P> {
    /// An unopened session, every operation on it fails with `InvalidSession` until [`Self::open`].
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            state: SessionState::Unopened,
            _thread_bound: PhantomData,
        }
    }
    /// Shorthand for [`Self::new`] followed by [`Self::open`].
    pub fn opened(platform: P) -> AppResult<Self> {
        let mut session = Self::new(platform);
        session.open()?;
        Ok(session)
    }
    /// Brings up the runtime for this thread and creates the root enumerator.
    ///
    /// A session can only be opened once; reopening a closed one is an `InvalidSession`.
    pub fn open(&mut self) -> AppResult<()> {
        if !matches!(self.state, SessionState::Unopened) {
            return Err(AutoSoundError::InvalidSession);
        }

        let init = self
            .platform
            .initialize()
            .map_err(AutoSoundError::SessionInit)?;
        if init == RuntimeInit::AlreadyInitialized {
            debug!("Audio runtime was already initialized on this thread");
        }

        match self.platform.create_enumerator() {
            Ok(enumerator) => {
                self.state = SessionState::Open(enumerator);
                Ok(())
            }
            Err(source) => {
                // Keep the thread's init count balanced, we're not going to close this
                self.platform.uninitialize();
                Err(AutoSoundError::ObjectCreation {
                    object: "device enumerator",
                    source,
                })
            }
        }
    }
    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open(_))
    }
    /// Releases the enumerator, then the runtime. Must be the last thing done with the session.
    pub fn close(&mut self) -> AppResult<()> {
        if !self.is_open() {
            return Err(AutoSoundError::InvalidSession);
        }
        self.release();
        Ok(())
    }
    pub(crate) fn enumerator(&self) -> AppResult<&P::Enumerator> {
        match &self.state {
            SessionState::Open(enumerator) => Ok(enumerator),
            SessionState::Unopened | SessionState::Closed => Err(AutoSoundError::InvalidSession),
        }
    }
    /// The platform, but only while the session (and so the runtime) is up.
    pub(crate) fn platform(&self) -> AppResult<&P> {
        self.enumerator()?;
        Ok(&self.platform)
    }
    fn release(&mut self) {
        // The enumerator needs to get dropped first, otherwise the uninit call will run while it's
        // still in memory and cause an ACCESS_VIOLATION when it does get dropped
        let state = std::mem::replace(&mut self.state, SessionState::Closed);
        if let SessionState::Open(enumerator) = state {
            drop(enumerator);
            self.platform.uninitialize();
        }
    }
}

impl<P: AudioPlatform> Drop for EndpointSession<P> {
    fn drop(&mut self) {
        self.release();
    }
}
