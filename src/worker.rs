use std::{
    sync::mpsc::{self, Receiver, Sender},
    thread::{self, JoinHandle},
};

use takeable::Takeable;
use tracing::*;

use crate::{
    endpoints::{
        controller::set_default,
        directory::{current_default_id, list_endpoints},
        session::EndpointSession,
        Endpoint,
    },
    errors::{AppResult, AutoSoundError},
    platform::{AudioPlatform, Direction},
};

enum Request {
    List {
        direction: Direction,
        reply: Sender<AppResult<Vec<Endpoint>>>,
    },
    CurrentDefault {
        direction: Direction,
        reply: Sender<AppResult<String>>,
    },
    SetDefault {
        endpoint_id: String,
        reply: Sender<AppResult<()>>,
    },
}

/// Thread owning the session used for interactive requests (listing, committing a selection).
///
/// Calls block until the worker answers. Dropping the handle closes the session on the worker's
/// thread and joins it.
pub struct EndpointWorker {
    request_tx: Takeable<Sender<Request>>,
    handle: Takeable<JoinHandle<()>>,
}

impl EndpointWorker {
    /// Starts the worker and waits for its session to open.
    pub fn spawn<P>(platform: P) -> AppResult<Self>
    where
        P: AudioPlatform + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel::<AppResult<()>>();

        let handle = thread::Builder::new()
            .name(String::from("endpoint-worker"))
            .spawn(move || {
                let session = match EndpointSession::opened(platform) {
                    Ok(session) => session,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                serve(session, request_rx);
            })?;

        ready_rx.recv().map_err(|_| AutoSoundError::WorkerGone)??;

        Ok(Self {
            request_tx: Takeable::new(request_tx),
            handle: Takeable::new(handle),
        })
    }
    pub fn list_endpoints(&self, direction: Direction) -> AppResult<Vec<Endpoint>> {
        self.request(|reply| Request::List { direction, reply })?
    }
    pub fn current_default_id(&self, direction: Direction) -> AppResult<String> {
        self.request(|reply| Request::CurrentDefault { direction, reply })?
    }
    pub fn set_default(&self, endpoint_id: &str) -> AppResult<()> {
        let endpoint_id = endpoint_id.to_owned();
        self.request(|reply| Request::SetDefault { endpoint_id, reply })?
    }
    fn request<T>(&self, build: impl FnOnce(Sender<T>) -> Request) -> AppResult<T> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.request_tx
            .send(build(reply_tx))
            .map_err(|_| AutoSoundError::WorkerGone)?;
        reply_rx.recv().map_err(|_| AutoSoundError::WorkerGone)
    }
}

impl Drop for EndpointWorker {
    fn drop(&mut self) {
        // Hanging up is the shutdown signal
        drop(self.request_tx.take());
        if self.handle.take().join().is_err() {
            error!("Endpoint worker panicked");
        }
    }
}

fn serve<P: AudioPlatform>(mut session: EndpointSession<P>, requests: Receiver<Request>) {
    debug!("Endpoint worker ready");
    for request in requests {
        // A dropped reply receiver just means the caller stopped waiting
        match request {
            Request::List { direction, reply } => {
                let _ = reply.send(list_endpoints(&session, direction));
            }
            Request::CurrentDefault { direction, reply } => {
                let _ = reply.send(current_default_id(&session, direction));
            }
            Request::SetDefault { endpoint_id, reply } => {
                let _ = reply.send(set_default(&session, &endpoint_id));
            }
        }
    }
    if let Err(e) = session.close() {
        warn!("Endpoint worker session already closed: {e}");
    }
    debug!("Endpoint worker stopped");
}

#[cfg(test)]
mod tests {
    use crate::platform::{
        fake::{FakeCall, FakeEndpoint, FakePlatform},
        Direction::*,
        Role,
    };

    use super::*;

    fn platform() -> FakePlatform {
        FakePlatform::with_endpoints(vec![
            FakeEndpoint::active("{speakers}", "Speakers", Render),
            FakeEndpoint::active("{headset}", "Headset", Render),
            FakeEndpoint::active("{mic}", "Microphone", Capture),
        ])
    }

    #[test]
    fn requests_are_served_on_the_worker_session() {
        let fake = platform();
        fake.force_default(Render, "{speakers}");
        let worker = EndpointWorker::spawn(fake.clone()).unwrap();

        let outputs = worker.list_endpoints(Render).unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(worker.current_default_id(Render).unwrap(), "{speakers}");

        worker.set_default("{headset}").unwrap();
        assert_eq!(worker.current_default_id(Render).unwrap(), "{headset}");
        assert_eq!(
            fake.default_for(Render, Role::Communications).as_deref(),
            Some("{headset}")
        );
    }

    #[test]
    fn errors_come_back_to_the_caller() {
        let fake = platform();
        fake.audio().failing_role = Some(Role::Communications);
        let worker = EndpointWorker::spawn(fake.clone()).unwrap();

        let err = worker.set_default("{mic}").unwrap_err();
        assert!(matches!(
            err,
            AutoSoundError::DefaultAssignment {
                role: Role::Communications,
                ..
            }
        ));
    }

    #[test]
    fn dropping_closes_the_session() {
        let fake = platform();
        let worker = EndpointWorker::spawn(fake.clone()).unwrap();
        worker.list_endpoints(Capture).unwrap();
        drop(worker);

        assert_eq!(fake.count(&FakeCall::Initialize), 1);
        assert_eq!(fake.count(&FakeCall::Uninitialize), 1);
        assert_eq!(fake.audio().live_objects(), 0);
    }

    #[test]
    fn session_failure_is_returned_from_spawn() {
        let fake = platform();
        fake.audio().init_fails = true;

        let err = EndpointWorker::spawn(fake).err().unwrap();
        assert!(matches!(err, AutoSoundError::SessionInit(_)));
    }

    #[test]
    fn worker_and_reconciler_sessions_are_separate() {
        use std::{
            sync::{Arc, RwLock},
            time::Duration,
        };

        use crate::reconcile::{PinnedSelection, Reconciler, SharedPins};

        let fake = platform();
        let worker = EndpointWorker::spawn(fake.clone()).unwrap();
        let pins: SharedPins = Arc::new(RwLock::new(PinnedSelection::default()));
        let reconciler =
            Reconciler::spawn(fake.clone(), pins, Duration::from_secs(3600), |_| ()).unwrap();

        assert_eq!(fake.count(&FakeCall::Initialize), 2);
        assert_eq!(fake.count(&FakeCall::CreateEnumerator), 2);

        reconciler.stop();
        // Worker's session is untouched by the reconciler going away
        assert_eq!(worker.list_endpoints(Render).unwrap().len(), 2);
        drop(worker);
        assert_eq!(fake.count(&FakeCall::Uninitialize), 2);
    }
}
