//! Shared test helpers for relay and route test modules.
//!
//! Provides a scripted in-process [`GenerationBackend`] that counts how often
//! it was opened and how often its upstream stream was released.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use genrelay_core::{Error, GenerationRequest, RawFragment, RelayEvent, Result, TransportErrorKind};

use crate::upstream::{GenerationBackend, UpstreamConnection};

/// One scripted upstream action.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Delta(&'static str),
    Done(&'static str),
    Fail(TransportErrorKind, &'static str),
    Protocol(&'static str),
    /// Never yield again.
    Hang,
}

/// Backend that replays a fixed script on every `open`.
pub struct ScriptedBackend {
    script: Vec<Step>,
    open_error: Option<(TransportErrorKind, &'static str)>,
    open_hangs: bool,
    opens: AtomicUsize,
    releases: Arc<AtomicUsize>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script,
            open_error: None,
            open_hangs: false,
            opens: AtomicUsize::new(0),
            releases: Arc::new(AtomicUsize::new(0)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every `open` fails with the given transport error.
    pub fn failing_open(kind: TransportErrorKind, message: &'static str) -> Self {
        Self {
            open_error: Some((kind, message)),
            ..Self::new(Vec::new())
        }
    }

    /// Every `open` waits forever.
    pub fn hanging_open() -> Self {
        Self {
            open_hangs: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Counts one release when the upstream stream is dropped.
struct ReleaseGuard(Arc<AtomicUsize>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn open(&self, request: &GenerationRequest) -> Result<UpstreamConnection> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if self.open_hangs {
            std::future::pending::<()>().await;
        }
        if let Some((kind, message)) = self.open_error {
            return Err(Error::transport(kind, message));
        }

        let script = self.script.clone();
        let guard = ReleaseGuard(Arc::clone(&self.releases));
        Ok(UpstreamConnection::spawn(async_stream::stream! {
            let _guard = guard;
            for step in script {
                match step {
                    Step::Delta(text) => yield Ok(RawFragment::delta(text)),
                    Step::Done(text) => yield Ok(RawFragment::complete(text)),
                    Step::Fail(kind, message) => yield Err(Error::transport(kind, message)),
                    Step::Protocol(message) => yield Err(Error::UpstreamProtocol(message.into())),
                    Step::Hang => std::future::pending::<()>().await,
                }
            }
        }))
    }
}

/// Read every event until the session closes the sink.
pub async fn drain(mut rx: mpsc::Receiver<RelayEvent>) -> Vec<RelayEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

/// Wait until `backend` has released `n` upstream streams.
pub async fn wait_for_releases(backend: &ScriptedBackend, n: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while backend.releases() < n {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("expected {n} releases, saw {}", backend.releases()));
}
