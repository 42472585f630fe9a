// Scriptable radio for controller tests
// Records every call and keeps the handles the controller passed in

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::io::duplex;

use super::channel::{DataChannel, LinkRole};
use super::listener::{DiscoverySink, LinkListener};
use super::peer::Peer;
use super::{DiscoverableOutcome, EnableOutcome, RadioAdapter, RadioError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    RequestEnable,
    RequestDiscoverable(Duration),
    StartDiscovery,
    CancelDiscovery,
    RegisterDiscovery,
    UnregisterDiscovery,
    Connect(Peer),
    RunServer,
    StopServer,
}

pub struct MockRadio {
    enabled: AtomicBool,
    fail_discovery: AtomicBool,
    enable_outcome: Mutex<EnableOutcome>,
    discoverable_outcome: Mutex<DiscoverableOutcome>,
    calls: Mutex<Vec<Call>>,
    sink: Mutex<Option<DiscoverySink>>,
    client_listener: Mutex<Option<LinkListener>>,
    server_listener: Mutex<Option<LinkListener>>,
}

impl MockRadio {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            fail_discovery: AtomicBool::new(false),
            enable_outcome: Mutex::new(EnableOutcome::Approved),
            discoverable_outcome: Mutex::new(DiscoverableOutcome::Approved(Duration::from_secs(120))),
            calls: Mutex::new(Vec::new()),
            sink: Mutex::new(None),
            client_listener: Mutex::new(None),
            server_listener: Mutex::new(None),
        }
    }

    pub fn answer_enable(&self, outcome: EnableOutcome) {
        *self.enable_outcome.lock().unwrap() = outcome;
    }

    pub fn answer_discoverable(&self, outcome: DiscoverableOutcome) {
        *self.discoverable_outcome.lock().unwrap() = outcome;
    }

    pub fn fail_discovery(&self, fail: bool) {
        self.fail_discovery.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    /// Pretend the radio found `peer`; false if nobody is subscribed
    pub fn discover(&self, peer: Peer) -> bool {
        match self.sink.lock().unwrap().as_ref() {
            Some(sink) => sink.deliver(peer),
            None => false,
        }
    }

    /// Listener handed to the last `connect`
    pub fn client_listener(&self) -> LinkListener {
        self.client_listener
            .lock()
            .unwrap()
            .clone()
            .expect("connect was never called")
    }

    /// Listener handed to the last `run_server`
    pub fn server_listener(&self) -> LinkListener {
        self.server_listener
            .lock()
            .unwrap()
            .clone()
            .expect("run_server was never called")
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RadioAdapter for MockRadio {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn request_enable(&self) -> impl Future<Output = EnableOutcome> + Send {
        self.record(Call::RequestEnable);
        let outcome = *self.enable_outcome.lock().unwrap();
        if outcome == EnableOutcome::Approved {
            self.enabled.store(true, Ordering::SeqCst);
        }
        async move { outcome }
    }

    fn request_discoverable(
        &self,
        duration: Duration,
    ) -> impl Future<Output = DiscoverableOutcome> + Send {
        self.record(Call::RequestDiscoverable(duration));
        let outcome = *self.discoverable_outcome.lock().unwrap();
        async move { outcome }
    }

    fn start_discovery(&self) -> Result<(), RadioError> {
        self.record(Call::StartDiscovery);
        if self.fail_discovery.load(Ordering::SeqCst) {
            return Err(RadioError::Disabled);
        }
        Ok(())
    }

    fn cancel_discovery(&self) {
        self.record(Call::CancelDiscovery);
    }

    fn register_discovery(&self, sink: DiscoverySink) {
        self.record(Call::RegisterDiscovery);
        *self.sink.lock().unwrap() = Some(sink);
    }

    fn unregister_discovery(&self) {
        self.record(Call::UnregisterDiscovery);
        *self.sink.lock().unwrap() = None;
    }

    fn connect(&self, peer: &Peer, listener: LinkListener) {
        self.record(Call::Connect(peer.clone()));
        *self.client_listener.lock().unwrap() = Some(listener);
    }

    fn run_server(&self, listener: LinkListener) {
        self.record(Call::RunServer);
        *self.server_listener.lock().unwrap() = Some(listener);
    }

    fn stop_server(&self) {
        self.record(Call::StopServer);
    }
}

/// Two ends of an in-memory link: (ours, theirs)
pub async fn linked_pair(role: LinkRole) -> (DataChannel, DataChannel) {
    let (a, b) = duplex(4096);
    let other_role = match role {
        LinkRole::Client => LinkRole::Server,
        LinkRole::Server => LinkRole::Client,
    };
    let ours = DataChannel::handshake(a, role, "remote".into(), "MOCK", "mock-local");
    let theirs = DataChannel::handshake(b, other_role, "local".into(), "PEER", "mock-remote");
    let (ours, theirs) = tokio::join!(ours, theirs);
    (ours.unwrap(), theirs.unwrap())
}
