// Connection controller: sequences enable -> discoverable -> discover -> connect
//
// All state lives on the controller's turn. Radio workers and spawned prompt
// tasks only ever post messages into the controller's inboxes through weak
// senders, and the controller applies them in `pump`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::error::PairingError;
use super::state::{PeerList, SessionState, StatusText};
use super::view::PairingView;
use crate::config::PairingConfig;
use crate::radio::{
    ChannelErrorCode, DataChannel, DiscoverableOutcome, DiscoverySink, EnableOutcome, LinkEvent,
    LinkListener, Peer, RadioAdapter, RadioEvent,
};

/// Results of work the controller spawned itself
#[derive(Debug)]
enum TaskResult {
    EnablePrompt(EnableOutcome),
    DiscoverablePrompt(DiscoverableOutcome),
    DiscoveryTimeout { round: u64 },
}

pub struct ConnectionController<R: RadioAdapter, V: PairingView> {
    radio: Arc<R>,
    view: V,
    config: PairingConfig,

    state: SessionState,
    status: StatusText,
    peers: PeerList,

    /// Screen still showing; false after `stop`
    attached: bool,
    subscribed: bool,
    server_running: bool,
    /// Bumped on every discovery start so stale timeouts can be told apart
    discovery_round: u64,

    task_tx: mpsc::UnboundedSender<TaskResult>,
    task_rx: mpsc::UnboundedReceiver<TaskResult>,
    radio_tx: mpsc::UnboundedSender<RadioEvent>,
    radio_rx: mpsc::UnboundedReceiver<RadioEvent>,
    /// Link events pulled out of `radio_rx` while discarding stale peers
    deferred: VecDeque<RadioEvent>,
}

impl<R: RadioAdapter, V: PairingView> ConnectionController<R, V> {
    pub fn new(radio: Arc<R>, view: V, config: PairingConfig) -> Self {
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let (radio_tx, radio_rx) = mpsc::unbounded_channel();
        let peers = PeerList::new(config.dedup_peers);

        Self {
            radio,
            view,
            config,
            state: SessionState::Idle,
            status: StatusText::SelectDevice,
            peers,
            attached: true,
            subscribed: false,
            server_running: false,
            discovery_round: 0,
            task_tx,
            task_rx,
            radio_tx,
            radio_rx,
            deferred: VecDeque::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    pub fn status(&self) -> StatusText {
        self.status
    }

    pub fn peers(&self) -> &[Peer] {
        self.peers.as_slice()
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Screen entered: subscribe to discovered peers and kick off the flow
    pub fn enter(&mut self) {
        if !self.attached {
            return;
        }
        if !self.subscribed {
            self.radio
                .register_discovery(DiscoverySink::new(self.radio_tx.downgrade()));
            self.subscribed = true;
        }
        self.begin_connection_flow();
    }

    /// Make sure the radio is on, then ask for visibility
    pub fn begin_connection_flow(&mut self) {
        if !self.attached || self.state == SessionState::LinkEstablished {
            return;
        }
        if self.radio.is_enabled() {
            self.request_discoverable(Duration::from_secs(self.config.discoverable_secs));
            return;
        }

        info!("Radio is off, asking to enable it");
        self.set_state(SessionState::EnablingRadio);
        let radio = self.radio.clone();
        let tx = self.task_tx.downgrade();
        tokio::spawn(async move {
            let outcome = radio.request_enable().await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(TaskResult::EnablePrompt(outcome));
            }
        });
    }

    /// Ask for inbound visibility. Discovery starts whatever the answer is.
    pub fn request_discoverable(&mut self, duration: Duration) {
        if !self.attached || self.state == SessionState::LinkEstablished {
            return;
        }
        self.set_state(SessionState::RequestingDiscoverable);
        let radio = self.radio.clone();
        let tx = self.task_tx.downgrade();
        tokio::spawn(async move {
            let outcome = radio.request_discoverable(duration).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(TaskResult::DiscoverablePrompt(outcome));
            }
        });
    }

    /// (Re)start the server listener and a fresh, time-bounded scan
    pub fn start_discovery(&mut self) {
        if !self.attached || self.state == SessionState::LinkEstablished {
            return;
        }

        // Every round gets a live listener, even if the last one died
        self.radio
            .run_server(LinkListener::new(self.radio_tx.downgrade()));
        self.server_running = true;
        debug!("Server listener started");

        self.radio.cancel_discovery();
        self.discard_stale_peers();
        self.peers.clear();
        self.view.peers_changed(self.peers.as_slice());

        match self.radio.start_discovery() {
            Ok(()) => {
                info!("Discovering...");
                self.set_state(SessionState::Discovering);
                self.discovery_round += 1;
                self.schedule_discovery_timeout(self.discovery_round);
            }
            Err(e) => {
                warn!("Could not start discovery: {}", e);
                self.set_state(SessionState::Idle);
                self.view.notify(&PairingError::DiscoveryStartFailed(e));
            }
        }
    }

    /// User tapped a device
    pub fn select_peer(&mut self, peer: Peer) {
        if !self.attached {
            return;
        }
        if matches!(
            self.state,
            SessionState::Connecting | SessionState::LinkEstablished
        ) {
            debug!("Ignoring selection of {} while {:?}", peer, self.state);
            return;
        }

        info!("Connecting to {}", peer);
        self.set_state(SessionState::Connecting);
        self.set_status(StatusText::Connecting);
        self.radio
            .connect(&peer, LinkListener::new(self.radio_tx.downgrade()));
    }

    /// Tap by list position; returns false if there is no such row
    pub fn select_index(&mut self, index: usize) -> bool {
        match self.peers.get(index).cloned() {
            Some(peer) => {
                self.select_peer(peer);
                true
            }
            None => false,
        }
    }

    /// Pull-to-refresh
    pub fn refresh(&mut self) {
        if !self.attached || self.state == SessionState::LinkEstablished {
            return;
        }
        if self.radio.is_enabled() {
            self.start_discovery();
        } else {
            self.begin_connection_flow();
        }
    }

    /// Screen exited. Idempotent.
    ///
    /// An outbound connect already in flight is not cancelled; whatever it
    /// reports afterwards is dropped.
    pub fn stop(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;

        if self.subscribed {
            self.radio.unregister_discovery();
            self.subscribed = false;
        }
        self.radio.cancel_discovery();
        self.stop_server();
        debug!("Pairing screen stopped");
    }

    /// Wait for the next background message and apply it.
    ///
    /// Cancel-safe: nothing is lost if the future is dropped before it
    /// completes, so it can sit in a `tokio::select!` next to UI input.
    pub async fn pump(&mut self) {
        if let Some(event) = self.deferred.pop_front() {
            self.on_radio_event(event);
            return;
        }
        tokio::select! {
            biased;
            Some(result) = self.task_rx.recv() => self.on_task_result(result),
            Some(event) = self.radio_rx.recv() => self.on_radio_event(event),
            // Unreachable while we hold both senders
            else => {}
        }
    }

    fn on_task_result(&mut self, result: TaskResult) {
        if !self.attached {
            debug!("Screen gone, dropping {:?}", result);
            return;
        }
        match result {
            TaskResult::EnablePrompt(outcome) => self.on_enable_result(outcome),
            TaskResult::DiscoverablePrompt(outcome) => self.on_discoverable_result(outcome),
            TaskResult::DiscoveryTimeout { round } => self.on_discovery_timeout(round),
        }
    }

    fn on_radio_event(&mut self, event: RadioEvent) {
        if !self.attached {
            debug!("Screen gone, dropping {:?}", event);
            return;
        }
        match event {
            RadioEvent::PeerDiscovered(peer) => self.on_peer_discovered(peer),
            RadioEvent::Link(LinkEvent::ClientLinkEstablished { peer }) => {
                debug!("Client socket established with {}", peer);
            }
            RadioEvent::Link(LinkEvent::ServerLinkReady { remote }) => {
                debug!("Server socket established with {}", remote);
            }
            RadioEvent::Link(LinkEvent::DataChannelReady(channel)) => {
                self.on_link_established(channel)
            }
            RadioEvent::Link(LinkEvent::Error { code, detail }) => self.on_error(code, &detail),
        }
    }

    fn on_enable_result(&mut self, outcome: EnableOutcome) {
        if self.state != SessionState::EnablingRadio {
            debug!("Stale enable result {:?} in {:?}", outcome, self.state);
            return;
        }
        match outcome {
            EnableOutcome::Approved => {
                info!("Radio enabled");
                self.request_discoverable(Duration::from_secs(self.config.discoverable_secs));
            }
            EnableOutcome::Declined => {
                warn!("Failed to enable radio");
                self.set_state(SessionState::Idle);
                self.view.notify(&PairingError::RadioUnavailable);
            }
        }
    }

    fn on_discoverable_result(&mut self, outcome: DiscoverableOutcome) {
        if self.state != SessionState::RequestingDiscoverable {
            debug!("Stale discoverable result {:?} in {:?}", outcome, self.state);
            return;
        }
        match outcome {
            DiscoverableOutcome::Approved(duration) => {
                info!("Device can be discovered for {} seconds", duration.as_secs());
            }
            DiscoverableOutcome::Declined => info!("Device cannot be discovered"),
        }
        self.start_discovery();
    }

    fn on_peer_discovered(&mut self, peer: Peer) {
        debug!("Device discovered: {}", peer);
        if self.peers.push(peer) {
            self.view.peers_changed(self.peers.as_slice());
        }
    }

    fn on_discovery_timeout(&mut self, round: u64) {
        if round != self.discovery_round {
            debug!("Ignoring timeout of superseded discovery round {}", round);
            return;
        }
        self.radio.cancel_discovery();
        info!("Discover finished");

        if self.state == SessionState::Discovering {
            self.set_state(SessionState::Idle);
        }
        if self.peers.is_empty() {
            info!("No device discovered");
            self.view.notify(&PairingError::DiscoveryEmpty);
        }
    }

    /// First data channel wins; any later one is the losing side of the race
    fn on_link_established(&mut self, channel: DataChannel) {
        if self.state == SessionState::LinkEstablished {
            debug!("Dropping redundant channel to {}", channel.peer());
            tokio::spawn(async move {
                if let Err(e) = channel.close().await {
                    debug!("Closing redundant channel: {}", e);
                }
            });
            return;
        }

        info!("Data channel established with {}", channel.peer());
        self.stop_server();
        self.radio.cancel_discovery();
        self.set_state(SessionState::LinkEstablished);
        self.view.hand_off(channel);
    }

    fn on_error(&mut self, code: ChannelErrorCode, detail: &str) {
        if self.state == SessionState::LinkEstablished {
            debug!("Ignoring {} after link established: {}", code, detail);
            return;
        }
        warn!("{}: {}", PairingError::Channel(code), detail);
        self.set_state(SessionState::Idle);
        self.set_status(StatusText::SelectDevice);
    }

    fn schedule_discovery_timeout(&self, round: u64) {
        let timeout = Duration::from_millis(self.config.discover_timeout_ms);
        let tx = self.task_tx.downgrade();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(TaskResult::DiscoveryTimeout { round });
            }
        });
    }

    fn stop_server(&mut self) {
        if self.server_running {
            self.radio.stop_server();
            self.server_running = false;
        }
    }

    /// Peers still queued from the previous round must not leak into the new list
    fn discard_stale_peers(&mut self) {
        while let Ok(event) = self.radio_rx.try_recv() {
            match event {
                RadioEvent::PeerDiscovered(peer) => debug!("Dropping stale peer {}", peer),
                other => self.deferred.push_back(other),
            }
        }
    }

    /// The refresh indicator follows the state; tell the view when it flips
    fn set_state(&mut self, state: SessionState) {
        let was_busy = self.state.is_busy();
        self.state = state;
        if state.is_busy() != was_busy {
            self.view.busy_changed(state.is_busy());
        }
    }

    fn set_status(&mut self, status: StatusText) {
        self.status = status;
        self.view.status_changed(status);
    }
}

impl<R: RadioAdapter, V: PairingView> Drop for ConnectionController<R, V> {
    fn drop(&mut self) {
        self.stop();
    }
}
