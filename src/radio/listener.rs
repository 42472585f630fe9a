// Connection listener handles given to the radio
// Radio workers report through these; delivery is marshaled to the controller's inbox

use std::fmt;
use tokio::sync::mpsc;
use tracing::debug;

use super::channel::DataChannel;
use super::peer::Peer;

/// Failure categories reported by the radio's channel workers.
///
/// Every category is recovered the same way by the pairing flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelErrorCode {
    SocketCreate,
    SocketClose,
    ServerAccept,
    ClientConnect,
    StreamCreate,
    StreamRead,
    StreamWrite,
}

impl ChannelErrorCode {
    pub const ALL: [ChannelErrorCode; 7] = [
        ChannelErrorCode::SocketCreate,
        ChannelErrorCode::SocketClose,
        ChannelErrorCode::ServerAccept,
        ChannelErrorCode::ClientConnect,
        ChannelErrorCode::StreamCreate,
        ChannelErrorCode::StreamRead,
        ChannelErrorCode::StreamWrite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelErrorCode::SocketCreate => "socket-create",
            ChannelErrorCode::SocketClose => "socket-close",
            ChannelErrorCode::ServerAccept => "server-accept",
            ChannelErrorCode::ClientConnect => "client-connect",
            ChannelErrorCode::StreamCreate => "stream-create",
            ChannelErrorCode::StreamRead => "stream-read",
            ChannelErrorCode::StreamWrite => "stream-write",
        }
    }
}

impl fmt::Display for ChannelErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notifications a radio emits while establishing a link
#[derive(Debug)]
pub enum LinkEvent {
    /// Outbound socket connected to `peer`
    ClientLinkEstablished { peer: Peer },

    /// Server accepted an inbound socket from `remote`
    ServerLinkReady { remote: String },

    /// Handshake finished, channel usable for gameplay
    DataChannelReady(DataChannel),

    /// Any channel failure
    Error {
        code: ChannelErrorCode,
        detail: String,
    },
}

/// Everything a radio can push at the pairing controller
#[derive(Debug)]
pub enum RadioEvent {
    PeerDiscovered(Peer),
    Link(LinkEvent),
}

/// Non-owning handle from a radio worker back to the controller.
///
/// Holds a weak sender: once the controller is dropped, sends are no-ops
/// and the worker never keeps the screen alive.
#[derive(Clone)]
pub struct LinkListener {
    tx: mpsc::WeakUnboundedSender<RadioEvent>,
}

impl LinkListener {
    pub fn new(tx: mpsc::WeakUnboundedSender<RadioEvent>) -> Self {
        Self { tx }
    }

    pub fn client_link_established(&self, peer: Peer) {
        self.deliver(LinkEvent::ClientLinkEstablished { peer });
    }

    pub fn server_link_ready(&self, remote: impl Into<String>) {
        self.deliver(LinkEvent::ServerLinkReady {
            remote: remote.into(),
        });
    }

    pub fn data_channel_ready(&self, channel: DataChannel) {
        self.deliver(LinkEvent::DataChannelReady(channel));
    }

    pub fn error(&self, code: ChannelErrorCode, detail: impl Into<String>) {
        self.deliver(LinkEvent::Error {
            code,
            detail: detail.into(),
        });
    }

    /// Whether the receiving controller still exists
    pub fn is_attached(&self) -> bool {
        self.tx.upgrade().is_some()
    }

    fn deliver(&self, event: LinkEvent) {
        match self.tx.upgrade() {
            Some(tx) => {
                let _ = tx.send(RadioEvent::Link(event));
            }
            None => debug!("Dropping link event, controller is gone: {:?}", event),
        }
    }
}

/// Subscription handle for discovered-peer notifications
#[derive(Clone)]
pub struct DiscoverySink {
    tx: mpsc::WeakUnboundedSender<RadioEvent>,
}

impl DiscoverySink {
    pub fn new(tx: mpsc::WeakUnboundedSender<RadioEvent>) -> Self {
        Self { tx }
    }

    /// Hand a discovered peer to the controller; returns false if it is gone
    pub fn deliver(&self, peer: Peer) -> bool {
        match self.tx.upgrade() {
            Some(tx) => tx.send(RadioEvent::PeerDiscovered(peer)).is_ok(),
            None => false,
        }
    }
}
