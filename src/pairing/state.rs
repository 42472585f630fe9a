// Pairing session state and the discovered peer collection

use std::fmt;

use crate::radio::Peer;

/// Where the pairing flow currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    EnablingRadio,
    RequestingDiscoverable,
    Discovering,
    Connecting,
    /// Terminal for the pairing screen
    LinkEstablished,
    Failed,
}

impl SessionState {
    /// Drives the refresh spinner
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionState::Discovering | SessionState::Connecting)
    }
}

/// Title text shown above the device list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusText {
    SelectDevice,
    Connecting,
}

impl fmt::Display for StatusText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusText::SelectDevice => f.write_str("select device"),
            StatusText::Connecting => f.write_str("connecting…"),
        }
    }
}

/// Peers found in the current discovery round, in arrival order
#[derive(Debug, Clone, Default)]
pub struct PeerList {
    peers: Vec<Peer>,
    dedup: bool,
}

impl PeerList {
    /// `dedup` drops peers whose address is already listed
    pub fn new(dedup: bool) -> Self {
        Self {
            peers: Vec::new(),
            dedup,
        }
    }

    /// Returns false if the peer was dropped as a duplicate
    pub fn push(&mut self, peer: Peer) -> bool {
        if self.dedup && self.peers.iter().any(|p| p.address == peer.address) {
            return false;
        }
        self.peers.push(peer);
        true
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }

    pub fn get(&self, index: usize) -> Option<&Peer> {
        self.peers.get(index)
    }

    pub fn as_slice(&self) -> &[Peer] {
        &self.peers
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(n: usize) -> Peer {
        Peer::new(format!("10.0.0.{}:4000", n), format!("snake-{}", n))
    }

    #[test]
    fn test_busy_only_while_discovering_or_connecting() {
        assert!(SessionState::Discovering.is_busy());
        assert!(SessionState::Connecting.is_busy());

        for state in [
            SessionState::Idle,
            SessionState::EnablingRadio,
            SessionState::RequestingDiscoverable,
            SessionState::LinkEstablished,
            SessionState::Failed,
        ] {
            assert!(!state.is_busy(), "{:?} should not be busy", state);
        }
    }

    #[test]
    fn test_peers_keep_arrival_order() {
        let mut list = PeerList::new(false);
        for n in 0..5 {
            assert!(list.push(peer(n)));
        }

        assert_eq!(list.as_slice().len(), 5);
        let names: Vec<&str> = list.as_slice().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["snake-0", "snake-1", "snake-2", "snake-3", "snake-4"]);
    }

    #[test]
    fn test_repeats_shown_unless_dedup_enabled() {
        let mut repeats = PeerList::new(false);
        repeats.push(peer(1));
        repeats.push(peer(1));
        assert_eq!(repeats.as_slice().len(), 2);

        let mut dedup = PeerList::new(true);
        assert!(dedup.push(peer(1)));
        assert!(!dedup.push(peer(1)));
        assert!(dedup.push(peer(2)));
        assert_eq!(dedup.as_slice().len(), 2);
    }

    #[test]
    fn test_status_text() {
        assert_eq!(StatusText::SelectDevice.to_string(), "select device");
        assert_eq!(StatusText::Connecting.to_string(), "connecting…");
    }
}
