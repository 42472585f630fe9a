// TastySnake link protocol definition
// Discovery beacons (UDP) and data channel messages (TCP)

use serde::{Deserialize, Serialize};

/// Broadcast by a discoverable device so scanning peers can list it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beacon {
    /// Random per-process id, used to ignore our own broadcasts
    pub device_id: String,
    pub name: String,
    /// TCP port the device accepts game connections on
    pub port: u16,
}

impl Beacon {
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

/// Messages exchanged over an established data channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkMessage {
    /// Handshake message, sent by both sides right after the socket connects
    Hello { device_id: String, name: String },

    /// Graceful disconnect
    Disconnect,
}

impl LinkMessage {
    /// Serialize message to bytes for transmission
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize message from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}
