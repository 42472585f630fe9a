// Discovered remote device

use serde::{Deserialize, Serialize};
use std::fmt;

/// A remote device able to host or join a game.
///
/// Peers are created by the radio when they are discovered and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Peer {
    /// Opaque address understood by the radio that produced it
    pub address: String,
    /// Name shown in the device list
    pub name: String,
}

impl Peer {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}
