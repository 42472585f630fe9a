// Flow-level outcomes the user gets told about

use thiserror::Error;

use crate::radio::{ChannelErrorCode, RadioError};

/// Everything that ends a pairing attempt early.
///
/// None of these are fatal: the flow goes back to idle and the user can
/// retry with a refresh.
#[derive(Debug, Error)]
pub enum PairingError {
    /// User declined switching the radio on
    #[error("bluetooth unable")]
    RadioUnavailable,

    #[error("device discovery failed: {0}")]
    DiscoveryStartFailed(#[source] RadioError),

    /// Scan timed out without finding anyone; neutral, not a fault
    #[error("no devices found")]
    DiscoveryEmpty,

    #[error("connection error: {0}")]
    Channel(ChannelErrorCode),
}
