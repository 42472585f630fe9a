// Short-range radio abstraction for TastySnake
// The pairing controller only talks to the radio through RadioAdapter

pub mod channel;
pub mod lan;
pub mod listener;
pub mod peer;
pub mod protocol;

#[cfg(test)]
pub mod mock;

pub use channel::{DataChannel, LinkFailure, LinkRole};
pub use lan::LanRadio;
pub use listener::{ChannelErrorCode, DiscoverySink, LinkEvent, LinkListener, RadioEvent};
pub use peer::Peer;

use std::future::Future;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result of asking the user to turn the radio on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableOutcome {
    Approved,
    Declined,
}

/// Result of asking the user to make this device visible to others
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverableOutcome {
    /// Visible for the granted duration
    Approved(Duration),
    Declined,
}

#[derive(Debug, Error)]
pub enum RadioError {
    #[error("radio is disabled")]
    Disabled,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Capability surface of the platform radio.
///
/// Synchronous methods must return quickly; anything that blocks runs on a
/// background task and reports through the [`LinkListener`] or
/// [`DiscoverySink`] it was given. Implementations are shared between the
/// controller and the tasks it spawns, hence `Send + Sync + 'static`.
pub trait RadioAdapter: Send + Sync + 'static {
    fn is_enabled(&self) -> bool;

    /// Ask for the radio to be switched on. Resolves once the user answered.
    fn request_enable(&self) -> impl Future<Output = EnableOutcome> + Send;

    /// Ask for inbound visibility for a bounded duration.
    fn request_discoverable(
        &self,
        duration: Duration,
    ) -> impl Future<Output = DiscoverableOutcome> + Send;

    /// Start scanning for peers. Results go to the registered sink.
    fn start_discovery(&self) -> Result<(), RadioError>;

    /// Stop scanning. Safe to call when no scan is running.
    fn cancel_discovery(&self);

    fn register_discovery(&self, sink: DiscoverySink);

    /// Safe to call when nothing is registered.
    fn unregister_discovery(&self);

    /// Start an outbound connection attempt to `peer`.
    fn connect(&self, peer: &Peer, listener: LinkListener);

    /// Start accepting one inbound connection.
    fn run_server(&self, listener: LinkListener);

    /// Stop the accept loop started by [`run_server`](Self::run_server).
    fn stop_server(&self);
}
