// UI surface the pairing controller drives

use super::error::PairingError;
use super::state::StatusText;
use crate::radio::{DataChannel, Peer};

/// Whatever renders the pairing screen.
///
/// Only ever called from the controller's own turn, never from a radio
/// worker.
pub trait PairingView {
    /// The full peer list after any change
    fn peers_changed(&mut self, peers: &[Peer]);

    /// Refresh indicator on/off
    fn busy_changed(&mut self, busy: bool);

    fn status_changed(&mut self, status: StatusText);

    /// One-shot user-visible message (toast)
    fn notify(&mut self, notice: &PairingError);

    /// Link is up; the view moves on to gameplay with this channel
    fn hand_off(&mut self, channel: DataChannel);
}
