// Pairing module for TastySnake
// Drives the connect screen from radio power-on to an established data channel

pub mod controller;
pub mod error;
pub mod state;
pub mod view;

pub use controller::ConnectionController;
pub use error::PairingError;
pub use state::{PeerList, SessionState, StatusText};
pub use view::PairingView;
