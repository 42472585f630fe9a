// Plain text rendering of the pairing screen

use std::io::Write;

use crate::pairing::{PairingError, PairingView, StatusText};
use crate::radio::{DataChannel, LinkRole, Peer};

/// Writes every view update as lines of text.
///
/// The handed-off channel is parked here until the caller takes it.
pub struct ConsoleView<W: Write> {
    out: W,
    channel: Option<DataChannel>,
}

impl<W: Write> ConsoleView<W> {
    pub fn new(out: W) -> Self {
        Self { out, channel: None }
    }

    pub fn take_channel(&mut self) -> Option<DataChannel> {
        self.channel.take()
    }

    /// Free-form line, e.g. help or a rejected command
    pub fn say(&mut self, text: &str) {
        self.line(format_args!("{}", text));
    }

    // Console output is best effort; a closed stdout is not a pairing failure
    fn line(&mut self, args: std::fmt::Arguments<'_>) {
        let _ = self.out.write_fmt(args);
        let _ = self.out.write_all(b"\n");
        let _ = self.out.flush();
    }
}

impl<W: Write> PairingView for ConsoleView<W> {
    fn peers_changed(&mut self, peers: &[Peer]) {
        if peers.is_empty() {
            self.line(format_args!("devices: (none)"));
            return;
        }
        self.line(format_args!("devices:"));
        for (i, peer) in peers.iter().enumerate() {
            self.line(format_args!("  {}. {}", i + 1, peer));
        }
    }

    fn busy_changed(&mut self, busy: bool) {
        if busy {
            self.line(format_args!("..."));
        } else {
            self.line(format_args!("ready"));
        }
    }

    fn status_changed(&mut self, status: StatusText) {
        self.line(format_args!("== {} ==", status));
    }

    fn notify(&mut self, notice: &PairingError) {
        self.line(format_args!("! {}", notice));
    }

    fn hand_off(&mut self, channel: DataChannel) {
        let side = match channel.role() {
            LinkRole::Client => "client",
            LinkRole::Server => "server",
        };
        self.line(format_args!("connected to {} as {}", channel.peer(), side));
        self.channel = Some(channel);
    }
}
