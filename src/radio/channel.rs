// Data channel handed to gameplay once a link is established
// Length-prefixed bincode frames over any async byte stream

use std::fmt;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::listener::ChannelErrorCode;
use super::peer::Peer;
use super::protocol::LinkMessage;

/// Largest frame accepted from the remote side
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Byte stream a data channel can run over (TCP socket, in-memory duplex, ...)
pub trait ChannelStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> ChannelStream for T {}

/// Which side of the link we ended up on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    /// We connected out to the peer
    Client,
    /// The peer connected to our server
    Server,
}

/// A channel failure tagged with the category the pairing flow reports
#[derive(Debug, Error)]
#[error("{code}: {source}")]
pub struct LinkFailure {
    pub code: ChannelErrorCode,
    #[source]
    pub source: io::Error,
}

impl LinkFailure {
    pub fn new(code: ChannelErrorCode, source: io::Error) -> Self {
        Self { code, source }
    }
}

/// Established bidirectional channel to a peer
pub struct DataChannel {
    peer: Peer,
    role: LinkRole,
    stream: Box<dyn ChannelStream>,
}

impl fmt::Debug for DataChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataChannel")
            .field("peer", &self.peer)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl DataChannel {
    /// Exchange `Hello` messages over a freshly connected stream.
    ///
    /// `remote_address` is what the radio knows about the other end; the
    /// display name comes from the remote `Hello`.
    pub async fn handshake<S: ChannelStream + 'static>(
        stream: S,
        role: LinkRole,
        remote_address: String,
        local_device_id: &str,
        local_name: &str,
    ) -> Result<Self, LinkFailure> {
        let mut channel = Self {
            peer: Peer::new(remote_address, String::new()),
            role,
            stream: Box::new(stream),
        };

        channel
            .send(&LinkMessage::Hello {
                device_id: local_device_id.to_string(),
                name: local_name.to_string(),
            })
            .await?;

        match channel.recv().await? {
            LinkMessage::Hello { name, .. } => {
                channel.peer.name = name;
                Ok(channel)
            }
            other => Err(LinkFailure::new(
                ChannelErrorCode::StreamRead,
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("expected hello, got {:?}", other),
                ),
            )),
        }
    }

    pub fn peer(&self) -> &Peer {
        &self.peer
    }

    pub fn role(&self) -> LinkRole {
        self.role
    }

    /// Write one framed message
    pub async fn send(&mut self, msg: &LinkMessage) -> Result<(), LinkFailure> {
        let write_err = |e: io::Error| LinkFailure::new(ChannelErrorCode::StreamWrite, e);

        let payload = msg
            .to_bytes()
            .map_err(|e| write_err(io::Error::new(io::ErrorKind::InvalidInput, e)))?;
        if payload.len() > MAX_FRAME_LEN {
            return Err(write_err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "frame too large",
            )));
        }

        self.stream
            .write_u32(payload.len() as u32)
            .await
            .map_err(write_err)?;
        self.stream.write_all(&payload).await.map_err(write_err)?;
        self.stream.flush().await.map_err(write_err)
    }

    /// Read one framed message
    pub async fn recv(&mut self) -> Result<LinkMessage, LinkFailure> {
        let read_err = |e: io::Error| LinkFailure::new(ChannelErrorCode::StreamRead, e);

        let len = self.stream.read_u32().await.map_err(read_err)? as usize;
        if len > MAX_FRAME_LEN {
            return Err(read_err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame of {} bytes exceeds limit", len),
            )));
        }

        let mut payload = vec![0u8; len];
        self.stream
            .read_exact(&mut payload)
            .await
            .map_err(read_err)?;

        LinkMessage::from_bytes(&payload)
            .map_err(|e| read_err(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    /// Say goodbye and shut the stream down
    pub async fn close(mut self) -> Result<(), LinkFailure> {
        // The remote may already be gone; only the shutdown result matters.
        let _ = self.send(&LinkMessage::Disconnect).await;
        self.stream
            .shutdown()
            .await
            .map_err(|e| LinkFailure::new(ChannelErrorCode::SocketClose, e))
    }
}
