//! Neighbor channels: one per neighbor, abstracted behind a trait so the
//! dispatcher can be driven by an in-memory fake in tests instead of real
//! filesystem sockets.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use tokio::net::UnixDatagram;

use crate::message::Envelope;

#[async_trait]
pub trait Channel: Send + Sync {
    async fn send(&self, envelope: &Envelope) -> io::Result<()>;

    /// Raw bytes of the next datagram, or an `Err`/empty read signaling the
    /// channel is gone.
    async fn recv_raw(&self) -> io::Result<Vec<u8>>;
}

/// A neighbor channel backed by a connected Unix datagram socket: the
/// router binds at its own router-side address on that link and connects
/// to the neighbor's named endpoint. Datagram framing means one JSON value
/// per read with no length prefix needed.
pub struct UnixChannel {
    socket: UnixDatagram,
}

impl UnixChannel {
    pub fn connect(local_path: impl AsRef<Path>, remote_path: impl AsRef<Path>) -> io::Result<Self> {
        let socket = UnixDatagram::bind(local_path)?;
        socket.connect(remote_path)?;
        Ok(Self { socket })
    }
}

#[async_trait]
impl Channel for UnixChannel {
    async fn send(&self, envelope: &Envelope) -> io::Result<()> {
        let bytes =
            serde_json::to_vec(envelope).expect("Envelope always serializes to valid JSON");
        self.socket.send(&bytes).await?;
        Ok(())
    }

    async fn recv_raw(&self) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; 65_535];
        let n = self.socket.recv(&mut buf).await?;
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "channel closed"));
        }
        buf.truncate(n);
        Ok(buf)
    }
}
