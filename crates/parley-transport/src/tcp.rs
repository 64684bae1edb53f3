//! Raw TCP transport: newline-delimited UTF-8 lines via `LinesCodec`.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};

use crate::{
    Connection, ConnectionId, DEFAULT_MAX_LINE_LEN, PendingConnection,
    Transport, TransportError,
};

/// A TCP [`Transport`] that listens for incoming line-protocol clients.
pub struct TcpTransport {
    listener: TcpListener,
    max_line_len: usize,
}

impl TcpTransport {
    /// Binds a new TCP transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self {
            listener,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        })
    }

    /// Sets the longest inbound line accepted before the connection is
    /// treated as broken.
    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }
}

impl Transport for TcpTransport {
    type Pending = PendingTcp;

    async fn accept(&mut self) -> Result<PendingTcp, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        Ok(PendingTcp {
            stream,
            peer,
            max_line_len: self.max_line_len,
        })
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    fn kind(&self) -> &'static str {
        "tcp"
    }
}

/// An accepted TCP stream. Establishing it needs no upgrade.
pub struct PendingTcp {
    stream: TcpStream,
    peer: SocketAddr,
    max_line_len: usize,
}

impl PendingConnection for PendingTcp {
    type Connection = TcpConnection;

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    async fn establish(self) -> Result<TcpConnection, TransportError> {
        let id = ConnectionId::next();
        let (read, write) = self.stream.into_split();
        tracing::debug!(%id, peer = %self.peer, "accepted TCP connection");
        Ok(TcpConnection {
            id,
            peer: self.peer,
            max_line_len: self.max_line_len,
            reader: Mutex::new(FramedRead::new(
                read,
                LinesCodec::new_with_max_length(self.max_line_len),
            )),
            writer: Mutex::new(FramedWrite::new(write, LinesCodec::new())),
        })
    }
}

/// A single TCP connection, split into independently locked halves.
pub struct TcpConnection {
    id: ConnectionId,
    peer: SocketAddr,
    max_line_len: usize,
    reader: Mutex<FramedRead<OwnedReadHalf, LinesCodec>>,
    writer: Mutex<FramedWrite<OwnedWriteHalf, LinesCodec>>,
}

impl Connection for TcpConnection {
    async fn send_line(&self, line: &str) -> Result<(), TransportError> {
        // `SinkExt::send` flushes, so a line is on the wire before the
        // lock is released.
        self.writer.lock().await.send(line).await.map_err(|e| match e {
            LinesCodecError::Io(e) => TransportError::SendFailed(e),
            LinesCodecError::MaxLineLengthExceeded => {
                TransportError::LineTooLong(self.max_line_len)
            }
        })
    }

    async fn recv_line(&self) -> Result<Option<String>, TransportError> {
        match self.reader.lock().await.next().await {
            // `LinesCodec` strips a trailing `\r`; a bare one mid-line
            // would still rewrite the line on a terminal.
            Some(Ok(line)) if line.contains('\r') => {
                Err(TransportError::EmbeddedTerminator)
            }
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                Err(TransportError::LineTooLong(self.max_line_len))
            }
            Some(Err(LinesCodecError::Io(e))) => {
                Err(TransportError::ReceiveFailed(e))
            }
            None => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        // `LinesCodec` encodes any `AsRef<str>`, so the item type is named.
        match SinkExt::<&str>::close(&mut *writer).await {
            Ok(()) => Ok(()),
            Err(LinesCodecError::Io(e))
                if e.kind() == std::io::ErrorKind::NotConnected =>
            {
                Ok(())
            }
            Err(LinesCodecError::Io(e)) => Err(TransportError::SendFailed(e)),
            Err(LinesCodecError::MaxLineLengthExceeded) => Ok(()),
        }
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}
