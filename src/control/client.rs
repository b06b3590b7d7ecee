//! Message channel abstraction and the WebSocket client for the drone simulator.
//!
//! The control loop only sees `MessageChannel`. `SimulatorClient` implements it on top
//! of a blocking `tungstenite` socket whose read timeout bounds each receive, so the
//! receive is the single suspension point of a cycle.

use embassy_time::{Duration, Instant};
use std::io::ErrorKind;
use std::net::TcpStream;
use tungstenite::error::UrlError;
use tungstenite::protocol::CloseFrame;
use tungstenite::protocol::frame::coding::CloseCode;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

/// How the remote side ended the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelClosed {
    /// Orderly close handshake.
    Clean,
    /// Abnormal close code or transport failure.
    Error(String),
}

impl std::fmt::Display for ChannelClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelClosed::Clean => write!(f, "closed cleanly"),
            ChannelClosed::Error(detail) => write!(f, "closed with error: {}", detail),
        }
    }
}

/// Outcome of one bounded receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Message(String),
    /// Nothing arrived within the timeout. Not an error.
    TimedOut,
    Closed(ChannelClosed),
}

/// Failure to establish the connection.
#[derive(Debug)]
pub enum ConnectError {
    Refused(String),
    Other(anyhow::Error),
}

impl std::fmt::Display for ConnectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectError::Refused(detail) => write!(f, "Server connection refused: {}", detail),
            ConnectError::Other(error) => write!(f, "Connection failed: {:#}", error),
        }
    }
}

impl std::error::Error for ConnectError {}

/// Bidirectional text channel to the simulator.
#[allow(async_fn_in_trait)]
pub trait MessageChannel {
    /// Send one text message.
    async fn send(&mut self, payload: &str) -> Result<(), ChannelClosed>;

    /// Wait at most `timeout` for the next text message.
    async fn receive(&mut self, timeout: Duration) -> Inbound;

    /// Release the connection. Calling it more than once has no further effect.
    fn close(&mut self);
}

/// WebSocket connection to the simulator.
pub struct SimulatorClient {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

impl SimulatorClient {
    /// Open a WebSocket connection to `uri`.
    ///
    /// # Returns
    /// * `Ok(SimulatorClient)` once the handshake completed
    /// * `Err(ConnectError::Refused)` when nothing accepts connections at the address
    /// * `Err(ConnectError::Other)` for every other setup failure
    pub fn connect(uri: &str) -> Result<Self, ConnectError> {
        let (socket, response) = tungstenite::connect(uri).map_err(classify_connect_error)?;
        log::info!("Connected to the drone simulator at {} (HTTP {})", uri, response.status());

        Ok(Self { socket, closed: false })
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> std::io::Result<()> {
        let timeout = std::time::Duration::from_micros(timeout.as_micros());
        match self.socket.get_mut() {
            MaybeTlsStream::Plain(stream) => stream.set_read_timeout(Some(timeout)),
            #[allow(unreachable_patterns)]
            _ => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "read timeouts are only supported on plain TCP streams",
            )),
        }
    }
}

impl MessageChannel for SimulatorClient {
    async fn send(&mut self, payload: &str) -> Result<(), ChannelClosed> {
        self.socket.send(Message::text(payload.to_owned())).map_err(closed_from_error)
    }

    async fn receive(&mut self, timeout: Duration) -> Inbound {
        let deadline = Instant::now() + timeout;

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Inbound::TimedOut;
            }
            if let Err(e) = self.set_read_timeout(deadline - now) {
                return Inbound::Closed(ChannelClosed::Error(format!("Failed to set read timeout: {}", e)));
            }

            match self.socket.read() {
                Ok(Message::Text(text)) => return Inbound::Message(text.to_string()),
                Ok(Message::Binary(bytes)) => return Inbound::Message(String::from_utf8_lossy(&bytes).into_owned()),
                Ok(Message::Close(frame)) => return Inbound::Closed(closed_from_frame(frame)),
                // Ping/pong are answered by tungstenite itself
                Ok(_) => continue,
                Err(tungstenite::Error::Io(e)) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Inbound::TimedOut;
                }
                Err(e) => return Inbound::Closed(closed_from_error(e)),
            }
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        match self.socket.close(None) {
            Ok(()) => {
                if let Err(e) = self.socket.flush() {
                    log::warn!("Failed to flush the close frame: {}", e);
                }
                log::info!("Connection to the drone simulator closed");
            }
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                log::debug!("Connection was already closed by the simulator");
            }
            Err(e) => log::warn!("Error while closing the connection: {}", e),
        }
    }
}

impl Drop for SimulatorClient {
    fn drop(&mut self) {
        self.close();
    }
}

fn classify_connect_error(error: tungstenite::Error) -> ConnectError {
    match error {
        tungstenite::Error::Io(ref e) if e.kind() == ErrorKind::ConnectionRefused => ConnectError::Refused(e.to_string()),
        // tungstenite reports a failed TCP connect to every resolved address this way
        tungstenite::Error::Url(UrlError::UnableToConnect(address)) => {
            ConnectError::Refused(format!("unable to connect to {}", address))
        }
        other => ConnectError::Other(anyhow::Error::new(other).context("WebSocket connection setup failed")),
    }
}

fn closed_from_error(error: tungstenite::Error) -> ChannelClosed {
    match error {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => ChannelClosed::Clean,
        other => ChannelClosed::Error(other.to_string()),
    }
}

fn closed_from_frame(frame: Option<CloseFrame>) -> ChannelClosed {
    match frame {
        None => ChannelClosed::Clean,
        Some(frame) => match frame.code {
            CloseCode::Normal | CloseCode::Away => ChannelClosed::Clean,
            code => ChannelClosed::Error(format!("close code {}: {}", u16::from(code), frame.reason)),
        },
    }
}
