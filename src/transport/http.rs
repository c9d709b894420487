//! REST + WebSocket client for a patchbay server
//!
//! - `GET  /api/graph` returns the full [`Snapshot`]
//! - `POST /api/link/create` with a [`LinkRequest`] body
//! - `POST /api/link/delete` with `{"linkId": ..}`
//! - `/ws` pushes `{"type": <topic>, "data": ..}` text frames
//!
//! Edits answer `202 Accepted`; the change itself only becomes visible
//! through a later snapshot.

use std::net::TcpStream;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use crate::config::ServerConfig;
use crate::error::{PatchbayError, Result, ResultExt};
use crate::transport::Transport;
use crate::types::{GraphTopic, LinkDeleteRequest, LinkId, LinkRequest, Snapshot};

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Envelope of an event-feed frame; only the tag matters here.
#[derive(Debug, Deserialize)]
struct EventFrame {
    #[serde(rename = "type")]
    kind: String,
}

/// Blocking HTTP/WebSocket transport.
pub struct HttpTransport {
    client: Client,
    base: String,
    events_url: String,
    socket: Option<Socket>,
}

impl HttpTransport {
    pub fn new(server: &ServerConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(server.request_timeout())
            .timeout(server.request_timeout())
            .build()
            .context("Building HTTP client")?;

        Ok(Self {
            client,
            base: server.http_base(),
            events_url: server.events_url(),
            socket: None,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn post<T: serde::Serialize>(&self, path: &str, body: &T) -> Result<()> {
        let response = self.client.post(self.url(path)).json(body).send()?;
        check_status(response).map(|_| ())
    }
}

fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().unwrap_or_default();
    Err(PatchbayError::Rejected {
        status: status.as_u16(),
        message,
    })
}

/// Map an event-feed text frame to a graph topic. Frames of other types
/// and malformed frames yield `None`.
pub fn parse_event_frame(text: &str) -> Option<GraphTopic> {
    match serde_json::from_str::<EventFrame>(text) {
        Ok(frame) => GraphTopic::from_tag(&frame.kind),
        Err(e) => {
            tracing::debug!("Ignoring malformed event frame: {}", e);
            None
        }
    }
}

impl Transport for HttpTransport {
    fn fetch_snapshot(&mut self) -> Result<Snapshot> {
        let response = self.client.get(self.url("/api/graph")).send()?;
        let snapshot = check_status(response)?
            .json::<Snapshot>()
            .context("Decoding graph snapshot")?;
        Ok(snapshot)
    }

    fn create_link(&mut self, request: &LinkRequest) -> Result<()> {
        self.post("/api/link/create", request)
    }

    fn delete_link(&mut self, link: LinkId) -> Result<()> {
        self.post("/api/link/delete", &LinkDeleteRequest { link_id: link })
    }

    fn connect_events(&mut self) -> Result<()> {
        self.socket = None;
        let (socket, _response) = tungstenite::connect(self.events_url.as_str())
            .with_context(|| format!("Connecting to {}", self.events_url))?;
        tracing::debug!("Event feed open at {}", self.events_url);
        self.socket = Some(socket);
        Ok(())
    }

    fn poll_event(&mut self, timeout: Duration) -> Result<Option<GraphTopic>> {
        let Some(socket) = self.socket.as_mut() else {
            return Err(PatchbayError::Disconnected);
        };

        if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
            stream.set_read_timeout(Some(timeout.max(Duration::from_millis(1))))?;
        }

        match socket.read() {
            Ok(Message::Text(text)) => Ok(parse_event_frame(text.as_str())),
            Ok(Message::Close(_)) => {
                self.socket = None;
                Err(PatchbayError::Disconnected)
            }
            Ok(_) => Ok(None),
            Err(tungstenite::Error::Io(e))
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                Ok(None)
            }
            Err(e) => {
                self.socket = None;
                Err(e.into())
            }
        }
    }
}
