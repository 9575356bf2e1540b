use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use research_protocol::{session_id_from_path, InboundEvent};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::script::MockConversation;

/// Scripted research backend serving `/ws/<session_id>`.
pub struct MockBackend {
    listener: TcpListener,
    pacing: Duration,
}

impl MockBackend {
    pub async fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            pacing: Duration::ZERO,
        })
    }

    /// Spaces out the records of a research run so a steering instruction
    /// can arrive before the report. Zero sends them back to back.
    #[must_use]
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// `ws://<addr>`, suitable as a client server URL.
    pub fn base_url(&self) -> io::Result<String> {
        Ok(format!("ws://{}", self.local_addr()?))
    }

    /// Accepts connections until the listener fails.
    pub async fn serve(self) -> io::Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            tokio::spawn(handle_connection(stream, peer, self.pacing));
        }
    }

    pub fn spawn(self) -> JoinHandle<io::Result<()>> {
        tokio::spawn(self.serve())
    }
}

fn not_found(path: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(format!("no session stream at {path}")));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, pacing: Duration) {
    let mut session_id = None;
    let handshake = accept_hdr_async(stream, |request: &Request, response: Response| {
        let path = request.uri().path();
        match session_id_from_path(path) {
            Some(id) => {
                session_id = Some(id.to_string());
                Ok(response)
            }
            None => Err(not_found(path)),
        }
    })
    .await;

    let socket = match handshake {
        Ok(socket) => socket,
        Err(error) => {
            warn!(%peer, %error, "handshake rejected");
            return;
        }
    };
    let Some(session_id) = session_id else {
        return;
    };

    info!(%peer, session = %session_id, "session stream opened");
    let (mut sink, mut source) = socket.split();
    let (replies_tx, mut replies_rx) = mpsc::unbounded_channel::<InboundEvent>();

    let writer_session = session_id.clone();
    let writer = tokio::spawn(async move {
        while let Some(event) = replies_rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(error) => {
                    warn!(%error, "failed to encode reply");
                    continue;
                }
            };
            if let Err(error) = sink.send(Message::Text(json.into())).await {
                warn!(session = %writer_session, %error, "write failed");
                return;
            }
        }
    });

    let mut conversation = MockConversation::new(session_id);
    while let Some(next) = source.next().await {
        let text = match next {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(error) => {
                warn!(session = conversation.session_id(), %error, "read failed");
                break;
            }
        };

        debug!(session = conversation.session_id(), record = %text, "inbound record");
        let replies = conversation.respond(text.as_str());
        if pacing.is_zero() || replies.len() < 2 {
            for reply in replies {
                let _ = replies_tx.send(reply);
            }
        } else {
            tokio::spawn(send_paced(replies, replies_tx.clone(), pacing));
        }
    }

    drop(replies_tx);
    writer.abort();
    info!(session = conversation.session_id(), "session stream closed");
}

async fn send_paced(replies: Vec<InboundEvent>, tx: UnboundedSender<InboundEvent>, pacing: Duration) {
    for (index, reply) in replies.into_iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(pacing).await;
        }
        if tx.send(reply).is_err() {
            return;
        }
    }
}
