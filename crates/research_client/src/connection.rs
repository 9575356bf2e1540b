//! The single duplex stream bound to a session.
//!
//! The stream is opened once and never reopened. Everything it observes is
//! translated into [`SessionEvent`]s on one channel so a single consumer can
//! apply them strictly in arrival order.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use research_protocol::OutboundMessage;
use steer_research::{SessionEvent, TransportError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, warn};
use url::Url;

/// Fire-and-forget handle for outbound records.
#[derive(Debug, Clone)]
pub struct OutboundSender {
    tx: UnboundedSender<OutboundMessage>,
}

impl OutboundSender {
    pub fn new(tx: UnboundedSender<OutboundMessage>) -> Self {
        Self { tx }
    }

    pub fn send(&self, message: OutboundMessage) -> Result<(), TransportError> {
        self.tx.send(message).map_err(|_| TransportError::Closed)
    }
}

pub struct Connection {
    pub events: UnboundedReceiver<SessionEvent>,
    pub outbound: OutboundSender,
}

impl Connection {
    /// Starts connecting in the background. The first event is either
    /// [`SessionEvent::Opened`] or a [`SessionEvent::TransportError`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(endpoint: Url) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(drive(endpoint, event_tx, outbound_rx));

        Self {
            events: event_rx,
            outbound: OutboundSender::new(outbound_tx),
        }
    }

    /// Builds a connection from caller-owned channels, for hosts that bring
    /// their own transport.
    pub fn from_channels(
        events: UnboundedReceiver<SessionEvent>,
        outbound: UnboundedSender<OutboundMessage>,
    ) -> Self {
        Self {
            events,
            outbound: OutboundSender::new(outbound),
        }
    }
}

async fn drive(
    endpoint: Url,
    events: UnboundedSender<SessionEvent>,
    outbound: UnboundedReceiver<OutboundMessage>,
) {
    let stream = match connect_async(endpoint.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(error) => {
            warn!(%endpoint, %error, "connection failed");
            let _ = events.send(SessionEvent::TransportError(format!(
                "failed to connect to {endpoint}: {error}"
            )));
            return;
        }
    };

    info!(%endpoint, "connected");
    if events.send(SessionEvent::Opened).is_err() {
        return;
    }

    let (sink, source) = stream.split();
    let writer = tokio::spawn(write_loop(sink, outbound, events.clone()));
    read_loop(source, events).await;
    writer.abort();
}

async fn write_loop<S>(
    mut sink: S,
    mut outbound: UnboundedReceiver<OutboundMessage>,
    events: UnboundedSender<SessionEvent>,
) where
    S: Sink<Message, Error = WsError> + Unpin,
{
    while let Some(message) = outbound.recv().await {
        // The submission is already in the transcript; an unsendable record
        // ends the stream.
        let text = match message.to_json() {
            Ok(text) => text,
            Err(error) => {
                warn!(%error, "outbound record failed to encode");
                let _ = events.send(SessionEvent::TransportError(error.to_string()));
                return;
            }
        };

        debug!(record = %text, "outbound frame");
        if let Err(error) = sink.send(Message::Text(text.into())).await {
            warn!(%error, "outbound write failed");
            let _ = events.send(SessionEvent::TransportError(error.to_string()));
            return;
        }
    }
}

async fn read_loop<S>(mut source: S, events: UnboundedSender<SessionEvent>)
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(next) = source.next().await {
        let event = match next {
            Ok(Message::Text(text)) => {
                debug!(record = %text, "inbound frame");
                SessionEvent::Frame(text.to_string())
            }
            Ok(Message::Close(frame)) => {
                let _ = events.send(close_event(frame.as_ref()));
                return;
            }
            Ok(Message::Binary(data)) => {
                debug!(len = data.len(), "ignoring binary frame");
                continue;
            }
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
            Err(error) => {
                let _ = events.send(SessionEvent::TransportError(error.to_string()));
                return;
            }
        };

        if events.send(event).is_err() {
            return;
        }
    }

    let _ = events.send(SessionEvent::Closed {
        abnormal: true,
        reason: Some("stream ended without a close frame".to_string()),
    });
}

pub fn close_event(frame: Option<&CloseFrame>) -> SessionEvent {
    match frame {
        Some(frame) => SessionEvent::Closed {
            abnormal: frame.code != CloseCode::Normal,
            reason: Some(format!("{} {}", u16::from(frame.code), frame.reason).trim().to_string()),
        },
        None => SessionEvent::Closed {
            abnormal: false,
            reason: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_close_frame_is_not_abnormal() {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "done".into(),
        };
        assert_eq!(
            close_event(Some(&frame)),
            SessionEvent::Closed {
                abnormal: false,
                reason: Some("1000 done".to_string()),
            }
        );
    }

    #[test]
    fn other_close_codes_are_abnormal() {
        let frame = CloseFrame {
            code: CloseCode::Away,
            reason: "".into(),
        };
        assert_eq!(
            close_event(Some(&frame)),
            SessionEvent::Closed {
                abnormal: true,
                reason: Some("1001".to_string()),
            }
        );
        assert_eq!(
            close_event(None),
            SessionEvent::Closed {
                abnormal: false,
                reason: None,
            }
        );
    }

    #[tokio::test]
    async fn write_loop_sends_text_frames_in_order() {
        let (frames_tx, mut frames_rx) = mpsc::unbounded_channel::<Message>();
        let sink = futures_util::sink::unfold(frames_tx, |frames_tx, frame: Message| async move {
            let _ = frames_tx.send(frame);
            Ok::<_, WsError>(frames_tx)
        });
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();

        outbound_tx
            .send(OutboundMessage::start_research("tea"))
            .expect("queue");
        outbound_tx.send(OutboundMessage::steer("go")).expect("queue");
        drop(outbound_tx);
        write_loop(Box::pin(sink), outbound_rx, events_tx).await;

        let first = frames_rx.recv().await.expect("first frame");
        assert_eq!(
            first.into_text().expect("text frame").as_str(),
            r#"{"type":"start_research","query":"tea"}"#
        );
        assert!(frames_rx.recv().await.is_some());
        assert!(events_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn write_failure_is_reported_as_transport_error() {
        let sink = futures_util::sink::unfold((), |(), _frame: Message| async move {
            Err::<(), _>(WsError::ConnectionClosed)
        });
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();

        outbound_tx
            .send(OutboundMessage::start_research("tea"))
            .expect("queue");
        write_loop(Box::pin(sink), outbound_rx, events_tx).await;

        assert!(matches!(
            events_rx.recv().await,
            Some(SessionEvent::TransportError(_))
        ));
    }

    #[test]
    fn outbound_sender_reports_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = OutboundSender::new(tx);
        drop(rx);

        assert_eq!(
            sender.send(OutboundMessage::steer("late")),
            Err(TransportError::Closed)
        );
    }
}
