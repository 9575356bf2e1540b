//! The client event loop.
//!
//! One task owns the [`Session`]. Stream events and input lines are drained
//! through a single `select!`, so every mutation happens on the same task in
//! the order it was observed.

use std::io::Write;

use research_protocol::OutboundMessage;
use steer_research::{
    ConnectionStatus, DiscardReason, EventOutcome, RejectReason, Session, SessionHost,
    SubmitOutcome, TransportError,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

use crate::commands::{parse_slash_command, SlashCommand, HELP_TEXT};
use crate::connection::{Connection, OutboundSender};
use crate::error::ClientError;
use crate::render::{render_status, RenderOptions, Renderer};

pub const BUSY_QUERY_HINT: &str = "Research in progress. Use /steer <instruction> to guide it.";
pub const NOT_CONNECTED_HINT: &str = "Not connected; messages cannot be sent.";
pub const NOT_BUSY_HINT: &str = "Steering is only available while research is running.";
pub const STEER_USAGE_HINT: &str = "Usage: /steer <instruction>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Quit,
    InputClosed,
}

struct LoopHost<'a> {
    outbound: &'a OutboundSender,
    render_requested: bool,
}

impl SessionHost for LoopHost<'_> {
    fn send(&mut self, message: OutboundMessage) -> Result<(), TransportError> {
        debug!(message_type = message.message_type(), "queueing outbound record");
        self.outbound.send(message)
    }

    fn request_render(&mut self) {
        self.render_requested = true;
    }
}

enum LineAction {
    Continue,
    Quit,
}

/// Drives `session` until the user quits or input ends.
///
/// When input ends while research is running, the loop keeps applying stream
/// events until the run settles or the stream goes away.
pub async fn run<R, W>(
    mut session: Session,
    connection: Connection,
    input: R,
    output: W,
    options: RenderOptions,
    endpoint: &str,
) -> Result<ExitReason, ClientError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let Connection {
        mut events,
        outbound,
    } = connection;
    let mut renderer = Renderer::new(output, options);
    let mut lines = input.lines();
    let mut events_open = true;
    let mut input_open = true;

    renderer
        .banner(&session.id().to_string(), endpoint)
        .map_err(|error| ClientError::io("writing banner", error))?;

    loop {
        if !input_open && (!events_open || settled(&session)) {
            info!(session = %session.id(), "input closed");
            return Ok(ExitReason::InputClosed);
        }

        tokio::select! {
            biased;

            event = events.recv(), if events_open => {
                let Some(event) = event else {
                    debug!("event channel closed");
                    events_open = false;
                    continue;
                };

                let outcome = session.handle_event(event);
                if let EventOutcome::Discarded(DiscardReason::Untracked(record)) = &outcome {
                    renderer
                        .passthrough(record)
                        .map_err(|error| ClientError::io("writing output", error))?;
                }
                renderer
                    .render_new_steps(session.transcript())
                    .map_err(|error| ClientError::io("writing output", error))?;
            }

            line = lines.next_line(), if input_open => {
                let line = line.map_err(|error| ClientError::io("reading input", error))?;
                let Some(line) = line else {
                    input_open = false;
                    continue;
                };

                match handle_line(&mut session, &outbound, &mut renderer, &line)
                    .map_err(|error| ClientError::io("writing output", error))?
                {
                    LineAction::Continue => {}
                    LineAction::Quit => {
                        info!(session = %session.id(), "quit requested");
                        return Ok(ExitReason::Quit);
                    }
                }
            }

            else => return Ok(ExitReason::InputClosed),
        }
    }
}

fn settled(session: &Session) -> bool {
    !session.busy() || session.connection() == ConnectionStatus::Closed
}

fn handle_line<W: Write>(
    session: &mut Session,
    outbound: &OutboundSender,
    renderer: &mut Renderer<W>,
    line: &str,
) -> std::io::Result<LineAction> {
    let mut host = LoopHost {
        outbound,
        render_requested: false,
    };

    let outcome = match parse_slash_command(line) {
        None => {
            if session.busy() {
                if !line.trim().is_empty() {
                    renderer.notice(BUSY_QUERY_HINT)?;
                }
                return Ok(LineAction::Continue);
            }
            session.on_query_input_replace(line);
            let outcome = session.submit_query(&mut host);
            if matches!(outcome, SubmitOutcome::Rejected(RejectReason::EmptyInput)) {
                return Ok(LineAction::Continue);
            }
            outcome
        }
        Some(SlashCommand::Steer(instruction)) => {
            session.on_steer_input_replace(instruction);
            let outcome = session.submit_steer(&mut host);
            if matches!(outcome, SubmitOutcome::Rejected(RejectReason::EmptyInput)) {
                renderer.notice(STEER_USAGE_HINT)?;
                return Ok(LineAction::Continue);
            }
            outcome
        }
        Some(SlashCommand::Help) => {
            renderer.notice(HELP_TEXT)?;
            return Ok(LineAction::Continue);
        }
        Some(SlashCommand::Status) => {
            renderer.notice(&render_status(
                &session.id().to_string(),
                &session.snapshot(),
            ))?;
            return Ok(LineAction::Continue);
        }
        Some(SlashCommand::Quit) => return Ok(LineAction::Quit),
        Some(SlashCommand::Unknown(command)) => {
            renderer.notice(&format!("Unknown command {command}. Type /help for commands."))?;
            return Ok(LineAction::Continue);
        }
    };

    match outcome {
        SubmitOutcome::Sent(_) => {}
        SubmitOutcome::Rejected(RejectReason::NotConnected) => renderer.notice(NOT_CONNECTED_HINT)?,
        SubmitOutcome::Rejected(RejectReason::NotBusy) => renderer.notice(NOT_BUSY_HINT)?,
        // Send failures already surface as a connection-lost step.
        SubmitOutcome::Rejected(RejectReason::SendFailed(_) | RejectReason::EmptyInput) => {}
    }

    if host.render_requested {
        renderer.render_new_steps(session.transcript())?;
    }
    Ok(LineAction::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use steer_research::SessionEvent;
    use tokio::sync::mpsc;

    fn plain() -> RenderOptions {
        RenderOptions { color: false }
    }

    #[tokio::test]
    async fn query_line_is_sent_and_echoed() {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        event_tx.send(SessionEvent::Opened).expect("queue opened");

        let mut output = Vec::new();
        let exit = run(
            Session::new(),
            Connection::from_channels(event_rx, outbound_tx),
            &b"topic\n/quit\n"[..],
            &mut output,
            plain(),
            "ws://test/ws/x",
        )
        .await
        .expect("loop runs");

        assert_eq!(exit, ExitReason::Quit);
        assert_eq!(
            outbound_rx.try_recv().expect("one record"),
            OutboundMessage::start_research("topic")
        );
        let rendered = String::from_utf8(output).expect("utf8");
        assert!(rendered.contains("> topic"), "{rendered}");
    }

    #[tokio::test]
    async fn lines_before_open_are_rejected_with_hint() {
        let (_event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();

        let mut output = Vec::new();
        let exit = run(
            Session::new(),
            Connection::from_channels(event_rx, outbound_tx),
            &b"topic\n"[..],
            &mut output,
            plain(),
            "ws://test/ws/x",
        )
        .await
        .expect("loop runs");

        assert_eq!(exit, ExitReason::InputClosed);
        assert!(outbound_rx.try_recv().is_err());
        let rendered = String::from_utf8(output).expect("utf8");
        assert!(rendered.contains(NOT_CONNECTED_HINT), "{rendered}");
    }

    #[tokio::test]
    async fn steer_outside_a_run_shows_hint() {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        event_tx.send(SessionEvent::Opened).expect("queue opened");

        let mut output = Vec::new();
        run(
            Session::new(),
            Connection::from_channels(event_rx, outbound_tx),
            &b"/steer focus\n/steer\n/bogus\n/quit\n"[..],
            &mut output,
            plain(),
            "ws://test/ws/x",
        )
        .await
        .expect("loop runs");

        assert!(outbound_rx.try_recv().is_err());
        let rendered = String::from_utf8(output).expect("utf8");
        assert!(rendered.contains(NOT_BUSY_HINT), "{rendered}");
        assert!(rendered.contains("Unknown command /bogus"), "{rendered}");
    }

    #[tokio::test]
    async fn input_end_waits_for_running_research_to_settle() {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        event_tx.send(SessionEvent::Opened).expect("queue opened");

        let backend = tokio::spawn(async move {
            let first = outbound_rx.recv().await.expect("query arrives");
            assert_eq!(first, OutboundMessage::start_research("tea"));
            event_tx
                .send(SessionEvent::Frame(
                    r#"{"type":"result","content":"Tea is good."}"#.to_string(),
                ))
                .expect("queue result");
            event_tx
        });

        let mut output = Vec::new();
        let exit = run(
            Session::new(),
            Connection::from_channels(event_rx, outbound_tx),
            &b"tea\n"[..],
            &mut output,
            plain(),
            "ws://test/ws/x",
        )
        .await
        .expect("loop runs");
        let _event_tx = backend.await.expect("backend task");

        assert_eq!(exit, ExitReason::InputClosed);
        let rendered = String::from_utf8(output).expect("utf8");
        assert!(rendered.contains("Final report\nTea is good."), "{rendered}");
    }
}
