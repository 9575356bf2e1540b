//! Line-oriented transcript rendering.
//!
//! Each transcript step is written once, in order, as a self-contained block.

use std::io::{self, Write};

use research_protocol::InboundEvent;
use steer_research::{ConnectionStatus, SessionSnapshot, SessionState, Transcript, TranscriptStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub color: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { color: true }
    }
}

#[derive(Debug, Clone, Copy)]
struct Palette {
    color: bool,
}

impl Palette {
    fn wrap(self, text: &str, prefix: &str, suffix: &str) -> String {
        if self.color {
            format!("{prefix}{text}{suffix}")
        } else {
            text.to_string()
        }
    }

    fn dim(self, text: &str) -> String {
        self.wrap(text, "\x1b[2m", "\x1b[22m")
    }

    fn bold(self, text: &str) -> String {
        self.wrap(text, "\x1b[1m", "\x1b[22m")
    }

    fn cyan(self, text: &str) -> String {
        self.wrap(text, "\x1b[36m", "\x1b[39m")
    }

    fn yellow(self, text: &str) -> String {
        self.wrap(text, "\x1b[33m", "\x1b[39m")
    }

    fn red(self, text: &str) -> String {
        self.wrap(text, "\x1b[31m", "\x1b[39m")
    }

    fn green(self, text: &str) -> String {
        self.wrap(text, "\x1b[32m", "\x1b[39m")
    }

    fn blue(self, text: &str) -> String {
        self.wrap(text, "\x1b[34m", "\x1b[39m")
    }

    fn italic(self, text: &str) -> String {
        self.wrap(text, "\x1b[3m", "\x1b[23m")
    }

    fn heading(self, text: &str) -> String {
        self.bold(&self.yellow(text))
    }
}

pub fn render_step(step: &TranscriptStep, options: RenderOptions) -> String {
    let palette = Palette {
        color: options.color,
    };

    match step {
        TranscriptStep::User { .. } => {
            let label = step.user_label().unwrap_or_default();
            palette.cyan(&format!("> {label}"))
        }
        TranscriptStep::Info { content } => palette.dim(&palette.italic(&format!("-- {content} --"))),
        TranscriptStep::Clarify { question } => {
            format!("{}\n{question}", palette.heading("Clarification needed"))
        }
        TranscriptStep::Report { content } => {
            format!("{}\n{content}", palette.heading("Final report"))
        }
        TranscriptStep::Error { message, .. } => {
            format!("{}\n{message}", palette.bold(&palette.red("Error")))
        }
        TranscriptStep::Plan { items } => {
            let mut block = palette.heading("Plan");
            for item in items {
                block.push_str("\n  - ");
                block.push_str(item);
            }
            block
        }
    }
}

/// Renders records the session keeps out of its transcript.
pub fn render_passthrough(event: &InboundEvent, options: RenderOptions) -> Option<String> {
    let palette = Palette {
        color: options.color,
    };

    match event {
        InboundEvent::Cot { content } => Some(format!(
            "{}\n{}",
            palette.heading("Thinking..."),
            palette.dim(content)
        )),
        InboundEvent::Sites { content } => {
            let mut block = palette.heading("Sites under research");
            for site in content.lines().filter_map(|line| line.strip_prefix("Query:")) {
                block.push_str("\n  ");
                block.push_str(&palette.green(site.trim()));
            }
            Some(block)
        }
        InboundEvent::Sources { content } => {
            let mut block = palette.heading("Sources");
            for source in content {
                block.push_str("\n  ");
                block.push_str(&palette.blue(source.label()));
                if source.label() != source.url {
                    block.push_str(&palette.dim(&format!(" <{}>", source.url)));
                }
            }
            Some(block)
        }
        _ => None,
    }
}

pub fn render_status(session_id: &str, snapshot: &SessionSnapshot) -> String {
    let connection = match snapshot.connection {
        ConnectionStatus::Connecting => "connecting",
        ConnectionStatus::Open => "open",
        ConnectionStatus::Closed => "closed",
    };
    let state = match snapshot.state {
        SessionState::Idle => "idle",
        SessionState::AwaitingClarification => "awaiting clarification",
        SessionState::Running => "running",
    };

    format!(
        "session {session_id} | connection {connection} | {state} | {} steps",
        snapshot.transcript_len
    )
}

/// Writes new transcript steps and local notices to an output stream.
pub struct Renderer<W: Write> {
    out: W,
    options: RenderOptions,
    rendered: usize,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, options: RenderOptions) -> Self {
        Self {
            out,
            options,
            rendered: 0,
        }
    }

    /// Writes every step appended since the previous call.
    pub fn render_new_steps(&mut self, transcript: &Transcript) -> io::Result<()> {
        for step in transcript.since(self.rendered) {
            writeln!(self.out, "{}\n", render_step(step, self.options))?;
        }
        self.rendered = transcript.len();
        self.out.flush()
    }

    pub fn passthrough(&mut self, event: &InboundEvent) -> io::Result<()> {
        if let Some(block) = render_passthrough(event, self.options) {
            writeln!(self.out, "{block}\n")?;
            self.out.flush()?;
        }
        Ok(())
    }

    pub fn notice(&mut self, text: &str) -> io::Result<()> {
        let palette = Palette {
            color: self.options.color,
        };
        writeln!(self.out, "{}", palette.dim(text))?;
        self.out.flush()
    }

    pub fn banner(&mut self, session_id: &str, endpoint: &str) -> io::Result<()> {
        let palette = Palette {
            color: self.options.color,
        };
        writeln!(self.out, "{}", palette.bold(&palette.green("SDR")))?;
        writeln!(self.out, "{}", palette.dim("Steering Deep Research"))?;
        writeln!(self.out, "{}", palette.dim(&format!("session {session_id} via {endpoint}")))?;
        writeln!(self.out)?;
        self.out.flush()
    }
}
