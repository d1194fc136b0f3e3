//! Streaming response collection with terminal redraw.
//!
//! Long generations would scroll the terminal by hundreds of lines. Every
//! few chunks the collector moves the cursor back over what it printed and
//! erases it, so the visible output stays bounded while the model streams.

use std::io::{IsTerminal, Write};

use cg_core::{find_filename_hint, BackendError, CompletionBackend};
use crossterm::cursor::MoveUp;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use tracing::debug;

/// Chunks printed before the collector erases them.
pub const REDRAW_CHUNK_THRESHOLD: u32 = 10;

/// How streamed text is shown on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleMode {
    /// Print chunks and periodically erase them
    #[default]
    Scroll,
    /// Print chunks without any control sequences
    Append,
    /// Print nothing
    Quiet,
}

impl ConsoleMode {
    /// `Scroll` on a terminal, `Append` otherwise.
    pub fn detect() -> Self {
        if std::io::stdout().is_terminal() {
            ConsoleMode::Scroll
        } else {
            ConsoleMode::Append
        }
    }
}

/// Per-call redraw counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamState {
    /// Chunks printed since the last redraw
    pub chunk_count: u32,
    /// Newlines printed since the last redraw
    pub line_break_count: u32,
}

/// A finished model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Full response text
    pub text: String,
    /// File name announced on the first line, if any
    pub filename_hint: Option<String>,
}

/// Accumulates streamed chunks and echoes them to `out`.
pub struct ResponseCollector<W: Write> {
    out: W,
    mode: ConsoleMode,
    state: StreamState,
    text: String,
}

impl<W: Write> ResponseCollector<W> {
    pub fn new(out: W, mode: ConsoleMode) -> Self {
        Self {
            out,
            mode,
            state: StreamState::default(),
            text: String::new(),
        }
    }

    /// Handle one streamed chunk.
    ///
    /// Console output is best effort; write errors are ignored.
    pub fn push(&mut self, chunk: &str) {
        self.text.push_str(chunk);

        self.state.chunk_count += 1;
        self.state.line_break_count += chunk.matches('\n').count() as u32;

        if self.state.chunk_count > REDRAW_CHUNK_THRESHOLD {
            if self.mode == ConsoleMode::Scroll {
                let _ = self.erase(self.state.line_break_count);
            }
            self.state = StreamState::default();
        }

        if self.mode != ConsoleMode::Quiet {
            let _ = self.out.write_all(chunk.as_bytes());
            let _ = self.out.flush();
        }
    }

    /// Current redraw counters.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Finish the call.
    ///
    /// `returned` is the text the backend reported; it is used only when
    /// nothing was streamed.
    pub fn finish(mut self, returned: String) -> Completion {
        if self.mode != ConsoleMode::Quiet && !self.text.is_empty() {
            let _ = self.out.write_all(b"\n");
            let _ = self.out.flush();
        }

        let text = if self.text.is_empty() {
            returned
        } else {
            self.text
        };
        let filename_hint = find_filename_hint(&text);
        Completion {
            text,
            filename_hint,
        }
    }

    /// Return to column 0 and erase `lines` lines upwards.
    fn erase(&mut self, lines: u32) -> std::io::Result<()> {
        self.out.write_all(b"\r")?;
        for _ in 0..lines {
            queue!(self.out, Clear(ClearType::UntilNewLine), MoveUp(1))?;
        }
        Ok(())
    }
}

/// Run one completion through a collector.
///
/// No retry here; the iteration loop owns retries.
pub async fn collect<W: Write + Send>(
    backend: &dyn CompletionBackend,
    prompt: &str,
    temperature: f32,
    out: W,
    mode: ConsoleMode,
) -> Result<Completion, BackendError> {
    let mut collector = ResponseCollector::new(out, mode);
    let returned = backend
        .complete(prompt, temperature, &mut |chunk: &str| collector.push(chunk))
        .await?;

    let completion = collector.finish(returned);
    debug!(
        model = backend.model(),
        bytes = completion.text.len(),
        hint = ?completion.filename_hint,
        "Response collected"
    );
    Ok(completion)
}
