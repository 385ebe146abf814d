//! Incremental translation of the Gemini CLI `stream-json` output into
//! OpenAI response frames.
//!
//! [`StreamState`] is a synchronous state machine owned by a single request.
//! It is fed raw stdout and stderr bytes and the exit status, and returns
//! the [`Output`]s the response should carry, in order. It guarantees that at
//! most one terminal response is produced.

use serde::Deserialize;

use crate::error::BridgeError;
use crate::framer;
use crate::protocol::{ChatCompletion, ChatCompletionChunk};

/// Stderr signature the Gemini CLI prints when a tool call fails.
pub const TOOL_FAILURE_SIGNATURE: &str = "Error executing tool";

/// Reassembles newline-delimited records from arbitrarily split chunks.
///
/// The pending buffer never holds a newline: every complete line is handed
/// out by [`LineBuffer::push`] before it returns.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        complete[..last_newline]
            .split(|&b| b == b'\n')
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect()
    }

    /// Drain whatever incomplete line is left once the stream has ended.
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }

    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}

/// One decoded record from the CLI's stdout.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolEvent {
    Message {
        #[serde(default)]
        role: String,
        #[serde(default)]
        content: Option<String>,
    },
    Result {
        #[serde(default)]
        status: Option<String>,
    },
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

/// Decode a single line. Blank lines yield `None`.
pub fn decode_line(line: &str) -> Option<Result<ToolEvent, serde_json::Error>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(serde_json::from_str(line))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Streaming,
    Buffered,
}

/// Something the HTTP response should carry.
#[derive(Debug)]
pub enum Output {
    /// One SSE chunk frame.
    Chunk(ChatCompletionChunk),
    /// The SSE `[DONE]` sentinel. Always the last frame of a stream.
    Done,
    /// The whole body of a buffered response.
    Completion(ChatCompletion),
    /// A failure: the response status for buffered requests, an in-band
    /// error frame for streaming ones.
    Failure(BridgeError),
}

/// Per-request translation state.
#[derive(Debug)]
pub struct StreamState {
    mode: ResponseMode,
    model: String,
    accumulated_text: String,
    saw_content: bool,
    response_sent: bool,
    tool_failure: Option<String>,
    lines: LineBuffer,
    stderr_lines: LineBuffer,
}

impl StreamState {
    pub fn new(mode: ResponseMode, model: impl Into<String>) -> Self {
        Self {
            mode,
            model: model.into(),
            accumulated_text: String::new(),
            saw_content: false,
            response_sent: false,
            tool_failure: None,
            lines: LineBuffer::default(),
            stderr_lines: LineBuffer::default(),
        }
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// True once the terminal response has been produced.
    pub fn is_finished(&self) -> bool {
        self.response_sent
    }

    pub fn on_stdout(&mut self, chunk: &[u8]) -> Vec<Output> {
        let mut out = Vec::new();
        for line in self.lines.push(chunk) {
            self.handle_line(&line, &mut out);
        }
        out
    }

    /// Stdout reached EOF; a trailing unterminated record is still decoded.
    pub fn on_stdout_end(&mut self) -> Vec<Output> {
        let mut out = Vec::new();
        if let Some(line) = self.lines.take_remainder() {
            self.handle_line(&line, &mut out);
        }
        out
    }

    /// Stderr is scanned line by line for the tool failure signature.
    pub fn on_stderr(&mut self, chunk: &[u8]) {
        for line in self.stderr_lines.push(chunk) {
            self.inspect_stderr_line(&line);
        }
    }

    pub fn on_stderr_end(&mut self) {
        if let Some(line) = self.stderr_lines.take_remainder() {
            self.inspect_stderr_line(&line);
        }
    }

    fn inspect_stderr_line(&mut self, line: &str) {
        if self.tool_failure.is_some() || !line.contains(TOOL_FAILURE_SIGNATURE) {
            return;
        }
        tracing::warn!("Gemini CLI reported a tool failure: {}", line.trim());
        self.tool_failure = Some(line.trim().to_string());
    }

    /// The child exited. Produces the fallback terminal response when the
    /// CLI never emitted a `result` event.
    pub fn on_exit(&mut self, code: Option<i32>) -> Vec<Output> {
        if self.response_sent {
            return Vec::new();
        }
        self.response_sent = true;

        let failure = if code != Some(0) {
            Some(BridgeError::ProcessFailed { code })
        } else if !self.saw_content {
            self.tool_failure.take().map(BridgeError::ToolExecution)
        } else {
            None
        };

        match (self.mode, failure) {
            (ResponseMode::Buffered, Some(err)) => vec![Output::Failure(err)],
            (ResponseMode::Buffered, None) => vec![Output::Completion(framer::completion(
                &self.model,
                std::mem::take(&mut self.accumulated_text),
            ))],
            (ResponseMode::Streaming, Some(err)) => vec![Output::Failure(err), Output::Done],
            (ResponseMode::Streaming, None) => vec![
                Output::Chunk(framer::finish_chunk(&self.model)),
                Output::Done,
            ],
        }
    }

    fn handle_line(&mut self, line: &str, out: &mut Vec<Output>) {
        match decode_line(line) {
            None => {}
            Some(Ok(event)) => self.handle_event(event, out),
            Some(Err(err)) => {
                tracing::debug!(
                    target: "gemini_bridge::decode",
                    "dropping undecodable event line ({err}): {line}"
                );
            }
        }
    }

    fn handle_event(&mut self, event: ToolEvent, out: &mut Vec<Output>) {
        if self.response_sent {
            return;
        }

        match event {
            ToolEvent::Error { message } => {
                tracing::error!(
                    "Gemini internal error: {}",
                    message.as_deref().unwrap_or("<no message>")
                );
            }
            ToolEvent::Message { role, content } if role == "assistant" => {
                let content = content.unwrap_or_default();
                self.saw_content |= !content.is_empty();
                match self.mode {
                    ResponseMode::Streaming => {
                        out.push(Output::Chunk(framer::delta_chunk(&self.model, content)));
                    }
                    ResponseMode::Buffered => self.accumulated_text.push_str(&content),
                }
            }
            ToolEvent::Result { status } => {
                tracing::debug!("generation finished (status={status:?})");
                self.response_sent = true;
                match self.mode {
                    ResponseMode::Streaming => {
                        out.push(Output::Chunk(framer::finish_chunk(&self.model)));
                        out.push(Output::Done);
                    }
                    ResponseMode::Buffered => {
                        out.push(Output::Completion(framer::completion(
                            &self.model,
                            std::mem::take(&mut self.accumulated_text),
                        )));
                    }
                }
            }
            ToolEvent::Message { .. } | ToolEvent::Unknown => {}
        }
    }
}
