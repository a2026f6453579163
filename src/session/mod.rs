//! Interactive sessions bound to a socket.
//!
//! # Data Flow
//! ```text
//! admitted socket
//!     → factory.rs (seed context, create evaluator)
//!     → Session::run
//!         prompt → read line → dot-command or evaluator → write replies
//!     → ends on `.exit`, client EOF, or termination by the lifecycle controller
//! ```
//!
//! # Design Decisions
//! - The session owns its socket; it never outlives it and vice versa
//! - Termination writes a final newline and closes the write side
//! - Evaluation faults are written to the client, never propagated

pub mod context;
pub mod factory;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{
    self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;
use tokio::sync::Notify;

use crate::config::EvaluatorOptions;
use crate::eval::{Evaluator, Reply};
use crate::net::connection::ConnectionId;

pub use context::{ContextValue, SessionContext};
pub use factory::SessionFactory;

const HELP: &str = "\
.break    Discard the expression being entered
.clear    Forget definitions made in this session
.exit     Close this session
.help     Print this help message
";

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client sent `.exit`.
    Exit,
    /// The client closed the connection.
    ClientClosed,
    /// The lifecycle controller asked the session to end.
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Break,
    Clear,
    Exit,
    Help,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim() {
        ".break" => Some(Command::Break),
        ".clear" => Some(Command::Clear),
        ".exit" => Some(Command::Exit),
        ".help" => Some(Command::Help),
        _ => None,
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Line {
    Complete,
    TooLong,
    Eof,
}

/// Read one line into `buf`, never buffering more than `max` bytes of it.
/// The rest of an overlong line is consumed and dropped.
async fn read_line_bounded<R>(
    input: &mut R,
    buf: &mut Vec<u8>,
    max: usize,
) -> io::Result<Line>
where
    R: AsyncBufRead + Unpin,
{
    let n = (&mut *input)
        .take(max as u64 + 1)
        .read_until(b'\n', buf)
        .await?;
    if n == 0 {
        return Ok(Line::Eof);
    }
    if buf.len() <= max || buf.last() == Some(&b'\n') {
        return Ok(Line::Complete);
    }

    loop {
        let (consumed, found) = {
            let available = input.fill_buf().await?;
            if available.is_empty() {
                break;
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (available.len(), false),
            }
        };
        input.consume(consumed);
        if found {
            break;
        }
    }
    Ok(Line::TooLong)
}

/// Decode a raw input line. With `terminal` set, backspace/DEL erase the
/// previous character and other control characters are dropped.
fn decode_line(raw: &[u8], terminal: bool) -> String {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_end_matches(['\n', '\r']);
    if !terminal {
        return text.to_string();
    }

    let mut line = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{8}' | '\u{7f}' => {
                line.pop();
            }
            '\t' => line.push(ch),
            c if c.is_control() => {}
            c => line.push(c),
        }
    }
    line
}

/// One client's interactive evaluation instance.
pub struct Session {
    id: ConnectionId,
    peer: SocketAddr,
    stream: TcpStream,
    evaluator: Box<dyn Evaluator>,
    options: EvaluatorOptions,
    terminate: Arc<Notify>,
}

impl Session {
    pub fn new(
        id: ConnectionId,
        peer: SocketAddr,
        stream: TcpStream,
        evaluator: Box<dyn Evaluator>,
        options: EvaluatorOptions,
        terminate: Arc<Notify>,
    ) -> Self {
        Self {
            id,
            peer,
            stream,
            evaluator,
            options,
            terminate,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Serve the client until the session ends.
    pub async fn run(self) -> io::Result<SessionEnd> {
        let Session {
            id,
            stream,
            mut evaluator,
            options,
            terminate,
            ..
        } = self;

        let (input, mut output) = stream.into_split();
        let mut input = BufReader::new(input);
        let mut buf = Vec::with_capacity(1024);

        write_prompt(&mut output, &options.prompt).await?;

        loop {
            buf.clear();
            let read = tokio::select! {
                biased;
                _ = terminate.notified() => {
                    tracing::debug!(connection_id = %id, "Session terminating");
                    output.write_all(b"\n").await?;
                    output.shutdown().await?;
                    return Ok(SessionEnd::Terminated);
                }
                read = read_line_bounded(&mut input, &mut buf, options.max_line_bytes) => read?,
            };

            match read {
                Line::Eof => return Ok(SessionEnd::ClientClosed),
                Line::TooLong => {
                    tracing::debug!(connection_id = %id, "Discarded overlong input line");
                    evaluator.reset_input();
                    let message = format!(
                        "Input line exceeds {} bytes, discarded\n",
                        options.max_line_bytes
                    );
                    output.write_all(message.as_bytes()).await?;
                    write_prompt(&mut output, &options.prompt).await?;
                    continue;
                }
                Line::Complete => {}
            }

            let line = decode_line(&buf, options.terminal);
            match parse_command(&line) {
                Some(Command::Exit) => {
                    output.flush().await?;
                    output.shutdown().await?;
                    return Ok(SessionEnd::Exit);
                }
                Some(Command::Break) => evaluator.reset_input(),
                Some(Command::Clear) => {
                    evaluator.reset_context();
                    output.write_all(b"Clearing context...\n").await?;
                }
                Some(Command::Help) => output.write_all(HELP.as_bytes()).await?,
                None => {
                    for reply in evaluator.eval_line(&line) {
                        let text = match reply {
                            Reply::Value(text) | Reply::Error(text) => text,
                        };
                        output.write_all(text.as_bytes()).await?;
                        output.write_all(b"\n").await?;
                    }
                }
            }

            let prompt = if evaluator.is_pending() {
                &options.continuation_prompt
            } else {
                &options.prompt
            };
            write_prompt(&mut output, prompt).await?;
        }
    }
}

async fn write_prompt<W>(output: &mut W, prompt: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(prompt.as_bytes()).await?;
    output.flush().await
}
