//! Engine-side GTP framing: the mirror image of the client.
//!
//! Reads command lines from an input stream, dispatches them to a
//! [`CommandHandler`], and emits `=`/`?` response frames. Used by tools
//! that answer GTP themselves and by the in-process engine doubles in the
//! test suite.

use std::fmt::{Display, Formatter, Result as FormatResult};

use log::{debug, trace};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// A single inbound GTP request as the engine side sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    id: Option<u32>,
    name: String,
    arguments: Vec<String>,
    line: String,
}

impl EngineCommand {
    /// Parse one input line. Returns `None` for blank lines and comments,
    /// which are never answered.
    pub fn parse(line: &str) -> Option<Self> {
        let without_comment = match line.find('#') {
            Some(index) => &line[..index],
            None => line,
        };

        let mut tokens = without_comment.split_whitespace();
        let first = tokens.next()?;

        let (id, name) = match first.parse::<u32>() {
            Ok(id) => (Some(id), tokens.next()?.to_string()),
            Err(_) => (None, first.to_string()),
        };

        let arguments = tokens.map(str::to_string).collect();

        Some(Self {
            id,
            name,
            arguments,
            line: line.to_string(),
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn argument(&self, index: usize) -> Option<&str> {
        self.arguments.get(index).map(String::as_str)
    }

    /// The input line exactly as received.
    pub fn line(&self) -> &str {
        &self.line
    }
}

impl Display for EngineCommand {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        write!(formatter, "{}", self.line)
    }
}

/// Command dispatch seam. `Ok` payload answers with `=`, `Err` message
/// with `?`.
pub trait CommandHandler: Send {
    fn handle(&mut self, command: &EngineCommand) -> Result<String, String>;
}

/// Answer GTP on the given streams until end of input.
///
/// Blank lines and comments are skipped without a response. The loop ends
/// after successfully answering `quit`.
///
/// # Errors
///
/// Propagates I/O errors from the streams; handler results never abort the
/// loop.
pub async fn serve<R, W>(
    reader: R,
    writer: W,
    handler: &mut dyn CommandHandler,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut output = writer;

    while let Some(line) = lines.next_line().await? {
        trace!("Engine read: {line}");

        let Some(command) = EngineCommand::parse(&line) else {
            continue;
        };

        let result = handler.handle(&command);
        let quit = command.name() == "quit" && result.is_ok();

        let text = format_response(&result, command.id());
        output.write_all(text.as_bytes()).await?;
        output.flush().await?;

        if quit {
            debug!("Engine answered quit, closing");
            break;
        }
    }

    Ok(())
}

/// Format one response frame.
///
/// Interior blank lines are collapsed to a single space so the payload
/// cannot terminate the frame early; exactly one blank line ends the frame.
pub fn format_response(result: &Result<String, String>, id: Option<u32>) -> String {
    let (status, payload) = match result {
        Ok(payload) => ('=', payload.as_str()),
        Err(message) => ('?', message.as_str()),
    };

    let collapsed = collapse_blank_lines(payload);

    let mut text = String::new();
    text.push(status);
    if let Some(id) = id {
        text.push_str(&id.to_string());
    }
    if !collapsed.is_empty() {
        text.push(' ');
        text.push_str(&collapsed);
    }
    text.push_str("\n\n");
    text
}

fn collapse_blank_lines(payload: &str) -> String {
    let trimmed = payload.trim_end();

    trimmed
        .lines()
        .map(|line| if line.is_empty() { " " } else { line })
        .collect::<Vec<_>>()
        .join("\n")
}
