use crate::error::gtp::GtpError;

use common::ErrorLocation;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;

/// A single outbound GTP request: optional sequence id, command name,
/// possibly-empty argument list.
///
/// Construction rejects text that would corrupt the framing: embedded
/// newlines (blank lines terminate responses) and comment lines (never
/// answered, so waiting on one would hang forever).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GtpCommand {
    id: Option<u32>,
    name: String,
    arguments: Vec<String>,
}

impl GtpCommand {
    /// Parse command text into name and arguments.
    ///
    /// # Errors
    ///
    /// Returns [`GtpError::InvalidCommand`] for empty text, embedded
    /// newlines, or a comment line.
    #[track_caller]
    pub fn new(text: &str) -> Result<Self, GtpError> {
        if text.contains('\n') {
            return Err(GtpError::InvalidCommand {
                message: format!("Command contains a newline: {text:?}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let trimmed = text.trim();

        if trimmed.is_empty() {
            return Err(GtpError::InvalidCommand {
                message: String::from("Empty command"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if trimmed.starts_with('#') {
            return Err(GtpError::InvalidCommand {
                message: format!("Comment line is not a command: {trimmed}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut tokens = trimmed.split_whitespace().map(str::to_string);
        let name = tokens.next().unwrap_or_default();
        let arguments = tokens.collect();

        Ok(Self {
            id: None,
            name,
            arguments,
        })
    }

    /// The same command with a sequence id attached.
    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
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

    /// The wire form: `[id] name [arguments...]`.
    pub fn to_line(&self) -> String {
        let mut line = String::new();

        if let Some(id) = self.id {
            line.push_str(&id.to_string());
            line.push(' ');
        }

        line.push_str(&self.name);

        for argument in &self.arguments {
            line.push(' ');
            line.push_str(argument);
        }

        line
    }
}

impl Display for GtpCommand {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        write!(formatter, "{}", self.to_line())
    }
}
