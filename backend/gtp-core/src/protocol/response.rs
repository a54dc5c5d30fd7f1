use crate::error::gtp::GtpError;

use common::ErrorLocation;

use std::panic::Location;

/// A fully-read GTP response frame. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GtpResponse {
    success: bool,
    id: Option<u32>,
    payload: String,
    raw: String,
}

impl GtpResponse {
    /// Parse the accumulated lines of one frame.
    ///
    /// The first line carries the status character (`=` success, `?`
    /// failure), an optional id echo, and the payload start; the remaining
    /// lines are payload continuation. The status and id prefix is stripped
    /// from the payload; the raw form keeps the frame verbatim for logging.
    ///
    /// # Errors
    ///
    /// Returns [`GtpError::Protocol`] for an empty frame or a first line
    /// without a status character. (The transport only forwards frames that
    /// start with one, so this guards against programmer misuse.)
    #[track_caller]
    pub fn parse(lines: &[String]) -> Result<Self, GtpError> {
        let first = lines.first().ok_or_else(|| GtpError::Protocol {
            message: String::from("Empty response frame"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let mut characters = first.chars();
        let success = match characters.next() {
            Some('=') => true,
            Some('?') => false,
            _ => {
                return Err(GtpError::Protocol {
                    message: format!("Response without status character: {first}"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        let rest = characters.as_str();
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let id = if digits_end > 0 {
            rest[..digits_end].parse().ok()
        } else {
            None
        };

        let first_payload = rest[digits_end..].strip_prefix(' ').unwrap_or(&rest[digits_end..]);

        let mut payload = String::from(first_payload);
        for line in &lines[1..] {
            payload.push('\n');
            payload.push_str(line);
        }
        let payload = payload.trim_end().to_string();

        Ok(Self {
            success,
            id,
            payload,
            raw: lines.join("\n"),
        })
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn id(&self) -> Option<u32> {
        self.id
    }

    /// The payload with the status and id prefix stripped and trailing
    /// whitespace trimmed.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// The frame exactly as read, for logging and shell display.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}
