use crate::error::model_error::ModelError;
use crate::ErrorLocation;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;

use serde::{Deserialize, Serialize};

/// Stone color of a board-affecting event.
///
/// `Empty` is only meaningful for setup edits: it marks the removal of a
/// stone during position editing. Played moves are always `Black` or `White`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Black,
    White,
    Empty,
}

impl Color {
    /// Single-letter form used as a protocol version 2 argument ("b" / "w").
    pub fn letter(self) -> &'static str {
        match self {
            Color::Black => "b",
            Color::White => "w",
            Color::Empty => "empty",
        }
    }

    /// Full word form used as a protocol version 1 command name.
    pub fn word(self) -> &'static str {
        match self {
            Color::Black => "black",
            Color::White => "white",
            Color::Empty => "empty",
        }
    }

    /// The opposing player color. `Empty` has no opponent and maps to itself.
    pub fn other(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
            Color::Empty => Color::Empty,
        }
    }

    /// Parse a GTP color argument ("b", "black", "w", "white"), case-insensitive.
    #[track_caller]
    pub fn parse(text: &str) -> Result<Color, ModelError> {
        match text.to_ascii_lowercase().as_str() {
            "b" | "black" => Ok(Color::Black),
            "w" | "white" => Ok(Color::White),
            _ => Err(ModelError::Validation {
                message: format!("Invalid color: {text}"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

impl Display for Color {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        match self {
            Color::Black => write!(formatter, "B"),
            Color::White => write!(formatter, "W"),
            Color::Empty => write!(formatter, "empty"),
        }
    }
}
