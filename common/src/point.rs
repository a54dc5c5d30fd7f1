use crate::error::model_error::ModelError;
use crate::ErrorLocation;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;

use serde::{Deserialize, Serialize};

/// Largest board edge length expressible in GTP vertex notation.
pub const MAX_BOARD_SIZE: u32 = 25;

/// Column letters in vertex notation. The letter I is skipped.
const COLUMN_LETTERS: &str = "ABCDEFGHJKLMNOPQRSTUVWXYZ";

/// A board intersection in positional coordinates.
///
/// `column` and `row` are zero-based and independent of any display
/// convention; `column` 0, `row` 0 is the lower-left vertex "A1".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    column: u32,
    row: u32,
}

impl Point {
    /// Create a point from zero-based coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] if either coordinate falls outside
    /// the largest expressible board ([`MAX_BOARD_SIZE`]).
    #[track_caller]
    pub fn new(column: u32, row: u32) -> Result<Self, ModelError> {
        if column >= MAX_BOARD_SIZE || row >= MAX_BOARD_SIZE {
            return Err(ModelError::Validation {
                message: format!("Point ({column}, {row}) exceeds maximum board size"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Self { column, row })
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    /// Parse a GTP vertex such as "D4" or "q16" (case-insensitive).
    ///
    /// "pass" is not a vertex; use [`parse_vertex`] where a pass is a legal
    /// answer.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] for an unknown column letter, a
    /// missing or malformed row number, or a row outside 1..=25.
    #[track_caller]
    pub fn parse_gtp(text: &str) -> Result<Self, ModelError> {
        let trimmed = text.trim();
        let mut chars = trimmed.chars();

        let column_char = chars.next().ok_or_else(|| ModelError::Validation {
            message: String::from("Empty vertex"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let column = COLUMN_LETTERS
            .find(column_char.to_ascii_uppercase())
            .ok_or_else(|| ModelError::Validation {
                message: format!("Invalid vertex column: {trimmed}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let row_digits = chars.as_str();
        let row: u32 = row_digits
            .parse()
            .map_err(|_| ModelError::Validation {
                message: format!("Invalid vertex row: {trimmed}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        if row == 0 || row > MAX_BOARD_SIZE {
            return Err(ModelError::Validation {
                message: format!("Vertex row out of range: {trimmed}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Self {
            column: column as u32,
            row: row - 1,
        })
    }
}

impl Display for Point {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        let letter = COLUMN_LETTERS
            .as_bytes()
            .get(self.column as usize)
            .copied()
            .unwrap_or(b'?') as char;
        write!(formatter, "{}{}", letter, self.row + 1)
    }
}

/// Parse a GTP vertex answer where "pass" is legal.
///
/// Returns `Ok(None)` for a pass, `Ok(Some(point))` for a vertex.
#[track_caller]
pub fn parse_vertex(text: &str) -> Result<Option<Point>, ModelError> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("pass") {
        return Ok(None);
    }
    Point::parse_gtp(trimmed).map(Some)
}
