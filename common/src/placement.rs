use crate::color::Color;
use crate::point::Point;

use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::{Deserialize, Serialize};

/// One board-affecting event: a played move or a setup edit.
///
/// This is the atomic unit the synchronizer diffs against. Two placements
/// are equal only when point, color, and the move/setup flag all match;
/// sequence order is semantically significant and never reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub color: Color,
    /// `None` represents a pass. Setup edits always carry a point.
    pub point: Option<Point>,
    pub is_setup: bool,
}

impl Placement {
    /// A played move. `point` of `None` is a pass.
    pub fn play(color: Color, point: Option<Point>) -> Self {
        Self {
            color,
            point,
            is_setup: false,
        }
    }

    /// A pass by the given color.
    pub fn pass(color: Color) -> Self {
        Self {
            color,
            point: None,
            is_setup: false,
        }
    }

    /// A setup edit. `Color::Empty` marks stone removal.
    pub fn setup(color: Color, point: Point) -> Self {
        Self {
            color,
            point: Some(point),
            is_setup: true,
        }
    }

    pub fn is_pass(&self) -> bool {
        self.point.is_none()
    }
}

impl Display for Placement {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        let kind = if self.is_setup { "setup " } else { "" };
        match self.point {
            Some(point) => write!(formatter, "{}{} {}", kind, self.color, point),
            None => write!(formatter, "{}{} pass", kind, self.color),
        }
    }
}
