//! Discrete direction labels shared by both estimators.

use std::fmt;

/// Label used when an estimator produced no confident direction
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Direction of the head or of the gaze
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Turned or looking left
    Left,
    /// Turned or looking right
    Right,
    /// Tilted or looking up
    Top,
    /// Tilted or looking down
    Bottom,
    /// Within thresholds on both axes
    Center,
}

impl Direction {
    /// Display name of the direction
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "Left",
            Self::Right => "Right",
            Self::Top => "Top",
            Self::Bottom => "Bottom",
            Self::Center => "Center",
        }
    }

    /// Label for an optional direction; `None` renders as [`UNKNOWN_LABEL`]
    #[must_use]
    pub fn label(direction: Option<Self>) -> &'static str {
        direction.map_or(UNKNOWN_LABEL, Self::as_str)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
