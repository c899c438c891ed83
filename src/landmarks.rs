//! Facial landmark containers and coordinate denormalization.
//!
//! Landmarks arrive from the external detector normalized to `[0, 1]` relative
//! to the frame width and height. Both estimators convert them to pixels with
//! the same [`denormalize`] so head and iris computations round identically.

use crate::{Error, Result};
use image::RgbImage;
use std::fs;
use std::path::Path;

/// A single normalized landmark
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Landmark {
    /// Horizontal position relative to frame width
    pub x: f32,
    /// Vertical position relative to frame height
    pub y: f32,
    /// Relative depth, carried but unused
    pub z: f32,
}

impl Landmark {
    /// Create a landmark from normalized coordinates
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Frame dimensions as `(height, width)` in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameShape {
    /// Number of pixel rows
    pub height: u32,
    /// Number of pixel columns
    pub width: u32,
}

impl FrameShape {
    /// Create a shape from height and width
    #[must_use]
    pub const fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    /// Shape of an image buffer
    #[must_use]
    pub fn of(frame: &RgbImage) -> Self {
        Self::new(frame.height(), frame.width())
    }
}

/// Integer pixel coordinate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PixelPoint {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl PixelPoint {
    /// Create a pixel point
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Integer midpoint using floor division on each axis
    #[must_use]
    pub fn floor_midpoint(self, other: Self) -> Self {
        Self::new(floor_half_sum(self.x, other.x), floor_half_sum(self.y, other.y))
    }

    /// Component-wise `self - other`
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if either difference overflows
    pub fn checked_offset(self, other: Self) -> Result<(i32, i32)> {
        match (self.x.checked_sub(other.x), self.y.checked_sub(other.y)) {
            (Some(dx), Some(dy)) => Ok((dx, dy)),
            _ => Err(Error::InvalidInput(format!(
                "Offset between ({}, {}) and ({}, {}) is out of range",
                self.x, self.y, other.x, other.y
            ))),
        }
    }
}

/// `floor((a + b) / 2)` without forming the sum
const fn floor_half_sum(a: i32, b: i32) -> i32 {
    (a >> 1) + (b >> 1) + (a & b & 1)
}

/// Convert a normalized landmark to pixel coordinates, truncating toward zero.
///
/// Non-finite or out-of-range products saturate instead of failing.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Truncation is the defined rounding
pub fn denormalize(landmark: &Landmark, shape: FrameShape) -> PixelPoint {
    PixelPoint::new(
        (f64::from(landmark.x) * f64::from(shape.width)) as i32,
        (f64::from(landmark.y) * f64::from(shape.height)) as i32,
    )
}

/// Ordered landmark set for one detected face
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    /// Wrap an ordered list of landmarks
    #[must_use]
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    /// Number of landmarks in the set
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the set holds no landmarks
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All landmarks in detector order
    #[must_use]
    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    /// Landmark at `index`
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientLandmarks`] when the index is not present
    pub fn get(&self, index: usize) -> Result<&Landmark> {
        self.points.get(index).ok_or(Error::InsufficientLandmarks {
            index,
            available: self.points.len(),
        })
    }

    /// Landmark at `index` converted to pixels
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientLandmarks`] when the index is not present
    pub fn pixel(&self, index: usize, shape: FrameShape) -> Result<PixelPoint> {
        self.get(index).map(|landmark| denormalize(landmark, shape))
    }

    /// Check that every index is present, reporting the first one missing
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientLandmarks`] for the first absent index
    pub fn require(&self, indices: &[usize]) -> Result<()> {
        indices.iter().try_for_each(|&index| self.get(index).map(|_| ()))
    }

    /// Parse landmarks from text, one `x y [z]` triple per line.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the first malformed line
    pub fn parse(content: &str) -> Result<Self> {
        let mut points = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let values = line
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|field| !field.is_empty())
                .map(str::parse::<f32>)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::InvalidInput(format!("Line {}: {e}", line_no + 1)))?;

            if let Some(value) = values.iter().find(|v| !v.is_finite()) {
                return Err(Error::InvalidInput(format!(
                    "Line {}: coordinate {value} is not finite",
                    line_no + 1
                )));
            }

            let landmark = match values.as_slice() {
                [x, y] => Landmark::new(*x, *y, 0.0),
                [x, y, z] => Landmark::new(*x, *y, *z),
                _ => {
                    return Err(Error::InvalidInput(format!(
                        "Line {}: expected 2 or 3 values, got {}",
                        line_no + 1,
                        values.len()
                    )))
                }
            };
            points.push(landmark);
        }

        Ok(Self::new(points))
    }

    /// Load landmarks from a text file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        log::info!("Loading landmarks from: {}", path.as_ref().display());
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }
}

impl From<Vec<Landmark>> for LandmarkSet {
    fn from(points: Vec<Landmark>) -> Self {
        Self::new(points)
    }
}
