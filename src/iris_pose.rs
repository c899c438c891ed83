//! Iris gaze estimation from eye contour and iris landmark clusters.
//!
//! Each cluster is reduced to an integer centroid. The offset between the
//! midpoint of the two eye centroids and the midpoint of the two iris
//! centroids decides where the eyes are looking, independent of head pose.

use crate::{
    annotate::{FrameAnnotator, EYE_CENTER_COLOR, IRIS_COLOR, TEXT_COLOR},
    config::IrisPoseConfig,
    constants::{
        iris::{LEFT_EYE, LEFT_IRIS, RIGHT_EYE, RIGHT_IRIS},
        DEFAULT_DISTANCE_THRESHOLD, IRIS_TEXT_ROWS, TEXT_MARGIN_X,
    },
    direction::Direction,
    landmarks::{FrameShape, LandmarkSet, PixelPoint},
    Error, Result,
};
use image::RgbImage;

/// Marker thickness for centroids
const MARKER_THICKNESS: u32 = 3;

/// Result of a successful iris estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrisPose {
    /// Classified gaze direction
    pub direction: Direction,
    /// Left iris centroid
    pub left_iris: PixelPoint,
    /// Right iris centroid
    pub right_iris: PixelPoint,
    /// Floor midpoint of the iris centroids
    pub iris_midpoint: PixelPoint,
    /// Left eye contour centroid
    pub left_eye: PixelPoint,
    /// Right eye contour centroid
    pub right_eye: PixelPoint,
    /// Floor midpoint of the eye centroids
    pub eye_midpoint: PixelPoint,
    /// `eye_midpoint.x - iris_midpoint.x`
    pub x_distance: i32,
    /// `eye_midpoint.y - iris_midpoint.y`
    pub y_distance: i32,
}

/// Integer centroid of a landmark cluster in pixels.
///
/// Each landmark is denormalized to integer pixels first and the mean is
/// truncated toward zero. Repeated indices count once per occurrence.
///
/// # Errors
///
/// Returns an error if:
/// - `indices` is empty ([`Error::InvalidInput`])
/// - an index is out of range ([`Error::InsufficientLandmarks`])
pub fn average_coordinates(landmarks: &LandmarkSet, indices: &[usize], shape: FrameShape) -> Result<PixelPoint> {
    if indices.is_empty() {
        return Err(Error::InvalidInput("Cannot average an empty landmark cluster".to_string()));
    }

    let (mut sum_x, mut sum_y) = (0_i64, 0_i64);
    for &index in indices {
        let pixel = landmarks.pixel(index, shape)?;
        sum_x += i64::from(pixel.x);
        sum_y += i64::from(pixel.y);
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)] // Sums of i32 pixels over a few indices
    let mean = |sum: i64| (sum as f64 / indices.len() as f64) as i32;
    Ok(PixelPoint::new(mean(sum_x), mean(sum_y)))
}

/// Classify gaze direction from the eye-to-iris offset.
///
/// The vertical axis is checked first, so `Top`/`Bottom` win over
/// `Left`/`Right` when both exceed the threshold.
#[must_use]
pub fn classify_iris_direction(x_distance: i32, y_distance: i32, threshold: f64) -> Direction {
    let (x, y) = (f64::from(x_distance), f64::from(y_distance));
    if y > threshold {
        Direction::Top
    } else if y < -threshold {
        Direction::Bottom
    } else if x > threshold {
        Direction::Left
    } else if x < -threshold {
        Direction::Right
    } else {
        Direction::Center
    }
}

/// Iris gaze estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrisPoseEstimator {
    distance_threshold: f64,
    draw_overlay: bool,
    annotator: FrameAnnotator,
}

impl Default for IrisPoseEstimator {
    fn default() -> Self {
        Self {
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            draw_overlay: true,
            annotator: FrameAnnotator::default(),
        }
    }
}

impl IrisPoseEstimator {
    /// Create an estimator with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an estimator from configuration
    #[must_use]
    pub fn from_config(config: &IrisPoseConfig, annotator: FrameAnnotator) -> Self {
        Self {
            distance_threshold: config.distance_threshold,
            draw_overlay: config.draw_overlay,
            annotator,
        }
    }

    /// Set the classification threshold in pixels
    #[must_use]
    pub const fn with_distance_threshold(mut self, distance_threshold: f64) -> Self {
        self.distance_threshold = distance_threshold;
        self
    }

    /// Enable or disable overlay drawing
    #[must_use]
    pub const fn with_draw_overlay(mut self, draw_overlay: bool) -> Self {
        self.draw_overlay = draw_overlay;
        self
    }

    /// Classification threshold in pixels
    #[must_use]
    pub const fn distance_threshold(&self) -> f64 {
        self.distance_threshold
    }

    /// Whether overlays are drawn
    #[must_use]
    pub const fn draw_overlay(&self) -> bool {
        self.draw_overlay
    }

    /// Estimate the gaze without touching any frame
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the landmark set lacks iris points ([`Error::InsufficientLandmarks`])
    /// - landmarks lie so far outside the frame that the offset overflows ([`Error::InvalidInput`])
    pub fn estimate(&self, landmarks: &LandmarkSet, shape: FrameShape) -> Result<IrisPose> {
        let left_iris = average_coordinates(landmarks, &LEFT_IRIS, shape)?;
        let right_iris = average_coordinates(landmarks, &RIGHT_IRIS, shape)?;
        let left_eye = average_coordinates(landmarks, &LEFT_EYE, shape)?;
        let right_eye = average_coordinates(landmarks, &RIGHT_EYE, shape)?;

        let iris_midpoint = left_iris.floor_midpoint(right_iris);
        let eye_midpoint = left_eye.floor_midpoint(right_eye);
        let (x_distance, y_distance) = eye_midpoint.checked_offset(iris_midpoint)?;
        let direction = classify_iris_direction(x_distance, y_distance, self.distance_threshold);

        log::debug!("Iris offset x={x_distance} y={y_distance} -> {direction}");

        Ok(IrisPose {
            direction,
            left_iris,
            right_iris,
            iris_midpoint,
            left_eye,
            right_eye,
            eye_midpoint,
            x_distance,
            y_distance,
        })
    }

    /// Estimate the gaze direction and annotate the frame.
    ///
    /// On error the frame is left untouched.
    ///
    /// # Errors
    ///
    /// Same as [`IrisPoseEstimator::estimate`]
    pub fn estimate_direction(&self, frame: &mut RgbImage, landmarks: &LandmarkSet) -> Result<IrisPose> {
        let pose = self.estimate(landmarks, FrameShape::of(frame))?;
        if self.draw_overlay {
            self.annotate(frame, &pose);
        }
        Ok(pose)
    }

    /// Draw centroid markers and the offset rows
    pub fn annotate(&self, frame: &mut RgbImage, pose: &IrisPose) {
        let markers = [
            (pose.left_iris, IRIS_COLOR),
            (pose.right_iris, IRIS_COLOR),
            (pose.eye_midpoint, EYE_CENTER_COLOR),
            (pose.iris_midpoint, IRIS_COLOR),
        ];
        for (point, color) in markers {
            self.annotator.draw_point(frame, point, color, MARKER_THICKNESS);
        }

        let rows = [
            format!("X distance center of eyes and irises: {}", pose.x_distance),
            format!("Y distance center of eyes and irises: {}", pose.y_distance),
            format!("Iris gaze direction: {}", pose.direction),
        ];
        for (text, baseline) in rows.iter().zip(IRIS_TEXT_ROWS) {
            self.annotator
                .put_text(frame, text, PixelPoint::new(TEXT_MARGIN_X, baseline), TEXT_COLOR);
        }
    }
}
