//! Head pose estimation from six facial landmarks.
//!
//! The nose tip, chin, outer eye corners and mouth corners are paired with a
//! generic 3D face model and solved as a Perspective-n-Point problem against
//! an approximate camera. The rotation is decomposed into x (pitch), y (yaw)
//! and z (roll) angles which are then thresholded into a [`Direction`].

use crate::{
    annotate::{FrameAnnotator, NOSE_LINE_COLOR, TEXT_COLOR},
    camera::CameraModel,
    config::HeadPoseConfig,
    constants::{
        head::{MODEL_POINTS, NOSE_TIP, POSE_LANDMARKS},
        DEFAULT_ANGLE_THRESHOLD, DEFAULT_NOSE_LINE_LENGTH, HEAD_TEXT_ROWS, TEXT_MARGIN_X,
    },
    direction::Direction,
    geometry::{rotation_matrix_to_euler, EulerAngles, PnpSolution, PnpSolver},
    landmarks::{FrameShape, LandmarkSet, PixelPoint},
    utils::safe_cast::f64_to_i32,
    Result,
};
use image::RgbImage;
use nalgebra::{Point2, Point3};

/// Line thickness of the nose direction overlay
const NOSE_LINE_THICKNESS: u32 = 2;

/// Result of a successful head pose estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPose {
    /// Classified head direction
    pub direction: Direction,
    /// Rotation angles in degrees
    pub angles: EulerAngles,
    /// Rotation and translation mapping model space into camera space
    pub solution: PnpSolution,
    /// Nose tip in pixels
    pub nose_tip: PixelPoint,
    /// Projection of a point in front of the nose, if it lies in front of the camera
    pub nose_end: Option<PixelPoint>,
}

/// Classify head direction from rotation angles.
///
/// Branches are tried in order and the first match wins, so yaw takes
/// precedence over pitch when both exceed the threshold.
#[must_use]
pub fn classify_head_direction(angles: EulerAngles, threshold: f64) -> Direction {
    if angles.yaw > threshold {
        Direction::Left
    } else if angles.yaw < -threshold {
        Direction::Right
    } else if angles.pitch > threshold {
        Direction::Bottom
    } else if angles.pitch < -threshold {
        Direction::Top
    } else {
        Direction::Center
    }
}

/// Head pose estimator.
///
/// Holds configuration only; every call builds its own camera model and
/// solve, so one value can be shared across threads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPoseEstimator {
    angle_threshold: f64,
    draw_overlay: bool,
    nose_line_length: f64,
    solver: PnpSolver,
    annotator: FrameAnnotator,
}

impl Default for HeadPoseEstimator {
    fn default() -> Self {
        Self {
            angle_threshold: DEFAULT_ANGLE_THRESHOLD,
            draw_overlay: true,
            nose_line_length: DEFAULT_NOSE_LINE_LENGTH,
            solver: PnpSolver::default(),
            annotator: FrameAnnotator::default(),
        }
    }
}

impl HeadPoseEstimator {
    /// Create an estimator with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an estimator from configuration
    #[must_use]
    pub fn from_config(config: &HeadPoseConfig, annotator: FrameAnnotator) -> Self {
        Self {
            angle_threshold: config.angle_threshold,
            draw_overlay: config.draw_overlay,
            nose_line_length: config.nose_line_length,
            solver: config.solver.solver(),
            annotator,
        }
    }

    /// Set the classification threshold in degrees
    #[must_use]
    pub const fn with_angle_threshold(mut self, angle_threshold: f64) -> Self {
        self.angle_threshold = angle_threshold;
        self
    }

    /// Enable or disable overlay drawing
    #[must_use]
    pub const fn with_draw_overlay(mut self, draw_overlay: bool) -> Self {
        self.draw_overlay = draw_overlay;
        self
    }

    /// Set the length of the nose direction line in model millimetres
    #[must_use]
    pub const fn with_nose_line_length(mut self, nose_line_length: f64) -> Self {
        self.nose_line_length = nose_line_length;
        self
    }

    /// Replace the PnP solver settings
    #[must_use]
    pub const fn with_solver(mut self, solver: PnpSolver) -> Self {
        self.solver = solver;
        self
    }

    /// Classification threshold in degrees
    #[must_use]
    pub const fn angle_threshold(&self) -> f64 {
        self.angle_threshold
    }

    /// Whether overlays are drawn
    #[must_use]
    pub const fn draw_overlay(&self) -> bool {
        self.draw_overlay
    }

    /// The six pose landmarks in pixels, in model point order
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InsufficientLandmarks`] if any of the six is missing
    pub fn image_points(landmarks: &LandmarkSet, shape: FrameShape) -> Result<[PixelPoint; 6]> {
        let mut points = [PixelPoint::default(); 6];
        for (slot, &index) in points.iter_mut().zip(POSE_LANDMARKS.iter()) {
            *slot = landmarks.pixel(index, shape)?;
        }
        Ok(points)
    }

    /// Estimate the head pose without touching any frame
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - a pose landmark is missing ([`crate::Error::InsufficientLandmarks`])
    /// - the solve fails or is degenerate ([`crate::Error::PoseSolveFailure`])
    pub fn estimate(&self, landmarks: &LandmarkSet, shape: FrameShape) -> Result<HeadPose> {
        let pixels = Self::image_points(landmarks, shape)?;
        let image_points: Vec<Point2<f64>> = pixels
            .iter()
            .map(|p| Point2::new(f64::from(p.x), f64::from(p.y)))
            .collect();
        let model_points: Vec<Point3<f64>> = MODEL_POINTS.iter().map(|p| Point3::new(p[0], p[1], p[2])).collect();

        let camera = CameraModel::from_frame(shape);
        let solution = self.solver.solve(&model_points, &image_points, &camera)?;

        let angles = rotation_matrix_to_euler(&solution.rotation_matrix());
        let direction = classify_head_direction(angles, self.angle_threshold);

        let nose_end = solution
            .project(&camera, &Point3::new(0.0, 0.0, self.nose_line_length))
            .and_then(|p| Some(PixelPoint::new(f64_to_i32(p.x).ok()?, f64_to_i32(p.y).ok()?)));

        log::debug!(
            "Head rotation x={:.1} y={:.1} z={:.1} -> {}",
            angles.pitch,
            angles.yaw,
            angles.roll,
            direction
        );

        Ok(HeadPose {
            direction,
            angles,
            solution,
            nose_tip: landmarks.pixel(NOSE_TIP, shape)?,
            nose_end,
        })
    }

    /// Estimate the head direction and annotate the frame.
    ///
    /// On error the frame is left untouched.
    ///
    /// # Errors
    ///
    /// Same as [`HeadPoseEstimator::estimate`]
    pub fn estimate_direction(&self, frame: &mut RgbImage, landmarks: &LandmarkSet) -> Result<HeadPose> {
        let pose = self.estimate(landmarks, FrameShape::of(frame))?;
        if self.draw_overlay {
            self.annotate(frame, &pose);
        }
        Ok(pose)
    }

    /// Draw the nose direction line and the angle rows
    pub fn annotate(&self, frame: &mut RgbImage, pose: &HeadPose) {
        if let Some(nose_end) = pose.nose_end {
            self.annotator
                .draw_line(frame, pose.nose_tip, nose_end, NOSE_LINE_COLOR, NOSE_LINE_THICKNESS);
        }

        let rows = [
            format!("Head x rotation: {:.0}", pose.angles.pitch),
            format!("Head y rotation: {:.0}", pose.angles.yaw),
            format!("Head z rotation: {:.0}", pose.angles.roll),
            format!("Head pose: {}", pose.direction),
        ];
        for (text, baseline) in rows.iter().zip(HEAD_TEXT_ROWS) {
            self.annotator
                .put_text(frame, text, PixelPoint::new(TEXT_MARGIN_X, baseline), TEXT_COLOR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify_yaw_before_pitch() {
        assert_eq!(classify_head_direction(EulerAngles::new(0.0, 30.0, 0.0), 25.0), Direction::Left);
        assert_eq!(classify_head_direction(EulerAngles::new(30.0, 0.0, 0.0), 25.0), Direction::Bottom);
        assert_eq!(classify_head_direction(EulerAngles::new(30.0, -30.0, 0.0), 25.0), Direction::Right);
    }

    #[test]
    fn test_classify_remaining_branches() {
        assert_eq!(classify_head_direction(EulerAngles::new(-30.0, 0.0, 0.0), 25.0), Direction::Top);
        assert_eq!(classify_head_direction(EulerAngles::new(10.0, -10.0, 80.0), 25.0), Direction::Center);
        // Threshold itself is not exceeded
        assert_eq!(classify_head_direction(EulerAngles::new(25.0, 25.0, 0.0), 25.0), Direction::Center);
    }

    #[test]
    fn test_missing_landmarks() {
        let landmarks = LandmarkSet::new(vec![crate::landmarks::Landmark::new(0.5, 0.5, 0.0); 200]);
        let result = HeadPoseEstimator::new().estimate(&landmarks, FrameShape::new(480, 640));
        assert!(matches!(
            result,
            Err(crate::Error::InsufficientLandmarks { index: 263, available: 200 })
        ));
    }

    #[test]
    fn test_builder_settings() {
        let estimator = HeadPoseEstimator::new().with_angle_threshold(10.0).with_draw_overlay(false);
        assert_eq!(estimator.angle_threshold(), 10.0);
        assert!(!estimator.draw_overlay());
    }

    proptest! {
        #[test]
        fn prop_yaw_beyond_threshold_dominates_pitch(
            yaw in 25.001f64..180.0,
            pitch in -180.0f64..180.0,
            roll in -180.0f64..180.0,
        ) {
            prop_assert_eq!(classify_head_direction(EulerAngles::new(pitch, yaw, roll), 25.0), Direction::Left);
            prop_assert_eq!(classify_head_direction(EulerAngles::new(pitch, -yaw, roll), 25.0), Direction::Right);
        }
    }
}
