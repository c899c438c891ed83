//! Combined head and iris estimation for one frame.

use crate::{
    config::Config,
    direction::Direction,
    head_pose::{HeadPose, HeadPoseEstimator},
    iris_pose::{IrisPose, IrisPoseEstimator},
    landmarks::LandmarkSet,
    Result,
};
use image::{imageops, RgbImage};

/// Outcome of one frame; `None` means that estimator produced no label
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GazeReport {
    /// Head pose, if it could be estimated
    pub head: Option<HeadPose>,
    /// Iris gaze, if it could be estimated
    pub iris: Option<IrisPose>,
}

impl GazeReport {
    /// Head direction label, `"Unknown"` when absent
    #[must_use]
    pub fn head_label(&self) -> &'static str {
        Direction::label(self.head.map(|h| h.direction))
    }

    /// Iris direction label, `"Unknown"` when absent
    #[must_use]
    pub fn iris_label(&self) -> &'static str {
        Direction::label(self.iris.map(|i| i.direction))
    }
}

/// Runs the head pose estimator and then the iris estimator on the same frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GazeEstimator {
    head: HeadPoseEstimator,
    iris: IrisPoseEstimator,
    flip_horizontal: bool,
}

impl GazeEstimator {
    /// Combine two configured estimators
    #[must_use]
    pub const fn new(head: HeadPoseEstimator, iris: IrisPoseEstimator) -> Self {
        Self {
            head,
            iris,
            flip_horizontal: false,
        }
    }

    /// Build both estimators from configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let annotator = config.annotator();
        log::info!(
            "Gaze estimator: angle threshold {}, distance threshold {}, flip {}",
            config.head_pose.angle_threshold,
            config.iris_pose.distance_threshold,
            config.input.flip_horizontal
        );
        Self {
            head: HeadPoseEstimator::from_config(&config.head_pose, annotator),
            iris: IrisPoseEstimator::from_config(&config.iris_pose, annotator),
            flip_horizontal: config.input.flip_horizontal,
        }
    }

    /// Mirror frames before processing
    #[must_use]
    pub const fn with_flip_horizontal(mut self, flip_horizontal: bool) -> Self {
        self.flip_horizontal = flip_horizontal;
        self
    }

    /// Head pose estimator in use
    #[must_use]
    pub const fn head(&self) -> &HeadPoseEstimator {
        &self.head
    }

    /// Iris estimator in use
    #[must_use]
    pub const fn iris(&self) -> &IrisPoseEstimator {
        &self.iris
    }

    /// Apply input preprocessing.
    ///
    /// Call this before running the landmark detector so that landmarks and
    /// the processed frame share one orientation.
    pub fn prepare_frame(&self, frame: &mut RgbImage) {
        if self.flip_horizontal {
            imageops::flip_horizontal_in_place(frame);
        }
    }

    /// Estimate head and iris direction and annotate the frame.
    ///
    /// `landmarks` is `None` when no face was detected, in which case the
    /// frame is left as is and both labels are absent. A recoverable failure
    /// of one estimator is logged and does not stop the other.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures that are not per-frame conditions
    pub fn process(&self, frame: &mut RgbImage, landmarks: Option<&LandmarkSet>) -> Result<GazeReport> {
        let Some(landmarks) = landmarks else {
            log::debug!("No face in frame");
            return Ok(GazeReport::default());
        };

        let head = recover("Head pose", self.head.estimate_direction(frame, landmarks))?;
        let iris = recover("Iris pose", self.iris.estimate_direction(frame, landmarks))?;

        Ok(GazeReport { head, iris })
    }
}

fn recover<T>(stage: &str, result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_recoverable() => {
            log::warn!("{stage} estimation skipped: {e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
