//! Head pose and iris gaze estimation from facial landmarks.
//!
//! Given the 478 normalized landmarks of a refined face mesh and the frame
//! they were detected on, this library estimates:
//! - the head direction, by solving a Perspective-n-Point problem between six
//!   landmarks and a generic 3D face model and thresholding the Euler angles
//! - the iris gaze direction, from the offset between eye contour centroids
//!   and iris centroids
//!
//! Both estimators can draw their results onto the frame. Landmark detection
//! itself is out of scope; landmarks come from any detector that follows the
//! face mesh topology.
//!
//! # Examples
//!
//! ## Head Pose
//!
//! ```no_run
//! use gaze_orientation::{head_pose::HeadPoseEstimator, landmarks::LandmarkSet};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut frame = image::open("face.png")?.to_rgb8();
//! let landmarks = LandmarkSet::from_file("face.txt")?;
//!
//! let estimator = HeadPoseEstimator::new().with_angle_threshold(20.0);
//! let pose = estimator.estimate_direction(&mut frame, &landmarks)?;
//! println!(
//!     "Head {} (x {:.0}, y {:.0}, z {:.0})",
//!     pose.direction, pose.angles.pitch, pose.angles.yaw, pose.angles.roll
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Iris Gaze
//!
//! ```no_run
//! use gaze_orientation::{iris_pose::IrisPoseEstimator, landmarks::{FrameShape, LandmarkSet}};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let landmarks = LandmarkSet::from_file("face.txt")?;
//!
//! // Estimation without drawing
//! let pose = IrisPoseEstimator::new().estimate(&landmarks, FrameShape::new(480, 640))?;
//! println!("Gaze {} ({}, {})", pose.direction, pose.x_distance, pose.y_distance);
//! # Ok(())
//! # }
//! ```
//!
//! ## Complete Pipeline
//!
//! ```no_run
//! use gaze_orientation::{config::Config, gaze::GazeEstimator, landmarks::LandmarkSet};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_file("config.yaml")?;
//! config.validate()?;
//! let estimator = GazeEstimator::from_config(&config);
//!
//! let mut frame = image::open("face.png")?.to_rgb8();
//! estimator.prepare_frame(&mut frame);
//!
//! // Landmarks detected on the prepared frame
//! let landmarks = LandmarkSet::from_file("face.txt")?;
//! let report = estimator.process(&mut frame, Some(&landmarks))?;
//! println!("Head: {}, iris: {}", report.head_label(), report.iris_label());
//! frame.save("annotated.png")?;
//! # Ok(())
//! # }
//! ```

/// Normalized landmarks and pixel denormalization
pub mod landmarks;

/// Approximate pinhole camera
pub mod camera;

/// `PnP` solving and rotation decomposition
pub mod geometry;

/// Direction labels
pub mod direction;

/// Overlay drawing
pub mod annotate;

/// Head pose estimation
pub mod head_pose;

/// Iris gaze estimation
pub mod iris_pose;

/// Combined per-frame estimation
pub mod gaze;

/// Utility functions for numeric conversions
pub mod utils;

/// Error types and result handling
pub mod error;

/// Constants used throughout the library
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
