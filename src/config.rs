//! Configuration management for gaze estimation

use crate::{
    annotate::{FrameAnnotator, DEFAULT_TEXT_SCALE, MAX_TEXT_SCALE},
    constants::{
        DEFAULT_ANGLE_THRESHOLD, DEFAULT_DISTANCE_THRESHOLD, DEFAULT_MAX_REPROJECTION_ERROR,
        DEFAULT_NOSE_LINE_LENGTH, DEFAULT_SOLVER_EPSILON, DEFAULT_SOLVER_MAX_ITERATIONS,
    },
    geometry::PnpSolver,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Head pose estimation
    pub head_pose: HeadPoseConfig,

    /// Iris gaze estimation
    pub iris_pose: IrisPoseConfig,

    /// Frame preprocessing
    pub input: InputConfig,

    /// Overlay rendering
    pub overlay: OverlayConfig,
}

/// Head pose parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadPoseConfig {
    /// Angle in degrees beyond which the head counts as turned
    pub angle_threshold: f64,

    /// Draw the nose line and angle rows
    pub draw_overlay: bool,

    /// Length of the nose direction line in model millimetres
    pub nose_line_length: f64,

    /// PnP solver settings
    pub solver: SolverConfig,
}

/// PnP solver parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Levenberg-Marquardt iteration budget
    pub max_iterations: usize,

    /// Convergence threshold on the update norm
    pub epsilon: f64,

    /// RMS reprojection error in pixels above which a solve is rejected
    pub max_reprojection_error: f64,
}

/// Iris gaze parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrisPoseConfig {
    /// Eye-to-iris offset in pixels beyond which the gaze counts as averted
    pub distance_threshold: f64,

    /// Draw centroid markers and offset rows
    pub draw_overlay: bool,
}

/// Frame preprocessing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Mirror the frame horizontally before processing (selfie view)
    pub flip_horizontal: bool,
}

/// Overlay rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Pixel size of one font cell
    pub text_scale: u32,
}

impl Default for HeadPoseConfig {
    fn default() -> Self {
        Self {
            angle_threshold: DEFAULT_ANGLE_THRESHOLD,
            draw_overlay: true,
            nose_line_length: DEFAULT_NOSE_LINE_LENGTH,
            solver: SolverConfig::default(),
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_SOLVER_MAX_ITERATIONS,
            epsilon: DEFAULT_SOLVER_EPSILON,
            max_reprojection_error: DEFAULT_MAX_REPROJECTION_ERROR,
        }
    }
}

impl Default for IrisPoseConfig {
    fn default() -> Self {
        Self {
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            draw_overlay: true,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            text_scale: DEFAULT_TEXT_SCALE,
        }
    }
}

impl SolverConfig {
    /// Build a solver from these settings
    #[must_use]
    pub const fn solver(&self) -> PnpSolver {
        PnpSolver::new(self.max_iterations, self.epsilon, self.max_reprojection_error)
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::IoError(e.to_string()))?;

        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content).map_err(|e| Error::IoError(e.to_string()))?;

        Ok(())
    }

    /// Annotator shared by both estimators
    #[must_use]
    pub fn annotator(&self) -> FrameAnnotator {
        FrameAnnotator::new(self.overlay.text_scale)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] naming the first invalid field
    pub fn validate(&self) -> Result<()> {
        // Thresholds
        if !self.head_pose.angle_threshold.is_finite() || self.head_pose.angle_threshold < 0.0 {
            return Err(Error::ConfigError(
                "Angle threshold must be finite and non-negative".to_string(),
            ));
        }
        if !self.iris_pose.distance_threshold.is_finite() || self.iris_pose.distance_threshold < 0.0 {
            return Err(Error::ConfigError(
                "Distance threshold must be finite and non-negative".to_string(),
            ));
        }

        // Head pose geometry
        if !self.head_pose.nose_line_length.is_finite() || self.head_pose.nose_line_length <= 0.0 {
            return Err(Error::ConfigError(
                "Nose line length must be greater than 0".to_string(),
            ));
        }

        // Solver
        let solver = &self.head_pose.solver;
        if solver.max_iterations == 0 {
            return Err(Error::ConfigError(
                "Solver iterations must be greater than 0".to_string(),
            ));
        }
        if !solver.epsilon.is_finite() || solver.epsilon <= 0.0 {
            return Err(Error::ConfigError("Solver epsilon must be greater than 0".to_string()));
        }
        if solver.max_reprojection_error.is_nan() || solver.max_reprojection_error <= 0.0 {
            return Err(Error::ConfigError(
                "Maximum reprojection error must be greater than 0".to_string(),
            ));
        }

        // Overlay
        if self.overlay.text_scale == 0 || self.overlay.text_scale > MAX_TEXT_SCALE {
            return Err(Error::ConfigError(format!(
                "Text scale must be between 1 and {MAX_TEXT_SCALE}"
            )));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r"# Gaze Orientation Configuration

# Head pose estimation
head_pose:
  angle_threshold: 25.0
  draw_overlay: true
  nose_line_length: 500.0
  solver:
    max_iterations: 100
    epsilon: 1.0e-10
    max_reprojection_error: 50.0

# Iris gaze estimation
iris_pose:
  distance_threshold: 3.0
  draw_overlay: true

# Frame preprocessing
input:
  flip_horizontal: false

# Overlay rendering
overlay:
  text_scale: 2
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_matches_defaults() {
        let parsed: Config = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: Config = serde_yaml::from_str("iris_pose:\n  distance_threshold: 5\n").unwrap();
        assert_eq!(parsed.iris_pose.distance_threshold, 5.0);
        assert!(parsed.iris_pose.draw_overlay);
        assert_eq!(parsed.head_pose, HeadPoseConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.head_pose.angle_threshold = -1.0;
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

        let mut config = Config::default();
        config.iris_pose.distance_threshold = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.head_pose.solver.max_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.overlay.text_scale = 0;
        assert!(config.validate().is_err());

        // Larger cells would make the 20 px overlay rows overlap
        config.overlay.text_scale = MAX_TEXT_SCALE + 1;
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
        config.overlay.text_scale = MAX_TEXT_SCALE;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_solver_from_config() {
        assert_eq!(SolverConfig::default().solver(), PnpSolver::default());
    }
}
