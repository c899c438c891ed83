//! Approximate pinhole camera derived from frame dimensions.

use crate::{constants::CAMERA_CENTER_FACTOR, landmarks::FrameShape};
use nalgebra::{Matrix3, Point2, Point3, Vector3};

/// Pinhole camera with square pixels and no lens distortion.
///
/// The focal length is the frame width and the principal point is the frame
/// centre. It is rebuilt for every frame so a change of resolution never
/// leaves a stale model behind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraModel {
    /// Focal length in pixels
    pub focal_length: f64,
    /// Principal point column
    pub cx: f64,
    /// Principal point row
    pub cy: f64,
}

impl CameraModel {
    /// Build the approximate camera for a frame
    #[must_use]
    pub fn from_frame(shape: FrameShape) -> Self {
        let width = f64::from(shape.width);
        let height = f64::from(shape.height);
        Self {
            focal_length: width,
            cx: width / CAMERA_CENTER_FACTOR,
            cy: height / CAMERA_CENTER_FACTOR,
        }
    }

    /// Intrinsic matrix `K`
    #[must_use]
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.focal_length,
            0.0,
            self.cx,
            0.0,
            self.focal_length,
            self.cy,
            0.0,
            0.0,
            1.0,
        )
    }

    /// Inverse of the intrinsic matrix
    #[must_use]
    pub fn inverse_matrix(&self) -> Matrix3<f64> {
        let f = self.focal_length;
        Matrix3::new(
            1.0 / f,
            0.0,
            -self.cx / f,
            0.0,
            1.0 / f,
            -self.cy / f,
            0.0,
            0.0,
            1.0,
        )
    }

    /// Project a point given in camera coordinates.
    ///
    /// Returns `None` for points on or behind the image plane.
    #[must_use]
    pub fn project(&self, point: &Point3<f64>) -> Option<Point2<f64>> {
        if point.z <= f64::EPSILON || !point.coords.iter().all(|v| v.is_finite()) {
            return None;
        }
        Some(Point2::new(
            self.focal_length * point.x / point.z + self.cx,
            self.focal_length * point.y / point.z + self.cy,
        ))
    }

    /// Back-project a pixel to a ray direction with unit depth
    #[must_use]
    pub fn unproject(&self, pixel: &Point2<f64>) -> Vector3<f64> {
        Vector3::new(
            (pixel.x - self.cx) / self.focal_length,
            (pixel.y - self.cy) / self.focal_length,
            1.0,
        )
    }
}
