//! Helper functions and utilities for tests
#![allow(dead_code)]

use gaze_orientation::{
    camera::CameraModel,
    constants::{
        head::{MODEL_POINTS, POSE_LANDMARKS},
        iris::{LEFT_EYE, LEFT_IRIS, RIGHT_EYE, RIGHT_IRIS},
        NUM_FACE_MESH_LANDMARKS,
    },
    geometry::{euler::rotation_matrix_to_vector, PnpSolution},
    landmarks::{FrameShape, Landmark, LandmarkSet},
};
use image::{Rgb, RgbImage};
use nalgebra::{Point3, Rotation3, Vector3};

/// Frame size used by most tests
pub const SHAPE: FrameShape = FrameShape::new(480, 640);

/// Distance of the synthetic head from the camera in model millimetres
pub const HEAD_DISTANCE: f64 = 1000.0;

/// Create a uniformly coloured test frame
pub fn create_test_frame(shape: FrameShape) -> RgbImage {
    RgbImage::from_pixel(shape.width, shape.height, Rgb([255, 255, 255]))
}

/// Rotation of a head facing the camera and turned by the given angles in degrees.
///
/// The face model has y up while image rows grow downward, so facing the
/// camera is a half turn about x.
pub fn head_rotation(pitch: f64, yaw: f64, roll: f64) -> Vector3<f64> {
    let rotation = Rotation3::from_euler_angles(
        std::f64::consts::PI + pitch.to_radians(),
        yaw.to_radians(),
        roll.to_radians(),
    );
    rotation_matrix_to_vector(rotation.matrix())
}

/// Landmark at pixel `(x, y)`, placed mid-pixel so denormalization lands on it
#[allow(clippy::cast_possible_truncation)]
pub fn landmark_at(x: f64, y: f64, shape: FrameShape) -> Landmark {
    Landmark::new(
        ((x + 0.5) / f64::from(shape.width)) as f32,
        ((y + 0.5) / f64::from(shape.height)) as f32,
        0.0,
    )
}

/// Full face mesh with every landmark at the frame centre
pub fn centered_landmarks() -> Vec<Landmark> {
    vec![Landmark::new(0.5, 0.5, 0.0); NUM_FACE_MESH_LANDMARKS]
}

/// Place the six head pose landmarks by projecting the face model through a pose
pub fn place_head(points: &mut [Landmark], rotation: Vector3<f64>, translation: Vector3<f64>, shape: FrameShape) {
    let camera = CameraModel::from_frame(shape);
    let pose = PnpSolution {
        rotation,
        translation,
        rms_error: 0.0,
        iterations: 0,
    };
    for (model, &index) in MODEL_POINTS.iter().zip(POSE_LANDMARKS.iter()) {
        let projected = pose
            .project(&camera, &Point3::new(model[0], model[1], model[2]))
            .expect("synthetic head must be in front of the camera");
        #[allow(clippy::cast_possible_truncation)]
        let normalized = Landmark::new(
            (projected.x / f64::from(shape.width)) as f32,
            (projected.y / f64::from(shape.height)) as f32,
            0.0,
        );
        points[index] = normalized;
    }
}

/// Landmark set for a head turned by the given angles, centred in the frame
pub fn synthetic_head(pitch: f64, yaw: f64, roll: f64, shape: FrameShape) -> LandmarkSet {
    let mut points = centered_landmarks();
    place_head(
        &mut points,
        head_rotation(pitch, yaw, roll),
        Vector3::new(0.0, 0.0, HEAD_DISTANCE),
        shape,
    );
    LandmarkSet::new(points)
}

/// Pixel positions of the four iris estimator clusters
#[derive(Debug, Clone, Copy)]
pub struct EyeLayout {
    pub left_eye: (f64, f64),
    pub right_eye: (f64, f64),
    pub left_iris: (f64, f64),
    pub right_iris: (f64, f64),
}

impl EyeLayout {
    /// Both irises at `iris`, both eye contours at `eye`
    pub fn uniform(eye: (f64, f64), iris: (f64, f64)) -> Self {
        Self {
            left_eye: eye,
            right_eye: eye,
            left_iris: iris,
            right_iris: iris,
        }
    }
}

/// Place every landmark of each eye and iris cluster on its layout position
pub fn place_eyes(points: &mut [Landmark], layout: EyeLayout, shape: FrameShape) {
    let clusters: [(&[usize], (f64, f64)); 4] = [
        (&LEFT_EYE, layout.left_eye),
        (&RIGHT_EYE, layout.right_eye),
        (&LEFT_IRIS, layout.left_iris),
        (&RIGHT_IRIS, layout.right_iris),
    ];
    for (indices, (x, y)) in clusters {
        for &index in indices {
            points[index] = landmark_at(x, y, shape);
        }
    }
}

/// Landmark set with only the eye and iris clusters placed
pub fn synthetic_eyes(layout: EyeLayout, shape: FrameShape) -> LandmarkSet {
    let mut points = centered_landmarks();
    place_eyes(&mut points, layout, shape);
    LandmarkSet::new(points)
}
