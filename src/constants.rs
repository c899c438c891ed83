//! Constants used throughout the library
//!
//! Landmark indices follow the 478-point refined face mesh topology (468 mesh
//! points followed by 10 iris points). They are a contract with the upstream
//! landmark detector and are kept here so that a different detector topology
//! only has to touch this file.

/// Number of landmarks produced by the refined face mesh detector
pub const NUM_FACE_MESH_LANDMARKS: usize = 478;

/// Landmark indices used for the head pose solve, in model point order
pub mod head {
    /// Nose tip
    pub const NOSE_TIP: usize = 4;
    /// Chin
    pub const CHIN: usize = 152;
    /// Left eye, outer (left) corner
    pub const LEFT_EYE_OUTER_CORNER: usize = 263;
    /// Right eye, outer (right) corner
    pub const RIGHT_EYE_OUTER_CORNER: usize = 33;
    /// Left mouth corner
    pub const LEFT_MOUTH_CORNER: usize = 287;
    /// Right mouth corner
    pub const RIGHT_MOUTH_CORNER: usize = 57;

    /// Image point indices paired with [`MODEL_POINTS`]
    pub const POSE_LANDMARKS: [usize; 6] = [
        NOSE_TIP,
        CHIN,
        LEFT_EYE_OUTER_CORNER,
        RIGHT_EYE_OUTER_CORNER,
        LEFT_MOUTH_CORNER,
        RIGHT_MOUTH_CORNER,
    ];

    /// Generic anthropometric face model in millimetres, nose tip at the origin
    pub const MODEL_POINTS: [[f64; 3]; 6] = [
        [0.0, 0.0, 0.0],
        [0.0, -330.0, -65.0],
        [-225.0, 170.0, -135.0],
        [225.0, 170.0, -135.0],
        [-150.0, -150.0, -125.0],
        [150.0, -150.0, -125.0],
    ];
}

/// Landmark clusters used by the iris estimator
pub mod iris {
    /// Left iris ring
    pub const LEFT_IRIS: [usize; 4] = [474, 475, 476, 477];

    /// Right iris centre followed by its ring
    pub const RIGHT_IRIS: [usize; 5] = [468, 469, 470, 471, 472];

    /// Left eye contour. 263 appears twice and is weighted accordingly.
    pub const LEFT_EYE: [usize; 17] = [
        263, 249, 390, 373, 374, 380, 381, 382, 362, 263, 466, 388, 387, 386, 385, 384, 398,
    ];

    /// Right eye contour. 33 and 133 appear twice and are weighted accordingly.
    pub const RIGHT_EYE: [usize; 18] = [
        33, 7, 163, 144, 145, 153, 154, 155, 133, 33, 246, 161, 160, 159, 158, 157, 173, 133,
    ];
}

/// Default head pose classification threshold (degrees)
pub const DEFAULT_ANGLE_THRESHOLD: f64 = 25.0;

/// Default iris offset classification threshold (pixels)
pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 3.0;

/// Length of the nose direction line in model space (mm)
pub const DEFAULT_NOSE_LINE_LENGTH: f64 = 500.0;

/// Camera matrix center factor
pub const CAMERA_CENTER_FACTOR: f64 = 2.0;

/// Default Levenberg-Marquardt iteration budget
pub const DEFAULT_SOLVER_MAX_ITERATIONS: usize = 100;

/// Default convergence threshold on the parameter update norm
pub const DEFAULT_SOLVER_EPSILON: f64 = 1e-10;

/// Default RMS reprojection error above which a solve is rejected (pixels)
pub const DEFAULT_MAX_REPROJECTION_ERROR: f64 = 50.0;

/// Text baselines for the head pose overlay (x rotation, y rotation, z rotation, label)
pub const HEAD_TEXT_ROWS: [i32; 4] = [50, 70, 90, 110];

/// Text baselines for the iris overlay (x distance, y distance, label)
pub const IRIS_TEXT_ROWS: [i32; 3] = [150, 170, 190];

/// Left margin of all overlay text
pub const TEXT_MARGIN_X: i32 = 10;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;
