use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};

/// Rotation angles in degrees as produced by the RQ decomposition
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EulerAngles {
    /// Rotation about the x axis
    pub pitch: f64,
    /// Rotation about the y axis
    pub yaw: f64,
    /// Rotation about the z axis
    pub roll: f64,
}

impl EulerAngles {
    /// Create angles from pitch, yaw and roll in degrees
    #[must_use]
    pub const fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }
}

/// Convert a Rodrigues rotation vector into a rotation matrix
#[must_use]
pub fn rotation_vector_to_matrix(rotation: &Vector3<f64>) -> Matrix3<f64> {
    Rotation3::from_scaled_axis(*rotation).into_inner()
}

/// Convert a rotation matrix into a Rodrigues rotation vector.
///
/// Goes through a unit quaternion so rotations close to a half turn keep a
/// well-defined axis.
#[must_use]
pub fn rotation_matrix_to_vector(matrix: &Matrix3<f64>) -> Vector3<f64> {
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix(matrix)).scaled_axis()
}

/// Givens coefficients `(s, c)` normalised with a `DBL_EPSILON` guard
fn givens(s: f64, c: f64) -> (f64, f64) {
    let z = 1.0 / (c * c + s * s + f64::EPSILON).sqrt();
    (s * z, c * z)
}

fn signed_angle(cos: f64, sin: f64) -> f64 {
    let sign = if sin >= 0.0 { 1.0 } else { -1.0 };
    cos.clamp(-1.0, 1.0).acos().to_degrees() * sign
}

/// Decompose a rotation matrix into x/y/z angles in degrees.
///
/// Three Givens rotations `Qx`, `Qy`, `Qz` are chosen so that
/// `M * Qx * Qy * Qz` is upper triangular, i.e. `M = Rz * Ry * Rx` for a
/// proper rotation. Each angle is read back from its Givens rotation, which
/// keeps yaw in `[-90, 90]` and pitch and roll in `[-180, 180]`.
#[must_use]
pub fn rotation_matrix_to_euler(matrix: &Matrix3<f64>) -> EulerAngles {
    let m = matrix;

    // Zero m[2][1] with a rotation about x
    let (s, c) = givens(m[(2, 1)], m[(2, 2)]);
    let mut qx = Matrix3::new(1.0, 0.0, 0.0, 0.0, c, s, 0.0, -s, c);
    let r = m * qx;

    // Zero r[2][0] with a rotation about y
    let (s, c) = givens(-r[(2, 0)], r[(2, 2)]);
    let mut qy = Matrix3::new(c, 0.0, -s, 0.0, 1.0, 0.0, s, 0.0, c);
    let r = r * qy;

    // Zero r[1][0] with a rotation about z
    let (s, c) = givens(r[(1, 0)], r[(1, 1)]);
    let mut qz = Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0);
    let r = r * qz;

    // Keep the first two diagonal entries of the triangular factor positive
    if r[(0, 0)] < 0.0 {
        if r[(1, 1)] < 0.0 {
            for (i, j) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                qz[(i, j)] *= -1.0;
            }
        } else {
            qz = qz.transpose();
            for (i, j) in [(0, 0), (0, 2), (2, 0), (2, 2)] {
                qy[(i, j)] *= -1.0;
            }
        }
    } else if r[(1, 1)] < 0.0 {
        qz = qz.transpose();
        qy = qy.transpose();
        for (i, j) in [(1, 1), (1, 2), (2, 1), (2, 2)] {
            qx[(i, j)] *= -1.0;
        }
    }

    EulerAngles::new(
        signed_angle(qx[(1, 1)], qx[(1, 2)]),
        signed_angle(qy[(0, 0)], qy[(2, 0)]),
        signed_angle(qz[(0, 0)], qz[(0, 1)]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_angles(pitch: f64, yaw: f64, roll: f64) -> Matrix3<f64> {
        Rotation3::from_euler_angles(pitch.to_radians(), yaw.to_radians(), roll.to_radians()).into_inner()
    }

    #[test]
    fn test_identity_has_zero_angles() {
        let angles = rotation_matrix_to_euler(&Matrix3::identity());
        assert!(angles.pitch.abs() < 1e-4);
        assert!(angles.yaw.abs() < 1e-4);
        assert!(angles.roll.abs() < 1e-4);
    }

    #[test]
    fn test_single_axis_rotations() {
        let angles = rotation_matrix_to_euler(&from_angles(30.0, 0.0, 0.0));
        assert!((angles.pitch - 30.0).abs() < 1e-4);
        assert!(angles.yaw.abs() < 1e-4);

        let angles = rotation_matrix_to_euler(&from_angles(0.0, -40.0, 0.0));
        assert!((angles.yaw + 40.0).abs() < 1e-4);
        assert!(angles.pitch.abs() < 1e-4);

        let angles = rotation_matrix_to_euler(&from_angles(0.0, 0.0, 120.0));
        assert!((angles.roll - 120.0).abs() < 1e-4);
    }

    #[test]
    fn test_combined_rotation_recovers_zyx_angles() {
        let angles = rotation_matrix_to_euler(&from_angles(30.0, 20.0, 10.0));
        assert!((angles.pitch - 30.0).abs() < 1e-4, "pitch {}", angles.pitch);
        assert!((angles.yaw - 20.0).abs() < 1e-4, "yaw {}", angles.yaw);
        assert!((angles.roll - 10.0).abs() < 1e-4, "roll {}", angles.roll);

        let angles = rotation_matrix_to_euler(&from_angles(-15.0, 35.0, -5.0));
        assert!((angles.pitch + 15.0).abs() < 1e-4);
        assert!((angles.yaw - 35.0).abs() < 1e-4);
        assert!((angles.roll + 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_half_turn_about_x() {
        // The face model's y axis points up while image rows grow downward,
        // so a camera-facing head sits near a half turn about x.
        let flip = Matrix3::new(1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, -1.0);
        let angles = rotation_matrix_to_euler(&flip);
        assert!((angles.pitch.abs() - 180.0).abs() < 1e-4);
        assert!(angles.yaw.abs() < 1e-4);
        assert!(angles.roll.abs() < 1e-4);
    }

    #[test]
    fn test_half_turn_rotation_vector() {
        let rvec = Vector3::new(std::f64::consts::PI, 0.0, 0.0);
        let back = rotation_matrix_to_vector(&rotation_vector_to_matrix(&rvec));
        assert!((back.norm() - std::f64::consts::PI).abs() < 1e-9);
        assert!(back.x.abs() > 3.0);
    }

    #[test]
    fn test_rotation_vector_roundtrip() {
        let rvec = Vector3::new(0.2, -0.3, 0.1);
        let matrix = rotation_vector_to_matrix(&rvec);
        assert!((matrix.determinant() - 1.0).abs() < 1e-12);
        assert!((rotation_matrix_to_vector(&matrix) - rvec).norm() < 1e-9);
    }
}
