use super::euler::{rotation_matrix_to_vector, rotation_vector_to_matrix};
use crate::{
    camera::CameraModel,
    constants::{DEFAULT_MAX_REPROJECTION_ERROR, DEFAULT_SOLVER_EPSILON, DEFAULT_SOLVER_MAX_ITERATIONS, EPSILON},
    Error, Result,
};
use nalgebra::{
    Const, DMatrix, DVector, Dyn, Matrix3, Matrix3x4, Matrix4, Matrix6, OMatrix, Point2, Point3, Rotation3, Vector3,
    Vector6,
};

/// Minimum number of correspondences for the linear initialisation
pub const MIN_CORRESPONDENCES: usize = 6;

/// Largest damping factor tried before the refinement gives up on a step
const MAX_DAMPING: f64 = 1e12;

/// Camera pose mapping model space into camera space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PnpSolution {
    /// Rodrigues rotation vector
    pub rotation: Vector3<f64>,
    /// Translation in model units
    pub translation: Vector3<f64>,
    /// Root mean square reprojection error in pixels
    pub rms_error: f64,
    /// Refinement iterations spent on the selected candidate
    pub iterations: usize,
}

impl PnpSolution {
    /// Rotation as a matrix
    #[must_use]
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        rotation_vector_to_matrix(&self.rotation)
    }

    /// Transform a model point into camera coordinates
    #[must_use]
    pub fn transform(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation_matrix() * point.coords + self.translation)
    }

    /// Project a model point into the image
    #[must_use]
    pub fn project(&self, camera: &CameraModel, point: &Point3<f64>) -> Option<Point2<f64>> {
        camera.project(&self.transform(point))
    }

    /// Per-point reprojection distance in pixels
    #[must_use]
    pub fn reprojection_errors(
        &self,
        camera: &CameraModel,
        object_points: &[Point3<f64>],
        image_points: &[Point2<f64>],
    ) -> Vec<f64> {
        object_points
            .iter()
            .zip(image_points)
            .map(|(object, image)| {
                self.project(camera, object)
                    .map_or(f64::INFINITY, |projected| (projected - image).norm())
            })
            .collect()
    }
}

/// Iterative Perspective-n-Point solver.
///
/// Candidate poses come from a direct linear transform and from two fixed
/// orientation priors; each is refined with Levenberg-Marquardt on the
/// reprojection error and the lowest-cost candidate in front of the camera
/// wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PnpSolver {
    /// Refinement iteration budget per candidate
    pub max_iterations: usize,
    /// Convergence threshold on the relative parameter update
    pub epsilon: f64,
    /// RMS reprojection error above which the solve is rejected (pixels)
    pub max_reprojection_error: f64,
}

impl Default for PnpSolver {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_SOLVER_MAX_ITERATIONS,
            epsilon: DEFAULT_SOLVER_EPSILON,
            max_reprojection_error: DEFAULT_MAX_REPROJECTION_ERROR,
        }
    }
}

/// Pose parameters `[rx, ry, rz, tx, ty, tz]`
type PoseParams = Vector6<f64>;

fn pose_params(rotation: &Vector3<f64>, translation: &Vector3<f64>) -> PoseParams {
    Vector6::new(
        rotation.x,
        rotation.y,
        rotation.z,
        translation.x,
        translation.y,
        translation.z,
    )
}

fn split_params(params: &PoseParams) -> (Vector3<f64>, Vector3<f64>) {
    (
        Vector3::new(params[0], params[1], params[2]),
        Vector3::new(params[3], params[4], params[5]),
    )
}

/// Stacked `(u, v)` residuals, `None` when a point falls behind the camera
fn residuals(
    params: &PoseParams,
    camera: &CameraModel,
    object_points: &[Point3<f64>],
    image_points: &[Point2<f64>],
) -> Option<DVector<f64>> {
    let (rotation, translation) = split_params(params);
    let matrix = rotation_vector_to_matrix(&rotation);

    let mut out = DVector::zeros(2 * object_points.len());
    for (i, (object, image)) in object_points.iter().zip(image_points).enumerate() {
        let projected = camera.project(&Point3::from(matrix * object.coords + translation))?;
        out[2 * i] = projected.x - image.x;
        out[2 * i + 1] = projected.y - image.y;
    }
    Some(out)
}

/// Central-difference Jacobian of the residuals
fn jacobian(
    params: &PoseParams,
    camera: &CameraModel,
    object_points: &[Point3<f64>],
    image_points: &[Point2<f64>],
) -> Option<OMatrix<f64, Dyn, Const<6>>> {
    let rows = 2 * object_points.len();
    let mut jac = OMatrix::<f64, Dyn, Const<6>>::zeros_generic(Dyn(rows), Const::<6>);

    for col in 0..6 {
        let step = 1e-6 * params[col].abs().max(1.0);
        let mut forward = *params;
        let mut backward = *params;
        forward[col] += step;
        backward[col] -= step;

        let r_forward = residuals(&forward, camera, object_points, image_points)?;
        let r_backward = residuals(&backward, camera, object_points, image_points)?;
        for row in 0..rows {
            jac[(row, col)] = (r_forward[row] - r_backward[row]) / (2.0 * step);
        }
    }
    Some(jac)
}

/// Translate to the centroid and scale so the mean distance is `sqrt(dim)`
fn normalize_image_points(points: &[Point2<f64>]) -> (Matrix3<f64>, Vec<Point2<f64>>) {
    let n = points.len() as f64;
    let centroid = points.iter().fold(Vector3::zeros(), |acc, p| acc + Vector3::new(p.x, p.y, 0.0)) / n;
    let mean_dist = points
        .iter()
        .map(|p| ((p.x - centroid.x).powi(2) + (p.y - centroid.y).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    let s = if mean_dist > EPSILON { std::f64::consts::SQRT_2 / mean_dist } else { 1.0 };

    let t = Matrix3::new(s, 0.0, -s * centroid.x, 0.0, s, -s * centroid.y, 0.0, 0.0, 1.0);
    let normalized = points
        .iter()
        .map(|p| Point2::new(s * (p.x - centroid.x), s * (p.y - centroid.y)))
        .collect();
    (t, normalized)
}

fn normalize_object_points(points: &[Point3<f64>]) -> (Matrix4<f64>, Vec<Point3<f64>>) {
    let n = points.len() as f64;
    let centroid = points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / n;
    let mean_dist = points.iter().map(|p| (p.coords - centroid).norm()).sum::<f64>() / n;
    let s = if mean_dist > EPSILON { 3.0_f64.sqrt() / mean_dist } else { 1.0 };

    #[rustfmt::skip]
    let t = Matrix4::new(
        s, 0.0, 0.0, -s * centroid.x,
        0.0, s, 0.0, -s * centroid.y,
        0.0, 0.0, s, -s * centroid.z,
        0.0, 0.0, 0.0, 1.0,
    );
    let normalized = points.iter().map(|p| Point3::from((p.coords - centroid) * s)).collect();
    (t, normalized)
}

/// Whether the image points span a 2D region rather than a line or a point
fn image_points_span_plane(points: &[Point2<f64>]) -> bool {
    let n = points.len() as f64;
    let (mx, my) = points.iter().fold((0.0, 0.0), |(x, y), p| (x + p.x, y + p.y));
    let (mx, my) = (mx / n, my / n);

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for p in points {
        let (dx, dy) = (p.x - mx, p.y - my);
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    // Eigenvalues of the 2x2 scatter matrix
    let trace = sxx + syy;
    let det = sxx * syy - sxy * sxy;
    let disc = (trace * trace / 4.0 - det).max(0.0).sqrt();
    let largest = trace / 2.0 + disc;
    let smallest = trace / 2.0 - disc;

    largest > EPSILON && smallest > 1e-6 * largest
}

impl PnpSolver {
    /// Create a solver with explicit refinement settings
    #[must_use]
    pub const fn new(max_iterations: usize, epsilon: f64, max_reprojection_error: f64) -> Self {
        Self {
            max_iterations,
            epsilon,
            max_reprojection_error,
        }
    }

    /// Solve for the pose that maps `object_points` onto `image_points`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoseSolveFailure`] if:
    /// - fewer than six correspondences are given or the counts differ
    /// - any coordinate is not finite
    /// - the image points are coincident or collinear
    /// - no candidate converges in front of the camera within the error bound
    pub fn solve(
        &self,
        object_points: &[Point3<f64>],
        image_points: &[Point2<f64>],
        camera: &CameraModel,
    ) -> Result<PnpSolution> {
        if object_points.len() != image_points.len() {
            return Err(Error::PoseSolveFailure(format!(
                "Mismatched correspondences: {} model points, {} image points",
                object_points.len(),
                image_points.len()
            )));
        }
        if object_points.len() < MIN_CORRESPONDENCES {
            return Err(Error::PoseSolveFailure(format!(
                "Expected at least {} correspondences, got {}",
                MIN_CORRESPONDENCES,
                object_points.len()
            )));
        }
        let finite = object_points.iter().all(|p| p.coords.iter().all(|v| v.is_finite()))
            && image_points.iter().all(|p| p.coords.iter().all(|v| v.is_finite()));
        if !finite {
            return Err(Error::PoseSolveFailure("Non-finite correspondence".to_string()));
        }
        if !image_points_span_plane(image_points) {
            return Err(Error::PoseSolveFailure(
                "Image points are coincident or collinear".to_string(),
            ));
        }

        let mut candidates = Vec::with_capacity(3);
        if let Some(initial) = Self::linear_initial_pose(object_points, image_points, camera) {
            candidates.push(initial);
        }
        for orientation in [Rotation3::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI), Rotation3::identity()] {
            if let Some(prior) = Self::prior_pose(&orientation, object_points, image_points, camera) {
                candidates.push(prior);
            }
        }

        let best = candidates
            .iter()
            .filter_map(|initial| self.refine(initial, camera, object_points, image_points))
            .filter(|solution| {
                object_points
                    .iter()
                    .all(|p| solution.transform(p).z > EPSILON)
            })
            .min_by(|a, b| a.rms_error.total_cmp(&b.rms_error))
            .ok_or_else(|| Error::PoseSolveFailure("No candidate pose converged".to_string()))?;

        if !best.rms_error.is_finite() || best.rms_error > self.max_reprojection_error {
            return Err(Error::PoseSolveFailure(format!(
                "Reprojection error {:.2}px exceeds {:.2}px",
                best.rms_error, self.max_reprojection_error
            )));
        }

        log::debug!(
            "PnP solved: rvec=({:.4}, {:.4}, {:.4}) tvec=({:.1}, {:.1}, {:.1}) rms={:.4}px after {} iterations",
            best.rotation.x,
            best.rotation.y,
            best.rotation.z,
            best.translation.x,
            best.translation.y,
            best.translation.z,
            best.rms_error,
            best.iterations
        );

        Ok(best)
    }

    /// Direct linear transform of the full projection matrix.
    ///
    /// Needs at least six non-coplanar model points; returns `None` when the
    /// linear system is degenerate or the points land behind the camera.
    fn linear_initial_pose(
        object_points: &[Point3<f64>],
        image_points: &[Point2<f64>],
        camera: &CameraModel,
    ) -> Option<PoseParams> {
        let n = object_points.len();
        let (t_img, img_n) = normalize_image_points(image_points);
        let (t_obj, obj_n) = normalize_object_points(object_points);

        // Build 2n x 12 system A p = 0
        let mut a = DMatrix::zeros(2 * n, 12);
        for i in 0..n {
            let x = [obj_n[i].x, obj_n[i].y, obj_n[i].z, 1.0];
            let (u, v) = (img_n[i].x, img_n[i].y);
            for k in 0..4 {
                a[(2 * i, k)] = x[k];
                a[(2 * i, 8 + k)] = -u * x[k];
                a[(2 * i + 1, 4 + k)] = x[k];
                a[(2 * i + 1, 8 + k)] = -v * x[k];
            }
        }

        // Null vector = eigenvector of AᵀA with the smallest eigenvalue
        let eigen = (a.transpose() * &a).symmetric_eigen();
        let (idx, _) = eigen.eigenvalues.argmin();
        let p: Vec<f64> = eigen.eigenvectors.column(idx).iter().copied().collect();
        let p_norm = Matrix3x4::from_row_slice(&p);

        // Undo normalization, then strip the intrinsics
        let projection = t_img.try_inverse()? * p_norm * t_obj;
        let mut m = camera.inverse_matrix() * projection;

        let mut a3 = m.fixed_view::<3, 3>(0, 0).into_owned();
        if a3.determinant() < 0.0 {
            m = -m;
            a3 = -a3;
        }

        let svd = a3.svd(true, true);
        let (u, v_t) = (svd.u?, svd.v_t?);
        let mut rotation = u * v_t;
        if rotation.determinant() < 0.0 {
            return None;
        }
        let scale = svd.singular_values.mean();
        if !scale.is_finite() || scale <= EPSILON {
            return None;
        }
        // Re-orthonormalize away rounding before converting
        rotation = Rotation3::from_matrix(&rotation).into_inner();
        let translation = m.column(3).into_owned() / scale;

        let centroid = object_points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / n as f64;
        if (rotation * centroid + translation).z <= EPSILON {
            return None;
        }

        let params = pose_params(&rotation_matrix_to_vector(&rotation), &translation);
        params.iter().all(|v| v.is_finite()).then_some(params)
    }

    /// Place the model at a fixed orientation, with depth from the ratio of
    /// model spread to image spread and offset from the image centroid.
    fn prior_pose(
        orientation: &Rotation3<f64>,
        object_points: &[Point3<f64>],
        image_points: &[Point2<f64>],
        camera: &CameraModel,
    ) -> Option<PoseParams> {
        let n = object_points.len() as f64;
        let obj_centroid = object_points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / n;
        let (ix, iy) = image_points.iter().fold((0.0, 0.0), |(x, y), p| (x + p.x, y + p.y));
        let img_centroid = Point2::new(ix / n, iy / n);

        let obj_spread = object_points
            .iter()
            .map(|p| {
                let d = p.coords - obj_centroid;
                (d.x * d.x + d.y * d.y).sqrt()
            })
            .sum::<f64>()
            / n;
        let img_spread = image_points.iter().map(|p| (p - img_centroid).norm()).sum::<f64>() / n;
        if img_spread <= EPSILON || obj_spread <= EPSILON {
            return None;
        }

        let depth = camera.focal_length * obj_spread / img_spread;
        let translation = camera.unproject(&img_centroid) * depth - orientation * obj_centroid;
        Some(pose_params(&rotation_matrix_to_vector(orientation.matrix()), &translation))
    }

    /// Levenberg-Marquardt refinement of the reprojection error
    fn refine(
        &self,
        initial: &PoseParams,
        camera: &CameraModel,
        object_points: &[Point3<f64>],
        image_points: &[Point2<f64>],
    ) -> Option<PnpSolution> {
        let mut params = *initial;
        let mut res = residuals(&params, camera, object_points, image_points)?;
        let mut cost = res.norm_squared();
        let mut lambda = 1e-3;
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;
            let jac = jacobian(&params, camera, object_points, image_points)?;
            let jtj: Matrix6<f64> = jac.tr_mul(&jac);
            let gradient: Vector6<f64> = jac.tr_mul(&res);
            if gradient.amax() <= self.epsilon {
                break;
            }

            let mut improved = false;
            while lambda <= MAX_DAMPING {
                let mut damped = jtj;
                for k in 0..6 {
                    damped[(k, k)] += lambda * jtj[(k, k)].max(EPSILON);
                }
                let Some(delta) = damped.cholesky().map(|c| c.solve(&(-gradient))) else {
                    lambda *= 10.0;
                    continue;
                };

                let candidate = params + delta;
                match residuals(&candidate, camera, object_points, image_points) {
                    Some(candidate_res) if candidate_res.norm_squared() < cost => {
                        let converged = delta.norm() <= self.epsilon * (params.norm() + self.epsilon);
                        params = candidate;
                        cost = candidate_res.norm_squared();
                        res = candidate_res;
                        lambda = (lambda / 10.0).max(1e-12);
                        improved = true;
                        if converged {
                            lambda = f64::INFINITY;
                        }
                        break;
                    }
                    _ => lambda *= 10.0,
                }
            }

            if !improved || lambda.is_infinite() {
                break;
            }
        }

        // Keep the rotation vector within a half turn
        let (rotation, translation) = split_params(&params);
        let rotation = rotation_matrix_to_vector(&rotation_vector_to_matrix(&rotation));
        let rms_error = (cost / object_points.len() as f64).sqrt();

        (rms_error.is_finite() && translation.iter().all(|v| v.is_finite())).then_some(PnpSolution {
            rotation,
            translation,
            rms_error,
            iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constants::head::MODEL_POINTS, landmarks::FrameShape};
    use proptest::prelude::*;

    fn model_points() -> Vec<Point3<f64>> {
        MODEL_POINTS.iter().map(|p| Point3::new(p[0], p[1], p[2])).collect()
    }

    fn synthesize(rotation: Vector3<f64>, translation: Vector3<f64>, camera: &CameraModel) -> Vec<Point2<f64>> {
        let truth = PnpSolution {
            rotation,
            translation,
            rms_error: 0.0,
            iterations: 0,
        };
        model_points()
            .iter()
            .map(|p| truth.project(camera, p).unwrap())
            .collect()
    }

    #[test]
    fn test_recovers_known_pose() {
        let camera = CameraModel::from_frame(FrameShape::new(480, 640));
        let rotation = Vector3::new(std::f64::consts::PI - 0.15, 0.2, 0.05);
        let translation = Vector3::new(-40.0, 25.0, 2500.0);
        let image_points = synthesize(rotation, translation, &camera);

        let solution = PnpSolver::default().solve(&model_points(), &image_points, &camera).unwrap();
        assert!(solution.rms_error < 1e-3, "rms {}", solution.rms_error);
        assert!((solution.rotation_matrix() - rotation_vector_to_matrix(&rotation)).norm() < 1e-4);
        assert!((solution.translation - translation).norm() < 0.5);
    }

    #[test]
    fn test_reprojection_of_all_points() {
        let camera = CameraModel::from_frame(FrameShape::new(720, 1280));
        let image_points = synthesize(Vector3::new(0.1, -0.4, 0.05), Vector3::new(30.0, -10.0, 3000.0), &camera);

        let solution = PnpSolver::default().solve(&model_points(), &image_points, &camera).unwrap();
        for error in solution.reprojection_errors(&camera, &model_points(), &image_points) {
            assert!(error < 1e-3, "reprojection error {error}");
        }
    }

    #[test]
    fn test_collinear_image_points_fail() {
        let camera = CameraModel::from_frame(FrameShape::new(480, 640));
        let image_points: Vec<_> = (0..6).map(|i| Point2::new(100.0 + f64::from(i) * 10.0, 200.0)).collect();
        let result = PnpSolver::default().solve(&model_points(), &image_points, &camera);
        assert!(matches!(result, Err(Error::PoseSolveFailure(_))));
    }

    #[test]
    fn test_coincident_image_points_fail() {
        let camera = CameraModel::from_frame(FrameShape::new(480, 640));
        let image_points = vec![Point2::new(320.0, 240.0); 6];
        let result = PnpSolver::default().solve(&model_points(), &image_points, &camera);
        assert!(matches!(result, Err(Error::PoseSolveFailure(_))));
    }

    #[test]
    fn test_too_few_points_fail() {
        let camera = CameraModel::from_frame(FrameShape::new(480, 640));
        let object = &model_points()[..4];
        let image = vec![Point2::new(0.0, 0.0); 4];
        assert!(PnpSolver::default().solve(object, &image, &camera).is_err());

        let image = vec![Point2::new(0.0, 0.0); 5];
        assert!(PnpSolver::default().solve(&model_points(), &image, &camera).is_err());
    }

    #[test]
    fn test_non_finite_points_fail() {
        let camera = CameraModel::from_frame(FrameShape::new(480, 640));
        let mut image_points = synthesize(Vector3::new(3.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 2000.0), &camera);
        image_points[2].x = f64::NAN;
        assert!(PnpSolver::default().solve(&model_points(), &image_points, &camera).is_err());
    }

    #[test]
    fn test_normalized_points_have_unit_scale() {
        let (_, normalized) = normalize_object_points(&model_points());
        let mean: f64 = normalized.iter().map(|p| p.coords.norm()).sum::<f64>() / normalized.len() as f64;
        assert!((mean - 3.0_f64.sqrt()).abs() < 1e-9);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_reprojects_plausible_head_poses(
            pitch in -35.0f64..35.0,
            yaw in -45.0f64..45.0,
            roll in -30.0f64..30.0,
            tx in -100.0f64..100.0,
            ty in -100.0f64..100.0,
            tz in 1000.0f64..4000.0,
        ) {
            let camera = CameraModel::from_frame(FrameShape::new(480, 640));
            // Facing the camera is a half turn about x
            let rotation = Rotation3::from_euler_angles(
                std::f64::consts::PI + pitch.to_radians(),
                yaw.to_radians(),
                roll.to_radians(),
            )
            .scaled_axis();
            let image_points = synthesize(rotation, Vector3::new(tx, ty, tz), &camera);

            let solution = PnpSolver::default().solve(&model_points(), &image_points, &camera).unwrap();
            prop_assert!(solution.rms_error < 1e-3, "rms {}", solution.rms_error);
        }
    }
}
