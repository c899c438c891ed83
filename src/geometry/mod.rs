//! Geometric solvers behind the head pose estimate.
//!
//! The pose pipeline mirrors the classic `solvePnP` + `Rodrigues` +
//! `RQDecomp3x3` chain:
//! 1. [`pnp`] recovers a rotation vector and translation from 2D/3D pairs
//! 2. [`euler`] turns the rotation vector into x/y/z angles in degrees

/// Rotation vector conversions and RQ decomposition into Euler angles
pub mod euler;

/// Perspective-n-Point solver with Levenberg-Marquardt refinement
pub mod pnp;

pub use euler::{rotation_matrix_to_euler, rotation_vector_to_matrix, EulerAngles};
pub use pnp::{PnpSolution, PnpSolver};
