//! Transforms by a caller-supplied orientation, typically a sensor's
//! mounting rotation relative to the body.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::covariance::{Covariance3, Covariance6};
use crate::error::{FtfError, Result};
use crate::static_tf::rotation_matrix;

/// Smallest quaternion norm accepted for normalization.
const MIN_NORM: f64 = 1e-9;

/// Normalize a raw quaternion, rejecting one too short to carry a
/// rotation.
pub fn normalize_orientation(q: &Quaternion<f64>) -> Result<UnitQuaternion<f64>> {
    UnitQuaternion::try_new(*q, MIN_NORM)
        .ok_or(FtfError::DegenerateOrientation { norm: q.norm() })
}

/// Rotate `v` by `q`.
pub fn transform_frame_vector(v: &Vector3<f64>, q: &Quaternion<f64>) -> Result<Vector3<f64>> {
    Ok(normalize_orientation(q)? * v)
}

/// `R·C·Rᵗ` with `R` taken from `q`.
pub fn transform_frame_covariance3(cov: &Covariance3, q: &Quaternion<f64>) -> Result<Covariance3> {
    let rotation = rotation_matrix(&normalize_orientation(q)?);
    Ok(cov.rotated(&rotation))
}

/// `diag(R, R)` similarity transform with `R` taken from `q`.
pub fn transform_frame_covariance6(cov: &Covariance6, q: &Quaternion<f64>) -> Result<Covariance6> {
    let rotation = rotation_matrix(&normalize_orientation(q)?);
    Ok(cov.rotated(&rotation))
}
