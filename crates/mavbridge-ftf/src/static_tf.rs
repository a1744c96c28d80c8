use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use nalgebra::{Matrix3, UnitQuaternion, Vector3};

use crate::covariance::{Covariance3, Covariance6};
use crate::rpy::quaternion_from_rpy;

/// Half-turn about X followed by a quarter-turn about Z. Maps NED to ENU
/// and back.
static NED_ENU_Q: LazyLock<UnitQuaternion<f64>> =
    LazyLock::new(|| quaternion_from_rpy(PI, 0.0, FRAC_PI_2));

/// Half-turn about the forward axis. Maps aircraft (FRD) to base_link
/// (FLU) and back.
static AIRCRAFT_BASELINK_Q: LazyLock<UnitQuaternion<f64>> =
    LazyLock::new(|| quaternion_from_rpy(PI, 0.0, 0.0));

static NED_ENU_R: LazyLock<Matrix3<f64>> = LazyLock::new(|| rotation_matrix(&NED_ENU_Q));

static AIRCRAFT_BASELINK_R: LazyLock<Matrix3<f64>> =
    LazyLock::new(|| rotation_matrix(&AIRCRAFT_BASELINK_Q));

/// Rotation matrix of `q` after re-normalizing it.
pub(crate) fn rotation_matrix(q: &UnitQuaternion<f64>) -> Matrix3<f64> {
    UnitQuaternion::new_normalize(*q.quaternion())
        .to_rotation_matrix()
        .into_inner()
}

/// The fixed frame conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaticTf {
    NedToEnu,
    EnuToNed,
    AircraftToBaselink,
    BaselinkToAircraft,
}

impl StaticTf {
    pub const ALL: [StaticTf; 4] = [
        StaticTf::NedToEnu,
        StaticTf::EnuToNed,
        StaticTf::AircraftToBaselink,
        StaticTf::BaselinkToAircraft,
    ];

    /// The conversion that undoes this one.
    pub const fn inverse(self) -> Self {
        match self {
            StaticTf::NedToEnu => StaticTf::EnuToNed,
            StaticTf::EnuToNed => StaticTf::NedToEnu,
            StaticTf::AircraftToBaselink => StaticTf::BaselinkToAircraft,
            StaticTf::BaselinkToAircraft => StaticTf::AircraftToBaselink,
        }
    }

    /// Whether this redefines the world frame (as opposed to the body
    /// frame).
    pub const fn is_world_frame(self) -> bool {
        match self {
            StaticTf::NedToEnu | StaticTf::EnuToNed => true,
            StaticTf::AircraftToBaselink | StaticTf::BaselinkToAircraft => false,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            StaticTf::NedToEnu => "ned-to-enu",
            StaticTf::EnuToNed => "enu-to-ned",
            StaticTf::AircraftToBaselink => "aircraft-to-baselink",
            StaticTf::BaselinkToAircraft => "baselink-to-aircraft",
        }
    }

    /// The fixed rotation. Both rotations are self-inverse, so a
    /// direction and its inverse share one.
    pub fn quaternion(self) -> &'static UnitQuaternion<f64> {
        match self {
            StaticTf::NedToEnu | StaticTf::EnuToNed => &NED_ENU_Q,
            StaticTf::AircraftToBaselink | StaticTf::BaselinkToAircraft => &AIRCRAFT_BASELINK_Q,
        }
    }

    pub fn rotation(self) -> &'static Matrix3<f64> {
        match self {
            StaticTf::NedToEnu | StaticTf::EnuToNed => &NED_ENU_R,
            StaticTf::AircraftToBaselink | StaticTf::BaselinkToAircraft => &AIRCRAFT_BASELINK_R,
        }
    }
}

impl fmt::Display for StaticTf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StaticTf {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        StaticTf::ALL
            .into_iter()
            .find(|tf| tf.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown transform {s:?} (expected one of: {})",
                    StaticTf::ALL.map(StaticTf::as_str).join(", ")
                )
            })
    }
}

/// Convert an orientation between conventions.
///
/// World-frame conversions (NED/ENU) rotate the reference axes and
/// left-multiply: `Q·q`. Body-frame conversions (aircraft/base_link)
/// rotate the body axes and right-multiply: `q·Q`. Swapping the two gives
/// a valid but wrong orientation.
pub fn transform_orientation(q: &UnitQuaternion<f64>, transform: StaticTf) -> UnitQuaternion<f64> {
    let fixed = transform.quaternion();
    let product = match transform {
        StaticTf::NedToEnu | StaticTf::EnuToNed => fixed.quaternion() * q.quaternion(),
        StaticTf::AircraftToBaselink | StaticTf::BaselinkToAircraft => {
            q.quaternion() * fixed.quaternion()
        }
    };
    UnitQuaternion::new_normalize(product)
}

/// Rotate a vector between conventions: `R·v`.
pub fn transform_vector(v: &Vector3<f64>, transform: StaticTf) -> Vector3<f64> {
    transform.rotation() * v
}

/// Rotate a 3×3 covariance between conventions: `R·C·Rᵗ`.
pub fn transform_covariance3(cov: &Covariance3, transform: StaticTf) -> Covariance3 {
    cov.rotated(transform.rotation())
}

/// Rotate a 6×6 covariance between conventions with `diag(R, R)`.
pub fn transform_covariance6(cov: &Covariance6, transform: StaticTf) -> Covariance6 {
    cov.rotated(transform.rotation())
}
