//! Frame transforms for mavbridge.
//!
//! Autopilots report in NED (world) and aircraft FRD (body) axes, while
//! robotics software expects ENU and base_link FLU. This crate converts
//! orientations, vectors and covariances between the two conventions
//! ([`StaticTf`]), and by arbitrary sensor mounting rotations
//! ([`arbitrary`]).
//!
//! All functions are pure. The two fixed rotations are built once on
//! first use.
//!
//! ```
//! use mavbridge_ftf::{transform_vector, StaticTf};
//! use nalgebra::Vector3;
//!
//! let enu = transform_vector(&Vector3::new(1.0, 2.0, 3.0), StaticTf::NedToEnu);
//! assert!((enu - Vector3::new(2.0, 1.0, -3.0)).norm() < 1e-12);
//! ```

pub mod arbitrary;
pub mod covariance;
pub mod error;
pub mod rpy;
pub mod static_tf;

pub use arbitrary::{
    normalize_orientation, transform_frame_covariance3, transform_frame_covariance6,
    transform_frame_vector,
};
pub use covariance::{Covariance3, Covariance6};
pub use error::{FtfError, Result};
pub use rpy::{quaternion_from_rpy, quaternion_get_yaw, quaternion_to_rpy};
pub use static_tf::{
    transform_covariance3, transform_covariance6, transform_orientation, transform_vector,
    StaticTf,
};

pub use nalgebra::{Quaternion, UnitQuaternion, Vector3};
