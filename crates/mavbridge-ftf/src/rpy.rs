use nalgebra::{UnitQuaternion, Vector3};

/// Orientation from roll, pitch and yaw in radians.
///
/// Applied as yaw about Z, then pitch about Y, then roll about X
/// (`q = Rz(yaw)·Ry(pitch)·Rx(roll)`).
pub fn quaternion_from_rpy(roll: f64, pitch: f64, yaw: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_euler_angles(roll, pitch, yaw)
}

/// Inverse of [`quaternion_from_rpy`], as `(roll, pitch, yaw)`.
pub fn quaternion_to_rpy(q: &UnitQuaternion<f64>) -> Vector3<f64> {
    let (roll, pitch, yaw) = q.euler_angles();
    Vector3::new(roll, pitch, yaw)
}

/// Heading only. Stable near pitch ±90° where full RPY is not.
pub fn quaternion_get_yaw(q: &UnitQuaternion<f64>) -> f64 {
    let q = q.quaternion();
    let (w, x, y, z) = (q.w, q.i, q.j, q.k);
    (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z))
}
