use std::f64::consts::{FRAC_PI_2, PI};

use mavbridge_ftf::{
    quaternion_from_rpy, transform_covariance3, transform_covariance6, transform_frame_covariance3,
    transform_frame_vector, transform_orientation, transform_vector, Covariance3, Covariance6,
    StaticTf, UnitQuaternion, Vector3,
};
use nalgebra::Matrix6;
use proptest::prelude::*;

fn static_tf() -> impl Strategy<Value = StaticTf> {
    prop::sample::select(StaticTf::ALL.to_vec())
}

fn orientation() -> impl Strategy<Value = UnitQuaternion<f64>> {
    (-PI..PI, -FRAC_PI_2..FRAC_PI_2, -PI..PI)
        .prop_map(|(roll, pitch, yaw)| quaternion_from_rpy(roll, pitch, yaw))
}

fn vector() -> impl Strategy<Value = Vector3<f64>> {
    (-1e3..1e3f64, -1e3..1e3f64, -1e3..1e3f64).prop_map(|(x, y, z)| Vector3::new(x, y, z))
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * (1.0 + a.abs().max(b.abs()))
}

fn is_symmetric(m: &Matrix6<f64>) -> bool {
    (m - m.transpose()).norm() <= 1e-9 * (1.0 + m.norm())
}

proptest! {
    #[test]
    fn orientation_round_trip(q in orientation(), tf in static_tf()) {
        let back = transform_orientation(&transform_orientation(&q, tf), tf.inverse());
        // q and -q are the same rotation
        prop_assert!(back.angle_to(&q) < 1e-9);
    }

    #[test]
    fn orientation_stays_unit(q in orientation(), tf in static_tf()) {
        let out = transform_orientation(&q, tf);
        prop_assert!(close(out.quaternion().norm(), 1.0));
    }

    #[test]
    fn vector_norm_preserved(v in vector(), tf in static_tf()) {
        prop_assert!(close(transform_vector(&v, tf).norm(), v.norm()));
    }

    #[test]
    fn vector_round_trip(v in vector(), tf in static_tf()) {
        let back = transform_vector(&transform_vector(&v, tf), tf.inverse());
        prop_assert!((back - v).norm() <= 1e-9 * (1.0 + v.norm()));
    }

    #[test]
    fn arbitrary_vector_norm_preserved(v in vector(), q in orientation(), scale in 0.1..10.0f64) {
        let raw = q.into_inner() * scale;
        let out = transform_frame_vector(&v, &raw).unwrap();
        prop_assert!(close(out.norm(), v.norm()));
    }

    #[test]
    fn covariance3_trace_and_round_trip(
        packed in prop::array::uniform6(-100.0..100.0f64),
        tf in static_tf(),
    ) {
        let cov = Covariance3::new(packed);
        let out = transform_covariance3(&cov, tf);
        prop_assert!(close(out.trace(), cov.trace()));

        let full = out.to_matrix();
        prop_assert!((full - full.transpose()).norm() == 0.0);

        let back = transform_covariance3(&out, tf.inverse());
        prop_assert!((back.to_matrix() - cov.to_matrix()).norm() <= 1e-9 * (1.0 + cov.to_matrix().norm()));
    }

    #[test]
    fn covariance6_symmetry_and_trace(
        packed in prop::array::uniform21(-100.0..100.0f64),
        tf in static_tf(),
    ) {
        let cov = Covariance6::new(packed);
        let out = transform_covariance6(&cov, tf);
        prop_assert!(close(out.trace(), cov.trace()));

        // the unpacked full product must already be symmetric
        let rotation = tf.rotation();
        let mut block = Matrix6::<f64>::zeros();
        block.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation);
        block.fixed_view_mut::<3, 3>(3, 3).copy_from(rotation);
        let full = block * cov.to_matrix() * block.transpose();
        prop_assert!(is_symmetric(&full));
        prop_assert!((full - out.to_matrix()).norm() <= 1e-9 * (1.0 + full.norm()));
    }

    #[test]
    fn arbitrary_covariance3_preserves_trace(
        packed in prop::array::uniform6(-100.0..100.0f64),
        q in orientation(),
    ) {
        let cov = Covariance3::new(packed);
        let out = transform_frame_covariance3(&cov, q.quaternion()).unwrap();
        prop_assert!(close(out.trace(), cov.trace()));
    }
}
