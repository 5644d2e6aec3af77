//! SO(3) rotation algebra for large-rotation finite elements.
//!
//! Rotations are carried as unit quaternions stored in a `Vector4` with the
//! vector part in components 0..2 and the scalar part in component 3.
//! Composition convention, fixed once and used everywhere: the product
//! returned by [`compose_quaternions`] satisfies
//! `R(compose_quaternions(q2, q1)) = R(q2) * R(q1)`, i.e. `q1` acts first and
//! incremental rotations multiply from the left:
//! `q_new = compose_quaternions(exp(delta_psi), q_old)`.
//!
//! The tangential transformation operator `T(psi)` maps a spatial spin
//! increment of the triad `exp(S(psi))` to the corresponding rate of the
//! rotation-vector parametrization; its inverse is the differential of the
//! exponential map. Material curvature follows from the transpose of the
//! inverse operator, `K = Tinv(psi)^T psi'` (the transpose differs from
//! `Tinv` only in the sign of the spin term).
//!
//! Everything is generic over [`RealScalar`] so the identical code path
//! serves plain floating point and forward-mode dual numbers.

use crate::fad::RealScalar;
use nalgebra::{Matrix3, Vector3, Vector4};

/// Squared-angle threshold below which series expansions replace the closed
/// forms (the closed forms divide by powers of the angle).
const SERIES_THRESHOLD_SQ: f64 = 1e-8;

/// Skew-symmetric (spin) matrix `S(v)` with `S(v) w = v x w`.
pub fn spin<T: RealScalar>(v: &Vector3<T>) -> Matrix3<T> {
    let z = T::zero();
    Matrix3::new(
        z.clone(),
        -v[2].clone(),
        v[1].clone(),
        v[2].clone(),
        z.clone(),
        -v[0].clone(),
        -v[1].clone(),
        v[0].clone(),
        z,
    )
}

fn cross<T: RealScalar>(a: &Vector3<T>, b: &Vector3<T>) -> Vector3<T> {
    Vector3::new(
        a[1].clone() * b[2].clone() - a[2].clone() * b[1].clone(),
        a[2].clone() * b[0].clone() - a[0].clone() * b[2].clone(),
        a[0].clone() * b[1].clone() - a[1].clone() * b[0].clone(),
    )
}

/// Unit quaternion of the rotation vector `psi` (exponential map, half-angle
/// formula). Total for finite input; a series handles the small-angle limit.
pub fn quaternion_from_rotation_vector<T: RealScalar>(psi: &Vector3<T>) -> Vector4<T> {
    let theta_sq = psi.dot(psi);
    let (fac, scalar) = if theta_sq.value() < SERIES_THRESHOLD_SQ {
        // sin(t/2)/t = 1/2 - t^2/48 + ..., cos(t/2) = 1 - t^2/8 + t^4/384
        let half = T::from_f64(0.5);
        let fac = half - theta_sq.clone() * T::from_f64(1.0 / 48.0);
        let scalar = T::one() - theta_sq.clone() * T::from_f64(0.125)
            + theta_sq.clone() * theta_sq * T::from_f64(1.0 / 384.0);
        (fac, scalar)
    } else {
        let theta = theta_sq.sqrt();
        let half_theta = theta.clone() * T::from_f64(0.5);
        ((half_theta.sin()) / theta, half_theta.cos())
    };
    Vector4::new(
        psi[0].clone() * fac.clone(),
        psi[1].clone() * fac.clone(),
        psi[2].clone() * fac,
        scalar,
    )
}

/// Rotation vector of a unit quaternion, canonicalized to the shortest
/// rotation, `|psi| <= pi`.
pub fn rotation_vector_from_quaternion<T: RealScalar>(q: &Vector4<T>) -> Vector3<T> {
    // q and -q describe the same rotation; pick the hemisphere with a
    // non-negative scalar part so the extracted angle stays in [0, pi].
    let q = if q[3].value() < 0.0 { -q.clone() } else { q.clone() };
    let qv = Vector3::new(q[0].clone(), q[1].clone(), q[2].clone());
    let s_sq = qv.dot(&qv);
    if s_sq.value() < 1e-16 {
        // psi = 2 qv / q0 * (1 - |qv|^2 / (3 q0^2))
        let q0 = q[3].clone();
        let corr = T::one() - s_sq / (q0.clone() * q0.clone() * T::from_f64(3.0));
        qv * (T::from_f64(2.0) / q0 * corr)
    } else {
        let s = s_sq.sqrt();
        let theta = s.atan2(&q[3]) * T::from_f64(2.0);
        qv * (theta / s)
    }
}

/// Hamilton product; `q1` acts first: `R(result) = R(q2) * R(q1)`.
pub fn compose_quaternions<T: RealScalar>(q2: &Vector4<T>, q1: &Vector4<T>) -> Vector4<T> {
    let v2 = Vector3::new(q2[0].clone(), q2[1].clone(), q2[2].clone());
    let v1 = Vector3::new(q1[0].clone(), q1[1].clone(), q1[2].clone());
    let w2 = q2[3].clone();
    let w1 = q1[3].clone();
    let v = v1.clone() * w2.clone() + v2.clone() * w1.clone() + cross(&v2, &v1);
    let w = w2 * w1 - v2.dot(&v1);
    Vector4::new(v[0].clone(), v[1].clone(), v[2].clone(), w)
}

/// Inverse (conjugate) of a unit quaternion.
pub fn inverse_quaternion<T: RealScalar>(q: &Vector4<T>) -> Vector4<T> {
    Vector4::new(-q[0].clone(), -q[1].clone(), -q[2].clone(), q[3].clone())
}

/// Rotation matrix (triad) of a unit quaternion.
pub fn triad_from_quaternion<T: RealScalar>(q: &Vector4<T>) -> Matrix3<T> {
    let qv = Vector3::new(q[0].clone(), q[1].clone(), q[2].clone());
    let w = q[3].clone();
    let two = T::from_f64(2.0);
    let diag = w.clone() * w.clone() - qv.dot(&qv);
    let mut r = Matrix3::identity() * diag;
    r += &qv * qv.transpose() * two.clone();
    r += spin(&qv) * (two * w);
    r
}

/// Unit quaternion of a rotation matrix (Spurrier's algorithm).
pub fn quaternion_from_triad(r: &Matrix3<f64>) -> Vector4<f64> {
    let trace = r[(0, 0)] + r[(1, 1)] + r[(2, 2)];
    let mut q = Vector4::zeros();
    if trace >= r[(0, 0)] && trace >= r[(1, 1)] && trace >= r[(2, 2)] {
        q[3] = 0.5 * (1.0 + trace).sqrt();
        q[0] = (r[(2, 1)] - r[(1, 2)]) / (4.0 * q[3]);
        q[1] = (r[(0, 2)] - r[(2, 0)]) / (4.0 * q[3]);
        q[2] = (r[(1, 0)] - r[(0, 1)]) / (4.0 * q[3]);
    } else {
        // largest diagonal entry decides the dominant vector component
        let mut i = 0;
        for k in 1..3 {
            if r[(k, k)] > r[(i, i)] {
                i = k;
            }
        }
        let j = (i + 1) % 3;
        let k = (i + 2) % 3;
        q[i] = (0.5 * r[(i, i)] + 0.25 * (1.0 - trace)).sqrt();
        q[3] = (r[(k, j)] - r[(j, k)]) / (4.0 * q[i]);
        q[j] = (r[(j, i)] + r[(i, j)]) / (4.0 * q[i]);
        q[k] = (r[(k, i)] + r[(i, k)]) / (4.0 * q[i]);
    }
    q
}

/// Quaternion of the smallest rotation mapping the first base vector e1 onto
/// the (not necessarily unit) tangent `t`. Used when reference triads are
/// constructed from centerline tangents.
pub fn quaternion_from_tangent(t: &Vector3<f64>) -> Vector4<f64> {
    let t = t / t.norm();
    let c = t[0];
    let axis = Vector3::new(0.0, -t[2], t[1]); // e1 x t
    let s = axis.norm();
    if s < 1e-12 {
        if c > 0.0 {
            Vector4::new(0.0, 0.0, 0.0, 1.0)
        } else {
            // t = -e1: rotate by pi about e2
            Vector4::new(0.0, 1.0, 0.0, 0.0)
        }
    } else {
        let angle = s.atan2(c);
        quaternion_from_rotation_vector(&(axis * (angle / s)))
    }
}

/// Tangential transformation operator `T(psi)`: maps a spatial spin increment
/// of `exp(S(psi))` to the rate of the rotation vector,
/// `dpsi = T(psi) dtheta`.
///
/// `T = I - S(psi)/2 + eta S(psi)^2` with
/// `eta = (1 - (theta/2) cot(theta/2)) / theta^2`.
pub fn tangential_transform<T: RealScalar>(psi: &Vector3<T>) -> Matrix3<T> {
    let theta_sq = psi.dot(psi);
    let eta = if theta_sq.value() < SERIES_THRESHOLD_SQ {
        T::from_f64(1.0 / 12.0) + theta_sq.clone() * T::from_f64(1.0 / 720.0)
    } else {
        let theta = theta_sq.clone().sqrt();
        let half = theta.clone() * T::from_f64(0.5);
        (T::one() - half.clone() * half.clone().cos() / half.sin()) / theta_sq.clone()
    };
    let s = spin(psi);
    Matrix3::identity() - s.clone() * T::from_f64(0.5) + s.clone() * s * eta
}

/// Inverse tangential transformation operator `Tinv(psi) = T(psi)^{-1}` (the
/// differential of the exponential map): `dtheta = Tinv(psi) dpsi`.
///
/// `Tinv = I + a S(psi) + b S(psi)^2` with `a = (1-cos)/theta^2`,
/// `b = (theta-sin)/theta^3`; well conditioned for `|psi| << pi`, with a
/// series fallback guarding the `0/0` limit at small angles.
pub fn tangential_transform_inv<T: RealScalar>(psi: &Vector3<T>) -> Matrix3<T> {
    let theta_sq = psi.dot(psi);
    let (a, b) = tinv_coefficients(&theta_sq);
    let s = spin(psi);
    Matrix3::identity() + s.clone() * a + s.clone() * s * b
}

fn tinv_coefficients<T: RealScalar>(theta_sq: &T) -> (T, T) {
    if theta_sq.value() < SERIES_THRESHOLD_SQ {
        let a = T::from_f64(0.5) - theta_sq.clone() * T::from_f64(1.0 / 24.0);
        let b = T::from_f64(1.0 / 6.0) - theta_sq.clone() * T::from_f64(1.0 / 120.0);
        (a, b)
    } else {
        let theta = theta_sq.clone().sqrt();
        let a = (T::one() - theta.clone().cos()) / theta_sq.clone();
        let b = (theta.clone() - theta.clone().sin()) / (theta_sq.clone() * theta.clone());
        (a, b)
    }
}

/// Directional derivative of the inverse tangential transformation,
/// `d/d eps Tinv(psi + eps v)` at `eps = 0`. Needed for the xi-derivative of
/// the generalized triad interpolation matrices.
pub fn tangential_transform_inv_deriv<T: RealScalar>(
    psi: &Vector3<T>,
    v: &Vector3<T>,
) -> Matrix3<T> {
    let theta_sq = psi.dot(psi);
    let (a, b) = tinv_coefficients(&theta_sq);
    // c1 = a'(theta)/theta, c2 = b'(theta)/theta; both smooth at theta -> 0
    let (c1, c2) = if theta_sq.value() < SERIES_THRESHOLD_SQ {
        (
            T::from_f64(-1.0 / 12.0) + theta_sq.clone() * T::from_f64(1.0 / 180.0),
            T::from_f64(-1.0 / 60.0) + theta_sq.clone() * T::from_f64(1.0 / 1260.0),
        )
    } else {
        let theta = theta_sq.clone().sqrt();
        let t2 = theta_sq.clone();
        let c1 = (theta.clone() * theta.clone().sin()
            - (T::one() - theta.clone().cos()) * T::from_f64(2.0))
            / (t2.clone() * t2.clone());
        let c2 = ((T::one() - theta.clone().cos()) * theta.clone()
            - (theta.clone() - theta.clone().sin()) * T::from_f64(3.0))
            / (t2.clone() * t2.clone() * theta.clone());
        (c1, c2)
    };
    let psi_dot_v = psi.dot(v);
    let s_psi = spin(psi);
    let s_v = spin(v);
    s_psi.clone() * (c1 * psi_dot_v.clone())
        + s_v.clone() * a
        + s_psi.clone() * s_psi.clone() * (c2 * psi_dot_v)
        + (s_psi.clone() * s_v.clone() + s_v * s_psi) * b
}
