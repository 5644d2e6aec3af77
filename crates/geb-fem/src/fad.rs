//! Forward-mode automatic differentiation scalar.
//!
//! [`Dual`] carries a value together with a dynamically sized vector of
//! partial derivatives with respect to a set of seeded variables. An empty
//! derivative vector denotes a constant, so temporaries created via
//! `from_f64` never allocate. The [`RealScalar`] trait abstracts over `f64`
//! and `Dual` so that strain, stress and triad-interpolation code is written
//! once and instantiated for both the plain and the differentiating scalar
//! type.

use nalgebra::{ClosedAddAssign, ClosedDivAssign, ClosedMulAssign, ClosedSubAssign, Scalar};
use num_traits::{One, Zero};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// Scalar abstraction shared by the plain and the dual-number evaluation
/// paths.
///
/// The operator bounds are exactly what nalgebra's generic matrix arithmetic
/// requires; the transcendental functions are the ones used by the rotation
/// algebra. Norms are computed explicitly via `sqrt` of dot products so no
/// further numeric machinery is needed on the scalar.
pub trait RealScalar:
    Scalar
    + Zero
    + One
    + ClosedAddAssign
    + ClosedSubAssign
    + ClosedMulAssign
    + ClosedDivAssign
    + Neg<Output = Self>
{
    fn from_f64(x: f64) -> Self;

    /// Value part (the plain number for `f64`, the real part for `Dual`).
    fn value(&self) -> f64;

    fn sqrt(&self) -> Self;
    fn sin(&self) -> Self;
    fn cos(&self) -> Self;
    fn tan(&self) -> Self;
    fn atan2(&self, other: &Self) -> Self;
    fn abs(&self) -> Self;
}

impl RealScalar for f64 {
    #[inline]
    fn from_f64(x: f64) -> Self {
        x
    }

    #[inline]
    fn value(&self) -> f64 {
        *self
    }

    #[inline]
    fn sqrt(&self) -> Self {
        f64::sqrt(*self)
    }

    #[inline]
    fn sin(&self) -> Self {
        f64::sin(*self)
    }

    #[inline]
    fn cos(&self) -> Self {
        f64::cos(*self)
    }

    #[inline]
    fn tan(&self) -> Self {
        f64::tan(*self)
    }

    #[inline]
    fn atan2(&self, other: &Self) -> Self {
        f64::atan2(*self, *other)
    }

    #[inline]
    fn abs(&self) -> Self {
        f64::abs(*self)
    }
}

/// Dual number with value and derivative vector.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dual {
    val: f64,
    der: Vec<f64>,
}

impl Dual {
    /// A constant (zero derivative with respect to every variable).
    pub fn constant(val: f64) -> Self {
        Dual {
            val,
            der: Vec::new(),
        }
    }

    /// The `index`-th of `num_vars` independent variables.
    pub fn variable(val: f64, index: usize, num_vars: usize) -> Self {
        let mut der = vec![0.0; num_vars];
        der[index] = 1.0;
        Dual { val, der }
    }

    pub fn val(&self) -> f64 {
        self.val
    }

    /// Partial derivative with respect to variable `j` (0 for constants).
    pub fn deriv(&self, j: usize) -> f64 {
        self.der.get(j).copied().unwrap_or(0.0)
    }

    fn combine(a: &[f64], fa: f64, b: &[f64], fb: f64) -> Vec<f64> {
        if a.is_empty() && b.is_empty() {
            return Vec::new();
        }
        let n = a.len().max(b.len());
        let mut out = vec![0.0; n];
        for (o, &ai) in out.iter_mut().zip(a.iter()) {
            *o += fa * ai;
        }
        for (o, &bi) in out.iter_mut().zip(b.iter()) {
            *o += fb * bi;
        }
        out
    }

    fn scale_der(&self, f: f64) -> Vec<f64> {
        self.der.iter().map(|d| f * d).collect()
    }
}

impl Add for Dual {
    type Output = Dual;
    fn add(self, rhs: Dual) -> Dual {
        Dual {
            val: self.val + rhs.val,
            der: Dual::combine(&self.der, 1.0, &rhs.der, 1.0),
        }
    }
}

impl Sub for Dual {
    type Output = Dual;
    fn sub(self, rhs: Dual) -> Dual {
        Dual {
            val: self.val - rhs.val,
            der: Dual::combine(&self.der, 1.0, &rhs.der, -1.0),
        }
    }
}

impl Mul for Dual {
    type Output = Dual;
    fn mul(self, rhs: Dual) -> Dual {
        Dual {
            val: self.val * rhs.val,
            der: Dual::combine(&self.der, rhs.val, &rhs.der, self.val),
        }
    }
}

impl Div for Dual {
    type Output = Dual;
    fn div(self, rhs: Dual) -> Dual {
        // (a/b)' = a'/b - a b'/b^2
        let inv = 1.0 / rhs.val;
        Dual {
            val: self.val * inv,
            der: Dual::combine(&self.der, inv, &rhs.der, -self.val * inv * inv),
        }
    }
}

impl Neg for Dual {
    type Output = Dual;
    fn neg(self) -> Dual {
        Dual {
            val: -self.val,
            der: self.scale_der(-1.0),
        }
    }
}

impl AddAssign for Dual {
    fn add_assign(&mut self, rhs: Dual) {
        *self = self.clone() + rhs;
    }
}

impl SubAssign for Dual {
    fn sub_assign(&mut self, rhs: Dual) {
        *self = self.clone() - rhs;
    }
}

impl MulAssign for Dual {
    fn mul_assign(&mut self, rhs: Dual) {
        *self = self.clone() * rhs;
    }
}

impl DivAssign for Dual {
    fn div_assign(&mut self, rhs: Dual) {
        *self = self.clone() / rhs;
    }
}

impl Zero for Dual {
    fn zero() -> Self {
        Dual::constant(0.0)
    }

    fn is_zero(&self) -> bool {
        self.val == 0.0 && self.der.iter().all(|d| *d == 0.0)
    }
}

impl One for Dual {
    fn one() -> Self {
        Dual::constant(1.0)
    }
}

impl RealScalar for Dual {
    fn from_f64(x: f64) -> Self {
        Dual::constant(x)
    }

    fn value(&self) -> f64 {
        self.val
    }

    fn sqrt(&self) -> Self {
        let r = self.val.sqrt();
        Dual {
            val: r,
            der: self.scale_der(0.5 / r),
        }
    }

    fn sin(&self) -> Self {
        Dual {
            val: self.val.sin(),
            der: self.scale_der(self.val.cos()),
        }
    }

    fn cos(&self) -> Self {
        Dual {
            val: self.val.cos(),
            der: self.scale_der(-self.val.sin()),
        }
    }

    fn tan(&self) -> Self {
        let t = self.val.tan();
        Dual {
            val: t,
            der: self.scale_der(1.0 + t * t),
        }
    }

    fn atan2(&self, other: &Self) -> Self {
        // d atan2(y, x) = (x dy - y dx) / (x^2 + y^2)
        let denom = self.val * self.val + other.val * other.val;
        Dual {
            val: self.val.atan2(other.val),
            der: Dual::combine(&self.der, other.val / denom, &other.der, -self.val / denom),
        }
    }

    fn abs(&self) -> Self {
        if self.val < 0.0 {
            -self.clone()
        } else {
            self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn constant_has_no_derivatives() {
        let c = Dual::constant(3.5);
        assert_eq!(c.val(), 3.5);
        assert_eq!(c.deriv(0), 0.0);
        assert_eq!(c.deriv(7), 0.0);
    }

    #[test]
    fn product_and_quotient_rules() {
        let x = Dual::variable(2.0, 0, 2);
        let y = Dual::variable(3.0, 1, 2);
        let p = x.clone() * y.clone();
        assert_eq!(p.val(), 6.0);
        assert_eq!(p.deriv(0), 3.0);
        assert_eq!(p.deriv(1), 2.0);

        let q = x / y;
        assert_relative_eq!(q.deriv(0), 1.0 / 3.0);
        assert_relative_eq!(q.deriv(1), -2.0 / 9.0);
    }

    #[test]
    fn chain_rule_through_transcendentals() {
        let x = Dual::variable(0.7, 0, 1);
        let f = (x.clone() * x).sin().sqrt();
        // f = sqrt(sin(x^2)), f' = cos(x^2) * 2x / (2 sqrt(sin(x^2)))
        let expect = (0.7_f64 * 0.7).cos() * 2.0 * 0.7 / (2.0 * (0.7_f64 * 0.7).sin().sqrt());
        assert_relative_eq!(f.val(), (0.7_f64 * 0.7).sin().sqrt(), epsilon = 1e-14);
        assert_relative_eq!(f.deriv(0), expect, epsilon = 1e-14);
    }

    #[test]
    fn atan2_derivative() {
        let y = Dual::variable(0.3, 0, 2);
        let x = Dual::variable(0.9, 1, 2);
        let a = y.atan2(&x);
        let denom = 0.3 * 0.3 + 0.9 * 0.9;
        assert_relative_eq!(a.deriv(0), 0.9 / denom, epsilon = 1e-14);
        assert_relative_eq!(a.deriv(1), -0.3 / denom, epsilon = 1e-14);
    }

    #[test]
    fn mixed_length_derivative_vectors() {
        let x = Dual::variable(1.0, 3, 4);
        let s = x + Dual::constant(2.0);
        assert_eq!(s.val(), 3.0);
        assert_eq!(s.deriv(3), 1.0);
    }

    #[test]
    fn nalgebra_matrix_arithmetic_works() {
        use nalgebra::Matrix3;
        let a = Matrix3::<Dual>::from_fn(|i, j| Dual::variable((i + j) as f64, i, 3));
        let b = Matrix3::<Dual>::identity();
        let c = &a * &b;
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(c[(i, j)].val(), (i + j) as f64);
            }
        }
    }
}
