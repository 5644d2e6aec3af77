//! Objective triad field interpolation from nodal rotations.
//!
//! Given N nodal triads (as unit quaternions), the scheme expresses every
//! nodal triad as a local rotation vector relative to a reference triad,
//! interpolates the local rotation vectors with scalar Lagrange polynomials
//! and recomposes with the reference triad. Because only relative rotations
//! are interpolated, the resulting triad field is objective: a rigid rotation
//! superposed on all nodes rotates the interpolated field without straining
//! it. Direct interpolation of quaternion components or rotation matrix
//! entries does not have this property and must not be used for the triad
//! field.
//!
//! The reference triad sits "between" the two middle nodes I and J:
//! `Lambda_r = Lambda_I exp(S(phi_IJ)/2)` with
//! `phi_IJ = log(Lambda_I^T Lambda_J)`, which keeps the local rotation
//! vectors small for moderately distorted elements.
//!
//! Besides the interpolated triad, the scheme provides the generalized
//! interpolation matrices `Itilde^i(xi)` that map nodal spin
//! variations/increments to the spin of the interpolated triad,
//! `dtheta(xi) = sum_i Itilde^i(xi) dtheta_i`, and their xi-derivative.

use crate::error::FemError;
use crate::fad::RealScalar;
use crate::rotations::{
    compose_quaternions, inverse_quaternion, quaternion_from_rotation_vector,
    rotation_vector_from_quaternion, tangential_transform, tangential_transform_inv,
    tangential_transform_inv_deriv, triad_from_quaternion,
};
use crate::shape::{lagrange_derivs, lagrange_values};
use nalgebra::{Matrix3, Vector3, Vector4};

#[derive(Debug, Clone)]
pub struct TriadInterpolation<T: RealScalar> {
    qnode: Vec<Vector4<T>>,
    /// first reference node (0-based)
    node_i: usize,
    /// second reference node (0-based)
    node_j: usize,
    /// relative rotation vector from node I to node J
    phi_ij: Vector3<T>,
    /// reference quaternion
    q_r: Vector4<T>,
    /// local rotation vectors of all nodes relative to the reference triad
    psi_node: Vec<Vector3<T>>,
}

impl<T: RealScalar> TriadInterpolation<T> {
    /// Set up the scheme for a set of nodal quaternions.
    pub fn new(qnode: &[Vector4<T>]) -> Result<Self, FemError> {
        let n = qnode.len();
        if n < 2 {
            return Err(FemError::TooFewNodes(n));
        }
        if n > 5 {
            return Err(FemError::UnsupportedOrder(n));
        }

        // middle node pair (coincident for odd node numbers)
        let node_i = (n + 1) / 2 - 1;
        let node_j = (n + 2) / 2 - 1;

        let q_ij = compose_quaternions(&inverse_quaternion(&qnode[node_i]), &qnode[node_j]);
        let phi_ij = rotation_vector_from_quaternion(&q_ij);
        let q_half = quaternion_from_rotation_vector(&(phi_ij.clone() * T::from_f64(0.5)));
        let q_r = compose_quaternions(&qnode[node_i], &q_half);

        let q_r_inv = inverse_quaternion(&q_r);
        let psi_node = qnode
            .iter()
            .map(|q| rotation_vector_from_quaternion(&compose_quaternions(&q_r_inv, q)))
            .collect();

        Ok(TriadInterpolation {
            qnode: qnode.to_vec(),
            node_i,
            node_j,
            phi_ij,
            q_r,
            psi_node,
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.qnode.len()
    }

    pub fn reference_quaternion(&self) -> &Vector4<T> {
        &self.q_r
    }

    pub fn local_rotation_vectors(&self) -> &[Vector3<T>] {
        &self.psi_node
    }

    /// Interpolated local rotation vector from precomputed Lagrange values.
    pub fn local_rotation(&self, ivals: &[f64]) -> Vector3<T> {
        let mut psi_l = Vector3::zeros();
        for (psi_i, &w) in self.psi_node.iter().zip(ivals.iter()) {
            psi_l += psi_i.clone() * T::from_f64(w);
        }
        psi_l
    }

    pub fn local_rotation_at_xi(&self, xi: f64) -> Vector3<T> {
        self.local_rotation(&lagrange_values(self.num_nodes(), xi))
    }

    /// xi-derivative of the interpolated local rotation vector.
    pub fn local_rotation_deriv_at_xi(&self, xi: f64) -> Vector3<T> {
        self.local_rotation(&lagrange_derivs(self.num_nodes(), xi))
    }

    /// Quaternion of the interpolated triad for a given local rotation.
    pub fn quaternion_from_local(&self, psi_l: &Vector3<T>) -> Vector4<T> {
        compose_quaternions(&self.q_r, &quaternion_from_rotation_vector(psi_l))
    }

    pub fn quaternion_at_xi(&self, xi: f64) -> Vector4<T> {
        self.quaternion_from_local(&self.local_rotation_at_xi(xi))
    }

    /// Interpolated triad for a given local rotation.
    pub fn triad_from_local(&self, psi_l: &Vector3<T>) -> Matrix3<T> {
        triad_from_quaternion(&self.quaternion_from_local(psi_l))
    }

    /// Interpolated triad at `xi` in [-1, 1] (extrapolation outside).
    pub fn triad_at_xi(&self, xi: f64) -> Matrix3<T> {
        self.triad_from_local(&self.local_rotation_at_xi(xi))
    }

    /// Weight matrix of node J in the variation of the reference triad,
    /// `dtheta_r = (I - W) dtheta_I + W dtheta_J`.
    fn reference_weight_matrix(&self) -> Matrix3<T> {
        let lambda_i = triad_from_quaternion(&self.qnode[self.node_i]);
        let tinv_half = tangential_transform_inv(&(self.phi_ij.clone() * T::from_f64(0.5)));
        let t_full = tangential_transform(&self.phi_ij);
        lambda_i.clone() * tinv_half * t_full * lambda_i.transpose() * T::from_f64(0.5)
    }

    /// Generalized interpolation matrices `Itilde^i` at the location described
    /// by the interpolated local rotation `psi_l` and Lagrange values `ivals`.
    ///
    /// They satisfy `dtheta(xi) = sum_i Itilde^i dtheta_i`, sum to the
    /// identity, and collapse to `I^i(xi) * I3` when all nodal triads
    /// coincide.
    pub fn generalized_interpolation_matrices(
        &self,
        psi_l: &Vector3<T>,
        ivals: &[f64],
    ) -> Vec<Matrix3<T>> {
        let lambda_r = triad_from_quaternion(&self.q_r);
        let tinv_l = tangential_transform_inv(psi_l);

        let mut itilde = Vec::with_capacity(self.num_nodes());
        let mut weighted_sum = Matrix3::<T>::zeros();
        for (psi_i, &w) in self.psi_node.iter().zip(ivals.iter()) {
            let t_i = tangential_transform(psi_i);
            weighted_sum += t_i.clone() * T::from_f64(w);
            itilde.push(
                lambda_r.clone() * tinv_l.clone() * t_i * lambda_r.transpose() * T::from_f64(w),
            );
        }

        // contribution of the reference-triad variation
        let coupling = Matrix3::identity()
            - lambda_r.clone() * tinv_l * weighted_sum * lambda_r.transpose();
        let w_j = self.reference_weight_matrix();
        let w_i = Matrix3::identity() - w_j.clone();
        itilde[self.node_i] += coupling.clone() * w_i;
        itilde[self.node_j] += coupling * w_j;
        itilde
    }

    pub fn generalized_interpolation_matrices_at_xi(&self, xi: f64) -> Vec<Matrix3<T>> {
        let ivals = lagrange_values(self.num_nodes(), xi);
        self.generalized_interpolation_matrices(&self.local_rotation(&ivals), &ivals)
    }

    /// xi-derivative of the generalized interpolation matrices.
    pub fn generalized_interpolation_matrices_deriv(
        &self,
        psi_l: &Vector3<T>,
        psi_l_xi: &Vector3<T>,
        ivals: &[f64],
        ivals_xi: &[f64],
    ) -> Vec<Matrix3<T>> {
        let lambda_r = triad_from_quaternion(&self.q_r);
        let tinv_l = tangential_transform_inv(psi_l);
        let dtinv_l = tangential_transform_inv_deriv(psi_l, psi_l_xi);

        let mut itilde_xi = Vec::with_capacity(self.num_nodes());
        let mut weighted_sum = Matrix3::<T>::zeros();
        let mut weighted_sum_xi = Matrix3::<T>::zeros();
        for ((psi_i, &w), &w_xi) in self.psi_node.iter().zip(ivals.iter()).zip(ivals_xi.iter()) {
            let t_i = tangential_transform(psi_i);
            weighted_sum += t_i.clone() * T::from_f64(w);
            weighted_sum_xi += t_i.clone() * T::from_f64(w_xi);
            let inner = tinv_l.clone() * T::from_f64(w_xi) + dtinv_l.clone() * T::from_f64(w);
            itilde_xi.push(lambda_r.clone() * inner * t_i * lambda_r.transpose());
        }

        let coupling_xi = -(lambda_r.clone()
            * (dtinv_l * weighted_sum + tinv_l * weighted_sum_xi)
            * lambda_r.transpose());
        let w_j = self.reference_weight_matrix();
        let w_i = Matrix3::identity() - w_j.clone();
        itilde_xi[self.node_i] += coupling_xi.clone() * w_i;
        itilde_xi[self.node_j] += coupling_xi * w_j;
        itilde_xi
    }

    pub fn generalized_interpolation_matrices_deriv_at_xi(&self, xi: f64) -> Vec<Matrix3<T>> {
        let n = self.num_nodes();
        let ivals = lagrange_values(n, xi);
        let ivals_xi = lagrange_derivs(n, xi);
        let psi_l = self.local_rotation(&ivals);
        let psi_l_xi = self.local_rotation(&ivals_xi);
        self.generalized_interpolation_matrices_deriv(&psi_l, &psi_l_xi, &ivals, &ivals_xi)
    }
}
