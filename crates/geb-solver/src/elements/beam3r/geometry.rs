//! Reference geometry setup and configuration-dependent accessors.

use super::Beam3r;
use crate::elements::BeamElement;
use crate::error::{BeamError, Result};
use geb_fem::TriadInterpolation;
use geb_fem::quadrature::{IntegrationPurpose, gauss_rule};
use geb_fem::rotations::{
    compose_quaternions, quaternion_from_rotation_vector, rotation_vector_from_quaternion,
    tangential_transform_inv, triad_from_quaternion,
};
use geb_fem::shape::{centerline_derivs, centerline_values, lagrange_derivs, lagrange_node_positions};
use nalgebra::{DMatrix, DVector, Matrix3, Vector3, Vector4};

impl Beam3r {
    /// Set up all reference-configuration data from the reference nodal
    /// positions (centerline nodes) and reference nodal rotation vectors
    /// (triad nodes). One-time operation; the reference geometry is immutable
    /// afterwards.
    pub fn set_up_reference_geometry(
        &mut self,
        xrefe: &[Vector3<f64>],
        rotrefe: &[Vector3<f64>],
    ) -> Result<()> {
        if self.isinit {
            return Err(BeamError::AlreadyInitialized { element: self.id() });
        }
        let nnodecl = self.nnodecl();
        let nnodetriad = self.num_nodes();
        if xrefe.len() != nnodecl {
            return Err(BeamError::SizeMismatch {
                element: self.id(),
                what: "reference nodal positions",
                expected: nnodecl,
                got: xrefe.len(),
            });
        }
        if rotrefe.len() != nnodetriad {
            return Err(BeamError::SizeMismatch {
                element: self.id(),
                what: "reference nodal rotation vectors",
                expected: nnodetriad,
                got: rotrefe.len(),
            });
        }

        self.xref = xrefe.to_vec();
        self.theta0node = rotrefe.to_vec();

        let qref: Vec<Vector4<f64>> = rotrefe
            .iter()
            .map(quaternion_from_rotation_vector)
            .collect();
        self.qconvnode = qref.clone();
        self.qnewnode = qref.clone();

        // reference tangents at the centerline nodes: for Hermite
        // interpolation the first triad director, otherwise the normalized
        // centerline derivative
        self.tref = if self.centerline_hermite {
            (0..nnodecl)
                .map(|node| triad_from_quaternion(&qref[node]) * Vector3::x())
                .collect()
        } else {
            lagrange_node_positions(nnodecl)
                .iter()
                .map(|&xi_node| {
                    let derivs = lagrange_derivs(nnodecl, xi_node);
                    let mut t = Vector3::zeros();
                    for (x, &d) in xrefe.iter().zip(derivs.iter()) {
                        t += x * d;
                    }
                    t.normalize()
                })
                .collect()
        };

        self.reflength = self.compute_reference_length()?;

        let ref_cl = self.reference_centerline_dofvec();
        let triad_ref = TriadInterpolation::new(&qref)?;

        // Jacobi determinants per integration purpose
        for purpose in [
            IntegrationPurpose::ElasticForce,
            IntegrationPurpose::ElasticMoment,
            IntegrationPurpose::Inertia,
            IntegrationPurpose::DampStoch,
            IntegrationPurpose::NeumannLineload,
        ] {
            let rule = self.my_gauss_rule(purpose);
            let mut jacobi = Vec::with_capacity(rule.num_points());
            for &xi in rule.points {
                let j = self.centerline_deriv_norm(&ref_cl, xi);
                if j < 1e-12 * self.reflength.max(1.0) {
                    return Err(BeamError::NumericalDegeneracy {
                        element: self.id(),
                        what: format!("Jacobi determinant {j:e} at xi = {xi}"),
                    });
                }
                jacobi.push(j);
            }
            match purpose {
                IntegrationPurpose::ElasticForce => self.jacobi_gp_elastf = jacobi,
                IntegrationPurpose::ElasticMoment => self.jacobi_gp_elastm = jacobi,
                IntegrationPurpose::Inertia => self.jacobi_gp_mass = jacobi,
                IntegrationPurpose::DampStoch => self.jacobi_gp_dampstoch = jacobi,
                IntegrationPurpose::NeumannLineload => self.jacobi_gp_neumannline = jacobi,
            }
        }

        // reference strain at the elastic-force Gauss points:
        // Gamma_ref = Lambda_0^T r_0'. Storing the full product (instead of
        // its deviation from the unit vector e1) allows arbitrary initial
        // triads, i.e. initially sheared configurations.
        let rule_f = self.my_gauss_rule(IntegrationPurpose::ElasticForce);
        self.gamma_ref_gp = rule_f
            .points
            .iter()
            .zip(self.jacobi_gp_elastf.clone())
            .map(|(&xi, jac)| {
                let r_xi = self.centerline_deriv(&ref_cl, xi);
                let lambda0 = triad_ref.triad_at_xi(xi);
                lambda0.transpose() * (r_xi / jac)
            })
            .collect();

        // reference curvature at the elastic-moment Gauss points:
        // K_ref = Tinv(Psi_l)^T Psi_l' (captures pre-curved and pre-twisted
        // reference configurations)
        let rule_m = self.my_gauss_rule(IntegrationPurpose::ElasticMoment);
        self.kref_gp = rule_m
            .points
            .iter()
            .zip(self.jacobi_gp_elastm.clone())
            .map(|(&xi, jac)| {
                let psi_l = triad_ref.local_rotation_at_xi(xi);
                let psi_l_s = triad_ref.local_rotation_deriv_at_xi(xi) / jac;
                tangential_transform_inv(&psi_l).transpose() * psi_l_s
            })
            .collect();

        // Gauss-point history buffers for Lie-group time integration
        let rule_mass = self.my_gauss_rule(IntegrationPurpose::Inertia);
        let ngp_mass = rule_mass.num_points();
        self.qconv_gp_mass = rule_mass
            .points
            .iter()
            .map(|&xi| triad_ref.quaternion_at_xi(xi))
            .collect();
        self.qnew_gp_mass = self.qconv_gp_mass.clone();
        self.rconv_gp_mass = rule_mass
            .points
            .iter()
            .map(|&xi| self.centerline_value(&ref_cl, xi))
            .collect();
        self.rnew_gp_mass = self.rconv_gp_mass.clone();
        let zeros = vec![Vector3::zeros(); ngp_mass];
        self.wconv_gp_mass = zeros.clone();
        self.wnew_gp_mass = zeros.clone();
        self.aconv_gp_mass = zeros.clone();
        self.anew_gp_mass = zeros.clone();
        self.amodconv_gp_mass = zeros.clone();
        self.amodnew_gp_mass = zeros.clone();
        self.rtconv_gp_mass = zeros.clone();
        self.rtnew_gp_mass = zeros.clone();
        self.rttconv_gp_mass = zeros.clone();
        self.rttnew_gp_mass = zeros.clone();
        self.rttmodconv_gp_mass = zeros.clone();
        self.rttmodnew_gp_mass = zeros;

        let rule_damp = self.my_gauss_rule(IntegrationPurpose::DampStoch);
        self.qconv_gp_dampstoch = rule_damp
            .points
            .iter()
            .map(|&xi| triad_ref.quaternion_at_xi(xi))
            .collect();
        self.qnew_gp_dampstoch = self.qconv_gp_dampstoch.clone();

        self.size_diagnostic_buffers();
        self.isinit = true;
        Ok(())
    }

    /// Reference length of the centerline. For Hermite interpolation the
    /// length enters the tangent shape functions, so it is obtained from a
    /// fixed-point iteration; for Lagrange interpolation a single pass of
    /// high-order quadrature suffices.
    fn compute_reference_length(&self) -> Result<f64> {
        let rule = gauss_rule(5);
        let integrate = |length: f64| -> f64 {
            rule.points
                .iter()
                .zip(rule.weights.iter())
                .map(|(&xi, &w)| {
                    let derivs =
                        centerline_derivs(self.nnodecl(), self.vpernode(), xi, length);
                    let mut r_xi = Vector3::zeros();
                    for node in 0..self.nnodecl() {
                        r_xi += self.xref[node] * derivs[self.vpernode() * node];
                        if self.centerline_hermite {
                            r_xi += self.tref[node] * derivs[self.vpernode() * node + 1];
                        }
                    }
                    w * r_xi.norm()
                })
                .sum()
        };

        if !self.centerline_hermite {
            return Ok(integrate(0.0));
        }

        let mut length = (self.xref[1] - self.xref[0]).norm();
        for _ in 0..50 {
            let next = integrate(length);
            if (next - length).abs() < 1e-14 * length.max(1.0) {
                return Ok(next);
            }
            length = next;
        }
        Err(BeamError::NumericalDegeneracy {
            element: self.id(),
            what: "reference length iteration did not converge".to_string(),
        })
    }

    /// Centerline DOF vector of the reference configuration
    /// (positions and, for Hermite interpolation, unit tangents).
    pub(super) fn reference_centerline_dofvec(&self) -> DVector<f64> {
        let vpernode = self.vpernode();
        let mut dofvec = DVector::zeros(3 * vpernode * self.nnodecl());
        for node in 0..self.nnodecl() {
            for k in 0..3 {
                dofvec[self.cl_dof(node, 0, k)] = self.xref[node][k];
                if self.centerline_hermite {
                    dofvec[self.cl_dof(node, 1, k)] = self.tref[node][k];
                }
            }
        }
        dofvec
    }

    fn centerline_value(&self, cl_dofvec: &DVector<f64>, xi: f64) -> Vector3<f64> {
        let vals = centerline_values(self.nnodecl(), self.vpernode(), xi, self.reflength);
        let mut r = Vector3::zeros();
        for (idx, &h) in vals.iter().enumerate() {
            for k in 0..3 {
                r[k] += h * cl_dofvec[3 * idx + k];
            }
        }
        r
    }

    fn centerline_deriv(&self, cl_dofvec: &DVector<f64>, xi: f64) -> Vector3<f64> {
        let derivs = centerline_derivs(self.nnodecl(), self.vpernode(), xi, self.reflength);
        let mut r_xi = Vector3::zeros();
        for (idx, &h) in derivs.iter().enumerate() {
            for k in 0..3 {
                r_xi[k] += h * cl_dofvec[3 * idx + k];
            }
        }
        r_xi
    }

    fn centerline_deriv_norm(&self, cl_dofvec: &DVector<f64>, xi: f64) -> f64 {
        self.centerline_deriv(cl_dofvec, xi).norm()
    }

    /// Jacobi factor ds/dxi at `xi`; a pure reference-configuration quantity
    /// since the arc-length parametrization refers to the reference
    /// centerline.
    pub(super) fn reference_jacobi_fac_at_xi(&self, xi: f64) -> f64 {
        self.centerline_deriv_norm(&self.reference_centerline_dofvec(), xi)
    }

    /// Total-Lagrangian centerline DOFs and current nodal quaternions for an
    /// element state vector.
    ///
    /// Translational (and tangent) entries of `disp` are displacements from
    /// the reference configuration; rotational entries are multiplicative
    /// rotation-vector increments relative to the converged nodal triads.
    pub(super) fn update_disp_totlag_and_nodal_triads(
        &self,
        disp: &DVector<f64>,
    ) -> Result<(DVector<f64>, Vec<Vector4<f64>>)> {
        self.require_initialized()?;
        self.check_vector_size(disp, "element state vector")?;

        let vpernode = self.vpernode();
        let mut cl = DVector::zeros(3 * vpernode * self.nnodecl());
        for node in 0..self.nnodecl() {
            for k in 0..3 {
                cl[self.cl_dof(node, 0, k)] = self.xref[node][k] + disp[self.pos_dof(node, k)];
                if self.centerline_hermite {
                    cl[self.cl_dof(node, 1, k)] =
                        self.tref[node][k] + disp[self.tan_dof(node, k)];
                }
            }
        }

        let mut qnode = Vec::with_capacity(self.num_nodes());
        for node in 0..self.num_nodes() {
            let psi_inc = Vector3::new(
                disp[self.rot_dof(node, 0)],
                disp[self.rot_dof(node, 1)],
                disp[self.rot_dof(node, 2)],
            );
            let angle = psi_inc.norm();
            if angle > 0.95 * std::f64::consts::PI {
                // no fallback exists for increments near pi; the time/load
                // step size is expected to keep increments small
                log::warn!(
                    "element {}: rotation increment of {angle:.3} rad at node {node} approaches pi",
                    self.id()
                );
            }
            if !angle.is_finite() {
                return Err(BeamError::NumericalDegeneracy {
                    element: self.id(),
                    what: format!("non-finite rotation increment at node {node}"),
                });
            }
            qnode.push(compose_quaternions(
                &quaternion_from_rotation_vector(&psi_inc),
                &self.qconvnode[node],
            ));
        }

        Ok((cl, qnode))
    }

    /// Extract the centerline-relevant values from an element state vector,
    /// optionally adding the reference values.
    pub fn extract_centerline_dof_values(
        &self,
        disp: &DVector<f64>,
        add_reference_values: bool,
    ) -> Result<DVector<f64>> {
        self.check_vector_size(disp, "element state vector")?;
        let vpernode = self.vpernode();
        let mut cl = DVector::zeros(3 * vpernode * self.nnodecl());
        for node in 0..self.nnodecl() {
            for k in 0..3 {
                let mut val = disp[self.pos_dof(node, k)];
                if add_reference_values {
                    val += self.xref[node][k];
                }
                cl[self.cl_dof(node, 0, k)] = val;
                if self.centerline_hermite {
                    let mut tval = disp[self.tan_dof(node, k)];
                    if add_reference_values {
                        tval += self.tref[node][k];
                    }
                    cl[self.cl_dof(node, 1, k)] = tval;
                }
            }
        }
        Ok(cl)
    }

    /// Centerline position at `xi` in [-1, 1] for the given state vector.
    pub(super) fn centerline_position_at_xi(
        &self,
        xi: f64,
        disp: &DVector<f64>,
    ) -> Result<Vector3<f64>> {
        self.require_initialized()?;
        let (cl, _) = self.update_disp_totlag_and_nodal_triads(disp)?;
        Ok(self.centerline_value(&cl, xi))
    }

    /// Cross-section triad at `xi` in [-1, 1] for the given state vector.
    pub(super) fn cross_section_triad_at_xi(
        &self,
        xi: f64,
        disp: &DVector<f64>,
    ) -> Result<Matrix3<f64>> {
        self.require_initialized()?;
        let (_, qnode) = self.update_disp_totlag_and_nodal_triads(disp)?;
        let triad_ip = TriadInterpolation::new(&qnode)?;
        Ok(triad_ip.triad_at_xi(xi))
    }

    /// Generalized interpolation matrix mapping primary DOF variations to
    /// the variation of position and orientation at `xi` (6 x ndof).
    pub fn generalized_interpolation_matrix_variations_at_xi(
        &self,
        xi: f64,
        disp: &DVector<f64>,
    ) -> Result<DMatrix<f64>> {
        self.require_initialized()?;
        let (_, qnode) = self.update_disp_totlag_and_nodal_triads(disp)?;
        let triad_ip = TriadInterpolation::new(&qnode)?;
        let itilde = triad_ip.generalized_interpolation_matrices_at_xi(xi);

        let h = centerline_values(self.nnodecl(), self.vpernode(), xi, self.reflength);

        let mut ivar = DMatrix::zeros(6, self.ndof());
        for node in 0..self.nnodecl() {
            for k in 0..3 {
                ivar[(k, self.pos_dof(node, k))] = h[self.vpernode() * node];
                if self.centerline_hermite {
                    ivar[(k, self.tan_dof(node, k))] = h[self.vpernode() * node + 1];
                }
            }
        }
        for node in 0..self.num_nodes() {
            for i in 0..3 {
                for j in 0..3 {
                    ivar[(3 + i, self.rot_dof(node, j))] = itilde[node][(i, j)];
                }
            }
        }
        Ok(ivar)
    }

    /// Generalized interpolation matrix mapping primary DOF increments to
    /// increments of position and orientation at `xi`. Identical to the
    /// variations variant for this formulation (both are multiplicative spin
    /// quantities).
    pub fn generalized_interpolation_matrix_increments_at_xi(
        &self,
        xi: f64,
        disp: &DVector<f64>,
    ) -> Result<DMatrix<f64>> {
        self.generalized_interpolation_matrix_variations_at_xi(xi, disp)
    }

    /// Current nodal quaternions for a full element state vector, or, when a
    /// plain list of rotation-vector increments (3 per triad node) is given,
    /// from those increments directly.
    pub fn nodal_triads_from_disp(&self, dispvec: &[f64]) -> Result<Vec<Vector4<f64>>> {
        self.require_initialized()?;
        if dispvec.len() == 3 * self.num_nodes() {
            let mut qnode = Vec::with_capacity(self.num_nodes());
            for node in 0..self.num_nodes() {
                let psi_inc = Vector3::new(
                    dispvec[3 * node],
                    dispvec[3 * node + 1],
                    dispvec[3 * node + 2],
                );
                qnode.push(compose_quaternions(
                    &quaternion_from_rotation_vector(&psi_inc),
                    &self.qconvnode[node],
                ));
            }
            Ok(qnode)
        } else {
            let disp = DVector::from_column_slice(dispvec);
            let (_, qnode) = self.update_disp_totlag_and_nodal_triads(&disp)?;
            Ok(qnode)
        }
    }

    /// Total rotation vectors of the current nodal triads (used for seeding
    /// automatic differentiation).
    pub(super) fn nodal_rotation_vectors(qnode: &[Vector4<f64>]) -> Vec<Vector3<f64>> {
        qnode.iter().map(rotation_vector_from_quaternion).collect()
    }
}
