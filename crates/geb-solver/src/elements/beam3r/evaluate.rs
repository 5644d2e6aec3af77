//! Internal elastic forces and consistent tangents.
//!
//! The residual follows Jelenic & Crisfield (1999), eq. (4.3): virtual spins
//! are interpolated with plain Lagrange polynomials, while the triad field
//! itself (and therefore the strain measures) uses the objective
//! local-rotation-vector interpolation. Axial/shear terms and torsion/bending
//! terms are integrated with separate quadrature rules (deliberate
//! under-integration of the former, see the rule table).
//!
//! The consistent tangent exists in two mutually exclusive flavors per term:
//! the analytic linearization below, and the automatic-differentiation path
//! that recomputes the complete force vector with dual-number DOFs and reads
//! the tangent off the dual parts. With `use_fad` set the analytic routines
//! are skipped entirely; without it the dual-number path is never entered.
//! Both produce the same matrix to solver precision.

use super::Beam3r;
use crate::elements::BeamElement;
use crate::error::{BeamError, Result};
use crate::materials::{evaluate_force_stress, evaluate_moment_stress};
use crate::params::LieGroupGenAlphaParams;
use geb_fem::quadrature::IntegrationPurpose;
use geb_fem::rotations::{spin, tangential_transform, tangential_transform_inv};
use geb_fem::shape::{centerline_derivs, centerline_values, lagrange_derivs, lagrange_values};
use geb_fem::{Dual, RealScalar, TriadInterpolation};
use nalgebra::{DMatrix, DVector, Matrix3, Vector3, Vector4};

/// Constant distributed load per unit reference length.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineLoad {
    pub force: Vector3<f64>,
    pub moment: Vector3<f64>,
}

impl Beam3r {
    /// Evaluate the element for the given state vector.
    ///
    /// Any requested output is overwritten (not accumulated). The stiffness
    /// matrix is the consistent linearization of the internal force with
    /// respect to multiplicative spin increments of the nodal triads and
    /// additive increments of the remaining DOFs. Mass matrix and inertia
    /// force are only computed when `dynamics` parameters are supplied.
    /// Repeated calls with identical input produce identical output and do
    /// not advance the converged state.
    pub fn evaluate(
        &mut self,
        disp: &DVector<f64>,
        mut stiffmatrix: Option<&mut DMatrix<f64>>,
        mut massmatrix: Option<&mut DMatrix<f64>>,
        mut force: Option<&mut DVector<f64>>,
        mut inertia_force: Option<&mut DVector<f64>>,
        dynamics: Option<&LieGroupGenAlphaParams>,
    ) -> Result<()> {
        self.require_initialized()?;
        if let Some(m) = stiffmatrix.as_mut() {
            self.check_matrix_size(m, "stiffness matrix")?;
            m.fill(0.0);
        }
        if let Some(m) = massmatrix.as_mut() {
            self.check_matrix_size(m, "mass matrix")?;
            m.fill(0.0);
        }
        if let Some(f) = force.as_mut() {
            self.check_vector_size(f, "internal force vector")?;
            f.fill(0.0);
        }
        if let Some(f) = inertia_force.as_mut() {
            self.check_vector_size(f, "inertia force vector")?;
            f.fill(0.0);
        }

        let (cl, qnode) = self.update_disp_totlag_and_nodal_triads(disp)?;
        self.qnewnode = qnode.clone();

        self.eint = 0.0;
        self.kmax = 0.0;

        if self.use_fad {
            let (cl_d, qnode_d) = self.set_automatic_differentiation_variables(&cl, &qnode);
            let mut force_d = DVector::from_element(self.ndof(), Dual::constant(0.0));
            self.calc_internal_force_and_stiff(&cl_d, &qnode_d, None, &mut force_d)?;
            if let Some(stiff) = stiffmatrix.as_mut() {
                self.calc_stiffmat_automatic_differentiation(stiff, &qnode, &force_d);
            }
            if let Some(f) = force.as_mut() {
                for i in 0..self.ndof() {
                    f[i] = force_d[i].val();
                }
            }
        } else {
            let mut force_plain = DVector::zeros(self.ndof());
            self.calc_internal_force_and_stiff(
                &cl,
                &qnode,
                stiffmatrix.as_mut().map(|m| &mut **m),
                &mut force_plain,
            )?;
            if let Some(f) = force.as_mut() {
                f.copy_from(&force_plain);
            }
        }

        if let Some(f) = force.as_ref() {
            if f.iter().any(|x| !x.is_finite()) {
                return Err(BeamError::NumericalDegeneracy {
                    element: self.id(),
                    what: "non-finite internal force".to_string(),
                });
            }
        }
        if let Some(m) = stiffmatrix.as_ref() {
            if m.iter().any(|x| !x.is_finite()) {
                return Err(BeamError::NumericalDegeneracy {
                    element: self.id(),
                    what: "non-finite stiffness matrix".to_string(),
                });
            }
        }

        if let Some(params) = dynamics {
            if massmatrix.is_some() || inertia_force.is_some() {
                self.calc_inertia_force_and_mass_matrix(
                    &cl,
                    &qnode,
                    params,
                    massmatrix.as_mut().map(|m| &mut **m),
                    inertia_force.as_mut().map(|f| &mut **f),
                )?;
            }
        }

        Ok(())
    }

    /// Internal force vector (and, on the plain-scalar path, the analytic
    /// stiffness) from total-Lagrangian centerline DOFs and current nodal
    /// quaternions. Shared verbatim between `f64` and dual-number scalars.
    pub(super) fn calc_internal_force_and_stiff<T: RealScalar>(
        &mut self,
        disp_cl: &DVector<T>,
        qnode: &[Vector4<T>],
        mut stiffmatrix: Option<&mut DMatrix<f64>>,
        internal_force: &mut DVector<T>,
    ) -> Result<()> {
        let nnodecl = self.nnodecl();
        let nnodetriad = self.num_nodes();
        let vpernode = self.vpernode();

        let triad_ip = TriadInterpolation::new(qnode)?;
        let c_n = self.material.constitutive_matrix_forces();
        let c_m = self.material.constitutive_matrix_moments();

        // --- axial and shear contributions, elastic-force rule -------------
        let rule = self.my_gauss_rule(IntegrationPurpose::ElasticForce);
        for (gp, (&xi, &wgt)) in rule.points.iter().zip(rule.weights.iter()).enumerate() {
            let jacobi = self.jacobi_gp_elastf[gp];
            let h_xi = centerline_derivs(nnodecl, vpernode, xi, self.reflength);
            let i_val = lagrange_values(nnodetriad, xi);

            // centerline derivative with respect to arc length
            let mut r_s: Vector3<T> = Vector3::zeros();
            for (idx, &h) in h_xi.iter().enumerate() {
                for k in 0..3 {
                    r_s[k] += disp_cl[3 * idx + k].clone() * T::from_f64(h / jacobi);
                }
            }

            let psi_l = triad_ip.local_rotation(&i_val);
            let lambda = triad_ip.triad_from_local(&psi_l);

            // convected strain Gamma = Lambda^T r' - Gamma_ref; the reference
            // value contains Lambda_0^T r_0', so initially sheared reference
            // configurations are admissible
            let mut gamma = lambda.transpose() * r_s.clone();
            gamma -= self.gamma_ref_gp[gp].map(T::from_f64);

            let stress_n_mat = evaluate_force_stress(self.material.as_ref(), &gamma);
            let stress_n = &lambda * &stress_n_mat;

            for node in 0..nnodecl {
                for v in 0..vpernode {
                    let row_base = if v == 0 {
                        self.pos_dof(node, 0)
                    } else {
                        self.tan_dof(node, 0)
                    };
                    let fac = T::from_f64(h_xi[vpernode * node + v] * wgt);
                    for k in 0..3 {
                        internal_force[row_base + k] += stress_n[k].clone() * fac.clone();
                    }
                }
            }

            // moment balance contribution of the force stress, -S(r') n
            let rs_cross_n = spin(&r_s) * &stress_n;
            for node in 0..nnodetriad {
                let fac = T::from_f64(i_val[node] * wgt * jacobi);
                for k in 0..3 {
                    internal_force[self.rot_dof(node, k)] -=
                        rs_cross_n[k].clone() * fac.clone();
                }
            }

            self.axial_strain_gp[gp] = gamma[0].value();
            self.shear_strain_2_gp[gp] = gamma[1].value();
            self.shear_strain_3_gp[gp] = gamma[2].value();
            self.material_axial_force_gp[gp] = stress_n_mat[0].value();
            self.material_shear_force_2_gp[gp] = stress_n_mat[1].value();
            self.material_shear_force_3_gp[gp] = stress_n_mat[2].value();
            self.spatial_x_force_gp[gp] = stress_n[0].value();
            self.spatial_y_force_gp[gp] = stress_n[1].value();
            self.spatial_z_force_gp[gp] = stress_n[2].value();

            self.eint += 0.5 * gamma.dot(&stress_n_mat).value() * wgt * jacobi;

            if let Some(stiff) = stiffmatrix.as_mut() {
                if !self.use_fad {
                    let itilde: Vec<Matrix3<f64>> = triad_ip
                        .generalized_interpolation_matrices(&psi_l, &i_val)
                        .iter()
                        .map(|m| m.map(|x| x.value()))
                        .collect();
                    let lambda_v = lambda.map(|x| x.value());
                    let cn_spatial = lambda_v * c_n * lambda_v.transpose();
                    self.calc_stiffmat_analytic_force_contributions(
                        stiff,
                        &stress_n.map(|x| x.value()),
                        &cn_spatial,
                        &r_s.map(|x| x.value()),
                        &itilde,
                        &i_val,
                        &h_xi,
                        wgt,
                        jacobi,
                    );
                }
            }
        }

        // --- torsion and bending contributions, elastic-moment rule --------
        let rule = self.my_gauss_rule(IntegrationPurpose::ElasticMoment);
        for (gp, (&xi, &wgt)) in rule.points.iter().zip(rule.weights.iter()).enumerate() {
            let jacobi = self.jacobi_gp_elastm[gp];
            let i_val = lagrange_values(nnodetriad, xi);
            let i_xi = lagrange_derivs(nnodetriad, xi);

            let psi_l = triad_ip.local_rotation(&i_val);
            let psi_l_s = triad_ip.local_rotation(&i_xi) * T::from_f64(1.0 / jacobi);
            let lambda = triad_ip.triad_from_local(&psi_l);

            // material curvature, Crisfield 1999 eq. (4.9): the transposed
            // inverse tangential operator acts on the arc-length derivative
            // of the local rotation vector
            let tinv = tangential_transform_inv(&psi_l);
            let mut kappa = tinv.transpose() * psi_l_s;
            kappa -= self.kref_gp[gp].map(T::from_f64);

            let stress_m_mat = evaluate_moment_stress(self.material.as_ref(), &kappa);
            let stress_m = &lambda * &stress_m_mat;

            for node in 0..nnodetriad {
                let fac = T::from_f64(i_xi[node] * wgt);
                for k in 0..3 {
                    internal_force[self.rot_dof(node, k)] +=
                        stress_m[k].clone() * fac.clone();
                }
            }

            self.twist_gp[gp] = kappa[0].value();
            self.curvature_2_gp[gp] = kappa[1].value();
            self.curvature_3_gp[gp] = kappa[2].value();
            self.material_torque_gp[gp] = stress_m_mat[0].value();
            self.material_bending_moment_2_gp[gp] = stress_m_mat[1].value();
            self.material_bending_moment_3_gp[gp] = stress_m_mat[2].value();
            self.spatial_x_moment_gp[gp] = stress_m[0].value();
            self.spatial_y_moment_gp[gp] = stress_m[1].value();
            self.spatial_z_moment_gp[gp] = stress_m[2].value();

            let bending = (kappa[1].value().powi(2) + kappa[2].value().powi(2)).sqrt();
            self.kmax = self.kmax.max(bending);

            self.eint += 0.5 * kappa.dot(&stress_m_mat).value() * wgt * jacobi;

            if let Some(stiff) = stiffmatrix.as_mut() {
                if !self.use_fad {
                    let itilde: Vec<Matrix3<f64>> = triad_ip
                        .generalized_interpolation_matrices(&psi_l, &i_val)
                        .iter()
                        .map(|m| m.map(|x| x.value()))
                        .collect();
                    let psi_l_xi = triad_ip.local_rotation(&i_xi);
                    let itilde_xi: Vec<Matrix3<f64>> = triad_ip
                        .generalized_interpolation_matrices_deriv(
                            &psi_l, &psi_l_xi, &i_val, &i_xi,
                        )
                        .iter()
                        .map(|m| m.map(|x| x.value()))
                        .collect();
                    let lambda_v = lambda.map(|x| x.value());
                    let cm_spatial = lambda_v * c_m * lambda_v.transpose();
                    self.calc_stiffmat_analytic_moment_contributions(
                        stiff,
                        &stress_m.map(|x| x.value()),
                        &cm_spatial,
                        &itilde,
                        &itilde_xi,
                        &i_xi,
                        wgt,
                        jacobi,
                    );
                }
            }
        }

        Ok(())
    }

    /// Analytic linearization of the axial/shear force contributions of one
    /// Gauss point. Skipped on the dual-number path, where the tangent comes
    /// from automatic differentiation instead.
    #[allow(clippy::too_many_arguments)]
    fn calc_stiffmat_analytic_force_contributions(
        &self,
        stiff: &mut DMatrix<f64>,
        stress_n: &Vector3<f64>,
        cn_spatial: &Matrix3<f64>,
        r_s: &Vector3<f64>,
        itilde: &[Matrix3<f64>],
        i_val: &[f64],
        h_xi: &[f64],
        wgt: f64,
        jacobi: f64,
    ) {
        let nnodecl = self.nnodecl();
        let nnodetriad = self.num_nodes();
        let vpernode = self.vpernode();

        let s_n = spin(stress_n);
        let s_rs = spin(r_s);
        // d n / d theta = cn S(r') - S(n)  (spatial increment of the force
        // stress under a spin of the cross-section triad)
        let dn_dtheta = cn_spatial * s_rs - s_n;
        // d(-S(r') n)/d r' = S(n) - S(r') cn
        let dmom_drs = s_n - s_rs * cn_spatial;

        let row_idx = |node: usize, v: usize, k: usize| {
            if v == 0 {
                self.pos_dof(node, k)
            } else {
                self.tan_dof(node, k)
            }
        };

        for anode in 0..nnodecl {
            for av in 0..vpernode {
                let h_a = h_xi[vpernode * anode + av];

                // translational x translational
                for bnode in 0..nnodecl {
                    for bv in 0..vpernode {
                        let fac = h_a * h_xi[vpernode * bnode + bv] * wgt / jacobi;
                        for i in 0..3 {
                            for j in 0..3 {
                                stiff[(row_idx(anode, av, i), row_idx(bnode, bv, j))] +=
                                    fac * cn_spatial[(i, j)];
                            }
                        }
                    }
                }

                // translational x rotational
                for bnode in 0..nnodetriad {
                    let aux = dn_dtheta * itilde[bnode];
                    for i in 0..3 {
                        for j in 0..3 {
                            stiff[(row_idx(anode, av, i), self.rot_dof(bnode, j))] +=
                                h_a * aux[(i, j)] * wgt;
                        }
                    }
                }
            }
        }

        for anode in 0..nnodetriad {
            let i_a = i_val[anode];

            // rotational x translational
            for bnode in 0..nnodecl {
                for bv in 0..vpernode {
                    let fac = i_a * h_xi[vpernode * bnode + bv] * wgt;
                    for i in 0..3 {
                        for j in 0..3 {
                            stiff[(self.rot_dof(anode, i), row_idx(bnode, bv, j))] +=
                                fac * dmom_drs[(i, j)];
                        }
                    }
                }
            }

            // rotational x rotational
            for bnode in 0..nnodetriad {
                let aux = s_rs * dn_dtheta * itilde[bnode];
                let fac = i_a * wgt * jacobi;
                for i in 0..3 {
                    for j in 0..3 {
                        stiff[(self.rot_dof(anode, i), self.rot_dof(bnode, j))] -=
                            fac * aux[(i, j)];
                    }
                }
            }
        }
    }

    /// Analytic linearization of the torsion/bending contributions of one
    /// Gauss point. Skipped on the dual-number path.
    #[allow(clippy::too_many_arguments)]
    fn calc_stiffmat_analytic_moment_contributions(
        &self,
        stiff: &mut DMatrix<f64>,
        stress_m: &Vector3<f64>,
        cm_spatial: &Matrix3<f64>,
        itilde: &[Matrix3<f64>],
        itilde_xi: &[Matrix3<f64>],
        i_xi: &[f64],
        wgt: f64,
        jacobi: f64,
    ) {
        let nnodetriad = self.num_nodes();
        let s_m = spin(stress_m);

        for anode in 0..nnodetriad {
            let fac = i_xi[anode] * wgt;
            for bnode in 0..nnodetriad {
                // d m / d theta_b: spatial spin of the moment stress plus the
                // constitutive response to the curvature increment
                let aux = cm_spatial * itilde_xi[bnode] / jacobi - s_m * itilde[bnode];
                for i in 0..3 {
                    for j in 0..3 {
                        stiff[(self.rot_dof(anode, i), self.rot_dof(bnode, j))] +=
                            fac * aux[(i, j)];
                    }
                }
            }
        }
    }

    /// Seed the dual-number DOFs: centerline values directly, rotations
    /// through the total rotation vector of each nodal triad. The quaternion
    /// norm constraint is relaxed to first order while the dual parts
    /// propagate.
    pub(super) fn set_automatic_differentiation_variables(
        &self,
        cl: &DVector<f64>,
        qnode: &[Vector4<f64>],
    ) -> (DVector<Dual>, Vec<Vector4<Dual>>) {
        let ndof = self.ndof();
        let vpernode = self.vpernode();

        let mut cl_d = DVector::from_element(cl.len(), Dual::constant(0.0));
        for node in 0..self.nnodecl() {
            for v in 0..vpernode {
                for k in 0..3 {
                    let cli = self.cl_dof(node, v, k);
                    let elem_idx = if v == 0 {
                        self.pos_dof(node, k)
                    } else {
                        self.tan_dof(node, k)
                    };
                    cl_d[cli] = Dual::variable(cl[cli], elem_idx, ndof);
                }
            }
        }

        let thetas = Self::nodal_rotation_vectors(qnode);
        let qnode_d = (0..self.num_nodes())
            .map(|node| {
                let theta_d = Vector3::new(
                    Dual::variable(thetas[node][0], self.rot_dof(node, 0), ndof),
                    Dual::variable(thetas[node][1], self.rot_dof(node, 1), ndof),
                    Dual::variable(thetas[node][2], self.rot_dof(node, 2), ndof),
                );
                geb_fem::rotations::quaternion_from_rotation_vector(&theta_d)
            })
            .collect();

        (cl_d, qnode_d)
    }

    /// Read the stiffness matrix off the dual parts of the force vector and
    /// transform the rotational columns from additive rotation-vector
    /// increments to multiplicative spin increments.
    pub(super) fn calc_stiffmat_automatic_differentiation(
        &self,
        stiff: &mut DMatrix<f64>,
        qnode: &[Vector4<f64>],
        forcevec: &DVector<Dual>,
    ) {
        let ndof = self.ndof();
        for i in 0..ndof {
            for j in 0..ndof {
                stiff[(i, j)] = forcevec[i].deriv(j);
            }
        }

        // columns of rotational DOFs: d theta_total/d(spin increment) = T(theta)
        let thetas = Self::nodal_rotation_vectors(qnode);
        for node in 0..self.num_nodes() {
            let tmat = tangential_transform(&thetas[node]);
            let cols = [
                self.rot_dof(node, 0),
                self.rot_dof(node, 1),
                self.rot_dof(node, 2),
            ];
            for row in 0..ndof {
                let old = [
                    stiff[(row, cols[0])],
                    stiff[(row, cols[1])],
                    stiff[(row, cols[2])],
                ];
                for (j, &col) in cols.iter().enumerate() {
                    stiff[(row, col)] =
                        old[0] * tmat[(0, j)] + old[1] * tmat[(1, j)] + old[2] * tmat[(2, j)];
                }
            }
        }
    }

    /// Consistent nodal forces of a constant distributed line load in the
    /// reference configuration (dead load).
    pub fn evaluate_line_load(
        &self,
        load: &LineLoad,
        external_force: &mut DVector<f64>,
    ) -> Result<()> {
        self.require_initialized()?;
        self.check_vector_size(external_force, "external force vector")?;
        external_force.fill(0.0);

        let rule = self.my_gauss_rule(IntegrationPurpose::NeumannLineload);
        for (gp, (&xi, &wgt)) in rule.points.iter().zip(rule.weights.iter()).enumerate() {
            let wj = wgt * self.jacobi_gp_neumannline[gp];
            let h = centerline_values(self.nnodecl(), self.vpernode(), xi, self.reflength);
            let i_val = lagrange_values(self.num_nodes(), xi);

            for node in 0..self.nnodecl() {
                for v in 0..self.vpernode() {
                    let row_base = if v == 0 {
                        self.pos_dof(node, 0)
                    } else {
                        self.tan_dof(node, 0)
                    };
                    let h_i = h[self.vpernode() * node + v];
                    for k in 0..3 {
                        external_force[row_base + k] += h_i * load.force[k] * wj;
                    }
                }
            }
            for node in 0..self.num_nodes() {
                for k in 0..3 {
                    external_force[self.rot_dof(node, k)] += i_val[node] * load.moment[k] * wj;
                }
            }
        }
        Ok(())
    }
}
