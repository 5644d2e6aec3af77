//! Viscous damping and stochastic forcing for Brownian dynamics.
//!
//! In the overdamped regime of coarse-grained polymer/filament simulation the
//! beam is immersed in a background fluid. Three force contributions arise,
//! all integrated with the damping/stochastic quadrature rule and additively
//! superposed on the elastic (and, if present, inertial) forces by the
//! driver:
//!
//!  - translational drag proportional to the relative velocity between the
//!    centerline and the background flow, with anisotropic slender-body
//!    coefficients (perpendicular drag differs from parallel drag, Howard,
//!    Mechanics of Motile Cells, table 6.2);
//!  - rotational drag about the filament axis, proportional to the axial
//!    component of the cross-section angular velocity;
//!  - stochastic forces built from externally drawn random values whose
//!    standard deviation the driver chooses according to the
//!    fluctuation-dissipation theorem; the element only applies the
//!    anisotropic sqrt-coefficient weighting and the quadrature factors.
//!
//! The angular velocity at the damping Gauss points is obtained from the
//! rotation increment between the converged and the current Gauss-point
//! triad, so this path maintains its own triad history buffers.

use super::Beam3r;
use crate::elements::BeamElement;
use crate::error::{BeamError, Result};
use crate::params::BrownianParams;
use geb_fem::TriadInterpolation;
use geb_fem::quadrature::IntegrationPurpose;
use geb_fem::rotations::{
    compose_quaternions, inverse_quaternion, rotation_vector_from_quaternion, spin,
    triad_from_quaternion,
};
use geb_fem::shape::{centerline_derivs, centerline_values, lagrange_values};
use nalgebra::{DMatrix, DVector, Matrix3, Vector3, Vector4};

impl Beam3r {
    /// Evaluate damping and stochastic force contributions for Brownian
    /// dynamics.
    ///
    /// `disp` and `vel` are the element state and velocity vectors in the
    /// usual DOF layout. Any requested output is overwritten. The random
    /// number slice must have exactly the length declared by
    /// [`BeamElement::how_many_random_numbers_i_need`]; its values are
    /// consumed in Gauss-point-major order, three per point (or a single
    /// triple when stochastic forces are held constant over the element).
    pub fn evaluate_brownian(
        &mut self,
        disp: &DVector<f64>,
        vel: &DVector<f64>,
        params: &BrownianParams<'_>,
        mut stiffmatrix: Option<&mut DMatrix<f64>>,
        mut force: Option<&mut DVector<f64>>,
    ) -> Result<()> {
        self.require_initialized()?;
        self.check_vector_size(disp, "element state vector")?;
        self.check_vector_size(vel, "element velocity vector")?;
        if params.dt <= 0.0 {
            return Err(BeamError::Unsupported {
                element: self.id(),
                what: format!("non-positive time step size {}", params.dt),
            });
        }
        let needed = self.how_many_random_numbers_i_need();
        if params.random_numbers.len() != needed {
            return Err(BeamError::SizeMismatch {
                element: self.id(),
                what: "random number slice",
                expected: needed,
                got: params.random_numbers.len(),
            });
        }
        if let Some(bg) = params.background {
            if bg.flow_dir > 2 || bg.grad_dir > 2 {
                return Err(BeamError::Unsupported {
                    element: self.id(),
                    what: format!(
                        "shear flow directions ({}, {})",
                        bg.flow_dir, bg.grad_dir
                    ),
                });
            }
        }
        if let Some(m) = stiffmatrix.as_mut() {
            self.check_matrix_size(m, "Brownian stiffness matrix")?;
            m.fill(0.0);
        }
        if let Some(f) = force.as_mut() {
            self.check_vector_size(f, "Brownian force vector")?;
            f.fill(0.0);
        }

        let (cl, qnode) = self.update_disp_totlag_and_nodal_triads(disp)?;
        self.qnewnode = qnode.clone();
        let vel_cl = self.extract_centerline_dof_values(vel, false)?;

        self.evaluate_translational_damping(
            &cl,
            &vel_cl,
            params,
            stiffmatrix.as_mut().map(|m| &mut **m),
            force.as_mut().map(|f| &mut **f),
        );
        self.evaluate_stochastic_forces(
            &cl,
            params,
            stiffmatrix.as_mut().map(|m| &mut **m),
            force.as_mut().map(|f| &mut **f),
        );
        self.evaluate_rotational_damping(
            &qnode,
            params,
            stiffmatrix.as_mut().map(|m| &mut **m),
            force.as_mut().map(|f| &mut **f),
        )?;

        Ok(())
    }

    /// Background flow velocity and its spatial gradient at `point`.
    fn background_velocity(
        params: &BrownianParams<'_>,
        point: &Vector3<f64>,
    ) -> (Vector3<f64>, Matrix3<f64>) {
        let mut vel = Vector3::zeros();
        let mut grad = Matrix3::zeros();
        if let Some(bg) = params.background {
            vel[bg.flow_dir] = bg.rate * point[bg.grad_dir];
            grad[(bg.flow_dir, bg.grad_dir)] = bg.rate;
        }
        (vel, grad)
    }

    /// Translational drag forces, `f = N_a (gamma_perp I
    /// + (gamma_par - gamma_perp) t t^T)(v - v_bg)`, and their linearization
    /// with respect to the centerline DOFs (velocities enter through the
    /// backward-difference factor 1/dt of the driver's velocity update).
    fn evaluate_translational_damping(
        &self,
        disp_cl: &DVector<f64>,
        vel_cl: &DVector<f64>,
        params: &BrownianParams<'_>,
        mut stiffmatrix: Option<&mut DMatrix<f64>>,
        mut force: Option<&mut DVector<f64>>,
    ) {
        let nnodecl = self.nnodecl();
        let vpernode = self.vpernode();
        let g_par = params.damping.gamma_par;
        let g_perp = params.damping.gamma_perp;
        let dt = params.dt;

        let row_idx = |node: usize, v: usize, k: usize| {
            if v == 0 {
                self.pos_dof(node, k)
            } else {
                self.tan_dof(node, k)
            }
        };

        let rule = self.my_gauss_rule(IntegrationPurpose::DampStoch);
        for (gp, (&xi, &wgt)) in rule.points.iter().zip(rule.weights.iter()).enumerate() {
            let jacobi = self.jacobi_gp_dampstoch[gp];
            let h = centerline_values(nnodecl, vpernode, xi, self.reflength);
            let h_xi = centerline_derivs(nnodecl, vpernode, xi, self.reflength);

            let mut point = Vector3::zeros();
            let mut tangent = Vector3::zeros();
            let mut velgp = Vector3::zeros();
            for idx in 0..vpernode * nnodecl {
                for k in 0..3 {
                    point[k] += h[idx] * disp_cl[3 * idx + k];
                    tangent[k] += h_xi[idx] * disp_cl[3 * idx + k] / jacobi;
                    velgp[k] += h[idx] * vel_cl[3 * idx + k];
                }
            }

            let (velbg, velbg_grad) = Self::background_velocity(params, &point);
            let vrel = velgp - velbg;

            // anisotropic drag matrix per unit length
            let damp = Matrix3::identity() * g_perp
                + tangent * tangent.transpose() * (g_par - g_perp);

            if let Some(f) = force.as_mut() {
                let drag = damp * vrel;
                for a in 0..vpernode * nnodecl {
                    let fac = h[a] * wgt * jacobi;
                    for k in 0..3 {
                        f[row_idx(a / vpernode, a % vpernode, k)] += fac * drag[k];
                    }
                }
            }

            if let Some(stiff) = stiffmatrix.as_mut() {
                // (t (x) t) grad(v_bg) coupling of the anisotropic part
                let tt_grad = tangent * (tangent.transpose() * velbg_grad);
                let t_dot_vrel = tangent.dot(&vrel);

                for a in 0..vpernode * nnodecl {
                    let (anode, av) = (a / vpernode, a % vpernode);
                    for b in 0..vpernode * nnodecl {
                        let (bnode, bv) = (b / vpernode, b % vpernode);
                        let fac_val = wgt * jacobi * h[a] * h[b];
                        let fac_der = wgt * h[a] * h_xi[b];
                        for k in 0..3 {
                            let row = row_idx(anode, av, k);
                            // drag stiffness through d(v)/d(d) = I/dt and the
                            // background velocity gradient
                            for l in 0..3 {
                                let col = row_idx(bnode, bv, l);
                                stiff[(row, col)] += fac_val * damp[(k, l)] / dt;
                                stiff[(row, col)] -= fac_val
                                    * (velbg_grad[(k, l)] * g_perp
                                        + (g_par - g_perp) * tt_grad[(k, l)]);
                                // tangent variation of the anisotropic part
                                stiff[(row, col)] +=
                                    fac_der * (g_par - g_perp) * tangent[k] * vrel[l];
                            }
                            stiff[(row, row_idx(bnode, bv, k))] +=
                                fac_der * (g_par - g_perp) * t_dot_vrel;
                        }
                    }
                }
            }
        }
    }

    /// Stochastic line forces from the externally supplied random values,
    /// weighted with the square roots of the drag coefficients so that the
    /// resulting force variance matches the translational damping.
    fn evaluate_stochastic_forces(
        &self,
        disp_cl: &DVector<f64>,
        params: &BrownianParams<'_>,
        mut stiffmatrix: Option<&mut DMatrix<f64>>,
        mut force: Option<&mut DVector<f64>>,
    ) {
        let nnodecl = self.nnodecl();
        let vpernode = self.vpernode();
        let sqrt_par = params.damping.gamma_par.sqrt();
        let sqrt_perp = params.damping.gamma_perp.sqrt();

        let row_idx = |node: usize, v: usize, k: usize| {
            if v == 0 {
                self.pos_dof(node, k)
            } else {
                self.tan_dof(node, k)
            }
        };

        let rule = self.my_gauss_rule(IntegrationPurpose::DampStoch);
        for (gp, (&xi, &wgt)) in rule.points.iter().zip(rule.weights.iter()).enumerate() {
            let jacobi = self.jacobi_gp_dampstoch[gp];
            let h = centerline_values(nnodecl, vpernode, xi, self.reflength);
            let h_xi = centerline_derivs(nnodecl, vpernode, xi, self.reflength);

            let mut tangent = Vector3::zeros();
            for idx in 0..vpernode * nnodecl {
                for k in 0..3 {
                    tangent[k] += h_xi[idx] * disp_cl[3 * idx + k] / jacobi;
                }
            }

            let rand_at = |l: usize| {
                if self.const_stoch_force {
                    params.random_numbers[l]
                } else {
                    params.random_numbers[3 * gp + l]
                }
            };

            for a in 0..vpernode * nnodecl {
                let (anode, av) = (a / vpernode, a % vpernode);
                for k in 0..3 {
                    let row = row_idx(anode, av, k);
                    for l in 0..3 {
                        let coeff = sqrt_perp * ((k == l) as usize as f64)
                            + (sqrt_par - sqrt_perp) * tangent[k] * tangent[l];
                        if let Some(f) = force.as_mut() {
                            f[row] -= h[a] * coeff * rand_at(l) * (jacobi * wgt).sqrt();
                        }
                        if let Some(stiff) = stiffmatrix.as_mut() {
                            // tangent variation of the sqrt-anisotropy
                            let fac = (wgt / jacobi).sqrt() * (sqrt_par - sqrt_perp);
                            for b in 0..vpernode * nnodecl {
                                let (bnode, bv) = (b / vpernode, b % vpernode);
                                stiff[(row, row_idx(bnode, bv, k))] -=
                                    h[a] * h_xi[b] * tangent[l] * rand_at(l) * fac;
                                stiff[(row, row_idx(bnode, bv, l))] -=
                                    h[a] * h_xi[b] * tangent[k] * rand_at(l) * fac;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Rotational drag about the filament axis. The cross-section angular
    /// velocity is recovered from the rotation increment between the
    /// converged and the current triad at each damping Gauss point; only its
    /// axial component is damped (spinning of a slender filament about its
    /// own axis).
    fn evaluate_rotational_damping(
        &mut self,
        qnode: &[Vector4<f64>],
        params: &BrownianParams<'_>,
        mut stiffmatrix: Option<&mut DMatrix<f64>>,
        mut force: Option<&mut DVector<f64>>,
    ) -> Result<()> {
        let nnodetriad = self.num_nodes();
        let g_rot = params.damping.gamma_rot;
        let dt = params.dt;

        let triad_ip = TriadInterpolation::new(qnode)?;

        let rule = self.my_gauss_rule(IntegrationPurpose::DampStoch);
        for (gp, (&xi, &wgt)) in rule.points.iter().zip(rule.weights.iter()).enumerate() {
            let jacobi = self.jacobi_gp_dampstoch[gp];
            let i_val = lagrange_values(nnodetriad, xi);

            let q_new = triad_ip.quaternion_at_xi(xi);
            let lambda = triad_from_quaternion(&q_new);
            let axis = Vector3::new(lambda[(0, 0)], lambda[(1, 0)], lambda[(2, 0)]);

            // spatial rotation increment over the step, divided difference as
            // angular velocity
            let q_rel = compose_quaternions(&q_new, &inverse_quaternion(&self.qconv_gp_dampstoch[gp]));
            let omega = rotation_vector_from_quaternion(&q_rel) / dt;

            let moment = axis * (g_rot * axis.dot(&omega));

            if let Some(f) = force.as_mut() {
                for node in 0..nnodetriad {
                    let fac = i_val[node] * wgt * jacobi;
                    for k in 0..3 {
                        f[self.rot_dof(node, k)] += fac * moment[k];
                    }
                }
            }

            if let Some(stiff) = stiffmatrix.as_mut() {
                // d(moment)/d(theta): velocity part through 1/dt, geometric
                // part through the spin of the axis director
                let core = (axis * axis.transpose()) * (g_rot / dt)
                    - (axis * omega.transpose() + Matrix3::identity() * axis.dot(&omega))
                        * spin(&axis)
                        * g_rot;
                let itilde = triad_ip.generalized_interpolation_matrices_at_xi(xi);
                for anode in 0..nnodetriad {
                    let fac = i_val[anode] * wgt * jacobi;
                    for bnode in 0..nnodetriad {
                        let aux = core * itilde[bnode];
                        for i in 0..3 {
                            for j in 0..3 {
                                stiff[(self.rot_dof(anode, i), self.rot_dof(bnode, j))] +=
                                    fac * aux[(i, j)];
                            }
                        }
                    }
                }
            }

            self.qnew_gp_dampstoch[gp] = q_new;
        }

        Ok(())
    }
}
