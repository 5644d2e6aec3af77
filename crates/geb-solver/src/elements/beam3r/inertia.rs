//! Inertia forces and mass matrix for element-based Lie-group
//! generalized-alpha time integration.
//!
//! Rotational inertia on SO(3) cannot be recovered by differencing rotation
//! vectors; the element therefore keeps Gauss-point triads, material angular
//! velocities and (modified) accelerations double-buffered between converged
//! and current state and propagates them with the generalized-alpha
//! recurrence of Bruls, Cardona & Arnold (2012). The outer time integrator
//! owns the recurrence parameters; the element applies them consistently at
//! its inertia Gauss points.
//!
//! The returned mass matrix is the full linearization of the inertia force
//! with respect to the DOF increments, rescaled by
//! `beta dt^2 (1-alpha_f)/(1-alpha_m)` because the driver multiplies the
//! mass contribution by the inverse of that factor when assembling its
//! effective tangent.

use super::Beam3r;
use crate::elements::BeamElement;
use crate::error::{BeamError, Result};
use crate::params::LieGroupGenAlphaParams;
use geb_fem::TriadInterpolation;
use geb_fem::quadrature::IntegrationPurpose;
use geb_fem::rotations::{
    compose_quaternions, inverse_quaternion, rotation_vector_from_quaternion, spin,
    tangential_transform, triad_from_quaternion,
};
use geb_fem::shape::{centerline_values, lagrange_values};
use nalgebra::{DMatrix, DVector, Matrix3, Vector3, Vector4};

impl Beam3r {
    pub(super) fn calc_inertia_force_and_mass_matrix(
        &mut self,
        disp_cl: &DVector<f64>,
        qnode: &[Vector4<f64>],
        params: &LieGroupGenAlphaParams,
        mut massmatrix: Option<&mut DMatrix<f64>>,
        mut inertia_force: Option<&mut DVector<f64>>,
    ) -> Result<()> {
        if params.dt <= 0.0 {
            return Err(BeamError::Unsupported {
                element: self.id(),
                what: format!("non-positive time step size {}", params.dt),
            });
        }

        let nnodecl = self.nnodecl();
        let nnodetriad = self.num_nodes();
        let vpernode = self.vpernode();

        let dt = params.dt;
        let beta = params.beta;
        let gamma = params.gamma;
        let alpha_f = params.alpha_f;
        let alpha_m = params.alpha_m;
        let diff_vel = params.diff_factor_vel();
        let diff_acc = params.diff_factor_acc();

        let rho_a = self.material.translational_mass();
        let c_rho = self.material.mass_moment_of_inertia();

        let triad_ip = TriadInterpolation::new(qnode)?;

        self.ekin = 0.0;
        self.ekintrans = 0.0;
        self.ekintorsion = 0.0;
        self.ekinbending = 0.0;
        self.linear_momentum = Vector3::zeros();
        self.angular_momentum = Vector3::zeros();

        let rule = self.my_gauss_rule(IntegrationPurpose::Inertia);
        for (gp, (&xi, &wgt)) in rule.points.iter().zip(rule.weights.iter()).enumerate() {
            let wj = wgt * self.jacobi_gp_mass[gp];
            let h = centerline_values(nnodecl, vpernode, xi, self.reflength);
            let i_val = lagrange_values(nnodetriad, xi);

            // current centerline position at the Gauss point
            let mut r_new = Vector3::zeros();
            for (idx, &hv) in h.iter().enumerate() {
                for k in 0..3 {
                    r_new[k] += hv * disp_cl[3 * idx + k];
                }
            }

            // translational generalized-alpha update from the converged state
            let dr = r_new - self.rconv_gp_mass[gp];
            let rttmod_new = dr / (beta * dt * dt)
                - self.rtconv_gp_mass[gp] / (beta * dt)
                - self.rttmodconv_gp_mass[gp] * ((1.0 - 2.0 * beta) / (2.0 * beta));
            let rt_new = dr * (gamma / (beta * dt))
                + self.rtconv_gp_mass[gp] * (1.0 - gamma / beta)
                + self.rttmodconv_gp_mass[gp] * (dt * (1.0 - gamma / (2.0 * beta)));
            let rtt_new = (rttmod_new * (1.0 - alpha_m) + self.rttmodconv_gp_mass[gp] * alpha_m
                - self.rttconv_gp_mass[gp] * alpha_f)
                / (1.0 - alpha_f);

            // rotational generalized-alpha update: material step increment
            // from the converged to the current Gauss-point triad
            let q_new = triad_ip.quaternion_at_xi(xi);
            let q_conv = self.qconv_gp_mass[gp];
            let psi =
                rotation_vector_from_quaternion(&compose_quaternions(&inverse_quaternion(&q_conv), &q_new));
            let amod_new = psi / (beta * dt * dt)
                - self.wconv_gp_mass[gp] / (beta * dt)
                - self.amodconv_gp_mass[gp] * ((1.0 - 2.0 * beta) / (2.0 * beta));
            let w_new = psi * (gamma / (beta * dt))
                + self.wconv_gp_mass[gp] * (1.0 - gamma / beta)
                + self.amodconv_gp_mass[gp] * (dt * (1.0 - gamma / (2.0 * beta)));
            let a_new = (amod_new * (1.0 - alpha_m) + self.amodconv_gp_mass[gp] * alpha_m
                - self.aconv_gp_mass[gp] * alpha_f)
                / (1.0 - alpha_f);

            let lambda_new = triad_from_quaternion(&q_new);
            let lambda_conv = triad_from_quaternion(&q_conv);

            // material moment of inertia forces, pushed forward
            let m_rot_mat = c_rho * a_new + w_new.cross(&(c_rho * w_new));
            let m_rot = lambda_new * m_rot_mat;
            let f_trans = rtt_new * rho_a;

            if let Some(f) = inertia_force.as_mut() {
                for node in 0..nnodecl {
                    for v in 0..vpernode {
                        let row_base = if v == 0 {
                            self.pos_dof(node, 0)
                        } else {
                            self.tan_dof(node, 0)
                        };
                        let hv = h[vpernode * node + v];
                        for k in 0..3 {
                            f[row_base + k] += hv * f_trans[k] * wj;
                        }
                    }
                }
                for node in 0..nnodetriad {
                    for k in 0..3 {
                        f[self.rot_dof(node, k)] += i_val[node] * m_rot[k] * wj;
                    }
                }
            }

            if let Some(mass) = massmatrix.as_mut() {
                // translational block
                for anode in 0..nnodecl {
                    for av in 0..vpernode {
                        let row_base = if av == 0 {
                            self.pos_dof(anode, 0)
                        } else {
                            self.tan_dof(anode, 0)
                        };
                        let h_a = h[vpernode * anode + av];
                        for bnode in 0..nnodecl {
                            for bv in 0..vpernode {
                                let col_base = if bv == 0 {
                                    self.pos_dof(bnode, 0)
                                } else {
                                    self.tan_dof(bnode, 0)
                                };
                                let fac = rho_a * diff_acc * h_a * h[vpernode * bnode + bv] * wj;
                                for k in 0..3 {
                                    mass[(row_base + k, col_base + k)] += fac;
                                }
                            }
                        }
                    }
                }

                // rotational block: linearization of Lambda (C_rho A + W x C_rho W)
                // with respect to spin increments of the interpolated triad
                let gyro = spin(&w_new) * c_rho - spin(&(c_rho * w_new));
                let core: Matrix3<f64> = lambda_new
                    * (c_rho * diff_acc + gyro * diff_vel)
                    * tangential_transform(&psi)
                    * lambda_conv.transpose()
                    - spin(&m_rot);
                let itilde = triad_ip.generalized_interpolation_matrices_at_xi(xi);
                for anode in 0..nnodetriad {
                    let fac = i_val[anode] * wj;
                    for bnode in 0..nnodetriad {
                        let aux = core * itilde[bnode];
                        for i in 0..3 {
                            for j in 0..3 {
                                mass[(self.rot_dof(anode, i), self.rot_dof(bnode, j))] +=
                                    fac * aux[(i, j)];
                            }
                        }
                    }
                }
            }

            // energies and momenta
            let w_crho_w = w_new.dot(&(c_rho * w_new));
            self.ekintrans += 0.5 * rho_a * rt_new.dot(&rt_new) * wj;
            self.ekintorsion += 0.5 * c_rho[(0, 0)] * w_new[0] * w_new[0] * wj;
            self.ekinbending +=
                0.5 * (w_crho_w - c_rho[(0, 0)] * w_new[0] * w_new[0]) * wj;
            self.linear_momentum += rt_new * rho_a * wj;
            self.angular_momentum +=
                (r_new.cross(&(rt_new * rho_a)) + lambda_new * (c_rho * w_new)) * wj;

            // advance the current-iterate buffers
            self.qnew_gp_mass[gp] = q_new;
            self.wnew_gp_mass[gp] = w_new;
            self.anew_gp_mass[gp] = a_new;
            self.amodnew_gp_mass[gp] = amod_new;
            self.rnew_gp_mass[gp] = r_new;
            self.rtnew_gp_mass[gp] = rt_new;
            self.rttnew_gp_mass[gp] = rtt_new;
            self.rttmodnew_gp_mass[gp] = rttmod_new;
        }

        self.ekin = self.ekintrans + self.ekintorsion + self.ekinbending;

        // the driver applies its global mass factor
        // (1-alpha_m)/(beta dt^2 (1-alpha_f)); the exact linearization was
        // assembled above, so the inverse factor is applied here
        if let Some(mass) = massmatrix.as_mut() {
            let scale = beta * dt * dt * (1.0 - alpha_f) / (1.0 - alpha_m);
            **mass *= scale;
        }

        if let Some(f) = inertia_force.as_ref() {
            if f.iter().any(|x| !x.is_finite()) {
                return Err(BeamError::NumericalDegeneracy {
                    element: self.id(),
                    what: "non-finite inertia force".to_string(),
                });
            }
        }

        Ok(())
    }
}
