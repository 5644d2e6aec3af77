//! 3D nonlinear Reissner beam element.
//!
//! Implemented after Jelenic & Crisfield, "Geometrically exact 3D beam
//! theory: implementation of a strain-invariant finite element for statics
//! and dynamics" (1999), Crisfield & Jelenic, "Objectivity of strain measures
//! in the geometrically exact three-dimensional beam theory and its finite
//! element implementation" (1999), and Romero, "The interpolation of
//! rotations and its application to finite element models of geometrically
//! exact rods" (2004).
//!
//! The element interpolates the centerline with Lagrange polynomials or, for
//! two centerline nodes carrying tangent DOFs, with cubic Hermite functions,
//! and the triad field with the objective local-rotation-vector scheme of
//! [`geb_fem::TriadInterpolation`]. Rotational entries of the element state
//! vector are multiplicative rotation-vector increments relative to the last
//! converged nodal triads; stiffness columns are taken with respect to
//! spatial spin increments. Prescribing 3D rotation values additively has no
//! direct physical interpretation under this convention; planar rotations are
//! unaffected.

mod brownian;
mod evaluate;
mod geometry;
mod inertia;

pub use evaluate::LineLoad;

use crate::elements::BeamElement;
use crate::error::{BeamError, Result};
use crate::materials::{BeamConstitutiveLaw, CrossSectionRegistry};
use geb_fem::quadrature::{GaussRule, IntegrationPurpose, beam_gauss_rule};
use nalgebra::{DMatrix, DVector, Matrix3, Vector3, Vector4};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const PACK_TYPE_TAG: &str = "Beam3r";
const PACK_SCHEMA_VERSION: u32 = 1;

/// Static configuration of a [`Beam3r`] element.
#[derive(Debug, Clone, Copy)]
pub struct Beam3rConfig {
    /// Number of nodes carrying triads (2..=5; 2..=3 with Hermite
    /// centerline).
    pub num_triad_nodes: usize,
    /// Cubic Hermite centerline interpolation on the first two nodes.
    pub centerline_hermite: bool,
    /// Obtain the elastic tangent by automatic differentiation instead of
    /// the analytic linearization.
    pub use_fad: bool,
    /// Hold stochastic forces constant over the element length (then only 3
    /// random values are consumed per step).
    pub constant_stochastic_force: bool,
}

impl Default for Beam3rConfig {
    fn default() -> Self {
        Self {
            num_triad_nodes: 2,
            centerline_hermite: false,
            use_fad: false,
            constant_stochastic_force: false,
        }
    }
}

/// Pseudo-transient-continuation damping factors.
#[derive(Debug, Clone, Copy, Default)]
pub struct PtcParams {
    /// artificial translational damping
    pub ctransptc: f64,
    /// artificial rotational damping
    pub crotptc: f64,
}

/// Geometrically exact Reissner beam element.
#[derive(Debug, Clone)]
pub struct Beam3r {
    id: i32,
    num_triad_nodes: usize,
    pub(super) centerline_hermite: bool,
    pub(super) use_fad: bool,
    const_stoch_force: bool,

    pub(super) material: Arc<dyn BeamConstitutiveLaw>,

    /// reference geometry set up exactly once
    pub(super) isinit: bool,

    /// reference arc length
    pub(super) reflength: f64,
    /// reference nodal rotation vectors
    pub(super) theta0node: Vec<Vector3<f64>>,
    /// reference tangents at the centerline nodes
    pub(super) tref: Vec<Vector3<f64>>,
    /// reference positions of the centerline nodes
    pub(super) xref: Vec<Vector3<f64>>,

    /// reference strain at the elastic-force Gauss points,
    /// Lambda_0^T r_0' (includes the unit axial part)
    pub(super) gamma_ref_gp: Vec<Vector3<f64>>,
    /// reference curvature at the elastic-moment Gauss points
    pub(super) kref_gp: Vec<Vector3<f64>>,

    /// Jacobi determinants ds/dxi per Gauss point, one set per purpose
    pub(super) jacobi_gp_elastf: Vec<f64>,
    pub(super) jacobi_gp_elastm: Vec<f64>,
    pub(super) jacobi_gp_mass: Vec<f64>,
    pub(super) jacobi_gp_dampstoch: Vec<f64>,
    pub(super) jacobi_gp_neumannline: Vec<f64>,

    /// nodal triads at the end of the last converged step
    pub(super) qconvnode: Vec<Vector4<f64>>,
    /// nodal triads of the current iterate
    pub(super) qnewnode: Vec<Vector4<f64>>,

    // Gauss-point history for Lie-group time integration (inertia rule).
    // Angular velocities/accelerations are material quantities.
    pub(super) qconv_gp_mass: Vec<Vector4<f64>>,
    pub(super) qnew_gp_mass: Vec<Vector4<f64>>,
    pub(super) wconv_gp_mass: Vec<Vector3<f64>>,
    pub(super) wnew_gp_mass: Vec<Vector3<f64>>,
    pub(super) aconv_gp_mass: Vec<Vector3<f64>>,
    pub(super) anew_gp_mass: Vec<Vector3<f64>>,
    pub(super) amodconv_gp_mass: Vec<Vector3<f64>>,
    pub(super) amodnew_gp_mass: Vec<Vector3<f64>>,
    pub(super) rconv_gp_mass: Vec<Vector3<f64>>,
    pub(super) rnew_gp_mass: Vec<Vector3<f64>>,
    pub(super) rtconv_gp_mass: Vec<Vector3<f64>>,
    pub(super) rtnew_gp_mass: Vec<Vector3<f64>>,
    pub(super) rttconv_gp_mass: Vec<Vector3<f64>>,
    pub(super) rttnew_gp_mass: Vec<Vector3<f64>>,
    pub(super) rttmodconv_gp_mass: Vec<Vector3<f64>>,
    pub(super) rttmodnew_gp_mass: Vec<Vector3<f64>>,

    /// triads at the damping/stochastic Gauss points
    pub(super) qconv_gp_dampstoch: Vec<Vector4<f64>>,
    pub(super) qnew_gp_dampstoch: Vec<Vector4<f64>>,

    // Diagnostics, recomputed every evaluate call and never serialized.
    pub(super) eint: f64,
    pub(super) ekin: f64,
    pub(super) ekintorsion: f64,
    pub(super) ekinbending: f64,
    pub(super) ekintrans: f64,
    pub(super) linear_momentum: Vector3<f64>,
    pub(super) angular_momentum: Vector3<f64>,
    pub(super) kmax: f64,

    pub(super) axial_strain_gp: Vec<f64>,
    pub(super) shear_strain_2_gp: Vec<f64>,
    pub(super) shear_strain_3_gp: Vec<f64>,
    pub(super) twist_gp: Vec<f64>,
    pub(super) curvature_2_gp: Vec<f64>,
    pub(super) curvature_3_gp: Vec<f64>,

    pub(super) material_axial_force_gp: Vec<f64>,
    pub(super) material_shear_force_2_gp: Vec<f64>,
    pub(super) material_shear_force_3_gp: Vec<f64>,
    pub(super) material_torque_gp: Vec<f64>,
    pub(super) material_bending_moment_2_gp: Vec<f64>,
    pub(super) material_bending_moment_3_gp: Vec<f64>,

    pub(super) spatial_x_force_gp: Vec<f64>,
    pub(super) spatial_y_force_gp: Vec<f64>,
    pub(super) spatial_z_force_gp: Vec<f64>,
    pub(super) spatial_x_moment_gp: Vec<f64>,
    pub(super) spatial_y_moment_gp: Vec<f64>,
    pub(super) spatial_z_moment_gp: Vec<f64>,
}

impl Beam3r {
    /// Create an uninitialized element; reference geometry must be set up
    /// before the first evaluation.
    pub fn new(
        id: i32,
        config: Beam3rConfig,
        material: Arc<dyn BeamConstitutiveLaw>,
    ) -> Result<Self> {
        let n = config.num_triad_nodes;
        let valid = if config.centerline_hermite {
            (2..=3).contains(&n)
        } else {
            (2..=5).contains(&n)
        };
        if !valid {
            return Err(BeamError::Unsupported {
                element: id,
                what: format!(
                    "{} triad nodes with centerline_hermite = {}",
                    n, config.centerline_hermite
                ),
            });
        }

        Ok(Beam3r {
            id,
            num_triad_nodes: n,
            centerline_hermite: config.centerline_hermite,
            use_fad: config.use_fad,
            const_stoch_force: config.constant_stochastic_force,
            material,
            isinit: false,
            reflength: 0.0,
            theta0node: Vec::new(),
            tref: Vec::new(),
            xref: Vec::new(),
            gamma_ref_gp: Vec::new(),
            kref_gp: Vec::new(),
            jacobi_gp_elastf: Vec::new(),
            jacobi_gp_elastm: Vec::new(),
            jacobi_gp_mass: Vec::new(),
            jacobi_gp_dampstoch: Vec::new(),
            jacobi_gp_neumannline: Vec::new(),
            qconvnode: Vec::new(),
            qnewnode: Vec::new(),
            qconv_gp_mass: Vec::new(),
            qnew_gp_mass: Vec::new(),
            wconv_gp_mass: Vec::new(),
            wnew_gp_mass: Vec::new(),
            aconv_gp_mass: Vec::new(),
            anew_gp_mass: Vec::new(),
            amodconv_gp_mass: Vec::new(),
            amodnew_gp_mass: Vec::new(),
            rconv_gp_mass: Vec::new(),
            rnew_gp_mass: Vec::new(),
            rtconv_gp_mass: Vec::new(),
            rtnew_gp_mass: Vec::new(),
            rttconv_gp_mass: Vec::new(),
            rttnew_gp_mass: Vec::new(),
            rttmodconv_gp_mass: Vec::new(),
            rttmodnew_gp_mass: Vec::new(),
            qconv_gp_dampstoch: Vec::new(),
            qnew_gp_dampstoch: Vec::new(),
            eint: 0.0,
            ekin: 0.0,
            ekintorsion: 0.0,
            ekinbending: 0.0,
            ekintrans: 0.0,
            linear_momentum: Vector3::zeros(),
            angular_momentum: Vector3::zeros(),
            kmax: 0.0,
            axial_strain_gp: Vec::new(),
            shear_strain_2_gp: Vec::new(),
            shear_strain_3_gp: Vec::new(),
            twist_gp: Vec::new(),
            curvature_2_gp: Vec::new(),
            curvature_3_gp: Vec::new(),
            material_axial_force_gp: Vec::new(),
            material_shear_force_2_gp: Vec::new(),
            material_shear_force_3_gp: Vec::new(),
            material_torque_gp: Vec::new(),
            material_bending_moment_2_gp: Vec::new(),
            material_bending_moment_3_gp: Vec::new(),
            spatial_x_force_gp: Vec::new(),
            spatial_y_force_gp: Vec::new(),
            spatial_z_force_gp: Vec::new(),
            spatial_x_moment_gp: Vec::new(),
            spatial_y_moment_gp: Vec::new(),
            spatial_z_moment_gp: Vec::new(),
        })
    }

    // --- dimensions and DOF layout ------------------------------------------

    /// Interpolated values per centerline node (1 = Lagrange, 2 = Hermite).
    pub(super) fn vpernode(&self) -> usize {
        if self.centerline_hermite { 2 } else { 1 }
    }

    /// Number of centerline nodes.
    pub(super) fn nnodecl(&self) -> usize {
        if self.centerline_hermite {
            2
        } else {
            self.num_triad_nodes
        }
    }

    /// DOFs of a node used for both centerline and triad interpolation.
    pub(super) fn dofs_per_combined_node(&self) -> usize {
        3 * self.vpernode() + 3
    }

    pub(super) fn ndof(&self) -> usize {
        self.dofs_per_combined_node() * self.nnodecl() + 3 * (self.num_triad_nodes - self.nnodecl())
    }

    /// Element-local index of the k-th position DOF of a centerline node.
    pub(super) fn pos_dof(&self, node: usize, k: usize) -> usize {
        self.dofs_per_combined_node() * node + k
    }

    /// Element-local index of the k-th rotation DOF of a triad node.
    pub(super) fn rot_dof(&self, node: usize, k: usize) -> usize {
        let nnodecl = self.nnodecl();
        if node < nnodecl {
            self.dofs_per_combined_node() * node + 3 + k
        } else {
            self.dofs_per_combined_node() * nnodecl + 3 * (node - nnodecl) + k
        }
    }

    /// Element-local index of the k-th tangent DOF of a centerline node
    /// (Hermite only).
    pub(super) fn tan_dof(&self, node: usize, k: usize) -> usize {
        self.dofs_per_combined_node() * node + 6 + k
    }

    /// Element-local index within the extracted centerline DOF vector.
    pub(super) fn cl_dof(&self, node: usize, v: usize, k: usize) -> usize {
        3 * self.vpernode() * node + 3 * v + k
    }

    /// Quadrature rule for the requested integration purpose; a fixed table
    /// lookup (see [`beam_gauss_rule`]).
    pub fn my_gauss_rule(&self, purpose: IntegrationPurpose) -> &'static GaussRule {
        beam_gauss_rule(purpose, self.num_triad_nodes, self.centerline_hermite)
    }

    // --- accessors ----------------------------------------------------------

    pub fn is_initialized(&self) -> bool {
        self.isinit
    }

    pub(super) fn require_initialized(&self) -> Result<()> {
        if self.isinit {
            Ok(())
        } else {
            Err(BeamError::NotInitialized { element: self.id })
        }
    }

    pub fn material(&self) -> &Arc<dyn BeamConstitutiveLaw> {
        &self.material
    }

    /// Jacobi determinant of the first elastic-force Gauss point (constant
    /// over the element for linear Lagrange interpolation).
    pub fn jacobi(&self) -> f64 {
        self.jacobi_gp_elastf[0]
    }

    /// Reference tangents at the centerline nodes.
    pub fn tref(&self) -> &[Vector3<f64>] {
        &self.tref
    }

    /// Unit tangent in the reference configuration at centerline node `node`.
    pub fn ref_tangent_at_node(&self, node: usize) -> Result<Vector3<f64>> {
        self.tref
            .get(node)
            .copied()
            .ok_or(BeamError::SizeMismatch {
                element: self.id,
                what: "centerline node index",
                expected: self.tref.len(),
                got: node,
            })
    }

    /// Initial nodal rotation vectors.
    pub fn initial_nodal_rot_vecs(&self) -> &[Vector3<f64>] {
        &self.theta0node
    }

    /// Maximum curvature norm over the elastic-moment Gauss points of the
    /// last evaluation.
    pub fn kappa_max(&self) -> f64 {
        self.kmax
    }

    pub fn kinetic_energy_translational(&self) -> f64 {
        self.ekintrans
    }

    pub fn kinetic_energy_torsion(&self) -> f64 {
        self.ekintorsion
    }

    pub fn kinetic_energy_bending(&self) -> f64 {
        self.ekinbending
    }

    pub fn linear_momentum(&self) -> Vector3<f64> {
        self.linear_momentum
    }

    pub fn angular_momentum(&self) -> Vector3<f64> {
        self.angular_momentum
    }

    /// Material strain resultants at the Gauss points of the last
    /// evaluation: (axial, shear 2, shear 3) at the elastic-force points,
    /// (twist, curvature 2, curvature 3) at the elastic-moment points.
    pub fn material_strain_resultants(
        &self,
    ) -> (&[f64], &[f64], &[f64], &[f64], &[f64], &[f64]) {
        (
            &self.axial_strain_gp,
            &self.shear_strain_2_gp,
            &self.shear_strain_3_gp,
            &self.twist_gp,
            &self.curvature_2_gp,
            &self.curvature_3_gp,
        )
    }

    /// Material stress resultants at the Gauss points of the last
    /// evaluation, ordered as in [`Self::material_strain_resultants`].
    pub fn material_stress_resultants(
        &self,
    ) -> (&[f64], &[f64], &[f64], &[f64], &[f64], &[f64]) {
        (
            &self.material_axial_force_gp,
            &self.material_shear_force_2_gp,
            &self.material_shear_force_3_gp,
            &self.material_torque_gp,
            &self.material_bending_moment_2_gp,
            &self.material_bending_moment_3_gp,
        )
    }

    /// Spatial stress resultants at the Gauss points of the last evaluation.
    pub fn spatial_stress_resultants(
        &self,
    ) -> (&[f64], &[f64], &[f64], &[f64], &[f64], &[f64]) {
        (
            &self.spatial_x_force_gp,
            &self.spatial_y_force_gp,
            &self.spatial_z_force_gp,
            &self.spatial_x_moment_gp,
            &self.spatial_y_moment_gp,
            &self.spatial_z_moment_gp,
        )
    }

    /// Converged nodal quaternions.
    pub fn qconvnode(&self) -> &[Vector4<f64>] {
        &self.qconvnode
    }

    /// Nodal quaternions of the current iterate.
    pub fn qnewnode(&self) -> &[Vector4<f64>] {
        &self.qnewnode
    }

    // --- state machine ------------------------------------------------------

    /// Commit the current iterate: advance all "new" buffers into the
    /// converged state. Called exactly once per completed time step.
    pub fn update_step_state(&mut self) {
        self.qconvnode.clone_from(&self.qnewnode);
        self.qconv_gp_mass.clone_from(&self.qnew_gp_mass);
        self.wconv_gp_mass.clone_from(&self.wnew_gp_mass);
        self.aconv_gp_mass.clone_from(&self.anew_gp_mass);
        self.amodconv_gp_mass.clone_from(&self.amodnew_gp_mass);
        self.rconv_gp_mass.clone_from(&self.rnew_gp_mass);
        self.rtconv_gp_mass.clone_from(&self.rtnew_gp_mass);
        self.rttconv_gp_mass.clone_from(&self.rttnew_gp_mass);
        self.rttmodconv_gp_mass.clone_from(&self.rttmodnew_gp_mass);
        self.qconv_gp_dampstoch.clone_from(&self.qnew_gp_dampstoch);
    }

    /// Discard the current iterate: reset all "new" buffers to the converged
    /// state (used when a time step is repeated).
    pub fn reset_step_state(&mut self) {
        self.qnewnode.clone_from(&self.qconvnode);
        self.qnew_gp_mass.clone_from(&self.qconv_gp_mass);
        self.wnew_gp_mass.clone_from(&self.wconv_gp_mass);
        self.anew_gp_mass.clone_from(&self.aconv_gp_mass);
        self.amodnew_gp_mass.clone_from(&self.amodconv_gp_mass);
        self.rnew_gp_mass.clone_from(&self.rconv_gp_mass);
        self.rtnew_gp_mass.clone_from(&self.rtconv_gp_mass);
        self.rttnew_gp_mass.clone_from(&self.rttconv_gp_mass);
        self.rttmodnew_gp_mass.clone_from(&self.rttmodconv_gp_mass);
        self.qnew_gp_dampstoch.clone_from(&self.qconv_gp_dampstoch);
    }

    // --- PTC ----------------------------------------------------------------

    /// Add the pseudo-transient-continuation damping contribution to the
    /// stiffness matrix (2-node elements).
    pub fn evaluate_ptc(&self, params: &PtcParams, stiffmatrix: &mut DMatrix<f64>) -> Result<()> {
        self.require_initialized()?;
        if self.num_triad_nodes > 2 {
            return Err(BeamError::Unsupported {
                element: self.id,
                what: format!("PTC for {}-noded element", self.num_triad_nodes),
            });
        }
        self.check_matrix_size(stiffmatrix, "PTC stiffness matrix")?;

        // nodal (Lobatto) weights: half the reference length per end node
        let weight = 0.5 * self.reflength;
        for node in 0..2 {
            for k in 0..3 {
                let r = self.rot_dof(node, k);
                stiffmatrix[(r, r)] += params.crotptc * weight;
                let p = self.pos_dof(node, k);
                stiffmatrix[(p, p)] += params.ctransptc * weight;
            }
        }
        Ok(())
    }

    /// Row-sum lumping of a mass matrix: off-diagonal entries are summed
    /// onto the diagonal of their row.
    pub fn lump_mass_matrix(massmatrix: &mut DMatrix<f64>) {
        let n = massmatrix.nrows();
        for r in 0..n {
            let sum: f64 = massmatrix.row(r).iter().sum();
            for c in 0..n {
                massmatrix[(r, c)] = 0.0;
            }
            massmatrix[(r, r)] = sum;
        }
    }

    pub(super) fn check_matrix_size(
        &self,
        m: &DMatrix<f64>,
        what: &'static str,
    ) -> Result<()> {
        let ndof = self.ndof();
        if m.nrows() != ndof || m.ncols() != ndof {
            return Err(BeamError::SizeMismatch {
                element: self.id,
                what,
                expected: ndof,
                got: m.nrows(),
            });
        }
        Ok(())
    }

    pub(super) fn check_vector_size(
        &self,
        v: &DVector<f64>,
        what: &'static str,
    ) -> Result<()> {
        let ndof = self.ndof();
        if v.len() != ndof {
            return Err(BeamError::SizeMismatch {
                element: self.id,
                what,
                expected: ndof,
                got: v.len(),
            });
        }
        Ok(())
    }

    // --- serialization ------------------------------------------------------

    /// Serialize the complete persistent element state into an opaque byte
    /// buffer. Diagnostic quantities (energies, per-Gauss-point resultants)
    /// are cheap to recompute and deliberately excluded to keep the
    /// communication payload small.
    pub fn pack(&self) -> Result<Vec<u8>> {
        let data = PackData {
            type_tag: PACK_TYPE_TAG.to_string(),
            schema_version: PACK_SCHEMA_VERSION,
            id: self.id,
            material_id: self.material.id(),
            num_triad_nodes: self.num_triad_nodes,
            centerline_hermite: self.centerline_hermite,
            use_fad: self.use_fad,
            const_stoch_force: self.const_stoch_force,
            isinit: self.isinit,
            reflength: self.reflength,
            theta0node: self.theta0node.clone(),
            tref: self.tref.clone(),
            xref: self.xref.clone(),
            gamma_ref_gp: self.gamma_ref_gp.clone(),
            kref_gp: self.kref_gp.clone(),
            jacobi_gp_elastf: self.jacobi_gp_elastf.clone(),
            jacobi_gp_elastm: self.jacobi_gp_elastm.clone(),
            jacobi_gp_mass: self.jacobi_gp_mass.clone(),
            jacobi_gp_dampstoch: self.jacobi_gp_dampstoch.clone(),
            jacobi_gp_neumannline: self.jacobi_gp_neumannline.clone(),
            qconvnode: self.qconvnode.clone(),
            qnewnode: self.qnewnode.clone(),
            qconv_gp_mass: self.qconv_gp_mass.clone(),
            qnew_gp_mass: self.qnew_gp_mass.clone(),
            wconv_gp_mass: self.wconv_gp_mass.clone(),
            wnew_gp_mass: self.wnew_gp_mass.clone(),
            aconv_gp_mass: self.aconv_gp_mass.clone(),
            anew_gp_mass: self.anew_gp_mass.clone(),
            amodconv_gp_mass: self.amodconv_gp_mass.clone(),
            amodnew_gp_mass: self.amodnew_gp_mass.clone(),
            rconv_gp_mass: self.rconv_gp_mass.clone(),
            rnew_gp_mass: self.rnew_gp_mass.clone(),
            rtconv_gp_mass: self.rtconv_gp_mass.clone(),
            rtnew_gp_mass: self.rtnew_gp_mass.clone(),
            rttconv_gp_mass: self.rttconv_gp_mass.clone(),
            rttnew_gp_mass: self.rttnew_gp_mass.clone(),
            rttmodconv_gp_mass: self.rttmodconv_gp_mass.clone(),
            rttmodnew_gp_mass: self.rttmodnew_gp_mass.clone(),
            qconv_gp_dampstoch: self.qconv_gp_dampstoch.clone(),
            qnew_gp_dampstoch: self.qnew_gp_dampstoch.clone(),
        };
        Ok(serde_json::to_vec(&data)?)
    }

    /// Reconstruct an element from a packed buffer; the constitutive law is
    /// re-resolved through the registry by the packed material id.
    pub fn unpack(buffer: &[u8], registry: &CrossSectionRegistry) -> Result<Self> {
        let data: PackData = serde_json::from_slice(buffer)?;
        if data.type_tag != PACK_TYPE_TAG {
            return Err(BeamError::TypeTagMismatch {
                expected: PACK_TYPE_TAG.to_string(),
                got: data.type_tag,
            });
        }
        if data.schema_version != PACK_SCHEMA_VERSION {
            return Err(BeamError::SchemaVersionMismatch {
                expected: PACK_SCHEMA_VERSION,
                got: data.schema_version,
            });
        }
        let material = registry.get(data.material_id)?;

        let mut element = Beam3r::new(
            data.id,
            Beam3rConfig {
                num_triad_nodes: data.num_triad_nodes,
                centerline_hermite: data.centerline_hermite,
                use_fad: data.use_fad,
                constant_stochastic_force: data.const_stoch_force,
            },
            material,
        )?;

        element.isinit = data.isinit;
        element.reflength = data.reflength;
        element.theta0node = data.theta0node;
        element.tref = data.tref;
        element.xref = data.xref;
        element.gamma_ref_gp = data.gamma_ref_gp;
        element.kref_gp = data.kref_gp;
        element.jacobi_gp_elastf = data.jacobi_gp_elastf;
        element.jacobi_gp_elastm = data.jacobi_gp_elastm;
        element.jacobi_gp_mass = data.jacobi_gp_mass;
        element.jacobi_gp_dampstoch = data.jacobi_gp_dampstoch;
        element.jacobi_gp_neumannline = data.jacobi_gp_neumannline;
        element.qconvnode = data.qconvnode;
        element.qnewnode = data.qnewnode;
        element.qconv_gp_mass = data.qconv_gp_mass;
        element.qnew_gp_mass = data.qnew_gp_mass;
        element.wconv_gp_mass = data.wconv_gp_mass;
        element.wnew_gp_mass = data.wnew_gp_mass;
        element.aconv_gp_mass = data.aconv_gp_mass;
        element.anew_gp_mass = data.anew_gp_mass;
        element.amodconv_gp_mass = data.amodconv_gp_mass;
        element.amodnew_gp_mass = data.amodnew_gp_mass;
        element.rconv_gp_mass = data.rconv_gp_mass;
        element.rnew_gp_mass = data.rnew_gp_mass;
        element.rtconv_gp_mass = data.rtconv_gp_mass;
        element.rtnew_gp_mass = data.rtnew_gp_mass;
        element.rttconv_gp_mass = data.rttconv_gp_mass;
        element.rttnew_gp_mass = data.rttnew_gp_mass;
        element.rttmodconv_gp_mass = data.rttmodconv_gp_mass;
        element.rttmodnew_gp_mass = data.rttmodnew_gp_mass;
        element.qconv_gp_dampstoch = data.qconv_gp_dampstoch;
        element.qnew_gp_dampstoch = data.qnew_gp_dampstoch;

        element.size_diagnostic_buffers();
        Ok(element)
    }

    pub(super) fn size_diagnostic_buffers(&mut self) {
        let ngp_f = self.my_gauss_rule(IntegrationPurpose::ElasticForce).num_points();
        let ngp_m = self
            .my_gauss_rule(IntegrationPurpose::ElasticMoment)
            .num_points();
        self.axial_strain_gp = vec![0.0; ngp_f];
        self.shear_strain_2_gp = vec![0.0; ngp_f];
        self.shear_strain_3_gp = vec![0.0; ngp_f];
        self.material_axial_force_gp = vec![0.0; ngp_f];
        self.material_shear_force_2_gp = vec![0.0; ngp_f];
        self.material_shear_force_3_gp = vec![0.0; ngp_f];
        self.spatial_x_force_gp = vec![0.0; ngp_f];
        self.spatial_y_force_gp = vec![0.0; ngp_f];
        self.spatial_z_force_gp = vec![0.0; ngp_f];
        self.twist_gp = vec![0.0; ngp_m];
        self.curvature_2_gp = vec![0.0; ngp_m];
        self.curvature_3_gp = vec![0.0; ngp_m];
        self.material_torque_gp = vec![0.0; ngp_m];
        self.material_bending_moment_2_gp = vec![0.0; ngp_m];
        self.material_bending_moment_3_gp = vec![0.0; ngp_m];
        self.spatial_x_moment_gp = vec![0.0; ngp_m];
        self.spatial_y_moment_gp = vec![0.0; ngp_m];
        self.spatial_z_moment_gp = vec![0.0; ngp_m];
    }
}

/// Serialized element state; field order is the wire order and is stable
/// within one schema version.
#[derive(Serialize, Deserialize)]
struct PackData {
    type_tag: String,
    schema_version: u32,
    id: i32,
    material_id: u32,
    num_triad_nodes: usize,
    centerline_hermite: bool,
    use_fad: bool,
    const_stoch_force: bool,
    isinit: bool,
    reflength: f64,
    theta0node: Vec<Vector3<f64>>,
    tref: Vec<Vector3<f64>>,
    xref: Vec<Vector3<f64>>,
    gamma_ref_gp: Vec<Vector3<f64>>,
    kref_gp: Vec<Vector3<f64>>,
    jacobi_gp_elastf: Vec<f64>,
    jacobi_gp_elastm: Vec<f64>,
    jacobi_gp_mass: Vec<f64>,
    jacobi_gp_dampstoch: Vec<f64>,
    jacobi_gp_neumannline: Vec<f64>,
    qconvnode: Vec<Vector4<f64>>,
    qnewnode: Vec<Vector4<f64>>,
    qconv_gp_mass: Vec<Vector4<f64>>,
    qnew_gp_mass: Vec<Vector4<f64>>,
    wconv_gp_mass: Vec<Vector3<f64>>,
    wnew_gp_mass: Vec<Vector3<f64>>,
    aconv_gp_mass: Vec<Vector3<f64>>,
    anew_gp_mass: Vec<Vector3<f64>>,
    amodconv_gp_mass: Vec<Vector3<f64>>,
    amodnew_gp_mass: Vec<Vector3<f64>>,
    rconv_gp_mass: Vec<Vector3<f64>>,
    rnew_gp_mass: Vec<Vector3<f64>>,
    rtconv_gp_mass: Vec<Vector3<f64>>,
    rtnew_gp_mass: Vec<Vector3<f64>>,
    rttconv_gp_mass: Vec<Vector3<f64>>,
    rttnew_gp_mass: Vec<Vector3<f64>>,
    rttmodconv_gp_mass: Vec<Vector3<f64>>,
    rttmodnew_gp_mass: Vec<Vector3<f64>>,
    qconv_gp_dampstoch: Vec<Vector4<f64>>,
    qnew_gp_dampstoch: Vec<Vector4<f64>>,
}

impl BeamElement for Beam3r {
    fn id(&self) -> i32 {
        self.id
    }

    fn num_nodes(&self) -> usize {
        self.num_triad_nodes
    }

    fn num_centerline_nodes(&self) -> usize {
        self.nnodecl()
    }

    fn num_dofs(&self) -> usize {
        self.ndof()
    }

    fn ref_length(&self) -> f64 {
        self.reflength
    }

    fn position_at_xi(&self, xi: f64, disp: &DVector<f64>) -> Result<Vector3<f64>> {
        self.centerline_position_at_xi(xi, disp)
    }

    fn triad_at_xi(&self, xi: f64, disp: &DVector<f64>) -> Result<Matrix3<f64>> {
        self.cross_section_triad_at_xi(xi, disp)
    }

    fn jacobi_fac_at_xi(&self, xi: f64) -> f64 {
        self.reference_jacobi_fac_at_xi(xi)
    }

    fn position_dof_indices(&self, node: usize) -> Vec<usize> {
        if node < self.nnodecl() {
            (0..3).map(|k| self.pos_dof(node, k)).collect()
        } else {
            Vec::new()
        }
    }

    fn rotation_dof_indices(&self, node: usize) -> Vec<usize> {
        (0..3).map(|k| self.rot_dof(node, k)).collect()
    }

    fn tangent_dof_indices(&self, node: usize) -> Vec<usize> {
        if self.centerline_hermite && node < self.nnodecl() {
            (0..3).map(|k| self.tan_dof(node, k)).collect()
        } else {
            Vec::new()
        }
    }

    fn centerline_dof_indices(&self) -> Vec<usize> {
        let mut indices = Vec::with_capacity(3 * self.vpernode() * self.nnodecl());
        for node in 0..self.nnodecl() {
            for k in 0..3 {
                indices.push(self.pos_dof(node, k));
            }
            if self.centerline_hermite {
                for k in 0..3 {
                    indices.push(self.tan_dof(node, k));
                }
            }
        }
        indices
    }

    fn how_many_random_numbers_i_need(&self) -> usize {
        // three translational random values per damping/stochastic Gauss
        // point; a single set for the whole element when stochastic forces
        // are held constant over the element length
        if self.const_stoch_force {
            3
        } else {
            3 * self.my_gauss_rule(IntegrationPurpose::DampStoch).num_points()
        }
    }

    fn internal_energy(&self) -> f64 {
        self.eint
    }

    fn kinetic_energy(&self) -> f64 {
        self.ekin
    }
}
