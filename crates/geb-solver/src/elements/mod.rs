//! Beam element library.

use crate::error::Result;
use nalgebra::{DVector, Matrix3, Vector3};

pub mod beam3r;

pub use beam3r::{Beam3r, Beam3rConfig};

/// Capability set shared by all beam element formulations.
///
/// The trait is deliberately flat: formulation variants are separate structs
/// implementing this one interface, with free functions for anything that
/// does not need dynamic dispatch.
pub trait BeamElement {
    /// Globally unique element id.
    fn id(&self) -> i32;

    /// Number of nodes carrying triad degrees of freedom.
    fn num_nodes(&self) -> usize;

    /// Number of nodes used for centerline interpolation.
    fn num_centerline_nodes(&self) -> usize;

    /// Total number of element degrees of freedom.
    fn num_dofs(&self) -> usize;

    /// Reference arc length of the element.
    fn ref_length(&self) -> f64;

    /// Centerline position at `xi` in [-1, 1] for the given element state
    /// vector.
    fn position_at_xi(&self, xi: f64, disp: &DVector<f64>) -> Result<Vector3<f64>>;

    /// Cross-section triad at `xi` in [-1, 1] for the given element state
    /// vector.
    fn triad_at_xi(&self, xi: f64, disp: &DVector<f64>) -> Result<Matrix3<f64>>;

    /// Jacobi factor ds/dxi at `xi` (a reference-configuration quantity).
    fn jacobi_fac_at_xi(&self, xi: f64) -> f64;

    /// Element-local indices of the position DOFs of `node`.
    fn position_dof_indices(&self, node: usize) -> Vec<usize>;

    /// Element-local indices of the rotation DOFs of `node`.
    fn rotation_dof_indices(&self, node: usize) -> Vec<usize>;

    /// Element-local indices of the tangent DOFs of `node` (empty without
    /// Hermite centerline interpolation).
    fn tangent_dof_indices(&self, node: usize) -> Vec<usize>;

    /// Element-local indices of all DOFs used for centerline interpolation.
    fn centerline_dof_indices(&self) -> Vec<usize>;

    /// Number of independent standard-normal random values consumed per step
    /// in Brownian-dynamics mode.
    fn how_many_random_numbers_i_need(&self) -> usize;

    /// Internal (elastic) energy from the last evaluate call.
    fn internal_energy(&self) -> f64;

    /// Kinetic energy from the last evaluate call with dynamics enabled.
    fn kinetic_energy(&self) -> f64;
}
