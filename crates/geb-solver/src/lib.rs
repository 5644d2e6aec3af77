//! Geometrically exact 3D Reissner beam element.
//!
//! This crate implements the nonlinear Reissner beam element with objective
//! triad interpolation after Jelenic & Crisfield (1999) and Romero (2004):
//! internal elastic forces with analytic or automatic-differentiation
//! consistent tangents, inertia forces and mass matrices consistent with
//! element-based Lie-group generalized-alpha time integration, Brownian
//! dynamics damping and stochastic forcing for filament simulations, and
//! state serialization for redistribution of elements across processes.
//!
//! The surrounding framework (discretization, assembly, linear solvers,
//! Newton/time-stepping drivers) is out of scope; the element exposes a
//! per-element evaluate entry point plus accessors for post-processing.

pub mod elements;
pub mod error;
pub mod materials;
pub mod params;

pub use elements::beam3r::{Beam3r, Beam3rConfig, LineLoad, PtcParams};
pub use elements::BeamElement;
pub use error::BeamError;
pub use materials::{
    BeamConstitutiveLaw, BeamCrossSection, CrossSectionRegistry, HookeanCrossSection,
};
pub use params::{BrownianParams, DampingCoefficients, FrictionModel, LieGroupGenAlphaParams, ShearFlow};
