//! General finite-element utilities for large-rotation (geometrically exact)
//! beam formulations.
//!
//! This crate collects the building blocks that are independent of any
//! concrete element: SO(3) rotation algebra with quaternion, rotation-vector
//! and rotation-matrix representations, the tangential transformation
//! operator and its inverse, the objective triad interpolation scheme based
//! on local rotation vectors, Lagrange/Hermite centerline shape functions,
//! 1D Gauss/Lobatto quadrature rules, and a forward-mode dual-number scalar
//! so that every code path can be instantiated for plain floating point and
//! for automatic differentiation alike.

pub mod error;
pub mod fad;
pub mod quadrature;
pub mod rotations;
pub mod shape;
pub mod triad;

pub use error::FemError;
pub use fad::{Dual, RealScalar};
pub use quadrature::{GaussRule, IntegrationPurpose, beam_gauss_rule, gauss_rule, lobatto3};
pub use triad::TriadInterpolation;
