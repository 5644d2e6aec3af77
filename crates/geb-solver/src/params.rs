//! Parameter structs handed to the element by the outer drivers.
//!
//! The time-integration and Brownian-dynamics drivers own these settings; the
//! element only consumes them. Passing them as typed structs replaces the
//! string-keyed parameter lists of classical FE frameworks.

/// Parameters of the element-based Lie-group generalized-alpha scheme.
///
/// The element uses them to propagate Gauss-point velocity/acceleration
/// history from the converged state and to linearize the inertia forces. The
/// recurrence relation itself is the driver's contract; the element merely
/// applies it consistently at its Gauss points.
#[derive(Debug, Clone, Copy)]
pub struct LieGroupGenAlphaParams {
    /// Time step size
    pub dt: f64,
    /// Newmark beta
    pub beta: f64,
    /// Newmark gamma
    pub gamma: f64,
    /// Generalized-alpha parameter alpha_f
    pub alpha_f: f64,
    /// Generalized-alpha parameter alpha_m
    pub alpha_m: f64,
}

impl LieGroupGenAlphaParams {
    /// Average-acceleration Newmark scheme (no numerical damping).
    pub fn newmark(dt: f64) -> Self {
        Self {
            dt,
            beta: 0.25,
            gamma: 0.5,
            alpha_f: 0.0,
            alpha_m: 0.0,
        }
    }

    /// Generalized-alpha scheme from a spectral radius at infinity
    /// rho_inf in [0, 1].
    pub fn with_spectral_radius(dt: f64, rho_inf: f64) -> Self {
        let alpha_m = (2.0 * rho_inf - 1.0) / (rho_inf + 1.0);
        let alpha_f = rho_inf / (rho_inf + 1.0);
        let beta = 0.25 * (1.0 - alpha_m + alpha_f).powi(2);
        let gamma = 0.5 - alpha_m + alpha_f;
        Self {
            dt,
            beta,
            gamma,
            alpha_f,
            alpha_m,
        }
    }

    /// d(velocity)/d(increment) factor of the scheme.
    pub fn diff_factor_vel(&self) -> f64 {
        self.gamma / (self.beta * self.dt)
    }

    /// d(acceleration)/d(increment) factor of the scheme.
    pub fn diff_factor_acc(&self) -> f64 {
        (1.0 - self.alpha_m) / (self.beta * self.dt * self.dt * (1.0 - self.alpha_f))
    }
}

/// Friction model for Brownian dynamics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrictionModel {
    /// Same damping coefficient parallel and perpendicular to the filament
    /// axis.
    Isotropic,
    /// Slender-body anisotropy: perpendicular drag twice the parallel drag.
    Anisotropic,
}

/// Viscous damping coefficients per unit filament length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DampingCoefficients {
    /// translational, parallel to the filament axis
    pub gamma_par: f64,
    /// translational, perpendicular to the filament axis
    pub gamma_perp: f64,
    /// rotational, about the filament axis
    pub gamma_rot: f64,
}

impl DampingCoefficients {
    /// Slender-body coefficients from dynamic viscosity and cross-section
    /// radius.
    pub fn from_viscosity(eta: f64, radius: f64, model: FrictionModel) -> Self {
        let gamma_perp = 4.0 * std::f64::consts::PI * eta;
        let gamma_par = match model {
            FrictionModel::Isotropic => gamma_perp,
            FrictionModel::Anisotropic => 0.5 * gamma_perp,
        };
        Self {
            gamma_par,
            gamma_perp,
            gamma_rot: 4.0 * std::f64::consts::PI * eta * radius * radius,
        }
    }
}

/// Linear shear-flow background velocity field,
/// `v(x) = rate * x[grad_dir] * e_flow_dir`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShearFlow {
    pub flow_dir: usize,
    pub grad_dir: usize,
    pub rate: f64,
}

/// Per-step inputs for the Brownian-dynamics force contribution.
///
/// `random_numbers` is the externally drawn slice of independent
/// standard-normal values; its required length is declared by the element
/// through `how_many_random_numbers_i_need`.
#[derive(Debug, Clone)]
pub struct BrownianParams<'a> {
    pub dt: f64,
    pub damping: DampingCoefficients,
    pub random_numbers: &'a [f64],
    pub background: Option<ShearFlow>,
}
