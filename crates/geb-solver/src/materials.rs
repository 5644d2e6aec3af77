//! Cross-section constitutive laws for beam elements.
//!
//! A beam constitutive law maps the material strain vector Gamma (axial and
//! two shear components) and the material curvature vector K (twist and two
//! bending components) to stress resultants through two 3x3 constitutive
//! matrices, and supplies the inertia properties of the cross-section. The
//! law object is immutable, shared between all elements referencing the same
//! material id, and handed to the element explicitly (at construction and at
//! unpack time) instead of being looked up through global state.

use crate::error::{BeamError, Result};
use geb_fem::RealScalar;
use nalgebra::{Matrix3, Vector3};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Geometric properties of a beam cross-section.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamCrossSection {
    /// Cross-sectional area
    pub area: f64,
    /// Second moment of area about local axis 2
    pub i_yy: f64,
    /// Second moment of area about local axis 3
    pub i_zz: f64,
    /// Torsional constant
    pub i_t: f64,
    /// Shear area in direction 2 (area if absent)
    pub shear_area_y: Option<f64>,
    /// Shear area in direction 3 (area if absent)
    pub shear_area_z: Option<f64>,
}

impl BeamCrossSection {
    /// Circular cross-section of given radius.
    pub fn circular(radius: f64) -> Self {
        let area = std::f64::consts::PI * radius.powi(2);
        let i = std::f64::consts::PI * radius.powi(4) / 4.0;
        let j = std::f64::consts::PI * radius.powi(4) / 2.0;
        Self {
            area,
            i_yy: i,
            i_zz: i,
            i_t: j,
            shear_area_y: Some(area * 0.9),
            shear_area_z: Some(area * 0.9),
        }
    }

    /// Rectangular cross-section, width along local axis 2, height along
    /// local axis 3.
    pub fn rectangular(width: f64, height: f64) -> Self {
        let area = width * height;
        let i_yy = width * height.powi(3) / 12.0;
        let i_zz = height * width.powi(3) / 12.0;

        // torsional constant, approximate closed form
        let a = width.max(height);
        let b = width.min(height);
        let j =
            (a * b.powi(3)) * (1.0 / 3.0 - 0.21 * (b / a) * (1.0 - b.powi(4) / (12.0 * a.powi(4))));

        Self {
            area,
            i_yy,
            i_zz,
            i_t: j,
            shear_area_y: Some(5.0 / 6.0 * area),
            shear_area_z: Some(5.0 / 6.0 * area),
        }
    }

    /// Cross-section with explicitly given properties.
    pub fn custom(area: f64, i_yy: f64, i_zz: f64, i_t: f64) -> Self {
        Self {
            area,
            i_yy,
            i_zz,
            i_t,
            shear_area_y: None,
            shear_area_z: None,
        }
    }
}

/// Constitutive interface consumed by beam elements.
///
/// All returned matrices are expressed in the material (cross-section) frame
/// and constant over the element lifetime; elements cast them once per
/// evaluation to the active scalar type.
pub trait BeamConstitutiveLaw: Debug + Send + Sync {
    /// Material id this law is registered under.
    fn id(&self) -> u32;

    /// Constitutive matrix for force resultants, diag(EA, GA_2, GA_3).
    fn constitutive_matrix_forces(&self) -> Matrix3<f64>;

    /// Constitutive matrix for moment resultants, diag(GJ, EI_2, EI_3).
    fn constitutive_matrix_moments(&self) -> Matrix3<f64>;

    /// Mass per unit reference length, rho * A.
    fn translational_mass(&self) -> f64;

    /// Cross-section mass moment of inertia tensor,
    /// rho * diag(I_yy + I_zz, I_yy, I_zz).
    fn mass_moment_of_inertia(&self) -> Matrix3<f64>;
}

/// Force stress resultants from material strain, `N = C_N * Gamma`.
pub fn evaluate_force_stress<T: RealScalar>(
    law: &dyn BeamConstitutiveLaw,
    gamma: &Vector3<T>,
) -> Vector3<T> {
    law.constitutive_matrix_forces().map(T::from_f64) * gamma
}

/// Moment stress resultants from material curvature, `M = C_M * K`.
pub fn evaluate_moment_stress<T: RealScalar>(
    law: &dyn BeamConstitutiveLaw,
    kappa: &Vector3<T>,
) -> Vector3<T> {
    law.constitutive_matrix_moments().map(T::from_f64) * kappa
}

/// Linear elastic (hookean) cross-section law.
#[derive(Debug, Clone, PartialEq)]
pub struct HookeanCrossSection {
    id: u32,
    c_n: Matrix3<f64>,
    c_m: Matrix3<f64>,
    rho_a: f64,
    c_rho: Matrix3<f64>,
}

impl HookeanCrossSection {
    /// Build the law from elastic constants, density and section geometry.
    pub fn new(id: u32, youngs: f64, poisson: f64, density: f64, section: &BeamCrossSection) -> Self {
        let shear = youngs / (2.0 * (1.0 + poisson));
        let ga_y = shear * section.shear_area_y.unwrap_or(section.area);
        let ga_z = shear * section.shear_area_z.unwrap_or(section.area);
        Self {
            id,
            c_n: Matrix3::from_diagonal(&Vector3::new(youngs * section.area, ga_y, ga_z)),
            c_m: Matrix3::from_diagonal(&Vector3::new(
                shear * section.i_t,
                youngs * section.i_yy,
                youngs * section.i_zz,
            )),
            rho_a: density * section.area,
            c_rho: Matrix3::from_diagonal(&Vector3::new(
                density * (section.i_yy + section.i_zz),
                density * section.i_yy,
                density * section.i_zz,
            )),
        }
    }

    /// Build the law from explicitly given rigidities.
    pub fn from_rigidities(
        id: u32,
        axial: f64,
        shear_2: f64,
        shear_3: f64,
        torsional: f64,
        bending_2: f64,
        bending_3: f64,
        rho_a: f64,
        c_rho: Matrix3<f64>,
    ) -> Self {
        Self {
            id,
            c_n: Matrix3::from_diagonal(&Vector3::new(axial, shear_2, shear_3)),
            c_m: Matrix3::from_diagonal(&Vector3::new(torsional, bending_2, bending_3)),
            rho_a,
            c_rho,
        }
    }
}

impl BeamConstitutiveLaw for HookeanCrossSection {
    fn id(&self) -> u32 {
        self.id
    }

    fn constitutive_matrix_forces(&self) -> Matrix3<f64> {
        self.c_n
    }

    fn constitutive_matrix_moments(&self) -> Matrix3<f64> {
        self.c_m
    }

    fn translational_mass(&self) -> f64 {
        self.rho_a
    }

    fn mass_moment_of_inertia(&self) -> Matrix3<f64> {
        self.c_rho
    }
}

/// Registry resolving material ids to shared constitutive-law handles.
#[derive(Debug, Clone, Default)]
pub struct CrossSectionRegistry {
    laws: HashMap<u32, Arc<dyn BeamConstitutiveLaw>>,
}

impl CrossSectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, law: Arc<dyn BeamConstitutiveLaw>) {
        self.laws.insert(law.id(), law);
    }

    pub fn get(&self, id: u32) -> Result<Arc<dyn BeamConstitutiveLaw>> {
        self.laws
            .get(&id)
            .cloned()
            .ok_or(BeamError::UnknownMaterial { id })
    }

    pub fn len(&self) -> usize {
        self.laws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laws.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn circular_section_properties() {
        let radius = 0.05;
        let section = BeamCrossSection::circular(radius);

        let expected_area = std::f64::consts::PI * radius.powi(2);
        let expected_i = std::f64::consts::PI * radius.powi(4) / 4.0;
        let expected_j = std::f64::consts::PI * radius.powi(4) / 2.0;

        assert_relative_eq!(section.area, expected_area, epsilon = 1e-10);
        assert_relative_eq!(section.i_yy, expected_i, epsilon = 1e-10);
        assert_relative_eq!(section.i_zz, expected_i, epsilon = 1e-10);
        assert_relative_eq!(section.i_t, expected_j, epsilon = 1e-10);
    }

    #[test]
    fn rectangular_section_properties() {
        let section = BeamCrossSection::rectangular(0.1, 0.2);
        assert_relative_eq!(section.area, 0.02);
        assert_relative_eq!(section.i_yy, 0.1 * 0.2f64.powi(3) / 12.0);
        assert_relative_eq!(section.i_zz, 0.2 * 0.1f64.powi(3) / 12.0);
        assert!(section.i_t > 0.0);
    }

    #[test]
    fn hookean_law_matrices() {
        let section = BeamCrossSection::custom(0.01, 2e-6, 3e-6, 4e-6);
        let law = HookeanCrossSection::new(1, 210e9, 0.3, 7850.0, &section);

        let g = 210e9 / (2.0 * 1.3);
        let c_n = law.constitutive_matrix_forces();
        assert_relative_eq!(c_n[(0, 0)], 210e9 * 0.01);
        assert_relative_eq!(c_n[(1, 1)], g * 0.01);
        let c_m = law.constitutive_matrix_moments();
        assert_relative_eq!(c_m[(0, 0)], g * 4e-6);
        assert_relative_eq!(c_m[(1, 1)], 210e9 * 2e-6);
        assert_relative_eq!(c_m[(2, 2)], 210e9 * 3e-6);
        assert_relative_eq!(law.translational_mass(), 7850.0 * 0.01);

        let gamma = Vector3::new(1e-3, 0.0, 2e-3);
        let n = evaluate_force_stress::<f64>(&law, &gamma);
        assert_relative_eq!(n[0], 210e9 * 0.01 * 1e-3);
        assert_relative_eq!(n[2], g * 0.01 * 2e-3);
    }

    #[test]
    fn registry_lookup_and_missing_id() {
        let mut registry = CrossSectionRegistry::new();
        let section = BeamCrossSection::circular(0.02);
        registry.insert(Arc::new(HookeanCrossSection::new(7, 1e7, 0.3, 1000.0, &section)));

        assert!(registry.get(7).is_ok());
        assert!(matches!(
            registry.get(8),
            Err(BeamError::UnknownMaterial { id: 8 })
        ));
    }
}
