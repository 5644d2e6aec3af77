//! Consistency of the element tangent: finite-difference verification of the
//! analytic linearization and agreement between the analytic and the
//! automatic-differentiation stiffness path.
//!
//! Rotational DOFs are perturbed multiplicatively (spin increments composed
//! onto the current nodal triads), matching the convention the stiffness
//! columns are taken in.

use geb_fem::rotations::{
    compose_quaternions, quaternion_from_rotation_vector, rotation_vector_from_quaternion,
};
use geb_fem::shape::lagrange_node_positions;
use geb_solver::{
    Beam3r, Beam3rConfig, BeamConstitutiveLaw, BeamCrossSection, BeamElement, HookeanCrossSection,
};
use nalgebra::{DMatrix, DVector, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

fn material() -> Arc<dyn BeamConstitutiveLaw> {
    Arc::new(HookeanCrossSection::new(
        1,
        1e7,
        0.3,
        1200.0,
        &BeamCrossSection::circular(0.01),
    ))
}

fn straight_element(num_triad_nodes: usize, hermite: bool, use_fad: bool, length: f64) -> Beam3r {
    let config = Beam3rConfig {
        num_triad_nodes,
        centerline_hermite: hermite,
        use_fad,
        ..Default::default()
    };
    let mut elem = Beam3r::new(1, config, material()).unwrap();
    let nnodecl = if hermite { 2 } else { num_triad_nodes };
    let xrefe: Vec<Vector3<f64>> = lagrange_node_positions(nnodecl)
        .iter()
        .map(|&xi| Vector3::new(0.5 * (xi + 1.0) * length, 0.0, 0.0))
        .collect();
    let rotrefe = vec![Vector3::zeros(); num_triad_nodes];
    elem.set_up_reference_geometry(&xrefe, &rotrefe).unwrap();
    elem
}

fn random_state(elem: &Beam3r, rng: &mut StdRng) -> DVector<f64> {
    let mut disp = DVector::zeros(elem.num_dofs());
    for node in 0..elem.num_nodes() {
        for &i in elem.position_dof_indices(node).iter() {
            disp[i] = rng.gen_range(-0.05..0.05);
        }
        for &i in elem.tangent_dof_indices(node).iter() {
            disp[i] = rng.gen_range(-0.05..0.05);
        }
        for &i in elem.rotation_dof_indices(node).iter() {
            disp[i] = rng.gen_range(-0.25..0.25);
        }
    }
    disp
}

/// Apply an increment vector to a state vector: additively for centerline
/// DOFs, multiplicatively (spin composition) for rotational DOFs.
fn apply_increment(elem: &Beam3r, disp: &DVector<f64>, delta: &DVector<f64>) -> DVector<f64> {
    let mut out = disp + delta;
    for node in 0..elem.num_nodes() {
        let idx = elem.rotation_dof_indices(node);
        let psi = Vector3::new(disp[idx[0]], disp[idx[1]], disp[idx[2]]);
        let dtheta = Vector3::new(delta[idx[0]], delta[idx[1]], delta[idx[2]]);
        let q_new = compose_quaternions(
            &quaternion_from_rotation_vector(&dtheta),
            &quaternion_from_rotation_vector(&psi),
        );
        let psi_new = rotation_vector_from_quaternion(&q_new);
        for k in 0..3 {
            out[idx[k]] = psi_new[k];
        }
    }
    out
}

fn force_at(elem: &mut Beam3r, disp: &DVector<f64>) -> DVector<f64> {
    let mut force = DVector::zeros(elem.num_dofs());
    elem.evaluate(disp, None, None, Some(&mut force), None, None)
        .unwrap();
    force
}

#[test]
fn analytic_tangent_matches_finite_differences_quadratically() {
    let mut rng = StdRng::seed_from_u64(99);

    for (n, hermite) in [(2, false), (3, false), (2, true)] {
        let mut elem = straight_element(n, hermite, false, 1.0);
        let ndof = elem.num_dofs();
        let disp = random_state(&elem, &mut rng);

        let mut force0 = DVector::zeros(ndof);
        let mut stiff = DMatrix::zeros(ndof, ndof);
        elem.evaluate(&disp, Some(&mut stiff), None, Some(&mut force0), None, None)
            .unwrap();

        let mut direction = DVector::zeros(ndof);
        for i in 0..ndof {
            direction[i] = rng.gen_range(-1.0..1.0);
        }
        direction /= direction.norm();

        // linearization error must shrink quadratically with the step
        let mut errors = Vec::new();
        for eps in [1e-4, 5e-5] {
            let delta = &direction * eps;
            let disp_pert = apply_increment(&elem, &disp, &delta);
            let force1 = force_at(&mut elem, &disp_pert);
            let predicted = &force0 + &stiff * &delta;
            errors.push((force1 - predicted).norm());
        }
        assert!(
            errors[1] <= 0.3 * errors[0] + 1e-10,
            "no quadratic convergence for {n}-noded element (hermite = {hermite}): \
             err(h) = {:.3e}, err(h/2) = {:.3e}",
            errors[0],
            errors[1]
        );
    }
}

#[test]
fn automatic_differentiation_tangent_matches_analytic_tangent() {
    let mut rng = StdRng::seed_from_u64(7321);

    let configs = [
        (2, false),
        (2, false),
        (3, false),
        (4, false),
        (2, true),
    ];
    for (n, hermite) in configs {
        let mut elem_analytic = straight_element(n, hermite, false, 1.3);
        let mut elem_fad = straight_element(n, hermite, true, 1.3);
        let ndof = elem_analytic.num_dofs();
        let disp = random_state(&elem_analytic, &mut rng);

        let mut force_analytic = DVector::zeros(ndof);
        let mut stiff_analytic = DMatrix::zeros(ndof, ndof);
        elem_analytic
            .evaluate(
                &disp,
                Some(&mut stiff_analytic),
                None,
                Some(&mut force_analytic),
                None,
                None,
            )
            .unwrap();

        let mut force_fad = DVector::zeros(ndof);
        let mut stiff_fad = DMatrix::zeros(ndof, ndof);
        elem_fad
            .evaluate(
                &disp,
                Some(&mut stiff_fad),
                None,
                Some(&mut force_fad),
                None,
                None,
            )
            .unwrap();

        // both paths evaluate the identical force functional
        assert!(
            (&force_fad - &force_analytic).norm() <= 1e-12 * (1.0 + force_analytic.norm()),
            "force vectors differ between scalar paths"
        );

        let denom = 1.0 + stiff_analytic.norm();
        assert!(
            (&stiff_fad - &stiff_analytic).norm() <= 1e-8 * denom,
            "tangent mismatch for {n}-noded element (hermite = {hermite}): {:.3e}",
            (&stiff_fad - &stiff_analytic).norm() / denom
        );
    }
}

#[test]
fn fad_tangent_also_passes_finite_difference_check() {
    let mut rng = StdRng::seed_from_u64(4242);
    let mut elem = straight_element(2, false, true, 1.0);
    let ndof = elem.num_dofs();
    let disp = random_state(&elem, &mut rng);

    let mut force0 = DVector::zeros(ndof);
    let mut stiff = DMatrix::zeros(ndof, ndof);
    elem.evaluate(&disp, Some(&mut stiff), None, Some(&mut force0), None, None)
        .unwrap();

    let mut direction = DVector::zeros(ndof);
    for i in 0..ndof {
        direction[i] = rng.gen_range(-1.0..1.0);
    }
    direction /= direction.norm();

    let mut errors = Vec::new();
    for eps in [1e-4, 5e-5] {
        let delta = &direction * eps;
        let disp_pert = apply_increment(&elem, &disp, &delta);
        let force1 = force_at(&mut elem, &disp_pert);
        errors.push((force1 - (&force0 + &stiff * &delta)).norm());
    }
    assert!(errors[1] <= 0.3 * errors[0] + 1e-10);
}
