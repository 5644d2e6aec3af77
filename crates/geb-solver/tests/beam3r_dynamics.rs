//! Inertia validation: lumped mass conservation, generalized-alpha velocity
//! propagation, and the energy/momentum diagnostics.

use geb_fem::shape::lagrange_node_positions;
use geb_solver::{
    Beam3r, Beam3rConfig, BeamConstitutiveLaw, BeamCrossSection, BeamElement, HookeanCrossSection,
    LieGroupGenAlphaParams,
};
use nalgebra::{DMatrix, DVector, Vector3};
use std::sync::Arc;

const DENSITY: f64 = 1200.0;
const RADIUS: f64 = 0.01;

fn material() -> Arc<dyn BeamConstitutiveLaw> {
    Arc::new(HookeanCrossSection::new(
        1,
        1e7,
        0.3,
        DENSITY,
        &BeamCrossSection::circular(RADIUS),
    ))
}

fn straight_element(num_triad_nodes: usize, hermite: bool, length: f64) -> Beam3r {
    let config = Beam3rConfig {
        num_triad_nodes,
        centerline_hermite: hermite,
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

#[test]
fn lumped_mass_row_sums_equal_total_element_mass() {
    let length = 1.6;
    let rho_a = DENSITY * std::f64::consts::PI * RADIUS * RADIUS;
    let total_mass = rho_a * length;

    for (n, hermite) in [(2, false), (3, false), (2, true)] {
        let mut elem = straight_element(n, hermite, length);
        let ndof = elem.num_dofs();
        let disp = DVector::zeros(ndof);
        let mut mass = DMatrix::zeros(ndof, ndof);
        let mut inertia = DVector::zeros(ndof);
        let params = LieGroupGenAlphaParams::newmark(0.01);
        elem.evaluate(
            &disp,
            None,
            Some(&mut mass),
            None,
            Some(&mut inertia),
            Some(&params),
        )
        .unwrap();

        Beam3r::lump_mass_matrix(&mut mass);

        for k in 0..3 {
            let mut sum = 0.0;
            for node in 0..elem.num_centerline_nodes() {
                let i = elem.position_dof_indices(node)[k];
                sum += mass[(i, i)];
            }
            // Hermite tangent rows carry their own lumped entries; the
            // translational rows alone must reproduce the element mass
            assert!(
                (sum - total_mass).abs() / total_mass < 1e-9,
                "lumped mass {sum} deviates from rho*A*L = {total_mass} \
                 for {n}-noded element (hermite = {hermite}), dimension {k}"
            );
        }
    }
}

#[test]
fn element_at_rest_has_no_inertia_force_and_no_kinetic_energy() {
    let mut elem = straight_element(3, false, 1.0);
    let ndof = elem.num_dofs();
    let disp = DVector::zeros(ndof);
    let mut mass = DMatrix::zeros(ndof, ndof);
    let mut inertia = DVector::zeros(ndof);
    let params = LieGroupGenAlphaParams::with_spectral_radius(0.01, 0.9);
    elem.evaluate(
        &disp,
        None,
        Some(&mut mass),
        None,
        Some(&mut inertia),
        Some(&params),
    )
    .unwrap();

    assert!(inertia.norm() < 1e-12);
    assert!(elem.kinetic_energy() < 1e-14);
    assert!(elem.linear_momentum().norm() < 1e-14);
    assert!(elem.angular_momentum().norm() < 1e-14);
}

#[test]
fn uniform_translation_step_produces_newmark_consistent_inertia() {
    // one step of uniform translation u from rest: the generalized-alpha
    // recurrence (Newmark limit) gives acceleration u/(beta dt^2) and
    // velocity u*gamma/(beta dt) at every Gauss point
    let length = 1.0;
    let dt = 1e-3;
    let u = Vector3::new(0.0, 2e-4, 0.0);
    let rho_a = DENSITY * std::f64::consts::PI * RADIUS * RADIUS;

    let mut elem = straight_element(2, false, length);
    let ndof = elem.num_dofs();
    let mut disp = DVector::zeros(ndof);
    for node in 0..2 {
        for (k, &i) in elem.position_dof_indices(node).iter().enumerate() {
            disp[i] = u[k];
        }
    }

    let params = LieGroupGenAlphaParams::newmark(dt);
    let mut inertia = DVector::zeros(ndof);
    elem.evaluate(&disp, None, None, None, Some(&mut inertia), Some(&params))
        .unwrap();

    // total inertia force = rho*A*L * u / (beta dt^2)
    let accel = u / (params.beta * dt * dt);
    for k in 0..3 {
        let mut sum = 0.0;
        for node in 0..2 {
            sum += inertia[elem.position_dof_indices(node)[k]];
        }
        assert!(
            (sum - rho_a * length * accel[k]).abs() <= 1e-9 * (1.0 + (rho_a * length * accel[k]).abs()),
            "inertia force resultant inconsistent with the Newmark update"
        );
    }

    // velocity u*gamma/(beta dt) at every point: momentum and kinetic energy
    let vel = u * (params.gamma / (params.beta * dt));
    let expect_momentum = vel * rho_a * length;
    assert!((elem.linear_momentum() - expect_momentum).norm() < 1e-9 * expect_momentum.norm());
    let expect_ekin = 0.5 * rho_a * length * vel.dot(&vel);
    assert!((elem.kinetic_energy() - expect_ekin).abs() < 1e-9 * expect_ekin);
    assert!(elem.kinetic_energy_torsion().abs() < 1e-14);
    assert!(elem.kinetic_energy_bending().abs() < 1e-14);
}

#[test]
fn update_step_state_commits_the_current_iterate() {
    let mut elem = straight_element(2, false, 1.0);
    let ndof = elem.num_dofs();
    let mut disp = DVector::zeros(ndof);
    disp[elem.rotation_dof_indices(0)[0]] = 0.1;
    disp[elem.rotation_dof_indices(1)[0]] = 0.15;

    let params = LieGroupGenAlphaParams::newmark(0.01);
    let mut inertia = DVector::zeros(ndof);
    elem.evaluate(&disp, None, None, None, Some(&mut inertia), Some(&params))
        .unwrap();

    assert_ne!(elem.qconvnode()[0], elem.qnewnode()[0]);
    let qnew_before = elem.qnewnode().to_vec();
    elem.update_step_state();
    assert_eq!(elem.qconvnode()[0], qnew_before[0]);
    assert_eq!(elem.qconvnode()[1], qnew_before[1]);

    // a repeated step discards the iterate instead
    let mut inertia2 = DVector::zeros(ndof);
    elem.evaluate(&disp, None, None, None, Some(&mut inertia2), Some(&params))
        .unwrap();
    assert_ne!(elem.qnewnode()[0], elem.qconvnode()[0]);
    elem.reset_step_state();
    assert_eq!(elem.qnewnode()[0], elem.qconvnode()[0]);
}
