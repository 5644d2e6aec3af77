//! Element lifecycle and serialization: pack/unpack round trips, the
//! one-time reference geometry setup, fatal input-size checks, and the PTC
//! stiffness augmentation.

use geb_fem::shape::lagrange_node_positions;
use geb_solver::{
    Beam3r, Beam3rConfig, BeamConstitutiveLaw, BeamCrossSection, BeamElement, BeamError,
    CrossSectionRegistry, HookeanCrossSection, LieGroupGenAlphaParams, PtcParams,
};
use nalgebra::{DMatrix, DVector, Vector3};
use std::sync::Arc;

fn law() -> Arc<dyn BeamConstitutiveLaw> {
    Arc::new(HookeanCrossSection::new(
        4,
        1e7,
        0.3,
        1200.0,
        &BeamCrossSection::circular(0.01),
    ))
}

fn registry() -> CrossSectionRegistry {
    let mut registry = CrossSectionRegistry::new();
    registry.insert(law());
    registry
}

/// Pre-curved 3-node element with a committed non-trivial dynamic state.
fn configured_element() -> Beam3r {
    let config = Beam3rConfig {
        num_triad_nodes: 3,
        ..Default::default()
    };
    let mut elem = Beam3r::new(17, config, law()).unwrap();
    let radius = 1.5;
    let xrefe: Vec<Vector3<f64>> = lagrange_node_positions(3)
        .iter()
        .map(|&xi| {
            let alpha = 0.25 * (xi + 1.0);
            Vector3::new(radius * alpha.sin(), radius * (1.0 - alpha.cos()), 0.0)
        })
        .collect();
    let rotrefe: Vec<Vector3<f64>> = lagrange_node_positions(3)
        .iter()
        .map(|&xi| Vector3::new(0.0, 0.0, 0.25 * (xi + 1.0)))
        .collect();
    elem.set_up_reference_geometry(&xrefe, &rotrefe).unwrap();

    // drive the history buffers away from their initial values and commit
    let ndof = elem.num_dofs();
    let mut disp = DVector::zeros(ndof);
    for node in 0..3 {
        disp[elem.position_dof_indices(node)[1]] = 0.01 * (node as f64 + 1.0);
        disp[elem.rotation_dof_indices(node)[0]] = 0.02 * (node as f64 + 1.0);
    }
    let params = LieGroupGenAlphaParams::newmark(1e-3);
    let mut inertia = DVector::zeros(ndof);
    elem.evaluate(&disp, None, None, None, Some(&mut inertia), Some(&params))
        .unwrap();
    elem.update_step_state();
    elem
}

#[test]
fn pack_unpack_round_trip_is_bit_exact() {
    let elem = configured_element();
    let bytes = elem.pack().unwrap();
    let restored = Beam3r::unpack(&bytes, &registry()).unwrap();
    let bytes2 = restored.pack().unwrap();
    assert_eq!(bytes, bytes2, "serialized state changed across a round trip");

    assert_eq!(elem.id(), restored.id());
    assert_eq!(elem.num_dofs(), restored.num_dofs());
    assert_eq!(elem.ref_length().to_bits(), restored.ref_length().to_bits());
    assert_eq!(elem.qconvnode(), restored.qconvnode());
    assert_eq!(elem.qnewnode(), restored.qnewnode());
    assert_eq!(elem.tref(), restored.tref());
    assert_eq!(elem.initial_nodal_rot_vecs(), restored.initial_nodal_rot_vecs());
}

#[test]
fn unpacked_element_evaluates_identically() {
    let mut elem = configured_element();
    let bytes = elem.pack().unwrap();
    let mut restored = Beam3r::unpack(&bytes, &registry()).unwrap();

    let ndof = elem.num_dofs();
    let mut disp = DVector::zeros(ndof);
    for node in 0..3 {
        disp[elem.position_dof_indices(node)[2]] = 0.005 * (node as f64 - 1.0);
        disp[elem.rotation_dof_indices(node)[1]] = 0.01;
    }

    let mut force_a = DVector::zeros(ndof);
    let mut stiff_a = DMatrix::zeros(ndof, ndof);
    elem.evaluate(&disp, Some(&mut stiff_a), None, Some(&mut force_a), None, None)
        .unwrap();
    let mut force_b = DVector::zeros(ndof);
    let mut stiff_b = DMatrix::zeros(ndof, ndof);
    restored
        .evaluate(&disp, Some(&mut stiff_b), None, Some(&mut force_b), None, None)
        .unwrap();

    assert_eq!(force_a, force_b);
    assert_eq!(stiff_a, stiff_b);
}

#[test]
fn unpack_rejects_foreign_type_tags_and_unknown_materials() {
    let elem = configured_element();
    let bytes = elem.pack().unwrap();

    // same payload with a tampered element type tag
    let text = String::from_utf8(bytes.clone()).unwrap();
    let tampered = text.replacen("Beam3r", "Beam3x", 1).into_bytes();
    assert!(matches!(
        Beam3r::unpack(&tampered, &registry()),
        Err(BeamError::TypeTagMismatch { .. })
    ));

    // registry without the packed material id
    let empty = CrossSectionRegistry::new();
    assert!(matches!(
        Beam3r::unpack(&bytes, &empty),
        Err(BeamError::UnknownMaterial { id: 4 })
    ));
}

#[test]
fn reference_geometry_can_only_be_set_once() {
    let mut elem = configured_element();
    let xrefe = vec![Vector3::zeros(); 3];
    let rotrefe = vec![Vector3::zeros(); 3];
    assert!(matches!(
        elem.set_up_reference_geometry(&xrefe, &rotrefe),
        Err(BeamError::AlreadyInitialized { element: 17 })
    ));
}

#[test]
fn mismatched_state_vector_sizes_are_fatal() {
    let mut elem = configured_element();
    let short = DVector::zeros(5);
    let mut force = DVector::zeros(elem.num_dofs());
    assert!(matches!(
        elem.evaluate(&short, None, None, Some(&mut force), None, None),
        Err(BeamError::SizeMismatch { .. })
    ));

    let disp = DVector::zeros(elem.num_dofs());
    let mut small_force = DVector::zeros(4);
    assert!(matches!(
        elem.evaluate(&disp, None, None, Some(&mut small_force), None, None),
        Err(BeamError::SizeMismatch { .. })
    ));
}

#[test]
fn repeated_evaluation_with_identical_input_is_idempotent() {
    let mut elem = configured_element();
    let ndof = elem.num_dofs();
    let mut disp = DVector::zeros(ndof);
    disp[elem.rotation_dof_indices(1)[2]] = 0.07;

    let mut force_a = DVector::zeros(ndof);
    elem.evaluate(&disp, None, None, Some(&mut force_a), None, None)
        .unwrap();
    let mut force_b = DVector::zeros(ndof);
    elem.evaluate(&disp, None, None, Some(&mut force_b), None, None)
        .unwrap();
    assert_eq!(force_a, force_b);
}

#[test]
fn ptc_augments_the_diagonal_with_nodal_weights() {
    let config = Beam3rConfig::default();
    let mut elem = Beam3r::new(3, config, law()).unwrap();
    let length = 2.0;
    let xrefe = [Vector3::zeros(), Vector3::new(length, 0.0, 0.0)];
    let rotrefe = vec![Vector3::zeros(); 2];
    elem.set_up_reference_geometry(&xrefe, &rotrefe).unwrap();

    let ndof = elem.num_dofs();
    let mut stiff = DMatrix::zeros(ndof, ndof);
    let params = PtcParams {
        ctransptc: 3.0,
        crotptc: 5.0,
    };
    elem.evaluate_ptc(&params, &mut stiff).unwrap();

    for node in 0..2 {
        for k in 0..3 {
            let p = elem.position_dof_indices(node)[k];
            let r = elem.rotation_dof_indices(node)[k];
            assert!((stiff[(p, p)] - 3.0 * 0.5 * length).abs() < 1e-14);
            assert!((stiff[(r, r)] - 5.0 * 0.5 * length).abs() < 1e-14);
        }
    }

    // only the diagonal is touched
    let off_diag: f64 = stiff
        .iter()
        .sum::<f64>()
        - (0..ndof).map(|i| stiff[(i, i)]).sum::<f64>();
    assert_eq!(off_diag, 0.0);
}
