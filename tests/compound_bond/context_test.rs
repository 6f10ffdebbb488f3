use compound_bond::config::{Backend, EvaluatorConfig};
use compound_bond::{BondContext, BondForceError, CompoundBondForce, ForceField};
use glam::DVec3;

fn assert_approx_eq(actual: f64, expected: f64, tol: f64, msg: &str) {
    let diff = (actual - expected).abs();
    assert!(
        diff < tol,
        "{msg}: expected {expected}, got {actual} (diff={diff}, tol={tol})"
    );
}

fn assert_vec_approx_eq(actual: DVec3, expected: DVec3, tol: f64, msg: &str) {
    assert!(
        (actual - expected).abs().max_element() < tol,
        "{msg}: expected {expected}, got {actual}"
    );
}

fn config(backend: Backend) -> EvaluatorConfig {
    EvaluatorConfig {
        backend,
        chunk_size: 16,
        ..EvaluatorConfig::default()
    }
}

fn three_particles() -> Vec<DVec3> {
    vec![
        DVec3::new(0.0, 0.0, 0.0),
        DVec3::new(1.0, 0.0, 0.0),
        DVec3::new(1.0, 1.0, 0.0),
    ]
}

/// A zig-zag chain of `n` particles with a harmonic bond between neighbours.
fn chain(n: usize) -> (CompoundBondForce, Vec<DVec3>) {
    let mut force = CompoundBondForce::new(2, "k*(distance(p1,p2)-r0)^2").unwrap();
    force.add_per_bond_parameter("k").unwrap();
    force.add_global_parameter("r0", 1.0).unwrap();
    for i in 0..n - 1 {
        force.add_bond(&[i, i + 1], &[1.0 + (i % 7) as f64]).unwrap();
    }
    let positions = (0..n)
        .map(|i| DVec3::new(i as f64 * 0.9, (i % 2) as f64 * 0.3, (i % 3) as f64 * 0.1))
        .collect();
    (force, positions)
}

// ============================================================================
// Evaluation
// ============================================================================

#[test]
fn test_distance_scenario() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut force = CompoundBondForce::new(2, "distance(p1,p2)").unwrap();
    force.add_bond(&[0, 1], &[]).unwrap();
    let context = BondContext::new(&force, 3, &config(Backend::Reference)).unwrap();

    let (energy, forces) = context.calc_forces_and_energy(&three_particles()).unwrap();
    assert_approx_eq(energy, 1.0, 1e-12, "energy");
    assert_vec_approx_eq(forces[0], DVec3::new(1.0, 0.0, 0.0), 1e-12, "force on p1");
    assert_vec_approx_eq(forces[1], DVec3::new(-1.0, 0.0, 0.0), 1e-12, "force on p2");
    assert_eq!(forces[2], DVec3::ZERO);

    let flat: Vec<f64> = three_particles().iter().flat_map(|p| p.to_array()).collect();
    let mut e = 0.0;
    let mut gradients = vec![0.0; 9];
    context.energy_and_gradients(&flat, &mut e, &mut gradients);
    assert_approx_eq(e, 1.0, 1e-12, "force field energy");
    let expected = [-1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    for (i, (g, want)) in gradients.iter().zip(expected).enumerate() {
        assert_approx_eq(*g, want, 1e-12, &format!("gradient component {i}"));
    }
}

#[test]
#[should_panic(expected = "positions length mismatch")]
fn test_force_field_rejects_short_positions() {
    let mut force = CompoundBondForce::new(2, "distance(p1,p2)").unwrap();
    force.add_bond(&[0, 1], &[]).unwrap();
    let context = BondContext::new(&force, 3, &config(Backend::Reference)).unwrap();

    let mut energy = 0.0;
    let mut gradients = vec![0.0; 9];
    context.energy_and_gradients(&[0.0; 6], &mut energy, &mut gradients);
}

#[test]
fn test_forces_accumulate_over_shared_particles() {
    // Two bonds share the middle particle of a right angle.
    let mut force = CompoundBondForce::new(2, "distance(p1,p2)").unwrap();
    force.add_bond(&[0, 1], &[]).unwrap();
    force.add_bond(&[1, 2], &[]).unwrap();
    let context = BondContext::new(&force, 3, &config(Backend::Reference)).unwrap();

    let (energy, forces) = context.calc_forces_and_energy(&three_particles()).unwrap();
    assert_approx_eq(energy, 2.0, 1e-12, "energy");
    assert_vec_approx_eq(forces[1], DVec3::new(-1.0, 1.0, 0.0), 1e-12, "shared particle");
    let total = forces.iter().copied().sum::<DVec3>();
    assert_vec_approx_eq(total, DVec3::ZERO, 1e-12, "net force");
}

#[test]
fn test_reference_kernel_is_deterministic() {
    let (force, positions) = chain(200);
    let context = BondContext::new(&force, positions.len(), &config(Backend::Reference)).unwrap();
    let first = context.calc_forces_and_energy(&positions).unwrap();
    let second = context.calc_forces_and_energy(&positions).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_parallel_matches_reference() {
    let (force, positions) = chain(2000);
    let reference = BondContext::new(&force, positions.len(), &config(Backend::Reference)).unwrap();
    let parallel = BondContext::new(&force, positions.len(), &config(Backend::Parallel)).unwrap();
    assert_eq!(reference.kernel_name(), "reference");
    assert_eq!(parallel.kernel_name(), "parallel");

    let (e_ref, f_ref) = reference.calc_forces_and_energy(&positions).unwrap();
    let (e_par, f_par) = parallel.calc_forces_and_energy(&positions).unwrap();
    assert_approx_eq(e_par, e_ref, 1e-9 * e_ref.abs().max(1.0), "energy");
    for (i, (a, b)) in f_par.iter().zip(&f_ref).enumerate() {
        assert_vec_approx_eq(*a, *b, 1e-9, &format!("force on particle {i}"));
    }
}

#[test]
fn test_auto_backend_uses_threshold() {
    let (force, positions) = chain(10);
    let small = EvaluatorConfig {
        parallel_threshold: 100,
        ..EvaluatorConfig::default()
    };
    let context = BondContext::new(&force, positions.len(), &small).unwrap();
    assert_eq!(context.kernel_name(), "reference");

    let low = EvaluatorConfig {
        parallel_threshold: 5,
        ..EvaluatorConfig::default()
    };
    let context = BondContext::new(&force, positions.len(), &low).unwrap();
    assert_eq!(context.kernel_name(), "parallel");
}

#[test]
fn test_no_bonds() {
    let force = CompoundBondForce::new(2, "distance(p1,p2)").unwrap();
    for backend in [Backend::Reference, Backend::Parallel] {
        let context = BondContext::new(&force, 3, &config(backend)).unwrap();
        let (energy, forces) = context.calc_forces_and_energy(&three_particles()).unwrap();
        assert_eq!(energy, 0.0);
        assert!(forces.iter().all(|f| *f == DVec3::ZERO));
    }
}

#[test]
fn test_wrong_positions_length() {
    let (force, positions) = chain(5);
    let context = BondContext::new(&force, positions.len(), &config(Backend::Reference)).unwrap();
    assert!(matches!(
        context.calc_forces_and_energy(&positions[..4]),
        Err(BondForceError::Validation(_))
    ));
}

#[test]
fn test_particle_index_out_of_range() {
    let mut force = CompoundBondForce::new(2, "distance(p1,p2)").unwrap();
    force.add_bond(&[0, 3], &[]).unwrap();
    assert!(matches!(
        BondContext::new(&force, 3, &EvaluatorConfig::default()),
        Err(BondForceError::Validation(_))
    ));
}

#[test]
fn test_parse_error_surfaces_at_context_creation() {
    let mut force = CompoundBondForce::new(2, "distance(p1,p2) +").unwrap();
    force.add_bond(&[0, 1], &[]).unwrap();
    assert!(matches!(
        BondContext::new(&force, 3, &EvaluatorConfig::default()),
        Err(BondForceError::Parse(_))
    ));
}

// ============================================================================
// Global parameters
// ============================================================================

#[test]
fn test_global_parameters() {
    let mut force = CompoundBondForce::new(2, "scale*distance(p1,p2)").unwrap();
    force.add_global_parameter("scale", 2.0).unwrap();
    force.add_bond(&[0, 1], &[]).unwrap();
    let context = BondContext::new(&force, 3, &config(Backend::Reference)).unwrap();

    assert_eq!(context.global_parameter("scale"), Some(2.0));
    let (energy, _) = context.calc_forces_and_energy(&three_particles()).unwrap();
    assert_approx_eq(energy, 2.0, 1e-12, "default scale");

    context.set_global_parameter("scale", 3.0).unwrap();
    let (energy, forces) = context.calc_forces_and_energy(&three_particles()).unwrap();
    assert_approx_eq(energy, 3.0, 1e-12, "updated scale");
    assert_vec_approx_eq(forces[0], DVec3::new(3.0, 0.0, 0.0), 1e-12, "force on p1");

    context.set_global_parameter_by_index(0, 0.5).unwrap();
    assert_eq!(context.global_parameter_by_index(0), Some(0.5));

    assert!(matches!(
        context.set_global_parameter("missing", 1.0),
        Err(BondForceError::Validation(_))
    ));
    assert!(matches!(
        context.set_global_parameter_by_index(1, 1.0),
        Err(BondForceError::Validation(_))
    ));
}

// ============================================================================
// Parameter update path
// ============================================================================

#[test]
fn test_update_parameters_changes_energy() {
    let (force, positions) = chain(4);
    let context = BondContext::new(&force, positions.len(), &config(Backend::Reference)).unwrap();
    let (before, _) = context.calc_forces_and_energy(&positions).unwrap();

    let rows = [vec![2.0], vec![4.0], vec![6.0]];
    context.update_parameters(rows.iter().map(Vec::as_slice)).unwrap();
    assert_eq!(context.bond_parameters(1), Some(vec![4.0]));
    assert_eq!(context.num_bonds(), 3);

    let (after, _) = context.calc_forces_and_energy(&positions).unwrap();
    // Original constants were 1, 2, 3: every bond's constant doubled.
    assert_approx_eq(after, 2.0 * before, 1e-12, "doubled energy");
}

#[test]
fn test_update_parameters_rejects_wrong_shape() {
    let (force, positions) = chain(4);
    let context = BondContext::new(&force, positions.len(), &config(Backend::Reference)).unwrap();
    let (before, _) = context.calc_forces_and_energy(&positions).unwrap();

    let too_few = [vec![2.0], vec![4.0]];
    assert!(matches!(
        context.update_parameters(too_few.iter().map(Vec::as_slice)),
        Err(BondForceError::ContextSync(_))
    ));
    let too_wide = [vec![2.0, 1.0], vec![4.0, 1.0], vec![6.0, 1.0]];
    assert!(matches!(
        context.update_parameters(too_wide.iter().map(Vec::as_slice)),
        Err(BondForceError::ContextSync(_))
    ));

    // The previous table is still in place.
    let (after, _) = context.calc_forces_and_energy(&positions).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_update_parameters_in_context() {
    let (mut force, positions) = chain(4);
    let context = BondContext::new(&force, positions.len(), &config(Backend::Reference)).unwrap();

    force
        .set_bond_parameters(compound_bond::BondHandle(0), &[0, 1], &[10.0])
        .unwrap();
    context.update_parameters_in_context(&force).unwrap();
    assert_eq!(context.bond_parameters(0), Some(vec![10.0]));
}

#[test]
fn test_update_parameters_in_context_rejects_topology_changes() {
    let (mut force, positions) = chain(4);
    let context = BondContext::new(&force, positions.len(), &config(Backend::Reference)).unwrap();
    let (before, _) = context.calc_forces_and_energy(&positions).unwrap();

    let mut moved = force.clone();
    moved
        .set_bond_parameters(compound_bond::BondHandle(0), &[0, 2], &[10.0])
        .unwrap();
    assert!(matches!(
        context.update_parameters_in_context(&moved),
        Err(BondForceError::ContextSync(_))
    ));

    force.add_bond(&[0, 3], &[1.0]).unwrap();
    assert!(matches!(
        context.update_parameters_in_context(&force),
        Err(BondForceError::ContextSync(_))
    ));

    let (after, _) = context.calc_forces_and_energy(&positions).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_parameter_swap_during_parallel_passes() {
    let (force, positions) = chain(500);
    let context = BondContext::new(&force, positions.len(), &config(Backend::Parallel)).unwrap();
    let rows: Vec<Vec<f64>> = (0..context.num_bonds()).map(|_| vec![1.0]).collect();

    std::thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..20 {
                let (energy, _) = context.calc_forces_and_energy(&positions).unwrap();
                assert!(energy.is_finite());
            }
        });
        s.spawn(|| {
            for _ in 0..20 {
                context.update_parameters(rows.iter().map(Vec::as_slice)).unwrap();
            }
        });
    });
    assert_eq!(context.bond_parameters(0), Some(vec![1.0]));
}
