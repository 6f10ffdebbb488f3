use compound_bond::{BondForceError, BondHandle, CompoundBondForce, TabulatedFunction};

fn harmonic_force() -> CompoundBondForce {
    let mut force = CompoundBondForce::new(2, "k*(distance(p1,p2)-r0)^2").unwrap();
    force.add_per_bond_parameter("k").unwrap();
    force.add_per_bond_parameter("r0").unwrap();
    force
}

fn is_validation<T>(result: Result<T, BondForceError>) -> bool {
    matches!(result, Err(BondForceError::Validation(_)))
}

// ============================================================================
// Bonds
// ============================================================================

#[test]
fn test_add_bond_returns_handles_in_order() {
    let mut force = harmonic_force();
    assert_eq!(force.add_bond(&[0, 1], &[1.0, 0.5]).unwrap(), BondHandle(0));
    assert_eq!(force.add_bond(&[1, 2], &[2.0, 0.5]).unwrap(), BondHandle(1));
    assert_eq!(force.num_bonds(), 2);
    assert_eq!(force.bond(BondHandle(1)).unwrap().particles, vec![1, 2]);
}

#[test]
fn test_add_bond_validates_shape() {
    let mut force = harmonic_force();
    assert!(is_validation(force.add_bond(&[0, 1, 2], &[1.0, 0.5])));
    assert!(is_validation(force.add_bond(&[0, 1], &[1.0])));
    assert_eq!(force.num_bonds(), 0);
}

#[test]
fn test_set_bond_parameters() {
    let mut force = harmonic_force();
    let handle = force.add_bond(&[0, 1], &[1.0, 0.5]).unwrap();
    force.set_bond_parameters(handle, &[3, 4], &[2.0, 0.7]).unwrap();
    let bond = force.bond(handle).unwrap();
    assert_eq!(bond.particles, vec![3, 4]);
    assert_eq!(bond.parameters, vec![2.0, 0.7]);

    assert!(is_validation(force.set_bond_parameters(handle, &[3], &[2.0, 0.7])));
    assert!(is_validation(force.set_bond_parameters(BondHandle(5), &[3, 4], &[2.0, 0.7])));
}

#[test]
fn test_zero_particles_per_bond_is_rejected() {
    assert!(is_validation(CompoundBondForce::new(0, "1")));
}

// ============================================================================
// Parameters
// ============================================================================

#[test]
fn test_per_bond_parameter_after_bonds_is_rejected() {
    let mut force = harmonic_force();
    force.add_bond(&[0, 1], &[1.0, 0.5]).unwrap();
    assert!(is_validation(force.add_per_bond_parameter("extra")));
    assert_eq!(force.num_per_bond_parameters(), 2);
}

#[test]
fn test_parameter_names_are_unique_across_kinds() {
    let mut force = harmonic_force();
    assert!(is_validation(force.add_per_bond_parameter("k")));
    assert!(is_validation(force.add_global_parameter("r0", 1.0)));
    assert_eq!(force.add_global_parameter("scale", 1.0).unwrap(), 0);
    assert!(is_validation(force.add_global_parameter("scale", 2.0)));
}

#[test]
fn test_reserved_and_invalid_parameter_names() {
    let mut force = harmonic_force();
    assert!(is_validation(force.add_global_parameter("x1", 0.0)));
    assert!(is_validation(force.add_global_parameter("z12", 0.0)));
    assert!(is_validation(force.add_global_parameter("2k", 0.0)));
    assert!(is_validation(force.add_global_parameter("", 0.0)));
    // Not a position variable: no digits after the axis letter.
    assert!(force.add_global_parameter("xi", 0.0).is_ok());
}

#[test]
fn test_rename_parameters() {
    let mut force = harmonic_force();
    force.add_global_parameter("scale", 1.0).unwrap();

    force.set_per_bond_parameter_name(0, "kb").unwrap();
    assert_eq!(force.per_bond_parameter_name(0), Some("kb"));
    // Renaming to the current name is allowed.
    force.set_global_parameter_name(0, "scale").unwrap();
    assert!(is_validation(force.set_global_parameter_name(0, "r0")));
    assert!(is_validation(force.set_per_bond_parameter_name(7, "q")));
}

#[test]
fn test_global_default_value() {
    let mut force = harmonic_force();
    force.add_global_parameter("scale", 1.0).unwrap();
    force.set_global_parameter_default_value(0, 2.5).unwrap();
    assert_eq!(force.global_parameter_default_value(0), Some(2.5));
    assert!(is_validation(force.set_global_parameter_default_value(1, 2.5)));
}

// ============================================================================
// Tabulated functions
// ============================================================================

#[test]
fn test_function_names_may_not_shadow() {
    let mut force = harmonic_force();
    let table = |name: &str| TabulatedFunction::new(name, vec![0.0, 1.0], 0.0, 1.0);
    assert!(is_validation(force.add_function(table("sin"))));
    assert!(is_validation(force.add_function(table("distance"))));
    assert_eq!(force.add_function(table("f")).unwrap(), 0);
    assert!(is_validation(force.add_function(table("f"))));
    assert_eq!(force.num_functions(), 1);
}

#[test]
fn test_malformed_function_is_range_error() {
    let mut force = harmonic_force();
    let result = force.add_function(TabulatedFunction::new("f", vec![0.0, 1.0], 1.0, 0.0));
    assert!(matches!(result, Err(BondForceError::Range(_))));
}

#[test]
fn test_set_function_parameters() {
    let mut force = harmonic_force();
    force
        .add_function(TabulatedFunction::new("f", vec![0.0, 1.0], 0.0, 1.0))
        .unwrap();
    force.set_function_parameters(0, vec![0.0, 1.0, 4.0], 0.0, 2.0).unwrap();
    let f = force.function(0).unwrap();
    assert_eq!(f.name, "f");
    assert_eq!(f.values.len(), 3);
    assert_eq!(f.max, 2.0);

    assert!(matches!(
        force.set_function_parameters(0, vec![1.0], 0.0, 2.0),
        Err(BondForceError::Range(_))
    ));
    // The previous definition survives a failed update.
    assert_eq!(force.function(0).unwrap().values.len(), 3);
}

// ============================================================================
// Compilation
// ============================================================================

#[test]
fn test_compile_uses_current_declarations() {
    let mut force = CompoundBondForce::new(2, "k*distance(p1,p2)").unwrap();
    assert!(matches!(force.compile(), Err(BondForceError::Parse(_))));

    force.add_global_parameter("k", 2.0).unwrap();
    let compiled = force.compile().unwrap();
    assert_eq!(compiled.num_global_parameters(), 1);
    assert_eq!(compiled.particles_per_bond(), 2);

    force.set_energy_function("k*distance(p1,p2)^2");
    assert_eq!(force.energy_function(), "k*distance(p1,p2)^2");
    assert!(force.compile().is_ok());
}
