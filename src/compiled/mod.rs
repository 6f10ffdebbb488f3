pub mod derivative;
pub mod node;
pub mod resolve;

use std::collections::BTreeSet;

use glam::DVec3;
use log::debug;
use smallvec::SmallVec;

use crate::error::BondForceResult;
use crate::expr::parser::parse;
use crate::geometry::{Geometry, GeometryValue};
use crate::tabulated::{NaturalSpline, TabulatedFunction};
use derivative::differentiate;
use node::{Coordinate, EvalScope, Node};
use resolve::{Declarations, Resolved, resolve};

/// Default floor applied to lengths before dividing by them in geometry gradients.
pub const DEFAULT_DISTANCE_EPSILON: f64 = 1e-10;

/// Energy of one bond and the force on each of its particles, in bond order.
#[derive(Debug, Clone, PartialEq)]
pub struct BondEvaluation {
    pub energy: f64,
    pub forces: Vec<DVec3>,
}

/// An energy expression compiled once and evaluated for every bond.
///
/// Holds the resolved energy tree, one derivative tree per coordinate the
/// energy depends on, the distinct geometry calls both refer to, and the
/// splines of all tabulated functions.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    energy: Node,
    derivatives: Vec<(Coordinate, Node)>,
    geometries: Vec<Geometry>,
    splines: Vec<NaturalSpline>,
    particles_per_bond: usize,
    num_per_bond_parameters: usize,
    num_global_parameters: usize,
    distance_epsilon: f64,
}

/// Parses, resolves and differentiates an energy expression.
///
/// Fails with `BondForceError::Parse` for malformed expressions or unknown names,
/// and with `BondForceError::Range` for a malformed tabulated function.
pub fn compile(
    energy: &str,
    per_bond_names: &[String],
    global_names: &[String],
    functions: &[TabulatedFunction],
    particles_per_bond: usize,
) -> BondForceResult<CompiledExpression> {
    let splines = functions
        .iter()
        .map(NaturalSpline::new)
        .collect::<BondForceResult<Vec<_>>>()?;
    let function_names: Vec<String> = functions.iter().map(|f| f.name.clone()).collect();

    let parsed = parse(energy)?;
    let decls = Declarations {
        per_bond: per_bond_names,
        globals: global_names,
        functions: &function_names,
        particles_per_bond,
    };
    let Resolved {
        energy: energy_node,
        geometries,
    } = resolve(&parsed, &decls)?;

    let mut coordinates = BTreeSet::new();
    energy_node.collect_coordinates(&mut coordinates);
    let derivatives = coordinates
        .into_iter()
        .map(|c| Ok((c, differentiate(&energy_node, c)?)))
        .collect::<BondForceResult<Vec<_>>>()?;

    debug!(
        "Compiled '{}': {} nodes, {} geometry calls, {} derivative trees ({} nodes)",
        energy,
        energy_node.size(),
        geometries.len(),
        derivatives.len(),
        derivatives.iter().map(|(_, d)| d.size()).sum::<usize>()
    );

    Ok(CompiledExpression {
        energy: energy_node,
        derivatives,
        geometries,
        splines,
        particles_per_bond,
        num_per_bond_parameters: per_bond_names.len(),
        num_global_parameters: global_names.len(),
        distance_epsilon: DEFAULT_DISTANCE_EPSILON,
    })
}

impl CompiledExpression {
    pub fn with_distance_epsilon(mut self, epsilon: f64) -> Self {
        self.distance_epsilon = epsilon;
        self
    }

    pub fn distance_epsilon(&self) -> f64 {
        self.distance_epsilon
    }

    pub fn particles_per_bond(&self) -> usize {
        self.particles_per_bond
    }

    pub fn num_per_bond_parameters(&self) -> usize {
        self.num_per_bond_parameters
    }

    pub fn num_global_parameters(&self) -> usize {
        self.num_global_parameters
    }

    pub fn energy_node(&self) -> &Node {
        &self.energy
    }

    /// Distinct geometry calls, in the order their slots were assigned.
    pub fn geometries(&self) -> &[Geometry] {
        &self.geometries
    }

    /// Coordinates with a cached derivative tree, in ascending order.
    pub fn coordinates(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.derivatives.iter().map(|(c, _)| *c)
    }

    /// The derivative tree dE/d(coordinate), or `None` if the energy does not
    /// depend on that coordinate.
    pub fn derivative(&self, coordinate: Coordinate) -> Option<&Node> {
        self.derivatives
            .binary_search_by(|(c, _)| c.cmp(&coordinate))
            .ok()
            .map(|i| &self.derivatives[i].1)
    }

    /// Evaluates energy and forces for one bond.
    ///
    /// `positions` are the bond's own particles, in bond order.
    pub fn evaluate(&self, positions: &[DVec3], per_bond: &[f64], globals: &[f64]) -> BondEvaluation {
        let mut forces = vec![DVec3::ZERO; self.particles_per_bond];
        let energy = self.evaluate_into(positions, per_bond, globals, &mut forces);
        BondEvaluation { energy, forces }
    }

    /// Like [`evaluate`](Self::evaluate), but writes the forces into `forces`
    /// (overwriting it) and returns the energy.
    pub fn evaluate_into(
        &self,
        positions: &[DVec3],
        per_bond: &[f64],
        globals: &[f64],
        forces: &mut [DVec3],
    ) -> f64 {
        debug_assert_eq!(positions.len(), self.particles_per_bond);
        debug_assert_eq!(per_bond.len(), self.num_per_bond_parameters);
        debug_assert_eq!(globals.len(), self.num_global_parameters);
        debug_assert_eq!(forces.len(), self.particles_per_bond);

        // Each geometry call is evaluated once per bond and shared by the
        // energy tree and every derivative tree.
        let geometry: SmallVec<[GeometryValue; 4]> = self
            .geometries
            .iter()
            .map(|g| g.evaluate(positions, self.distance_epsilon))
            .collect();

        let scope = EvalScope {
            positions,
            per_bond,
            globals,
            splines: &self.splines,
            geometry: &geometry,
        };

        forces.fill(DVec3::ZERO);
        for (coordinate, derivative) in &self.derivatives {
            let de = derivative.evaluate(&scope);
            forces[coordinate.particle] -= coordinate.axis.unit() * de;
        }
        self.energy.evaluate(&scope)
    }
}
