// Kernels execute one full pass over all bonds.
//
// Both kernels gather the bond's particles into a local buffer, evaluate the
// compiled expression, and scatter the per-bond forces back onto the global
// particle array. The parallel kernel gives every rayon worker its own force
// accumulator and reduces them pairwise, so no two threads ever write the same
// particle slot.

use glam::f64::DVec3;
use rayon::prelude::*;

use crate::compiled::CompiledExpression;
use crate::config::{Backend, EvaluatorConfig};
use crate::parameters::BondParameterTable;
use crate::topology::BondTopology;

/// Everything a kernel reads during one pass. All of it is immutable for the
/// duration of the pass.
#[derive(Clone, Copy)]
pub struct PassInputs<'a> {
    pub compiled: &'a CompiledExpression,
    pub topology: &'a BondTopology,
    pub parameters: &'a BondParameterTable,
    pub globals: &'a [f64],
    pub positions: &'a [DVec3],
}

pub trait BondKernel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Sums the energy of every bond and writes the total force on every
    /// particle into `forces` (which is overwritten, not added to).
    fn execute(&self, inputs: &PassInputs, forces: &mut [DVec3]) -> f64;
}

/// Scratch buffers for one bond, reused across bonds by the same worker.
struct BondScratch {
    positions: Vec<DVec3>,
    forces: Vec<DVec3>,
}

impl BondScratch {
    fn new(particles_per_bond: usize) -> Self {
        Self {
            positions: vec![DVec3::ZERO; particles_per_bond],
            forces: vec![DVec3::ZERO; particles_per_bond],
        }
    }

    /// Evaluates bond `bond` and adds its forces into `forces`. Returns its energy.
    #[inline]
    fn accumulate(&mut self, inputs: &PassInputs, bond: usize, forces: &mut [DVec3]) -> f64 {
        let particles = inputs.topology.bond(bond);
        for (local, &particle) in self.positions.iter_mut().zip(particles) {
            *local = inputs.positions[particle];
        }
        let energy = inputs.compiled.evaluate_into(
            &self.positions,
            inputs.parameters.row(bond),
            inputs.globals,
            &mut self.forces,
        );
        for (&particle, force) in particles.iter().zip(&self.forces) {
            forces[particle] += *force;
        }
        energy
    }
}

/// Serial pass in bond order. Its summation order is fixed, so repeated passes
/// give bit-identical results.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceKernel;

impl BondKernel for ReferenceKernel {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn execute(&self, inputs: &PassInputs, forces: &mut [DVec3]) -> f64 {
        forces.fill(DVec3::ZERO);
        let mut scratch = BondScratch::new(inputs.topology.particles_per_bond());
        let mut energy = 0.0;
        for bond in 0..inputs.topology.num_bonds() {
            energy += scratch.accumulate(inputs, bond, forces);
        }
        energy
    }
}

/// Per-worker partial sums.
struct Accumulator {
    energy: f64,
    forces: Vec<DVec3>,
    scratch: BondScratch,
}

impl Accumulator {
    fn new(num_particles: usize, particles_per_bond: usize) -> Self {
        Self {
            energy: 0.0,
            forces: vec![DVec3::ZERO; num_particles],
            scratch: BondScratch::new(particles_per_bond),
        }
    }

    fn merge(mut self, other: Accumulator) -> Accumulator {
        self.energy += other.energy;
        for (a, b) in self.forces.iter_mut().zip(&other.forces) {
            *a += *b;
        }
        self
    }
}

/// Rayon pass: bonds are split into work items of at least `chunk_size` bonds.
#[derive(Debug, Clone, Copy)]
pub struct ParallelKernel {
    chunk_size: usize,
}

impl ParallelKernel {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl BondKernel for ParallelKernel {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn execute(&self, inputs: &PassInputs, forces: &mut [DVec3]) -> f64 {
        let num_particles = forces.len();
        let particles_per_bond = inputs.topology.particles_per_bond();

        let total = (0..inputs.topology.num_bonds())
            .into_par_iter()
            .with_min_len(self.chunk_size)
            .fold(
                || Accumulator::new(num_particles, particles_per_bond),
                |mut acc, bond| {
                    acc.energy += acc.scratch.accumulate(inputs, bond, &mut acc.forces);
                    acc
                },
            )
            .reduce(
                || Accumulator::new(num_particles, particles_per_bond),
                Accumulator::merge,
            );

        forces.copy_from_slice(&total.forces);
        total.energy
    }
}

/// Picks the kernel for a context with `num_bonds` bonds.
pub fn create_kernel(config: &EvaluatorConfig, num_bonds: usize) -> Box<dyn BondKernel> {
    match config.backend_for(num_bonds) {
        Backend::Parallel => Box::new(ParallelKernel::new(config.chunk_size)),
        Backend::Reference | Backend::Auto => Box::new(ReferenceKernel),
    }
}
