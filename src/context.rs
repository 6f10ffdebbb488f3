// Execution state for one force definition bound to a particle system.
//
// The compiled expression and the topology are fixed when the context is
// created. Per-bond parameter values live behind a `RwLock<Arc<_>>`: a pass
// clones the `Arc` once and reads that table for its whole duration, while an
// update builds a new table and swaps the `Arc`. Global values are copied out
// at the start of every pass.

use std::sync::{Arc, PoisonError, RwLock};

use glam::f64::DVec3;
use log::{debug, info, trace};

use crate::compiled::CompiledExpression;
use crate::config::EvaluatorConfig;
use crate::error::{BondForceError, BondForceResult};
use crate::force::CompoundBondForce;
use crate::kernel::{BondKernel, PassInputs, create_kernel};
use crate::parameters::{BondParameterTable, GlobalParameters};
use crate::topology::BondTopology;

pub struct BondContext {
    compiled: Arc<CompiledExpression>,
    topology: BondTopology,
    num_particles: usize,
    per_bond_names: Vec<String>,
    parameters: RwLock<Arc<BondParameterTable>>,
    globals: RwLock<GlobalParameters>,
    kernel: Box<dyn BondKernel>,
    config: EvaluatorConfig,
}

impl BondContext {
    /// Compiles `force` and binds it to a system of `num_particles` particles.
    pub fn new(force: &CompoundBondForce, num_particles: usize, config: &EvaluatorConfig) -> BondForceResult<Self> {
        config.validate()?;
        let compiled = force
            .compile()?
            .with_distance_epsilon(config.distance_epsilon);

        let topology = BondTopology::new(
            force.particles_per_bond(),
            force.bonds().iter().map(|b| b.particles.as_slice()),
            num_particles,
        )?;
        let parameters = BondParameterTable::from_rows(
            force.num_per_bond_parameters(),
            force.bonds().iter().map(|b| b.parameters.as_slice()),
        )
        .map_err(BondForceError::Validation)?;
        let globals = GlobalParameters::new(
            force
                .global_parameters()
                .iter()
                .map(|p| (p.name.clone(), p.default_value)),
        );
        let kernel = create_kernel(config, topology.num_bonds());

        info!(
            "Created bond context: {} bonds over {} particles, {} kernel",
            topology.num_bonds(),
            num_particles,
            kernel.name()
        );

        Ok(Self {
            compiled: Arc::new(compiled),
            topology,
            num_particles,
            per_bond_names: force.per_bond_parameter_names(),
            parameters: RwLock::new(Arc::new(parameters)),
            globals: RwLock::new(globals),
            kernel,
            config: config.clone(),
        })
    }

    pub fn compiled(&self) -> &Arc<CompiledExpression> {
        &self.compiled
    }

    pub fn topology(&self) -> &BondTopology {
        &self.topology
    }

    pub fn num_bonds(&self) -> usize {
        self.topology.num_bonds()
    }

    pub fn num_particles(&self) -> usize {
        self.num_particles
    }

    pub fn kernel_name(&self) -> &'static str {
        self.kernel.name()
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// The per-bond table the next pass will read.
    pub fn parameter_table(&self) -> Arc<BondParameterTable> {
        self.parameters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn bond_parameters(&self, bond: usize) -> Option<Vec<f64>> {
        let table = self.parameter_table();
        (bond < table.num_bonds()).then(|| table.row(bond).to_vec())
    }

    pub fn global_parameter(&self, name: &str) -> Option<f64> {
        self.globals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
    }

    pub fn global_parameter_by_index(&self, index: usize) -> Option<f64> {
        self.globals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .value(index)
    }

    /// Sets a global parameter by name. Takes effect from the next pass.
    pub fn set_global_parameter(&self, name: &str, value: f64) -> BondForceResult<()> {
        self.globals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set(name, value)
    }

    pub fn set_global_parameter_by_index(&self, index: usize, value: f64) -> BondForceResult<()> {
        self.globals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_value(index, value)
    }

    /// Total energy and the force on every particle.
    ///
    /// `positions` must hold one entry per particle of the system.
    pub fn calc_forces_and_energy(&self, positions: &[DVec3]) -> BondForceResult<(f64, Vec<DVec3>)> {
        let mut forces = vec![DVec3::ZERO; self.num_particles];
        let energy = self.calc_forces_and_energy_into(positions, &mut forces)?;
        Ok((energy, forces))
    }

    /// Like [`calc_forces_and_energy`](Self::calc_forces_and_energy), writing
    /// into a caller-provided force buffer of the same length as `positions`.
    pub fn calc_forces_and_energy_into(&self, positions: &[DVec3], forces: &mut [DVec3]) -> BondForceResult<f64> {
        if positions.len() != self.num_particles {
            return Err(BondForceError::Validation(format!(
                "expected {} positions, got {}",
                self.num_particles,
                positions.len()
            )));
        }
        if forces.len() != self.num_particles {
            return Err(BondForceError::Validation(format!(
                "expected a force buffer of {} entries, got {}",
                self.num_particles,
                forces.len()
            )));
        }

        let parameters = self.parameter_table();
        let globals = self
            .globals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot();

        let inputs = PassInputs {
            compiled: &self.compiled,
            topology: &self.topology,
            parameters: &parameters,
            globals: &globals,
            positions,
        };
        let energy = self.kernel.execute(&inputs, forces);
        trace!("{} pass over {} bonds: energy {}", self.kernel.name(), self.num_bonds(), energy);
        Ok(energy)
    }

    /// Replaces every bond's per-bond parameter values, one row per bond.
    ///
    /// Fails with `ContextSync` if the number of rows or the length of any row
    /// does not match; the current table is then left in place.
    pub fn update_parameters<'a, I>(&self, rows: I) -> BondForceResult<()>
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        let stride = self.per_bond_names.len();
        let table = BondParameterTable::from_rows(stride, rows).map_err(BondForceError::ContextSync)?;
        if table.num_bonds() != self.topology.num_bonds() {
            return Err(BondForceError::ContextSync(format!(
                "got parameters for {} bonds, the context has {}",
                table.num_bonds(),
                self.topology.num_bonds()
            )));
        }
        self.swap_table(table);
        Ok(())
    }

    /// Copies per-bond parameter values from an edited force definition.
    ///
    /// Only parameter values may differ. Any change to the bonds' particles
    /// or to the per-bond parameter declarations is a `ContextSync` error.
    pub fn update_parameters_in_context(&self, force: &CompoundBondForce) -> BondForceResult<()> {
        if force.particles_per_bond() != self.topology.particles_per_bond() {
            return Err(BondForceError::ContextSync(format!(
                "particles per bond changed from {} to {}",
                self.topology.particles_per_bond(),
                force.particles_per_bond()
            )));
        }
        if force.num_bonds() != self.topology.num_bonds() {
            return Err(BondForceError::ContextSync(format!(
                "number of bonds changed from {} to {}",
                self.topology.num_bonds(),
                force.num_bonds()
            )));
        }
        if force.per_bond_parameter_names() != self.per_bond_names {
            return Err(BondForceError::ContextSync(
                "per-bond parameter declarations changed".to_string(),
            ));
        }
        for (i, (bond, current)) in force.bonds().iter().zip(self.topology.bonds()).enumerate() {
            if bond.particles != current {
                return Err(BondForceError::ContextSync(format!(
                    "particles of bond {} changed from {:?} to {:?}",
                    i, current, bond.particles
                )));
            }
        }
        self.update_parameters(force.bonds().iter().map(|b| b.parameters.as_slice()))
    }

    fn swap_table(&self, table: BondParameterTable) {
        debug!(
            "Swapping per-bond parameter table ({} bonds x {} values)",
            table.num_bonds(),
            table.stride()
        );
        *self.parameters.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(table);
    }
}
