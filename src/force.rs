// The user-facing force definition.
//
// A `CompoundBondForce` collects the energy expression, parameter declarations,
// bonds and tabulated functions. Nothing is compiled while it is being edited;
// `compile()` (or creating a `BondContext`) turns it into a `CompiledExpression`.

use crate::compiled::resolve::parse_position_variable;
use crate::compiled::{self, CompiledExpression};
use crate::error::{BondForceError, BondForceResult};
use crate::expr::functions::{Func, GEOMETRY_FUNCTIONS};
use crate::tabulated::TabulatedFunction;

#[derive(Debug, Clone, PartialEq)]
pub struct PerBondParameter {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalParameter {
    pub name: String,
    pub default_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bond {
    pub particles: Vec<usize>,
    pub parameters: Vec<f64>,
}

/// Index of a bond in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BondHandle(pub usize);

#[derive(Debug, Clone)]
pub struct CompoundBondForce {
    particles_per_bond: usize,
    energy: String,
    per_bond_parameters: Vec<PerBondParameter>,
    global_parameters: Vec<GlobalParameter>,
    bonds: Vec<Bond>,
    functions: Vec<TabulatedFunction>,
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn out_of_range(what: &str, index: usize, len: usize) -> BondForceError {
    BondForceError::Validation(format!(
        "{} index {} out of range (have {})",
        what, index, len
    ))
}

impl CompoundBondForce {
    /// Creates a force whose bonds each act on `particles_per_bond` particles.
    pub fn new(particles_per_bond: usize, energy: impl Into<String>) -> BondForceResult<Self> {
        if particles_per_bond == 0 {
            return Err(BondForceError::Validation(
                "particles_per_bond must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            particles_per_bond,
            energy: energy.into(),
            per_bond_parameters: Vec::new(),
            global_parameters: Vec::new(),
            bonds: Vec::new(),
            functions: Vec::new(),
        })
    }

    pub fn particles_per_bond(&self) -> usize {
        self.particles_per_bond
    }

    pub fn energy_function(&self) -> &str {
        &self.energy
    }

    /// Replaces the energy expression. It is not parsed until the force is compiled.
    pub fn set_energy_function(&mut self, energy: impl Into<String>) {
        self.energy = energy.into();
    }

    pub fn num_bonds(&self) -> usize {
        self.bonds.len()
    }

    pub fn num_per_bond_parameters(&self) -> usize {
        self.per_bond_parameters.len()
    }

    pub fn num_global_parameters(&self) -> usize {
        self.global_parameters.len()
    }

    pub fn num_functions(&self) -> usize {
        self.functions.len()
    }

    // Parameter names share one namespace across per-bond and global
    // parameters, and may not look like position variables.
    fn check_parameter_name(&self, name: &str, replacing: Option<&str>) -> BondForceResult<()> {
        if !is_identifier(name) {
            return Err(BondForceError::Validation(format!(
                "'{}' is not a valid parameter name",
                name
            )));
        }
        if parse_position_variable(name).is_some() {
            return Err(BondForceError::Validation(format!(
                "'{}' is reserved for particle coordinates",
                name
            )));
        }
        let taken = self
            .per_bond_parameters
            .iter()
            .map(|p| p.name.as_str())
            .chain(self.global_parameters.iter().map(|p| p.name.as_str()))
            .filter(|&existing| Some(existing) != replacing)
            .any(|existing| existing == name);
        if taken {
            return Err(BondForceError::Validation(format!(
                "a parameter named '{}' already exists",
                name
            )));
        }
        Ok(())
    }

    /// Declares a per-bond parameter and returns its index. Must be called
    /// before any bond is added.
    pub fn add_per_bond_parameter(&mut self, name: impl Into<String>) -> BondForceResult<usize> {
        let name = name.into();
        if !self.bonds.is_empty() {
            return Err(BondForceError::Validation(format!(
                "cannot declare per-bond parameter '{}' after bonds have been added",
                name
            )));
        }
        self.check_parameter_name(&name, None)?;
        self.per_bond_parameters.push(PerBondParameter { name });
        Ok(self.per_bond_parameters.len() - 1)
    }

    pub fn per_bond_parameter_name(&self, index: usize) -> Option<&str> {
        self.per_bond_parameters.get(index).map(|p| p.name.as_str())
    }

    pub fn set_per_bond_parameter_name(&mut self, index: usize, name: impl Into<String>) -> BondForceResult<()> {
        let name = name.into();
        let current = self
            .per_bond_parameters
            .get(index)
            .ok_or_else(|| out_of_range("per-bond parameter", index, self.per_bond_parameters.len()))?
            .name
            .clone();
        self.check_parameter_name(&name, Some(current.as_str()))?;
        self.per_bond_parameters[index].name = name;
        Ok(())
    }

    pub fn per_bond_parameter_names(&self) -> Vec<String> {
        self.per_bond_parameters.iter().map(|p| p.name.clone()).collect()
    }

    /// Declares a global parameter and returns its index.
    pub fn add_global_parameter(&mut self, name: impl Into<String>, default_value: f64) -> BondForceResult<usize> {
        let name = name.into();
        self.check_parameter_name(&name, None)?;
        self.global_parameters.push(GlobalParameter { name, default_value });
        Ok(self.global_parameters.len() - 1)
    }

    pub fn global_parameter(&self, index: usize) -> Option<&GlobalParameter> {
        self.global_parameters.get(index)
    }

    pub fn global_parameter_name(&self, index: usize) -> Option<&str> {
        self.global_parameters.get(index).map(|p| p.name.as_str())
    }

    pub fn set_global_parameter_name(&mut self, index: usize, name: impl Into<String>) -> BondForceResult<()> {
        let name = name.into();
        let current = self
            .global_parameters
            .get(index)
            .ok_or_else(|| out_of_range("global parameter", index, self.global_parameters.len()))?
            .name
            .clone();
        self.check_parameter_name(&name, Some(current.as_str()))?;
        self.global_parameters[index].name = name;
        Ok(())
    }

    pub fn global_parameter_default_value(&self, index: usize) -> Option<f64> {
        self.global_parameters.get(index).map(|p| p.default_value)
    }

    pub fn set_global_parameter_default_value(&mut self, index: usize, value: f64) -> BondForceResult<()> {
        let len = self.global_parameters.len();
        let parameter = self
            .global_parameters
            .get_mut(index)
            .ok_or_else(|| out_of_range("global parameter", index, len))?;
        parameter.default_value = value;
        Ok(())
    }

    pub fn global_parameter_names(&self) -> Vec<String> {
        self.global_parameters.iter().map(|p| p.name.clone()).collect()
    }

    pub fn global_parameters(&self) -> &[GlobalParameter] {
        &self.global_parameters
    }

    fn check_bond(&self, particles: &[usize], parameters: &[f64]) -> BondForceResult<()> {
        if particles.len() != self.particles_per_bond {
            return Err(BondForceError::Validation(format!(
                "bond has {} particles, expected {}",
                particles.len(),
                self.particles_per_bond
            )));
        }
        if parameters.len() != self.per_bond_parameters.len() {
            return Err(BondForceError::Validation(format!(
                "bond has {} parameters, expected {}",
                parameters.len(),
                self.per_bond_parameters.len()
            )));
        }
        Ok(())
    }

    /// Adds a bond. Particle indices are checked against the system size when
    /// a context is created.
    pub fn add_bond(&mut self, particles: &[usize], parameters: &[f64]) -> BondForceResult<BondHandle> {
        self.check_bond(particles, parameters)?;
        self.bonds.push(Bond {
            particles: particles.to_vec(),
            parameters: parameters.to_vec(),
        });
        Ok(BondHandle(self.bonds.len() - 1))
    }

    pub fn bond(&self, handle: BondHandle) -> Option<&Bond> {
        self.bonds.get(handle.0)
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Replaces the particles and parameters of an existing bond.
    pub fn set_bond_parameters(
        &mut self,
        handle: BondHandle,
        particles: &[usize],
        parameters: &[f64],
    ) -> BondForceResult<()> {
        if handle.0 >= self.bonds.len() {
            return Err(out_of_range("bond", handle.0, self.bonds.len()));
        }
        self.check_bond(particles, parameters)?;
        let bond = &mut self.bonds[handle.0];
        bond.particles.clear();
        bond.particles.extend_from_slice(particles);
        bond.parameters.clear();
        bond.parameters.extend_from_slice(parameters);
        Ok(())
    }

    fn check_function_name(&self, name: &str) -> BondForceResult<()> {
        if !is_identifier(name) {
            return Err(BondForceError::Validation(format!(
                "'{}' is not a valid function name",
                name
            )));
        }
        if Func::lookup(name).is_some() || GEOMETRY_FUNCTIONS.contains(&name) {
            return Err(BondForceError::Validation(format!(
                "'{}' is the name of a built-in function",
                name
            )));
        }
        if self.functions.iter().any(|f| f.name == name) {
            return Err(BondForceError::Validation(format!(
                "a tabulated function named '{}' already exists",
                name
            )));
        }
        Ok(())
    }

    /// Registers a tabulated function and returns its index.
    pub fn add_function(&mut self, function: TabulatedFunction) -> BondForceResult<usize> {
        self.check_function_name(&function.name)?;
        function.validate()?;
        self.functions.push(function);
        Ok(self.functions.len() - 1)
    }

    pub fn function(&self, index: usize) -> Option<&TabulatedFunction> {
        self.functions.get(index)
    }

    pub fn functions(&self) -> &[TabulatedFunction] {
        &self.functions
    }

    /// Replaces the samples and domain of a tabulated function, keeping its name.
    pub fn set_function_parameters(
        &mut self,
        index: usize,
        values: Vec<f64>,
        min: f64,
        max: f64,
    ) -> BondForceResult<()> {
        let len = self.functions.len();
        let function = self
            .functions
            .get_mut(index)
            .ok_or_else(|| out_of_range("function", index, len))?;
        let candidate = TabulatedFunction::new(function.name.clone(), values, min, max);
        candidate.validate()?;
        *function = candidate;
        Ok(())
    }

    /// Parses and differentiates the energy expression against the current
    /// declarations.
    pub fn compile(&self) -> BondForceResult<CompiledExpression> {
        compiled::compile(
            &self.energy,
            &self.per_bond_parameter_names(),
            &self.global_parameter_names(),
            &self.functions,
            self.particles_per_bond,
        )
    }
}
