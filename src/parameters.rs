// Parameter tables consulted by the evaluator.
//
// Global parameters are a small named table shared by every bond. Per-bond
// parameters are stored flat, one row of `stride` values per bond.

use indexmap::IndexMap;

use crate::error::{BondForceError, BondForceResult};

/// Runtime values of the global parameters, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalParameters {
    values: IndexMap<String, f64>,
}

impl GlobalParameters {
    pub fn new<I, S>(defaults: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            values: defaults.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn set(&mut self, name: &str, value: f64) -> BondForceResult<()> {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(BondForceError::Validation(format!(
                "unknown global parameter '{}'",
                name
            ))),
        }
    }

    pub fn value(&self, index: usize) -> Option<f64> {
        self.values.get_index(index).map(|(_, v)| *v)
    }

    pub fn set_value(&mut self, index: usize, value: f64) -> BondForceResult<()> {
        let len = self.values.len();
        match self.values.get_index_mut(index) {
            Some((_, slot)) => {
                *slot = value;
                Ok(())
            }
            None => Err(BondForceError::Validation(format!(
                "global parameter index {} out of range (have {})",
                index, len
            ))),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Copies the current values, in slot order, for one evaluation pass.
    pub fn snapshot(&self) -> Vec<f64> {
        self.values.values().copied().collect()
    }
}

/// Per-bond parameter values for every bond, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct BondParameterTable {
    stride: usize,
    num_bonds: usize,
    values: Vec<f64>,
}

impl BondParameterTable {
    /// Builds a table from one row per bond. Every row must hold exactly `stride` values.
    pub fn from_rows<'a, I>(stride: usize, rows: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        let mut values = Vec::new();
        let mut num_bonds = 0;
        for row in rows {
            if row.len() != stride {
                return Err(format!(
                    "bond {} has {} parameters, expected {}",
                    num_bonds,
                    row.len(),
                    stride
                ));
            }
            values.extend_from_slice(row);
            num_bonds += 1;
        }
        Ok(Self {
            stride,
            num_bonds,
            values,
        })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn num_bonds(&self) -> usize {
        self.num_bonds
    }

    #[inline]
    pub fn row(&self, bond: usize) -> &[f64] {
        &self.values[bond * self.stride..(bond + 1) * self.stride]
    }
}
