// Bond topology: which particles each bond acts on.
//
// Particle indices are stored flat with a fixed stride of `particles_per_bond`.
// The topology of a context never changes after it is created; only parameter
// values can be swapped.

use crate::error::{BondForceError, BondForceResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BondTopology {
    particles_per_bond: usize,
    particles: Vec<usize>,
}

impl BondTopology {
    /// Builds the topology and checks every index against the particle system size.
    pub fn new<'a, I>(particles_per_bond: usize, bonds: I, num_particles: usize) -> BondForceResult<Self>
    where
        I: IntoIterator<Item = &'a [usize]>,
    {
        let mut particles = Vec::new();
        for (bond, indices) in bonds.into_iter().enumerate() {
            if indices.len() != particles_per_bond {
                return Err(BondForceError::Validation(format!(
                    "bond {} has {} particles, expected {}",
                    bond,
                    indices.len(),
                    particles_per_bond
                )));
            }
            if let Some(&bad) = indices.iter().find(|&&p| p >= num_particles) {
                return Err(BondForceError::Validation(format!(
                    "bond {} refers to particle {}, but the system has {} particles",
                    bond, bad, num_particles
                )));
            }
            particles.extend_from_slice(indices);
        }
        Ok(Self {
            particles_per_bond,
            particles,
        })
    }

    pub fn particles_per_bond(&self) -> usize {
        self.particles_per_bond
    }

    pub fn num_bonds(&self) -> usize {
        if self.particles_per_bond == 0 {
            0
        } else {
            self.particles.len() / self.particles_per_bond
        }
    }

    #[inline]
    pub fn bond(&self, index: usize) -> &[usize] {
        let n = self.particles_per_bond;
        &self.particles[index * n..(index + 1) * n]
    }

    pub fn bonds(&self) -> impl Iterator<Item = &[usize]> {
        self.particles.chunks_exact(self.particles_per_bond.max(1))
    }
}
