use glam::f64::DVec3;

use crate::context::BondContext;

/// Trait for force field implementations.
///
/// A force field computes the potential energy and its gradient (negative force)
/// for a set of particle positions.
pub trait ForceField {
    /// Compute the total energy and per-particle gradients for the given positions.
    ///
    /// # Arguments
    ///
    /// * `positions` - Flat array of coordinates [x0, y0, z0, x1, y1, z1, ...]
    /// * `energy` - Output: total potential energy
    /// * `gradients` - Output: gradient array (same layout as positions), dE/dx_i
    fn energy_and_gradients(&self, positions: &[f64], energy: &mut f64, gradients: &mut [f64]);
}

impl ForceField for BondContext {
    /// Panics if `positions` or `gradients` does not hold `3 * num_particles` values.
    fn energy_and_gradients(&self, positions: &[f64], energy: &mut f64, gradients: &mut [f64]) {
        let n = self.num_particles();
        assert_eq!(positions.len(), 3 * n, "positions length mismatch");
        assert_eq!(gradients.len(), 3 * n, "gradients length mismatch");

        let points: Vec<DVec3> = positions.chunks_exact(3).map(DVec3::from_slice).collect();
        let mut forces = vec![DVec3::ZERO; n];
        *energy = self
            .calc_forces_and_energy_into(&points, &mut forces)
            .expect("position and force buffers hold num_particles entries");
        for (g, f) in gradients.chunks_exact_mut(3).zip(&forces) {
            g[0] = -f.x;
            g[1] = -f.y;
            g[2] = -f.z;
        }
    }
}
