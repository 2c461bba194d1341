//! Deterministic initial particle state

use crate::population::Population;
use glam::Vec4;
use serde::{Deserialize, Serialize};

/// Deterministic random number generator
pub struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        // LCG constants
        const A: u64 = 1664525;
        const C: u64 = 1013904223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        self.state as u32
    }

    pub fn next_f32(&mut self) -> f32 {
        self.next_u32() as f32 / u32::MAX as f32
    }

    /// Uniform sample in `[-1, 1]`.
    pub fn next_signed(&mut self) -> f32 {
        self.next_f32() * 2.0 - 1.0
    }
}

/// How initial positions are arranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeedLayout {
    /// Regular lattice in the XY plane matching texel layout.
    Grid,
    /// Evenly spaced on the unit circle.
    Ring,
    /// Random points inside the unit cube.
    Cloud,
}

/// Initial `(positions, velocities)` for every texel of the state textures.
///
/// Both vectors have `extent.capacity()` entries. Texels past the population
/// are zero. Positions carry `w = 1`, velocities start at rest.
pub fn initial_state(
    population: &Population,
    layout: SeedLayout,
    seed: u64,
) -> (Vec<Vec4>, Vec<Vec4>) {
    let extent = population.extent();
    let capacity = extent.capacity() as usize;
    let mut positions = vec![Vec4::ZERO; capacity];
    let velocities = vec![Vec4::ZERO; capacity];
    let mut rng = DeterministicRng::new(seed);
    let count = population.count();

    for index in 0..count {
        let texel = population.texel_of(index);
        let position = match layout {
            SeedLayout::Grid => {
                let span = (extent.width.max(extent.height).max(2) - 1) as f32;
                let p = texel.as_vec2() / span * 2.0 - 1.0;
                Vec4::new(p.x, p.y, 0.0, 1.0)
            }
            SeedLayout::Ring => {
                let angle = index as f32 / count as f32 * std::f32::consts::TAU;
                Vec4::new(angle.cos(), angle.sin(), 0.0, 1.0)
            }
            SeedLayout::Cloud => Vec4::new(
                rng.next_signed(),
                rng.next_signed(),
                rng.next_signed(),
                1.0,
            ),
        };
        positions[extent.linear(texel)] = position;
    }

    (positions, velocities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::TextureExtent;

    #[test]
    fn rng_is_deterministic() {
        let mut a = DeterministicRng::new(7);
        let mut b = DeterministicRng::new(7);
        for _ in 0..16 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn unused_texels_stay_zero() {
        let population = Population::new(3, TextureExtent::new(2, 2)).unwrap();
        let (positions, velocities) = initial_state(&population, SeedLayout::Ring, 1);
        assert_eq!(positions.len(), 4);
        assert_eq!(velocities.len(), 4);
        assert_eq!(positions[3], Vec4::ZERO);
        assert!(positions[..3].iter().all(|p| p.w == 1.0));
        assert!(velocities.iter().all(|v| *v == Vec4::ZERO));
    }

    #[test]
    fn cloud_stays_in_unit_cube() {
        let population = Population::new(64, TextureExtent::new(8, 8)).unwrap();
        let (positions, _) = initial_state(&population, SeedLayout::Cloud, 42);
        assert!(positions
            .iter()
            .all(|p| p.x.abs() <= 1.0 && p.y.abs() <= 1.0 && p.z.abs() <= 1.0));
        let (again, _) = initial_state(&population, SeedLayout::Cloud, 42);
        assert_eq!(positions, again);
    }

    #[test]
    fn grid_spans_clip_square() {
        let population = Population::new(4, TextureExtent::new(2, 2)).unwrap();
        let (positions, _) = initial_state(&population, SeedLayout::Grid, 0);
        assert_eq!(positions[0], Vec4::new(-1.0, -1.0, 0.0, 1.0));
        assert_eq!(positions[3], Vec4::new(1.0, 1.0, 0.0, 1.0));
    }
}
