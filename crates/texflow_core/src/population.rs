//! Particle population and texel addressing
//!
//! Particle `i` lives at texel `(i % width, i / width)` of every state
//! texture. That mapping is the particle's identity for its whole lifetime.

use crate::config::ConfigError;
use glam::{UVec2, Vec2};

/// Dimensions shared by every state texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureExtent {
    pub width: u32,
    pub height: u32,
}

impl TextureExtent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of texels, i.e. the largest population the texture can hold.
    pub fn capacity(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn contains(&self, texel: UVec2) -> bool {
        texel.x < self.width && texel.y < self.height
    }

    /// Linear raster index of a texel.
    #[inline]
    pub fn linear(&self, texel: UVec2) -> usize {
        texel.y as usize * self.width as usize + texel.x as usize
    }
}

/// A fixed-size homogeneous set of particles mapped onto a state texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Population {
    count: u32,
    extent: TextureExtent,
}

impl Population {
    pub fn new(count: u32, extent: TextureExtent) -> Result<Self, ConfigError> {
        if extent.capacity() == 0 {
            return Err(ConfigError::EmptyExtent {
                width: extent.width,
                height: extent.height,
            });
        }
        if count == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if u64::from(count) > extent.capacity() {
            return Err(ConfigError::PopulationExceedsCapacity {
                count,
                width: extent.width,
                height: extent.height,
            });
        }
        Ok(Self { count, extent })
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[inline]
    pub fn extent(&self) -> TextureExtent {
        self.extent
    }

    pub fn texel_of(&self, index: u32) -> UVec2 {
        debug_assert!(index < self.count);
        UVec2::new(index % self.extent.width, index / self.extent.width)
    }

    /// Particle stored at `texel`, if that texel is inside the population.
    pub fn index_of(&self, texel: UVec2) -> Option<u32> {
        if !self.extent.contains(texel) {
            return None;
        }
        let index = self.extent.linear(texel);
        (index < self.count as usize).then_some(index as u32)
    }

    /// Texel-center UV of particle `index`.
    pub fn uv_of(&self, index: u32) -> Vec2 {
        let texel = self.texel_of(index).as_vec2() + Vec2::splat(0.5);
        texel / Vec2::new(self.extent.width as f32, self.extent.height as f32)
    }

    /// Flattened `[u, v]` pairs, one per particle, in index order.
    pub fn uv_coords(&self) -> Vec<f32> {
        (0..self.count)
            .flat_map(|i| {
                let uv = self.uv_of(i);
                [uv.x, uv.y]
            })
            .collect()
    }
}
