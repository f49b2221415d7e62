//! Settings for the demo simulation

use super::movement::DEFAULT_WALK_SPEED;

/// Knobs for [`SimWorld::create_test_world`](super::SimWorld::create_test_world)
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Junctions per side of the square test grid
    pub grid: usize,
    /// Distance between neighbouring junctions
    pub spacing: f32,
    pub vehicles: usize,
    pub pedestrians: usize,
    /// Nodes shared by every agent's path
    pub pool_capacity: usize,
    /// World units per second
    pub vehicle_speed: f32,
    /// World units per second
    pub walk_speed: f32,
    /// Seed for reproducible runs; `None` draws from the thread RNG
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            grid: 3,
            spacing: 20.0,
            vehicles: 6,
            pedestrians: 4,
            pool_capacity: 512,
            vehicle_speed: 8.0,
            walk_speed: DEFAULT_WALK_SPEED,
            seed: None,
        }
    }
}

impl SimConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
