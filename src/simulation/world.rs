//! Demo world that drives agents around a generated grid city
//!
//! This is the entry point for running the path engine headless: it owns
//! the map, the node pool and the agents, hands out random trips and
//! advances everyone once per tick.

use anyhow::{Context, Result};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

use super::assembly::Pathfinder;
use super::config::SimConfig;
use super::error::{MapResult, PathError};
use super::map::{CityMap, CityMapBuilder, Quadrant};
use super::movement::{begin, PathFollower, TravelMode};
use super::node_pool::NodePool;
use super::types::{
    AgentId, DirectedPoint, JunctionId, MapElement, Position, Rect, SimId, DEFAULT_ROAD_WIDTH,
    SIDEWALK_WIDTH,
};

/// Side of the square buildings placed by the test map
const BUILDING_SIZE: f32 = 4.0;

/// One moving agent
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    pub follower: PathFollower,
    /// Distance per second for vehicles; unused for pedestrians, which move by time
    pub speed: f32,
    /// Completed trips
    pub trips: usize,
}

/// Counters reported by [`SimWorld::stats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimStats {
    pub paths_built: usize,
    pub arrivals: usize,
    pub not_reachable: usize,
    pub pool_exhausted: usize,
    /// Invalid pairs, endpoints or unknown elements
    pub other_failures: usize,
    pub nodes_in_use: usize,
    pub pool_capacity: usize,
}

impl SimStats {
    pub fn failures(&self) -> usize {
        self.not_reachable + self.pool_exhausted + self.other_failures
    }
}

/// The main simulation world
pub struct SimWorld {
    pub map: CityMap,
    pub pool: NodePool,
    pub agents: Vec<Agent>,
    /// Simulation time in seconds
    pub time: f32,
    pathfinder: Pathfinder,
    /// Optional seeded RNG for reproducible simulations
    rng: Option<StdRng>,
    stats: SimStats,
    next_id: usize,
}

impl SimWorld {
    fn new_internal(map: CityMap, pool_capacity: usize, rng: Option<StdRng>) -> Self {
        Self {
            map,
            pool: NodePool::new(pool_capacity),
            agents: Vec::new(),
            time: 0.0,
            pathfinder: Pathfinder::new(),
            rng,
            stats: SimStats::default(),
            next_id: 0,
        }
    }

    pub fn new(map: CityMap, pool_capacity: usize) -> Self {
        Self::new_internal(map, pool_capacity, None)
    }

    /// Create a new SimWorld with a seeded RNG for reproducible simulations
    pub fn new_with_seed(map: CityMap, pool_capacity: usize, seed: u64) -> Self {
        Self::new_internal(map, pool_capacity, Some(StdRng::seed_from_u64(seed)))
    }

    /// Choose a random element from a slice, using seeded RNG if available
    fn choose_random<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            return None;
        }
        match &mut self.rng {
            Some(rng) => slice.choose(rng),
            None => slice.choose(&mut rand::rng()),
        }
    }

    fn next_agent_id(&mut self) -> AgentId {
        let id = AgentId(SimId(self.next_id));
        self.next_id += 1;
        id
    }

    /// Places a vehicle inside a building, on a road or in a junction
    pub fn add_vehicle(&mut self, at: MapElement, speed: f32) -> Result<AgentId> {
        if at.is_sidewalk() {
            anyhow::bail!("vehicles cannot start on {}", at);
        }
        let position = self
            .map
            .element_position(at)
            .with_context(|| format!("{} is not part of the map", at))?;
        let id = self.next_agent_id();
        let point = DirectedPoint::new(position, Position::ZERO);
        self.agents.push(Agent {
            id,
            follower: PathFollower::new(TravelMode::Vehicle, at, point),
            speed,
            trips: 0,
        });
        Ok(id)
    }

    /// Places a pedestrian on a road or junction sidewalk
    pub fn add_pedestrian(&mut self, at: MapElement, walk_speed: f32) -> Result<AgentId> {
        let point = self
            .sidewalk_point(at)
            .with_context(|| format!("{} is not a sidewalk of this map", at))?;
        let id = self.next_agent_id();
        self.agents.push(Agent {
            id,
            follower: PathFollower::new(TravelMode::Pedestrian, at, point)
                .with_walk_speed(walk_speed),
            speed: walk_speed,
            trips: 0,
        });
        Ok(id)
    }

    /// Standing point on a sidewalk: right of a road's midpoint, or a
    /// junction's north-east corner
    fn sidewalk_point(&self, element: MapElement) -> Option<DirectedPoint> {
        match element {
            MapElement::RoadSidewalk(id) => {
                let road = self.map.road(id)?;
                let offset = road.width * 0.5 + SIDEWALK_WIDTH * 0.5;
                Some(DirectedPoint::new(
                    road.midpoint() + road.direction().right_normal() * offset,
                    road.direction(),
                ))
            }
            MapElement::JunctionSidewalk(id) => {
                let junction = self.map.junction(id)?;
                Some(DirectedPoint::new(
                    junction.corner(Quadrant::NorthEast),
                    Position::ZERO,
                ))
            }
            _ => None,
        }
    }

    /// Everything a vehicle can drive to
    fn vehicle_destinations(&self) -> Vec<MapElement> {
        let buildings = self.map.buildings().iter().map(|b| MapElement::Building(b.id));
        let roads = self.map.roads().iter().map(|r| MapElement::Road(r.id));
        let junctions = self.map.junctions().iter().map(|j| MapElement::Junction(j.id));
        buildings.chain(roads).chain(junctions).collect()
    }

    fn sidewalk_destinations(&self) -> Vec<MapElement> {
        let roads = self.map.roads().iter().map(|r| MapElement::RoadSidewalk(r.id));
        let junctions = self
            .map
            .junctions()
            .iter()
            .map(|j| MapElement::JunctionSidewalk(j.id));
        roads.chain(junctions).collect()
    }

    /// Sends an idle agent to `destination`
    pub fn send_agent(&mut self, index: usize, destination: MapElement) -> Result<(), PathError> {
        let Some(agent) = self.agents.get_mut(index) else {
            return Ok(());
        };
        let from = agent.follower.element();
        let head = match agent.follower.mode() {
            TravelMode::Vehicle => {
                self.pathfinder
                    .connect(&self.map, &mut self.pool, from, destination)?
            }
            TravelMode::Pedestrian => {
                self.pathfinder
                    .connect_sidewalk(&self.map, &mut self.pool, from, destination)?
            }
        };
        begin(&mut agent.follower, &self.map, &mut self.pool, head)?;
        self.stats.paths_built += 1;
        debug!(
            "Agent {} heading from {} to {}",
            agent.id.0 .0, from, destination
        );
        Ok(())
    }

    fn plan_trip(&mut self, index: usize) {
        let Some(agent) = self.agents.get(index) else {
            return;
        };
        let (id, mode, from) = (agent.id, agent.follower.mode(), agent.follower.element());
        let candidates = match mode {
            TravelMode::Vehicle => self.vehicle_destinations(),
            TravelMode::Pedestrian => self.sidewalk_destinations(),
        };
        let Some(&destination) = self.choose_random(&candidates) else {
            return;
        };
        if destination == from {
            return;
        }
        if let Err(err) = self.send_agent(index, destination) {
            self.record_failure(id, &err);
        }
    }

    fn record_failure(&mut self, agent: AgentId, err: &PathError) {
        match err {
            PathError::NotReachable { .. } => self.stats.not_reachable += 1,
            PathError::PoolExhausted { .. } => self.stats.pool_exhausted += 1,
            _ => self.stats.other_failures += 1,
        }
        warn!("Agent {} has no usable path: {}", agent.0 .0, err);
    }

    /// Run one simulation tick
    pub fn tick(&mut self, delta_secs: f32) {
        self.time += delta_secs;

        for index in 0..self.agents.len() {
            if !self.agents[index].follower.is_travelling() {
                self.plan_trip(index);
            }

            let agent = &mut self.agents[index];
            if !agent.follower.is_travelling() {
                continue;
            }
            let budget = match agent.follower.mode() {
                TravelMode::Vehicle => agent.speed * delta_secs,
                TravelMode::Pedestrian => delta_secs,
            };
            match agent.follower.advance(&self.map, &mut self.pool, budget) {
                Ok(step) => {
                    if step.arrived {
                        agent.trips += 1;
                        self.stats.arrivals += 1;
                        debug!(
                            "Agent {} arrived on {}",
                            agent.id.0 .0,
                            agent.follower.element()
                        );
                    }
                }
                Err(err) => {
                    agent.follower.abandon(&mut self.pool);
                    let id = agent.id;
                    self.record_failure(id, &err);
                }
            }
        }
    }

    pub fn stats(&self) -> SimStats {
        SimStats {
            nodes_in_use: self.pool.in_use(),
            pool_capacity: self.pool.capacity(),
            ..self.stats.clone()
        }
    }

    /// Build a grid city with agents, as configured
    pub fn create_test_world(config: &SimConfig) -> Result<Self> {
        let map = build_test_map(config.grid, config.spacing)
            .context("Failed to build the test city map")?;
        let mut world = match config.seed {
            Some(seed) => Self::new_with_seed(map, config.pool_capacity, seed),
            None => Self::new(map, config.pool_capacity),
        };

        let homes: Vec<MapElement> = world
            .map
            .buildings()
            .iter()
            .map(|b| MapElement::Building(b.id))
            .collect();
        for _ in 0..config.vehicles {
            let Some(&home) = world.choose_random(&homes) else {
                break;
            };
            world.add_vehicle(home, config.vehicle_speed)?;
        }

        let sidewalks = world.sidewalk_destinations();
        for _ in 0..config.pedestrians {
            let Some(&start) = world.choose_random(&sidewalks) else {
                break;
            };
            world.add_pedestrian(start, config.walk_speed)?;
        }

        Ok(world)
    }

    /// Print a summary of the current simulation state
    pub fn print_summary(&self) {
        let stats = self.stats();
        println!("=== City Paths Summary ===");
        println!("Time: {:.2}s", self.time);
        println!(
            "Junctions: {}, Roads: {}, Buildings: {}",
            self.map.junction_count(),
            self.map.road_count(),
            self.map.building_count()
        );
        println!(
            "Agents: {} ({} travelling)",
            self.agents.len(),
            self.agents.iter().filter(|a| a.follower.is_travelling()).count()
        );
        println!(
            "Pool: {}/{} nodes in use",
            stats.nodes_in_use, stats.pool_capacity
        );
        println!(
            "Paths built: {}, Arrivals: {}",
            stats.paths_built, stats.arrivals
        );
        println!(
            "Failures: not reachable={}, pool exhausted={}, other={}",
            stats.not_reachable, stats.pool_exhausted, stats.other_failures
        );
        println!();

        println!("--- Agents ---");
        for agent in &self.agents {
            let point = agent.follower.point();
            println!(
                "  Agent {} ({:?}) on {} at ({:.1}, {:.1}), path nodes={}, trips={}",
                agent.id.0 .0,
                agent.follower.mode(),
                agent.follower.element(),
                point.position.x,
                point.position.y,
                self.pool.chain_len(agent.follower.head()),
                agent.trips
            );
        }
    }

    /// Draw an ASCII map of the city and the agents' remaining paths
    pub fn draw_map(&self) {
        let mut min = Position::new(f32::INFINITY, f32::INFINITY);
        let mut max = Position::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
        let corners = self
            .map
            .junctions()
            .iter()
            .map(|j| j.position)
            .chain(self.map.buildings().iter().flat_map(|b| [b.bounds.min, b.bounds.max]));
        for p in corners {
            min = Position::new(min.x.min(p.x), min.y.min(p.y));
            max = Position::new(max.x.max(p.x), max.y.max(p.y));
        }
        if !min.x.is_finite() {
            return;
        }

        // Half a character per world unit, with padding
        let scale = 0.5;
        min = min - Position::new(2.0, 2.0);
        max = max + Position::new(2.0, 2.0);
        let width = (((max.x - min.x) * scale) as usize).max(1);
        let height = (((max.y - min.y) * scale) as usize).max(1);
        let mut grid = vec![vec![' '; width]; height];

        // Rows grow downwards, so y is flipped
        let to_grid = |p: &Position| -> (usize, usize) {
            let col = ((p.x - min.x).max(0.0) * scale) as usize;
            let row = ((max.y - p.y).max(0.0) * scale) as usize;
            (row.min(height - 1), col.min(width - 1))
        };

        for road in self.map.roads() {
            let (start_row, start_col) = to_grid(&road.endpoints[0]);
            let (end_row, end_col) = to_grid(&road.endpoints[1]);

            let dx = (end_col as i32 - start_col as i32).abs();
            let dy = (end_row as i32 - start_row as i32).abs();
            let sx = if start_col < end_col { 1 } else { -1 };
            let sy = if start_row < end_row { 1 } else { -1 };

            let mut err = dx - dy;
            let mut x = start_col as i32;
            let mut y = start_row as i32;

            loop {
                if x >= 0 && x < width as i32 && y >= 0 && y < height as i32 {
                    let cell = &mut grid[y as usize][x as usize];
                    if *cell == ' ' {
                        *cell = '#';
                    }
                }

                if x == end_col as i32 && y == end_row as i32 {
                    break;
                }

                let e2 = 2 * err;
                if e2 > -dy {
                    err -= dy;
                    x += sx;
                }
                if e2 < dx {
                    err += dx;
                    y += sy;
                }
            }
        }

        for agent in &self.agents {
            if let Ok(points) = agent.follower.path_points(&self.map, &self.pool, 4) {
                for point in points {
                    let (row, col) = to_grid(&point.position);
                    if grid[row][col] == ' ' {
                        grid[row][col] = '.';
                    }
                }
            }
        }

        for junction in self.map.junctions() {
            let (row, col) = to_grid(&junction.position);
            grid[row][col] = '+';
        }
        for building in self.map.buildings() {
            let (row, col) = to_grid(&building.center());
            grid[row][col] = 'B';
        }
        for agent in &self.agents {
            let (row, col) = to_grid(&agent.follower.point().position);
            grid[row][col] = match agent.follower.mode() {
                TravelMode::Vehicle => 'V',
                TravelMode::Pedestrian => 'p',
            };
        }

        println!("\n=== City Map ===");
        println!("Legend: B=Building, +=Junction, #=Road, V=Vehicle, p=Pedestrian, .=Path");
        println!();
        for row in grid {
            let line: String = row.into_iter().collect();
            println!("{}", line.trim_end());
        }
        println!();
    }
}

/// Square grid of `grid` x `grid` junctions `spacing` apart
///
/// Every road gets a building on alternating sides. The first building has
/// a child and a grandchild behind it, and the first junction has a building
/// of its own off the corner of the grid.
pub fn build_test_map(grid: usize, spacing: f32) -> MapResult<CityMap> {
    let grid = grid.max(2);
    let mut builder = CityMapBuilder::new();

    let position = |col: usize, row: usize| {
        Position::new(col as f32 * spacing, row as f32 * spacing)
    };
    let mut junctions: Vec<JunctionId> = Vec::with_capacity(grid * grid);
    for row in 0..grid {
        for col in 0..grid {
            junctions.push(builder.add_junction(position(col, row)));
        }
    }
    let at = |col: usize, row: usize| junctions[row * grid + col];

    let mut roads = Vec::new();
    for row in 0..grid {
        for col in 0..grid {
            if col + 1 < grid {
                let id = builder.add_road(at(col, row), at(col + 1, row))?;
                roads.push((id, position(col, row), position(col + 1, row)));
            }
            if row + 1 < grid {
                let id = builder.add_road(at(col, row), at(col, row + 1))?;
                roads.push((id, position(col, row), position(col, row + 1)));
            }
        }
    }

    // Clear of the road surface and its sidewalk
    let setback = DEFAULT_ROAD_WIDTH * 0.5 + SIDEWALK_WIDTH + BUILDING_SIZE * 0.5 + 1.0;
    let mut first = None;
    for (i, (road, from, to)) in roads.iter().enumerate() {
        let side = if i % 2 == 0 { 1.0 } else { -1.0 };
        let normal = from.direction_to(to).right_normal() * side;
        let center = from.lerp(to, 0.5) + normal * setback;
        let building =
            builder.add_building(Rect::square(center, BUILDING_SIZE), MapElement::Road(*road))?;
        if first.is_none() {
            first = Some((building, center, normal));
        }
    }

    if let Some((parent, center, normal)) = first {
        let child_center = center + normal * (BUILDING_SIZE + 2.0);
        let child = builder.add_building(
            Rect::square(child_center, BUILDING_SIZE),
            MapElement::Building(parent),
        )?;
        let across = normal.right_normal();
        builder.add_building(
            Rect::square(child_center + across * (BUILDING_SIZE + 2.0), BUILDING_SIZE),
            MapElement::Building(child),
        )?;
    }

    let offset = DEFAULT_ROAD_WIDTH + BUILDING_SIZE;
    builder.add_building(
        Rect::square(Position::new(-offset, -offset), BUILDING_SIZE),
        MapElement::Junction(at(0, 0)),
    )?;

    builder.build()
}
