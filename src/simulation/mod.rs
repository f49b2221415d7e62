//! Path construction and path following on a city graph
//!
//! This module contains the whole engine: the read-only map, the shared
//! path node pool, the breadth-first network search, path assembly through
//! buildings, the transition function between path elements and the
//! movement driver. The demo world on top runs headless from the console.

mod assembly;
mod config;
mod curve;
mod error;
mod map;
mod movement;
mod node_pool;
mod search;
mod transition;
mod types;
mod world;

pub use assembly::{common_ancestor, prefix, release_all, Pathfinder};
pub use config::SimConfig;
pub use curve::{CubicCurve, ARC_SAMPLES};
pub use error::{MapError, MapResult, PathError, PathResult};
pub use map::{
    Building, CityMap, CityMapBuilder, Junction, Quadrant, Road, RoadSide, Side, TrafficLight,
};
pub use movement::{begin, Advance, PathFollower, TravelMode, DEFAULT_WALK_SPEED};
pub use node_pool::{NodeIndex, NodePool, PathIter, PathNode};
pub use search::{find_route, Layer, NetworkNode, SearchScratch};
pub use transition::{is_at_segment_end, next_point};
pub use types::{
    AgentId, BuildingId, DirectedPoint, JunctionId, MapElement, Position, Rect, RoadId, SimId,
    DEFAULT_ROAD_WIDTH, MAX_JUNCTION_ROADS, POSITION_EPSILON, SIDEWALK_WIDTH,
};
pub use world::{build_test_map, Agent, SimStats, SimWorld};
