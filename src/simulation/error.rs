//! Error types for map construction and path requests.

use thiserror::Error;

use super::types::{BuildingId, JunctionId, MapElement, RoadId};

/// Errors surfaced to agent controllers by path construction and following.
///
/// None of these are fatal to the simulation: the caller drops the request
/// and tries again later.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    #[error("path node pool exhausted (capacity {capacity})")]
    PoolExhausted { capacity: usize },

    #[error("no route from {from} to {to}")]
    NotReachable { from: MapElement, to: MapElement },

    #[error("no transition rule from {element} to {}", describe_next(.next))]
    InvalidElementPair {
        element: MapElement,
        next: Option<MapElement>,
    },

    #[error("{0} cannot be used as an endpoint for this kind of path")]
    InvalidEndpoint(MapElement),

    #[error("{0} does not exist in this map")]
    UnknownElement(MapElement),
}

fn describe_next(next: &Option<MapElement>) -> String {
    match next {
        Some(element) => element.to_string(),
        None => "end of path".to_string(),
    }
}

pub type PathResult<T> = Result<T, PathError>;

/// Errors produced while building a [`CityMap`](super::map::CityMap).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    #[error("junction {junction:?} would have {count} roads, at most {max} are supported")]
    TooManyRoads {
        junction: JunctionId,
        count: usize,
        max: usize,
    },

    #[error("junction {0:?} not found")]
    UnknownJunction(JunctionId),

    #[error("road {0:?} not found")]
    UnknownRoad(RoadId),

    #[error("building {0:?} not found")]
    UnknownBuilding(BuildingId),

    #[error("{0} cannot be a building connection parent")]
    InvalidParent(MapElement),

    #[error("road between {0:?} and {1:?} has no length")]
    DegenerateRoad(JunctionId, JunctionId),
}

pub type MapResult<T> = Result<T, MapError>;
