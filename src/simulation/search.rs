//! Breadth-first search over the implicit road/junction graph
//!
//! Roads and junctions are the nodes; a road is adjacent to its two
//! junctions. The same search serves the vehicle layer and the sidewalk
//! layer, which share the topology and differ only in element tags.

use log::{debug, trace};

use super::error::{PathError, PathResult};
use super::map::CityMap;
use super::types::{JunctionId, MapElement, RoadId};

/// Which element tags a search produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Roadway,
    Sidewalk,
}

/// A node of the search graph, independent of layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkNode {
    Road(RoadId),
    Junction(JunctionId),
}

impl Layer {
    pub fn element(self, node: NetworkNode) -> MapElement {
        match (self, node) {
            (Layer::Roadway, NetworkNode::Road(id)) => MapElement::Road(id),
            (Layer::Roadway, NetworkNode::Junction(id)) => MapElement::Junction(id),
            (Layer::Sidewalk, NetworkNode::Road(id)) => MapElement::RoadSidewalk(id),
            (Layer::Sidewalk, NetworkNode::Junction(id)) => MapElement::JunctionSidewalk(id),
        }
    }

    /// Search node for an element of this layer
    pub fn node(self, element: MapElement) -> Option<NetworkNode> {
        match (self, element) {
            (Layer::Roadway, MapElement::Road(id)) | (Layer::Sidewalk, MapElement::RoadSidewalk(id)) => {
                Some(NetworkNode::Road(id))
            }
            (Layer::Roadway, MapElement::Junction(id))
            | (Layer::Sidewalk, MapElement::JunctionSidewalk(id)) => {
                Some(NetworkNode::Junction(id))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Visit {
    node: NetworkNode,
    /// Index in the visit list of the node that discovered this one
    source: Option<usize>,
}

/// Reusable buffers for [`find_route`]
///
/// Marker arrays are resized to the map and cleared at the start of each
/// search, so one scratch can serve any number of searches.
#[derive(Debug, Default)]
pub struct SearchScratch {
    road_seen: Vec<bool>,
    junction_seen: Vec<bool>,
    visits: Vec<Visit>,
}

impl SearchScratch {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self, map: &CityMap) {
        self.road_seen.clear();
        self.road_seen.resize(map.road_count(), false);
        self.junction_seen.clear();
        self.junction_seen.resize(map.junction_count(), false);
        self.visits.clear();
    }

    /// Marks a node as seen, returning false if it already was
    fn mark(&mut self, node: NetworkNode) -> bool {
        let seen = match node {
            NetworkNode::Road(id) => &mut self.road_seen[id.index()],
            NetworkNode::Junction(id) => &mut self.junction_seen[id.index()],
        };
        !std::mem::replace(seen, true)
    }

    /// Walks source indices back from `last` and writes the route in order
    fn recover(&self, last: usize, layer: Layer, route: &mut Vec<MapElement>) {
        let first = route.len();
        let mut cursor = Some(last);
        while let Some(index) = cursor {
            let visit = self.visits[index];
            route.push(layer.element(visit.node));
            cursor = visit.source;
        }
        route[first..].reverse();
    }
}

/// Fewest-hop route between two road-network elements of one layer
///
/// Appends the route, both ends included, to `route`. Among routes with
/// the same hop count the first one found wins, visiting a junction's roads
/// in clockwise slot order and a road's junctions first-to-second; it is
/// not necessarily the geometrically shortest.
pub fn find_route(
    map: &CityMap,
    scratch: &mut SearchScratch,
    layer: Layer,
    start: MapElement,
    end: MapElement,
    route: &mut Vec<MapElement>,
) -> PathResult<()> {
    let start_node = layer.node(start).ok_or(PathError::InvalidEndpoint(start))?;
    let end_node = layer.node(end).ok_or(PathError::InvalidEndpoint(end))?;
    if !map.contains(start) {
        return Err(PathError::UnknownElement(start));
    }
    if !map.contains(end) {
        return Err(PathError::UnknownElement(end));
    }

    if start_node == end_node {
        route.push(start);
        return Ok(());
    }

    if !map.connected(start, end) {
        debug!("{} and {} are in different network components", start, end);
        return Err(PathError::NotReachable {
            from: start,
            to: end,
        });
    }

    scratch.reset(map);
    scratch.mark(start_node);
    scratch.visits.push(Visit {
        node: start_node,
        source: None,
    });

    let mut cursor = 0;
    let mut neighbours = Vec::with_capacity(4);
    while cursor < scratch.visits.len() {
        let current = scratch.visits[cursor].node;

        neighbours.clear();
        match current {
            NetworkNode::Junction(id) => {
                if let Some(junction) = map.junction(id) {
                    neighbours.extend(junction.roads().map(NetworkNode::Road));
                }
            }
            NetworkNode::Road(id) => {
                if let Some(road) = map.road(id) {
                    neighbours.extend(road.junctions.iter().copied().map(NetworkNode::Junction));
                }
            }
        }

        for &neighbour in &neighbours {
            if !scratch.mark(neighbour) {
                continue;
            }
            scratch.visits.push(Visit {
                node: neighbour,
                source: Some(cursor),
            });
            if neighbour == end_node {
                let last = scratch.visits.len() - 1;
                scratch.recover(last, layer, route);
                trace!(
                    "Found route {} -> {} after {} visits",
                    start,
                    end,
                    scratch.visits.len()
                );
                return Ok(());
            }
        }

        cursor += 1;
    }

    Err(PathError::NotReachable {
        from: start,
        to: end,
    })
}
