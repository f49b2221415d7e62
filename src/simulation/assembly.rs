//! Path assembly: building prefixes, network search and building suffixes
//!
//! A full vehicle path may start and end inside buildings. Buildings are
//! reduced to the road or junction at the root of their connection tree,
//! the network in between is searched, and the building chains are glued
//! back on either side.

use log::debug;

use super::error::{PathError, PathResult};
use super::map::CityMap;
use super::node_pool::{NodeIndex, NodePool};
use super::search::{find_route, Layer, SearchScratch};
use super::types::{BuildingId, MapElement};

/// Builds paths into a [`NodePool`], reusing its search buffers between requests
#[derive(Debug, Default)]
pub struct Pathfinder {
    scratch: SearchScratch,
    elements: Vec<MapElement>,
}

impl Pathfinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vehicle path between two roads, junctions or buildings
    pub fn connect(
        &mut self,
        map: &CityMap,
        pool: &mut NodePool,
        start: MapElement,
        end: MapElement,
    ) -> PathResult<NodeIndex> {
        self.elements.clear();
        self.plan_vehicle(map, start, end)?;
        self.commit(pool, start, end)
    }

    /// Pedestrian path between two sidewalk elements
    pub fn connect_sidewalk(
        &mut self,
        map: &CityMap,
        pool: &mut NodePool,
        start: MapElement,
        end: MapElement,
    ) -> PathResult<NodeIndex> {
        self.elements.clear();
        self.plan_sidewalk(map, start, end)?;
        self.commit(pool, start, end)
    }

    /// Elements a vehicle path would traverse, without allocating nodes
    pub fn route(
        &mut self,
        map: &CityMap,
        start: MapElement,
        end: MapElement,
    ) -> PathResult<Vec<MapElement>> {
        self.elements.clear();
        self.plan_vehicle(map, start, end)?;
        Ok(self.elements.clone())
    }

    /// Elements a pedestrian path would traverse, without allocating nodes
    pub fn sidewalk_route(
        &mut self,
        map: &CityMap,
        start: MapElement,
        end: MapElement,
    ) -> PathResult<Vec<MapElement>> {
        self.elements.clear();
        self.plan_sidewalk(map, start, end)?;
        Ok(self.elements.clone())
    }

    fn commit(
        &mut self,
        pool: &mut NodePool,
        start: MapElement,
        end: MapElement,
    ) -> PathResult<NodeIndex> {
        let head = pool
            .alloc_chain(&self.elements)?
            .ok_or(PathError::NotReachable {
                from: start,
                to: end,
            })?;
        debug!(
            "Built path {} -> {} with {} nodes ({} in use)",
            start,
            end,
            self.elements.len(),
            pool.in_use()
        );
        Ok(head)
    }

    fn plan_vehicle(&mut self, map: &CityMap, start: MapElement, end: MapElement) -> PathResult<()> {
        for element in [start, end] {
            if element.is_sidewalk() {
                return Err(PathError::InvalidEndpoint(element));
            }
            if !map.contains(element) {
                return Err(PathError::UnknownElement(element));
            }
        }

        if start == end {
            self.elements.push(start);
            return Ok(());
        }

        if let (MapElement::Building(a), MapElement::Building(b)) = (start, end) {
            if let Some(ancestor) = common_ancestor(map, a, b) {
                self.push_through_ancestor(map, a, b, ancestor);
                return Ok(());
            }
        }

        let start_chain = match start {
            MapElement::Building(id) => map.building_chain(id),
            _ => Vec::new(),
        };
        let end_chain = match end {
            MapElement::Building(id) => map.building_chain(id),
            _ => Vec::new(),
        };
        let start_net = network_root(map, start, &start_chain)?;
        let end_net = network_root(map, end, &end_chain)?;

        self.elements
            .extend(start_chain.iter().map(|id| MapElement::Building(*id)));

        if start_net == end_net {
            self.push_shared_root(map, start_net, &start_chain, &end_chain);
        } else {
            find_route(
                map,
                &mut self.scratch,
                Layer::Roadway,
                start_net,
                end_net,
                &mut self.elements,
            )
            .map_err(|err| match err {
                PathError::NotReachable { .. } => PathError::NotReachable {
                    from: start,
                    to: end,
                },
                other => other,
            })?;
        }

        self.elements
            .extend(end_chain.iter().rev().map(|id| MapElement::Building(*id)));
        Ok(())
    }

    fn plan_sidewalk(&mut self, map: &CityMap, start: MapElement, end: MapElement) -> PathResult<()> {
        for element in [start, end] {
            if !element.is_sidewalk() {
                return Err(PathError::InvalidEndpoint(element));
            }
        }
        find_route(
            map,
            &mut self.scratch,
            Layer::Sidewalk,
            start,
            end,
            &mut self.elements,
        )
    }

    /// Down the tree from `a` to the ancestor, then up from it to `b`
    fn push_through_ancestor(
        &mut self,
        map: &CityMap,
        a: BuildingId,
        b: BuildingId,
        ancestor: BuildingId,
    ) {
        for id in map.building_chain(a) {
            self.elements.push(MapElement::Building(id));
            if id == ancestor {
                break;
            }
        }
        let descent: Vec<BuildingId> = map
            .building_chain(b)
            .into_iter()
            .take_while(|id| *id != ancestor)
            .collect();
        self.elements
            .extend(descent.iter().rev().map(|id| MapElement::Building(*id)));
    }

    /// Both ends reduce to the same road or junction
    ///
    /// Two buildings on the same road share its frontage: the road alone is
    /// enough when the destination lies ahead in the exit lane, otherwise the
    /// vehicle turns around at the junction ahead.
    fn push_shared_root(
        &mut self,
        map: &CityMap,
        root: MapElement,
        start_chain: &[BuildingId],
        end_chain: &[BuildingId],
    ) {
        let frontage = match (root, start_chain.last(), end_chain.last()) {
            (MapElement::Road(road_id), Some(from), Some(to)) => map
                .road(road_id)
                .zip(map.building(*from))
                .zip(map.building(*to))
                .map(|((road, from), to)| (road, from, to)),
            _ => None,
        };

        let Some((road, from, to)) = frontage else {
            self.elements.push(root);
            return;
        };

        let lane = road.lane_direction_near(&from.center());
        let forward = lane.dot(&road.direction()) >= 0.0;
        let gap = road.along(&to.connect_point) - road.along(&from.connect_point);
        let ahead = if forward { gap >= 0.0 } else { gap <= 0.0 };

        self.elements.push(root);
        if !ahead {
            let turn_at = road.junctions[if forward { 1 } else { 0 }];
            debug!(
                "Building {} lies behind building {} on {}, turning at junction {}",
                to.id.index(),
                from.id.index(),
                root,
                turn_at.index()
            );
            self.elements.push(MapElement::Junction(turn_at));
            self.elements.push(root);
        }
    }
}

/// Road or junction an endpoint reduces to
fn network_root(
    map: &CityMap,
    element: MapElement,
    chain: &[BuildingId],
) -> PathResult<MapElement> {
    match chain.last() {
        Some(root) => map
            .building(*root)
            .map(|b| b.connect_elem)
            .ok_or(PathError::UnknownElement(MapElement::Building(*root))),
        None => Ok(element),
    }
}

/// Nearest building both `a` and `b` reach by following connection parents
pub fn common_ancestor(map: &CityMap, a: BuildingId, b: BuildingId) -> Option<BuildingId> {
    let height = |id: BuildingId| map.building(id).map(|b| b.connect_tree_height);
    let parent = |id: BuildingId| map.building(id).and_then(|b| b.parent_building());

    let (mut x, mut y) = (a, b);
    while height(x)? > height(y)? {
        x = parent(x)?;
    }
    while height(y)? > height(x)? {
        y = parent(y)?;
    }
    loop {
        if x == y {
            return Some(x);
        }
        x = parent(x)?;
        y = parent(y)?;
    }
}

/// Prepends one element to an existing path without searching
pub fn prefix(pool: &mut NodePool, element: MapElement, head: NodeIndex) -> PathResult<NodeIndex> {
    pool.prepend(element, Some(head))
}

/// Abandons a path, returning all its nodes to the pool
pub fn release_all(pool: &mut NodePool, head: NodeIndex) {
    pool.release_chain(head);
}
