//! City map graph: junctions, roads and buildings
//!
//! The map is built once through [`CityMapBuilder`] and is read-only
//! afterwards. Edges between roads and junctions are implicit: a road
//! touches the two junctions it connects, and a junction lists up to
//! [`MAX_JUNCTION_ROADS`] incident roads in clockwise order.

use std::f32::consts::TAU;

use log::debug;
use ordered_float::OrderedFloat;
use petgraph::unionfind::UnionFind;

use super::error::{MapError, MapResult};
use super::types::{
    BuildingId, DirectedPoint, JunctionId, MapElement, Position, Rect, RoadId, SimId,
    DEFAULT_ROAD_WIDTH, MAX_JUNCTION_ROADS, SIDEWALK_WIDTH,
};

/// State of the light controlling one road's entry into a junction
///
/// Written by the traffic-light simulation, read by agent controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrafficLight {
    #[default]
    Green,
    Yellow,
    Red,
}

/// One of the four corners of a junction's sidewalk square, clockwise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    NorthEast,
    SouthEast,
    SouthWest,
    NorthWest,
}

impl Quadrant {
    /// Quadrant of `p` relative to `center`
    pub fn of(center: &Position, p: &Position) -> Quadrant {
        let east = p.x >= center.x;
        let north = p.y >= center.y;
        match (east, north) {
            (true, true) => Quadrant::NorthEast,
            (true, false) => Quadrant::SouthEast,
            (false, false) => Quadrant::SouthWest,
            (false, true) => Quadrant::NorthWest,
        }
    }

    fn signs(self) -> (f32, f32) {
        match self {
            Quadrant::NorthEast => (1.0, 1.0),
            Quadrant::SouthEast => (1.0, -1.0),
            Quadrant::SouthWest => (-1.0, -1.0),
            Quadrant::NorthWest => (-1.0, 1.0),
        }
    }

    /// Two corners are adjacent when they share one side of the square
    pub fn is_adjacent(self, other: Quadrant) -> bool {
        let (ax, ay) = self.signs();
        let (bx, by) = other.signs();
        (ax == bx) != (ay == by)
    }
}

/// Side of a junction square a road leaves from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    North,
    East,
    South,
    West,
}

impl Side {
    /// Side faced by a direction leaving the junction centre
    pub fn from_direction(direction: &Position) -> Side {
        if direction.x.abs() >= direction.y.abs() {
            if direction.x >= 0.0 {
                Side::East
            } else {
                Side::West
            }
        } else if direction.y >= 0.0 {
            Side::North
        } else {
            Side::South
        }
    }

    /// The two sidewalk corners bordering this side
    pub fn corners(self) -> [Quadrant; 2] {
        match self {
            Side::North => [Quadrant::NorthWest, Quadrant::NorthEast],
            Side::East => [Quadrant::NorthEast, Quadrant::SouthEast],
            Side::South => [Quadrant::SouthEast, Quadrant::SouthWest],
            Side::West => [Quadrant::SouthWest, Quadrant::NorthWest],
        }
    }
}

/// Which side of a road's centre line, looking from its first end to its second
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadSide {
    Left,
    Right,
}

/// A junction where up to four roads meet
#[derive(Debug, Clone)]
pub struct Junction {
    pub id: JunctionId,
    pub position: Position,
    /// Side of the square occupied by the junction
    pub size: f32,
    roads: [Option<RoadId>; MAX_JUNCTION_ROADS],
    lights: [TrafficLight; MAX_JUNCTION_ROADS],
    stop_distances: [f32; MAX_JUNCTION_ROADS],
}

impl Junction {
    /// Incident roads in clockwise order, starting from north
    pub fn roads(&self) -> impl Iterator<Item = RoadId> + '_ {
        self.roads.iter().flatten().copied()
    }

    pub fn road_count(&self) -> usize {
        self.roads.iter().flatten().count()
    }

    pub fn road_slot(&self, road: RoadId) -> Option<usize> {
        self.roads.iter().position(|slot| *slot == Some(road))
    }

    pub fn bounds(&self) -> Rect {
        Rect::square(self.position, self.size)
    }

    /// Sidewalk corner in the given quadrant
    pub fn corner(&self, quadrant: Quadrant) -> Position {
        let half = self.size * 0.5 + SIDEWALK_WIDTH * 0.5;
        let (sx, sy) = quadrant.signs();
        Position::new(self.position.x + sx * half, self.position.y + sy * half)
    }

    pub fn quadrant_of(&self, p: &Position) -> Quadrant {
        Quadrant::of(&self.position, p)
    }

    /// Distance before the junction edge at which vehicles arriving on `road` stop
    pub fn stop_distance(&self, road: RoadId) -> f32 {
        self.road_slot(road)
            .map(|slot| self.stop_distances[slot])
            .unwrap_or(0.0)
    }

    pub fn traffic_light(&self, road: RoadId) -> Option<TrafficLight> {
        self.road_slot(road).map(|slot| self.lights[slot])
    }
}

/// A two-way road segment between two junctions
#[derive(Debug, Clone)]
pub struct Road {
    pub id: RoadId,
    pub junctions: [JunctionId; 2],
    /// Where the road meets each junction square
    pub endpoints: [Position; 2],
    pub width: f32,
}

impl Road {
    /// Unit direction from the first endpoint to the second
    pub fn direction(&self) -> Position {
        self.endpoints[0].direction_to(&self.endpoints[1])
    }

    pub fn length(&self) -> f32 {
        self.endpoints[0].distance(&self.endpoints[1])
    }

    /// 0 or 1 for the end touching `junction`
    pub fn end_index(&self, junction: JunctionId) -> Option<usize> {
        self.junctions.iter().position(|j| *j == junction)
    }

    /// Direction of travel towards the given end
    pub fn direction_into(&self, end: usize) -> Position {
        if end == 1 {
            self.direction()
        } else {
            -self.direction()
        }
    }

    /// Distance of a lane centre from the road centre line
    pub fn lane_offset(&self) -> f32 {
        self.width * 0.25
    }

    /// Signed position of `p` projected on the centre line, from the first endpoint
    pub fn along(&self, p: &Position) -> f32 {
        (*p - self.endpoints[0]).dot(&self.direction())
    }

    pub fn midpoint(&self) -> Position {
        self.endpoints[0].lerp(&self.endpoints[1], 0.5)
    }

    /// Point on the lane travelling in `lane_direction`, abreast of `along`
    pub fn lane_point(&self, along: f32, lane_direction: Position) -> DirectedPoint {
        let centre = self.endpoints[0] + self.direction() * along;
        DirectedPoint::new(
            centre + lane_direction.right_normal() * self.lane_offset(),
            lane_direction,
        )
    }

    /// Lane direction whose travel lane lies closest to `p`
    pub fn lane_direction_near(&self, p: &Position) -> Position {
        match self.side_of(p) {
            RoadSide::Right => self.direction(),
            RoadSide::Left => -self.direction(),
        }
    }

    /// Lane direction matching the heading `direction`
    pub fn lane_direction_for(&self, direction: &Position) -> Position {
        if direction.dot(&self.direction()) >= 0.0 {
            self.direction()
        } else {
            -self.direction()
        }
    }

    /// Point where a vehicle coming out of the junction at `end` enters the road
    pub fn enter_point(&self, end: usize) -> DirectedPoint {
        let away = self.direction_into(1 - end);
        DirectedPoint::new(
            self.endpoints[end] + away.right_normal() * self.lane_offset(),
            away,
        )
    }

    /// Point where a vehicle leaves the road into the junction at `end`,
    /// held back by that junction's stop distance
    pub fn leave_point(&self, end: usize, stop_distance: f32) -> DirectedPoint {
        let towards = self.direction_into(end);
        DirectedPoint::new(
            self.endpoints[end] - towards * stop_distance
                + towards.right_normal() * self.lane_offset(),
            towards,
        )
    }

    pub fn side_of(&self, p: &Position) -> RoadSide {
        if self.direction().cross(&(*p - self.endpoints[0])) > 0.0 {
            RoadSide::Left
        } else {
            RoadSide::Right
        }
    }
}

/// A building attached to the road network, directly or through other buildings
#[derive(Debug, Clone)]
pub struct Building {
    pub id: BuildingId,
    pub bounds: Rect,
    /// Parent in the connection forest: a road, a junction or another building
    pub connect_elem: MapElement,
    /// Number of hops to the road network, 1 when `connect_elem` is a road or junction
    pub connect_tree_height: usize,
    /// Door on this building's boundary facing the parent
    pub entrance: Position,
    /// Point on the parent the door connects to
    pub connect_point: Position,
}

impl Building {
    pub fn center(&self) -> Position {
        self.bounds.center()
    }

    pub fn parent_building(&self) -> Option<BuildingId> {
        self.connect_elem.as_building()
    }
}

/// The read-only city graph consumed by the path engine
#[derive(Debug, Clone)]
pub struct CityMap {
    junctions: Vec<Junction>,
    roads: Vec<Road>,
    buildings: Vec<Building>,
    /// Connected component label per junction
    components: Vec<usize>,
}

impl CityMap {
    pub fn junction_count(&self) -> usize {
        self.junctions.len()
    }

    pub fn road_count(&self) -> usize {
        self.roads.len()
    }

    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }

    pub fn junction(&self, id: JunctionId) -> Option<&Junction> {
        self.junctions.get(id.index())
    }

    pub fn road(&self, id: RoadId) -> Option<&Road> {
        self.roads.get(id.index())
    }

    pub fn building(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.get(id.index())
    }

    pub fn junctions(&self) -> &[Junction] {
        &self.junctions
    }

    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    /// Whether the element refers to something in this map
    pub fn contains(&self, element: MapElement) -> bool {
        match element {
            MapElement::Road(id) | MapElement::RoadSidewalk(id) => id.index() < self.roads.len(),
            MapElement::Junction(id) | MapElement::JunctionSidewalk(id) => {
                id.index() < self.junctions.len()
            }
            MapElement::Building(id) => id.index() < self.buildings.len(),
        }
    }

    /// Chain from `building` up the connection forest, ending with the
    /// building attached to the road network
    pub fn building_chain(&self, building: BuildingId) -> Vec<BuildingId> {
        let mut chain = vec![building];
        let mut current = building;
        while let Some(parent) = self.building(current).and_then(Building::parent_building) {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Road or junction at the root of a building's connection tree
    pub fn root_element(&self, building: BuildingId) -> Option<MapElement> {
        let chain = self.building_chain(building);
        let root = chain.last().and_then(|id| self.building(*id))?;
        Some(root.connect_elem)
    }

    /// Whether two elements lie in the same connected part of the road network
    pub fn connected(&self, a: MapElement, b: MapElement) -> bool {
        match (self.component_of(a), self.component_of(b)) {
            (Some(ca), Some(cb)) => ca == cb,
            _ => false,
        }
    }

    fn component_of(&self, element: MapElement) -> Option<usize> {
        match element {
            MapElement::Junction(id) | MapElement::JunctionSidewalk(id) => {
                self.components.get(id.index()).copied()
            }
            MapElement::Road(id) | MapElement::RoadSidewalk(id) => {
                let road = self.road(id)?;
                self.components.get(road.junctions[0].index()).copied()
            }
            MapElement::Building(id) => self.component_of(self.root_element(id)?),
        }
    }

    /// Representative point of an element, used to place agents
    pub fn element_position(&self, element: MapElement) -> Option<Position> {
        match element {
            MapElement::Road(id) | MapElement::RoadSidewalk(id) => {
                self.road(id).map(Road::midpoint)
            }
            MapElement::Junction(id) | MapElement::JunctionSidewalk(id) => {
                self.junction(id).map(|j| j.position)
            }
            MapElement::Building(id) => self.building(id).map(Building::center),
        }
    }

    /// Sidewalk corner of `junction` on the given side of `road`
    pub fn sidewalk_corner(
        &self,
        road: RoadId,
        junction: JunctionId,
        side: RoadSide,
    ) -> Option<Position> {
        let road = self.road(road)?;
        let end = road.end_index(junction)?;
        let junction = self.junction(junction)?;
        let leaving = Side::from_direction(&road.direction_into(1 - end));
        let [first, second] = leaving.corners().map(|q| junction.corner(q));
        let offset = |p: &Position| road.direction().cross(&(*p - road.endpoints[0]));
        let first_is_left = offset(&first) >= offset(&second);
        Some(match (side, first_is_left) {
            (RoadSide::Left, true) | (RoadSide::Right, false) => first,
            _ => second,
        })
    }

    /// Update the light for `road` at `junction`
    pub fn set_traffic_light(
        &mut self,
        junction: JunctionId,
        road: RoadId,
        light: TrafficLight,
    ) -> MapResult<()> {
        let j = self
            .junctions
            .get_mut(junction.index())
            .ok_or(MapError::UnknownJunction(junction))?;
        let slot = j.road_slot(road).ok_or(MapError::UnknownRoad(road))?;
        j.lights[slot] = light;
        Ok(())
    }
}

struct PendingRoad {
    junctions: [JunctionId; 2],
    width: f32,
}

struct PendingBuilding {
    bounds: Rect,
    parent: MapElement,
}

/// Construct a [`CityMap`] incrementally, then call [`build`](Self::build)
///
/// Parents must be added before the buildings connecting to them, which
/// keeps the building forest acyclic.
#[derive(Default)]
pub struct CityMapBuilder {
    junctions: Vec<Position>,
    roads: Vec<PendingRoad>,
    buildings: Vec<PendingBuilding>,
    stop_distances: Vec<(JunctionId, RoadId, f32)>,
}

impl CityMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_junction(&mut self, position: Position) -> JunctionId {
        let id = JunctionId(SimId(self.junctions.len()));
        self.junctions.push(position);
        id
    }

    /// Adds a road of default width between two junctions
    pub fn add_road(&mut self, a: JunctionId, b: JunctionId) -> MapResult<RoadId> {
        self.add_road_with_width(a, b, DEFAULT_ROAD_WIDTH)
    }

    pub fn add_road_with_width(
        &mut self,
        a: JunctionId,
        b: JunctionId,
        width: f32,
    ) -> MapResult<RoadId> {
        let pos_a = *self
            .junctions
            .get(a.index())
            .ok_or(MapError::UnknownJunction(a))?;
        let pos_b = *self
            .junctions
            .get(b.index())
            .ok_or(MapError::UnknownJunction(b))?;

        if a == b || pos_a.same_place(&pos_b) {
            return Err(MapError::DegenerateRoad(a, b));
        }

        for junction in [a, b] {
            let count = self.incident_roads(junction) + 1;
            if count > MAX_JUNCTION_ROADS {
                return Err(MapError::TooManyRoads {
                    junction,
                    count,
                    max: MAX_JUNCTION_ROADS,
                });
            }
        }

        let id = RoadId(SimId(self.roads.len()));
        self.roads.push(PendingRoad {
            junctions: [a, b],
            width,
        });
        Ok(id)
    }

    /// Adds a building whose connection parent is a road, junction or
    /// previously added building
    pub fn add_building(&mut self, bounds: Rect, parent: MapElement) -> MapResult<BuildingId> {
        match parent {
            MapElement::Road(id) if id.index() >= self.roads.len() => {
                return Err(MapError::UnknownRoad(id))
            }
            MapElement::Junction(id) if id.index() >= self.junctions.len() => {
                return Err(MapError::UnknownJunction(id))
            }
            MapElement::Building(id) if id.index() >= self.buildings.len() => {
                return Err(MapError::UnknownBuilding(id))
            }
            MapElement::RoadSidewalk(_) | MapElement::JunctionSidewalk(_) => {
                return Err(MapError::InvalidParent(parent))
            }
            _ => {}
        }

        let id = BuildingId(SimId(self.buildings.len()));
        self.buildings.push(PendingBuilding { bounds, parent });
        Ok(id)
    }

    /// Sets how far before the junction edge vehicles on `road` stop
    pub fn set_stop_distance(
        &mut self,
        junction: JunctionId,
        road: RoadId,
        distance: f32,
    ) -> MapResult<()> {
        let pending = self
            .roads
            .get(road.index())
            .ok_or(MapError::UnknownRoad(road))?;
        if !pending.junctions.contains(&junction) {
            return Err(MapError::UnknownJunction(junction));
        }
        self.stop_distances.push((junction, road, distance));
        Ok(())
    }

    fn incident_roads(&self, junction: JunctionId) -> usize {
        self.roads
            .iter()
            .filter(|road| road.junctions.contains(&junction))
            .count()
    }

    pub fn build(self) -> MapResult<CityMap> {
        let mut junctions: Vec<Junction> = self
            .junctions
            .iter()
            .enumerate()
            .map(|(i, position)| Junction {
                id: JunctionId(SimId(i)),
                position: *position,
                size: 0.0,
                roads: [None; MAX_JUNCTION_ROADS],
                lights: [TrafficLight::default(); MAX_JUNCTION_ROADS],
                stop_distances: [0.0; MAX_JUNCTION_ROADS],
            })
            .collect();

        // A junction square is as wide as its widest road
        for road in &self.roads {
            for j in road.junctions {
                let junction = &mut junctions[j.index()];
                junction.size = junction.size.max(road.width);
            }
        }
        for junction in &mut junctions {
            if junction.size <= 0.0 {
                junction.size = DEFAULT_ROAD_WIDTH;
            }
        }

        let mut roads = Vec::with_capacity(self.roads.len());
        for (i, pending) in self.roads.iter().enumerate() {
            let [a, b] = pending.junctions;
            let ja = &junctions[a.index()];
            let jb = &junctions[b.index()];
            let dir = ja.position.direction_to(&jb.position);
            let endpoints = [
                ja.position + dir * (ja.size * 0.5),
                jb.position - dir * (jb.size * 0.5),
            ];
            if (endpoints[1] - endpoints[0]).dot(&dir) <= 0.0 {
                return Err(MapError::DegenerateRoad(a, b));
            }
            roads.push(Road {
                id: RoadId(SimId(i)),
                junctions: [a, b],
                endpoints,
                width: pending.width,
            });
        }

        // Clockwise slot order, bearing measured from north
        for junction in &mut junctions {
            let mut incident: Vec<(f32, RoadId)> = roads
                .iter()
                .filter_map(|road: &Road| {
                    let end = road.end_index(junction.id)?;
                    let away = road.direction_into(1 - end);
                    Some((away.x.atan2(away.y).rem_euclid(TAU), road.id))
                })
                .collect();
            incident.sort_by_key(|(bearing, _)| OrderedFloat(*bearing));
            for (slot, (_, road)) in incident.into_iter().enumerate() {
                junction.roads[slot] = Some(road);
            }
        }

        for (junction, road, distance) in self.stop_distances {
            let j = &mut junctions[junction.index()];
            if let Some(slot) = j.road_slot(road) {
                j.stop_distances[slot] = distance;
            }
        }

        let mut buildings: Vec<Building> = Vec::with_capacity(self.buildings.len());
        for (i, pending) in self.buildings.iter().enumerate() {
            let center = pending.bounds.center();
            let (connect_point, height) = match pending.parent {
                MapElement::Road(id) => {
                    let road = &roads[id.index()];
                    let along = road.along(&center).clamp(0.0, road.length());
                    (road.endpoints[0] + road.direction() * along, 1)
                }
                MapElement::Junction(id) => {
                    (junctions[id.index()].bounds().boundary_point(&center), 1)
                }
                MapElement::Building(id) => {
                    let parent = &buildings[id.index()];
                    (
                        parent.bounds.boundary_point(&center),
                        parent.connect_tree_height + 1,
                    )
                }
                other => return Err(MapError::InvalidParent(other)),
            };
            buildings.push(Building {
                id: BuildingId(SimId(i)),
                bounds: pending.bounds,
                connect_elem: pending.parent,
                connect_tree_height: height,
                entrance: pending.bounds.boundary_point(&connect_point),
                connect_point,
            });
        }

        let mut union = UnionFind::<usize>::new(junctions.len());
        for road in &roads {
            union.union(road.junctions[0].index(), road.junctions[1].index());
        }
        let components = union.into_labeling();

        debug!(
            "Built city map: {} junctions, {} roads, {} buildings",
            junctions.len(),
            roads.len(),
            buildings.len()
        );

        Ok(CityMap {
            junctions,
            roads,
            buildings,
            components,
        })
    }
}
