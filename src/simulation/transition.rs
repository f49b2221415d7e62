//! Hand-off points between consecutive path elements
//!
//! [`next_point`] answers "where does an agent standing at `current` on
//! `element` go next to get onto `next`". Some pairs need two legs (leave a
//! building through its door, then drive onto the road); the function
//! always returns the leg that starts from where the agent is, so an agent
//! has reached the hand-off once the answer equals its own position.

use super::error::{PathError, PathResult};
use super::map::{Building, CityMap, Junction, Road, Side};
use super::types::{
    BuildingId, DirectedPoint, JunctionId, MapElement, MapElement as E, Position, RoadId,
};

/// Next target for an agent at `current` on `element`, heading for `next`
/// (`None` on the last element of a path)
pub fn next_point(
    map: &CityMap,
    current: &DirectedPoint,
    element: MapElement,
    next: Option<MapElement>,
) -> PathResult<DirectedPoint> {
    let invalid = || PathError::InvalidElementPair { element, next };

    match (element, next) {
        (E::Road(r), Some(E::Junction(j))) => {
            let road = road(map, r)?;
            let end = road.end_index(j).ok_or_else(invalid)?;
            let stop = junction(map, j)?.stop_distance(r);
            Ok(road.leave_point(end, stop))
        }
        (E::Junction(j), Some(E::Road(r))) => {
            let road = road(map, r)?;
            let end = road.end_index(j).ok_or_else(invalid)?;
            Ok(road.enter_point(end))
        }
        (E::Road(r), Some(E::Building(b))) => {
            let road = road(map, r)?;
            let building = building(map, b)?;
            if building.connect_elem != element {
                return Err(invalid());
            }
            Ok(road_to_building(road, building, current))
        }
        (E::Junction(j), Some(E::Building(b))) => {
            let building = building(map, b)?;
            if building.connect_elem != E::Junction(j) {
                return Err(invalid());
            }
            let door = DirectedPoint::facing_from(&building.connect_point, building.entrance);
            if current.same_place(&door) || current.position.same_place(&building.connect_point) {
                Ok(door)
            } else {
                Ok(towards(current, building.connect_point))
            }
        }
        (E::Building(b), Some(E::Road(r))) => {
            let road = road(map, r)?;
            let building = building(map, b)?;
            if building.connect_elem != E::Road(r) {
                return Err(invalid());
            }
            let lane = road.lane_direction_near(&building.center());
            let target = road.lane_point(road.along(&building.connect_point), lane);
            Ok(leave_building(building, current, target))
        }
        (E::Building(b), Some(E::Junction(j))) => {
            let building = building(map, b)?;
            if building.connect_elem != E::Junction(j) {
                return Err(invalid());
            }
            let target =
                DirectedPoint::facing_from(&building.entrance, building.connect_point);
            Ok(leave_building(building, current, target))
        }
        (E::Building(a), Some(E::Building(b))) => {
            let from = building(map, a)?;
            let to = building(map, b)?;
            Ok(building_to_building(from, to, current))
        }
        (E::Road(r), None) => {
            let road = road(map, r)?;
            Ok(park_on_road(road, current))
        }
        (E::Junction(j), None) => Ok(towards(current, junction(map, j)?.position)),
        (E::Building(b), None) => Ok(towards(current, building(map, b)?.center())),
        (E::RoadSidewalk(r), Some(E::JunctionSidewalk(j))) => {
            let road = road(map, r)?;
            road.end_index(j).ok_or_else(invalid)?;
            let corner = map
                .sidewalk_corner(r, j, road.side_of(&current.position))
                .ok_or_else(invalid)?;
            Ok(towards(current, corner))
        }
        (E::JunctionSidewalk(j), Some(E::RoadSidewalk(r))) => {
            let road = road(map, r)?;
            let junction = junction(map, j)?;
            let end = road.end_index(j).ok_or_else(invalid)?;
            Ok(cross_to_road_side(junction, road, end, current))
        }
        (E::RoadSidewalk(r), None) => {
            let road = road(map, r)?;
            let side = road.side_of(&current.position);
            let [a, b] = road.junctions;
            let first = map.sidewalk_corner(r, a, side).ok_or_else(invalid)?;
            let second = map.sidewalk_corner(r, b, side).ok_or_else(invalid)?;
            Ok(towards(current, first.lerp(&second, 0.5)))
        }
        (E::JunctionSidewalk(j), None) => {
            let junction = junction(map, j)?;
            let corner = junction.corner(junction.quadrant_of(&current.position));
            Ok(towards(current, corner))
        }
        (E::Road(_), Some(E::Road(_) | E::RoadSidewalk(_) | E::JunctionSidewalk(_)))
        | (E::Junction(_), Some(E::Junction(_) | E::RoadSidewalk(_) | E::JunctionSidewalk(_)))
        | (E::Building(_), Some(E::RoadSidewalk(_) | E::JunctionSidewalk(_)))
        | (
            E::RoadSidewalk(_),
            Some(E::Road(_) | E::Junction(_) | E::Building(_) | E::RoadSidewalk(_)),
        )
        | (
            E::JunctionSidewalk(_),
            Some(E::Road(_) | E::Junction(_) | E::Building(_) | E::JunctionSidewalk(_)),
        ) => {
            Err(invalid())
        }
    }
}

/// Whether an agent at `current` has reached the hand-off onto `next`
pub fn is_at_segment_end(
    map: &CityMap,
    current: &DirectedPoint,
    element: MapElement,
    next: Option<MapElement>,
) -> PathResult<bool> {
    Ok(next_point(map, current, element, next)?.same_place(current))
}

fn road(map: &CityMap, id: RoadId) -> PathResult<&Road> {
    map.road(id)
        .ok_or(PathError::UnknownElement(MapElement::Road(id)))
}

fn junction(map: &CityMap, id: JunctionId) -> PathResult<&Junction> {
    map.junction(id)
        .ok_or(PathError::UnknownElement(MapElement::Junction(id)))
}

fn building(map: &CityMap, id: BuildingId) -> PathResult<&Building> {
    map.building(id)
        .ok_or(PathError::UnknownElement(MapElement::Building(id)))
}

/// Straight towards `target`, keeping the current heading once there
fn towards(current: &DirectedPoint, target: Position) -> DirectedPoint {
    if current.position.same_place(&target) {
        DirectedPoint::new(target, current.direction)
    } else {
        DirectedPoint::facing_from(&current.position, target)
    }
}

/// Lane the agent drives in, from its heading or else its position
fn current_lane(road: &Road, current: &DirectedPoint) -> Position {
    if current.direction.length() > 0.0 {
        road.lane_direction_for(&current.direction)
    } else {
        road.lane_direction_near(&current.position)
    }
}

/// Door first, then `target` outside
fn leave_building(
    building: &Building,
    current: &DirectedPoint,
    target: DirectedPoint,
) -> DirectedPoint {
    if current.same_place(&target) || current.position.same_place(&building.entrance) {
        target
    } else {
        let outwards = target.position - building.entrance;
        DirectedPoint::new(building.entrance, outwards)
    }
}

/// Stay in lane until abreast of the connector, then turn in to the door
fn road_to_building(road: &Road, building: &Building, current: &DirectedPoint) -> DirectedPoint {
    let lane = current_lane(road, current);
    let abreast = road.lane_point(road.along(&building.connect_point), lane);
    let door = DirectedPoint::facing_from(&abreast.position, building.entrance);
    if current.position.same_place(&building.entrance) || current.same_place(&abreast) {
        door
    } else {
        abreast
    }
}

/// Final stop on a road: in the current lane, no earlier than halfway
fn park_on_road(road: &Road, current: &DirectedPoint) -> DirectedPoint {
    let lane = current_lane(road, current);
    let forward = lane.dot(&road.direction()) >= 0.0;
    let length = road.length();
    let along = road.along(&current.position).clamp(0.0, length);
    let travelled = if forward { along } else { length - along };
    let stop = travelled.max(length * 0.5);
    let target = road.lane_point(if forward { stop } else { length - stop }, lane);
    if current.same_place(&target) {
        DirectedPoint::new(target.position, current.direction)
    } else {
        target
    }
}

fn building_to_building(
    from: &Building,
    to: &Building,
    current: &DirectedPoint,
) -> DirectedPoint {
    if to.connect_elem == MapElement::Building(from.id) {
        // The child's connector sits on this building's boundary
        return towards(current, to.connect_point);
    }
    if from.connect_elem == MapElement::Building(to.id) {
        if current.position.same_place(&from.connect_point)
            || current.position.same_place(&from.entrance)
        {
            return towards(current, from.connect_point);
        }
        return towards(current, from.entrance);
    }

    // Not linked: walk the perimeter clockwise towards the other building
    let bounds = &from.bounds;
    let goal = bounds.boundary_point(&to.entrance);
    if !bounds.on_boundary(&current.position) {
        return towards(current, bounds.boundary_point(&current.position));
    }
    let side = bounds.side_of(&current.position);
    if side == bounds.side_of(&goal) {
        towards(current, goal)
    } else {
        towards(current, bounds.corners()[(side + 1) % 4])
    }
}

/// Corner of the junction sidewalk from which the road's sidewalk continues
fn cross_to_road_side(
    junction: &Junction,
    road: &Road,
    end: usize,
    current: &DirectedPoint,
) -> DirectedPoint {
    let corners = Side::from_direction(&road.direction_into(1 - end)).corners();
    let here = junction.quadrant_of(&current.position);
    let target = if corners.contains(&here) {
        here
    } else if here.is_adjacent(corners[0]) {
        corners[0]
    } else {
        corners[1]
    };
    towards(current, junction.corner(target))
}
