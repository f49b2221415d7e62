//! Core types for the path engine
//!
//! Ids, 2D geometry and the map element reference shared by every module.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimId(pub usize);

/// A wrapper type for junction IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JunctionId(pub SimId);

/// A wrapper type for road IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoadId(pub SimId);

/// A wrapper type for building IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuildingId(pub SimId);

/// A wrapper type for agent IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub SimId);

impl JunctionId {
    pub fn index(self) -> usize {
        self.0 .0
    }
}

impl RoadId {
    pub fn index(self) -> usize {
        self.0 .0
    }
}

impl BuildingId {
    pub fn index(self) -> usize {
        self.0 .0
    }
}

/// Maximum number of roads that can meet at one junction
pub const MAX_JUNCTION_ROADS: usize = 4;

/// Two positions closer than this are the same place
pub const POSITION_EPSILON: f32 = 1e-3;

/// Width of a pedestrian sidewalk strip along roads and around junctions
pub const SIDEWALK_WIDTH: f32 = 1.0;

/// Road width used when the map builder is not given one
pub const DEFAULT_ROAD_WIDTH: f32 = 4.0;

/// A position on the ground plane
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const ZERO: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        (*other - *self).length()
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn lerp(&self, other: &Position, t: f32) -> Position {
        Position {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    pub fn dot(&self, other: &Position) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product; positive when `other` is
    /// counter-clockwise from `self`
    pub fn cross(&self, other: &Position) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Unit vector in the same direction, or zero for a zero vector
    pub fn normalized(&self) -> Position {
        let len = self.length();
        if len > 0.0 {
            Position::new(self.x / len, self.y / len)
        } else {
            Position::ZERO
        }
    }

    /// Perpendicular pointing to the right of this direction (clockwise)
    pub fn right_normal(&self) -> Position {
        Position::new(self.y, -self.x)
    }

    /// Unit direction from this position towards another
    pub fn direction_to(&self, other: &Position) -> Position {
        (*other - *self).normalized()
    }

    pub fn same_place(&self, other: &Position) -> bool {
        self.distance(other) <= POSITION_EPSILON
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Position {
    type Output = Position;

    fn mul(self, rhs: f32) -> Position {
        Position::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Position {
    type Output = Position;

    fn neg(self) -> Position {
        Position::new(-self.x, -self.y)
    }
}

/// Where an agent is and which way it is facing
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DirectedPoint {
    pub position: Position,
    /// Unit heading, zero when undefined
    pub direction: Position,
}

impl DirectedPoint {
    pub fn new(position: Position, direction: Position) -> Self {
        Self {
            position,
            direction: direction.normalized(),
        }
    }

    /// A point at `position` facing away from `from`
    pub fn facing_from(from: &Position, position: Position) -> Self {
        Self::new(position, from.direction_to(&position))
    }

    pub fn same_place(&self, other: &DirectedPoint) -> bool {
        self.position.same_place(&other.position)
    }
}

/// A reference to any addressable element of the city map
///
/// Equality is identity: same tag and same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapElement {
    Road(RoadId),
    Junction(JunctionId),
    Building(BuildingId),
    RoadSidewalk(RoadId),
    JunctionSidewalk(JunctionId),
}

impl MapElement {
    pub fn is_sidewalk(&self) -> bool {
        matches!(self, MapElement::RoadSidewalk(_) | MapElement::JunctionSidewalk(_))
    }

    pub fn as_building(&self) -> Option<BuildingId> {
        match self {
            MapElement::Building(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for MapElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapElement::Road(id) => write!(f, "road {}", id.index()),
            MapElement::Junction(id) => write!(f, "junction {}", id.index()),
            MapElement::Building(id) => write!(f, "building {}", id.index()),
            MapElement::RoadSidewalk(id) => write!(f, "sidewalk of road {}", id.index()),
            MapElement::JunctionSidewalk(id) => {
                write!(f, "sidewalk of junction {}", id.index())
            }
        }
    }
}

/// Axis-aligned rectangle used for building bounds and junction squares
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Position,
    pub max: Position,
}

impl Rect {
    pub fn new(min: Position, max: Position) -> Self {
        Self {
            min: Position::new(min.x.min(max.x), min.y.min(max.y)),
            max: Position::new(min.x.max(max.x), min.y.max(max.y)),
        }
    }

    /// Square of side `size` centred on `center`
    pub fn square(center: Position, size: f32) -> Self {
        let half = size * 0.5;
        Self::new(
            Position::new(center.x - half, center.y - half),
            Position::new(center.x + half, center.y + half),
        )
    }

    pub fn center(&self) -> Position {
        self.min.lerp(&self.max, 0.5)
    }

    pub fn contains(&self, p: &Position) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Nearest point of the rectangle (boundary or interior) to `p`
    pub fn clamp(&self, p: &Position) -> Position {
        Position::new(
            p.x.clamp(self.min.x, self.max.x),
            p.y.clamp(self.min.y, self.max.y),
        )
    }

    /// Nearest point on the boundary to `p`
    pub fn boundary_point(&self, p: &Position) -> Position {
        if !self.contains(p) {
            return self.clamp(p);
        }
        let to_left = p.x - self.min.x;
        let to_right = self.max.x - p.x;
        let to_bottom = p.y - self.min.y;
        let to_top = self.max.y - p.y;
        let nearest = to_left.min(to_right).min(to_bottom).min(to_top);
        if nearest == to_left {
            Position::new(self.min.x, p.y)
        } else if nearest == to_right {
            Position::new(self.max.x, p.y)
        } else if nearest == to_bottom {
            Position::new(p.x, self.min.y)
        } else {
            Position::new(p.x, self.max.y)
        }
    }

    pub fn on_boundary(&self, p: &Position) -> bool {
        self.boundary_point(p).same_place(p)
    }

    /// Corners in clockwise order starting at the top-left
    pub fn corners(&self) -> [Position; 4] {
        [
            Position::new(self.min.x, self.max.y),
            Position::new(self.max.x, self.max.y),
            Position::new(self.max.x, self.min.y),
            Position::new(self.min.x, self.min.y),
        ]
    }

    /// Index of the boundary side `p` lies on, matching `corners()`:
    /// side `i` runs from corner `i` to corner `i + 1`
    pub fn side_of(&self, p: &Position) -> usize {
        let b = self.boundary_point(p);
        if (b.y - self.max.y).abs() <= POSITION_EPSILON && b.x < self.max.x - POSITION_EPSILON {
            0
        } else if (b.x - self.max.x).abs() <= POSITION_EPSILON
            && b.y > self.min.y + POSITION_EPSILON
        {
            1
        } else if (b.y - self.min.y).abs() <= POSITION_EPSILON
            && b.x > self.min.x + POSITION_EPSILON
        {
            2
        } else {
            3
        }
    }
}
