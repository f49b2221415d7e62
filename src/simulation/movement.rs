//! Moving agents along their paths
//!
//! A path is followed leg by leg: each leg runs from the agent's current
//! directed point to the next hand-off point given by the transition
//! function. Vehicles move along a cubic curve by distance, pedestrians
//! interpolate linearly by elapsed time. Nodes are handed back to the pool
//! as soon as the agent moves past their element.

use log::trace;

use super::curve::CubicCurve;
use super::error::PathResult;
use super::map::CityMap;
use super::node_pool::{NodeIndex, NodePool};
use super::transition::next_point;
use super::types::{DirectedPoint, MapElement, POSITION_EPSILON};

/// Default pedestrian speed in world units per second
pub const DEFAULT_WALK_SPEED: f32 = 1.4;

/// How an agent moves, and what its movement budget measures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelMode {
    /// Budget is a distance along curved legs
    Vehicle,
    /// Budget is elapsed seconds on straight legs
    Pedestrian,
}

/// One leg in progress
#[derive(Debug, Clone, Copy)]
struct Segment {
    start: DirectedPoint,
    end: DirectedPoint,
    curve: CubicCurve,
    /// Arc length for vehicles, walking time for pedestrians
    total: f32,
    progress: f32,
}

impl Segment {
    fn new(mode: TravelMode, walk_speed: f32, start: DirectedPoint, end: DirectedPoint) -> Self {
        let curve = CubicCurve::between(&start, &end);
        let total = match mode {
            TravelMode::Vehicle => curve.length(),
            TravelMode::Pedestrian => start.position.distance(&end.position) / walk_speed,
        };
        Self {
            start,
            end,
            curve,
            total,
            progress: 0.0,
        }
    }

    fn remaining(&self) -> f32 {
        self.total - self.progress
    }

    fn current(&self, mode: TravelMode) -> DirectedPoint {
        if self.progress >= self.total {
            return self.end;
        }
        match mode {
            TravelMode::Vehicle => self
                .curve
                .directed_at(self.curve.param_at_distance(0.0, self.progress)),
            TravelMode::Pedestrian => {
                let ratio = self.progress / self.total;
                DirectedPoint::new(
                    self.start.position.lerp(&self.end.position, ratio),
                    self.end.position - self.start.position,
                )
            }
        }
    }

    fn sample(&self, mode: TravelMode, count: usize) -> Vec<DirectedPoint> {
        match mode {
            TravelMode::Vehicle => self.curve.sample(count),
            TravelMode::Pedestrian => {
                let count = count.max(1);
                let direction = self.end.position - self.start.position;
                (0..=count)
                    .map(|i| {
                        let ratio = i as f32 / count as f32;
                        DirectedPoint::new(
                            self.start.position.lerp(&self.end.position, ratio),
                            direction,
                        )
                    })
                    .collect()
            }
        }
    }
}

/// Outcome of one [`PathFollower::advance`] call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Advance {
    pub point: DirectedPoint,
    /// Remaining path, `None` once the path is finished
    pub head: Option<NodeIndex>,
    /// The path was completed during this call
    pub arrived: bool,
}

/// Drives one agent along a path held in a [`NodePool`]
#[derive(Debug, Clone)]
pub struct PathFollower {
    mode: TravelMode,
    walk_speed: f32,
    element: MapElement,
    point: DirectedPoint,
    head: Option<NodeIndex>,
    segment: Option<Segment>,
}

impl PathFollower {
    /// An idle agent standing at `point` on `element`
    pub fn new(mode: TravelMode, element: MapElement, point: DirectedPoint) -> Self {
        Self {
            mode,
            walk_speed: DEFAULT_WALK_SPEED,
            element,
            point,
            head: None,
            segment: None,
        }
    }

    pub fn with_walk_speed(mut self, walk_speed: f32) -> Self {
        if walk_speed > 0.0 {
            self.walk_speed = walk_speed;
        }
        self
    }

    pub fn mode(&self) -> TravelMode {
        self.mode
    }

    /// Element the agent currently belongs to
    pub fn element(&self) -> MapElement {
        self.element
    }

    pub fn point(&self) -> DirectedPoint {
        self.point
    }

    pub fn head(&self) -> Option<NodeIndex> {
        self.head
    }

    pub fn is_travelling(&self) -> bool {
        self.head.is_some()
    }

    /// Follows a new path, abandoning any previous one
    pub fn start(&mut self, pool: &mut NodePool, head: NodeIndex) {
        self.abandon(pool);
        self.element = pool.element(head);
        self.head = Some(head);
    }

    /// Returns the rest of the current path to the pool and stops
    pub fn abandon(&mut self, pool: &mut NodePool) {
        if let Some(head) = self.head.take() {
            pool.release_chain(head);
        }
        self.segment = None;
    }

    /// Moves the agent by `budget`: distance for vehicles, seconds for
    /// pedestrians
    ///
    /// Leftover budget at the end of a leg carries over to the next one.
    /// Position never runs past the end of the leg being travelled.
    pub fn advance(
        &mut self,
        map: &CityMap,
        pool: &mut NodePool,
        budget: f32,
    ) -> PathResult<Advance> {
        let mut budget = if budget.is_finite() { budget.max(0.0) } else { 0.0 };
        let tolerance = self.budget_tolerance();
        let mut arrived = false;

        loop {
            if self.segment.is_none() {
                let Some(head) = self.head else {
                    break;
                };
                match next_leg(map, pool, &self.point, Some(head))? {
                    Some((node, target)) => {
                        self.release_until(pool, node);
                        self.segment =
                            Some(Segment::new(self.mode, self.walk_speed, self.point, target));
                    }
                    None => {
                        self.finish(pool);
                        arrived = true;
                        break;
                    }
                }
            }

            let Some(segment) = self.segment.as_mut() else {
                break;
            };
            let remaining = segment.remaining();
            if budget + tolerance >= remaining {
                budget = (budget - remaining).max(0.0);
                self.point = segment.end;
                self.segment = None;
                continue;
            }

            segment.progress += budget;
            self.point = segment.current(self.mode);
            break;
        }

        Ok(Advance {
            point: self.point,
            head: self.head,
            arrived,
        })
    }

    /// `POSITION_EPSILON` expressed in budget units
    fn budget_tolerance(&self) -> f32 {
        match self.mode {
            TravelMode::Vehicle => POSITION_EPSILON,
            TravelMode::Pedestrian => POSITION_EPSILON / self.walk_speed,
        }
    }

    /// Budget needed to finish the path from where the agent stands, in the
    /// same units `advance` consumes
    pub fn remaining_length(&self, map: &CityMap, pool: &NodePool) -> PathResult<f32> {
        let mut total = 0.0;
        self.walk_legs(map, pool, |segment| total += segment.remaining())?;
        Ok(total)
    }

    /// Read-only walk of the rest of the path at a fixed resolution per leg,
    /// for debug drawing
    pub fn path_points(
        &self,
        map: &CityMap,
        pool: &NodePool,
        samples_per_leg: usize,
    ) -> PathResult<Vec<DirectedPoint>> {
        let mode = self.mode;
        let mut points = vec![self.point];
        self.walk_legs(map, pool, |segment| {
            let mut rest = *segment;
            rest.start = points.last().copied().unwrap_or(segment.start);
            rest.curve = CubicCurve::between(&rest.start, &rest.end);
            points.extend(rest.sample(mode, samples_per_leg).into_iter().skip(1));
        })?;
        Ok(points)
    }

    fn walk_legs<F>(&self, map: &CityMap, pool: &NodePool, mut visit: F) -> PathResult<()>
    where
        F: FnMut(&Segment),
    {
        let mut point = self.point;
        let mut head = self.head;
        if let Some(segment) = &self.segment {
            visit(segment);
            point = segment.end;
        }
        while let Some((node, target)) = next_leg(map, pool, &point, head)? {
            let segment = Segment::new(self.mode, self.walk_speed, point, target);
            visit(&segment);
            point = target;
            head = Some(node);
        }
        Ok(())
    }

    /// Hands back every node before `node`, which becomes the head
    fn release_until(&mut self, pool: &mut NodePool, node: NodeIndex) {
        while let Some(current) = self.head {
            if current == node {
                break;
            }
            self.head = pool.release_one(current);
        }
        let element = pool.element(node);
        if element != self.element {
            trace!("Agent moved from {} onto {}", self.element, element);
        }
        self.element = element;
    }

    /// Path completed: the agent stays on its last element
    fn finish(&mut self, pool: &mut NodePool) {
        if let Some(head) = self.head.take() {
            if let Some((_, last)) = pool.iter(Some(head)).last() {
                self.element = last;
            }
            pool.release_chain(head);
        }
        self.segment = None;
        trace!("Agent arrived on {}", self.element);
    }
}

/// Next leg from `point` along the path at `head`
///
/// Hand-offs the point already sits on are skipped. Returns the node owning
/// the leg and its target, or `None` once the whole path has been reached.
fn next_leg(
    map: &CityMap,
    pool: &NodePool,
    point: &DirectedPoint,
    mut head: Option<NodeIndex>,
) -> PathResult<Option<(NodeIndex, DirectedPoint)>> {
    while let Some(node) = head {
        let element = pool.element(node);
        let next = pool.next(node).map(|n| pool.element(n));
        let target = next_point(map, point, element, next)?;
        if !target.same_place(point) {
            return Ok(Some((node, target)));
        }
        head = pool.next(node);
    }
    Ok(None)
}

/// Starts `follower` on a fresh path, releasing the path if the first
/// transition is invalid
pub fn begin(
    follower: &mut PathFollower,
    map: &CityMap,
    pool: &mut NodePool,
    head: NodeIndex,
) -> PathResult<()> {
    follower.start(pool, head);
    if let Err(err) = next_leg(map, pool, &follower.point, follower.head) {
        follower.abandon(pool);
        return Err(err);
    }
    Ok(())
}
