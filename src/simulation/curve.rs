//! Cubic Bézier curves between directed points
//!
//! Vehicles follow a curve whose inner control points sit one third of the
//! chord along each end's heading, which rounds turns through junctions.
//! Arc length has no closed form, so it is measured by sampling and
//! inverted by bisection.

use super::types::{DirectedPoint, Position};

/// Chords summed when measuring arc length over the full curve
pub const ARC_SAMPLES: usize = 32;

/// Bisection steps when searching for a parameter by distance
const BISECTION_STEPS: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicCurve {
    pub points: [Position; 4],
}

impl CubicCurve {
    pub fn new(p0: Position, p1: Position, p2: Position, p3: Position) -> Self {
        Self {
            points: [p0, p1, p2, p3],
        }
    }

    /// Curve leaving `start` along its heading and arriving at `end` along its heading
    pub fn between(start: &DirectedPoint, end: &DirectedPoint) -> Self {
        let reach = start.position.distance(&end.position) / 3.0;
        Self::new(
            start.position,
            start.position + start.direction * reach,
            end.position - end.direction * reach,
            end.position,
        )
    }

    pub fn point_at(&self, t: f32) -> Position {
        let [p0, p1, p2, p3] = self.points;
        let mt = 1.0 - t;
        p0 * (mt * mt * mt) + p1 * (3.0 * mt * mt * t) + p2 * (3.0 * mt * t * t) + p3 * (t * t * t)
    }

    /// First derivative at `t`
    pub fn tangent_at(&self, t: f32) -> Position {
        let [p0, p1, p2, p3] = self.points;
        let mt = 1.0 - t;
        (p1 - p0) * (3.0 * mt * mt) + (p2 - p1) * (6.0 * mt * t) + (p3 - p2) * (3.0 * t * t)
    }

    /// Position and heading at `t`, falling back to the chord when the
    /// tangent vanishes
    pub fn directed_at(&self, t: f32) -> DirectedPoint {
        let tangent = self.tangent_at(t);
        let direction = if tangent.length() > f32::EPSILON {
            tangent
        } else {
            self.points[3] - self.points[0]
        };
        DirectedPoint::new(self.point_at(t), direction)
    }

    /// Length of the curve between two parameters
    pub fn arc_length(&self, t0: f32, t1: f32) -> f32 {
        if t1 <= t0 {
            return 0.0;
        }
        let steps = ((ARC_SAMPLES as f32 * (t1 - t0)).ceil() as usize).max(1);
        let step = (t1 - t0) / steps as f32;
        let mut length = 0.0;
        let mut previous = self.point_at(t0);
        for i in 1..=steps {
            let t = if i == steps { t1 } else { t0 + step * i as f32 };
            let point = self.point_at(t);
            length += previous.distance(&point);
            previous = point;
        }
        length
    }

    pub fn length(&self) -> f32 {
        self.arc_length(0.0, 1.0)
    }

    /// Parameter reached after travelling `distance` from `t0`, capped at 1
    pub fn param_at_distance(&self, t0: f32, distance: f32) -> f32 {
        if distance <= 0.0 {
            return t0;
        }
        if self.arc_length(t0, 1.0) <= distance {
            return 1.0;
        }
        let (mut low, mut high) = (t0, 1.0);
        for _ in 0..BISECTION_STEPS {
            let mid = 0.5 * (low + high);
            if self.arc_length(t0, mid) < distance {
                low = mid;
            } else {
                high = mid;
            }
        }
        0.5 * (low + high)
    }

    /// `count + 1` evenly spaced parameter samples, ends included
    pub fn sample(&self, count: usize) -> Vec<DirectedPoint> {
        let count = count.max(1);
        (0..=count)
            .map(|i| self.directed_at(i as f32 / count as f32))
            .collect()
    }
}
