use city_paths::simulation::{
    CityMap, CityMapBuilder, CubicCurve, DirectedPoint, JunctionId, MapElement, NodePool,
    PathFollower, Pathfinder, Position, RoadId, TravelMode,
};

fn two_junction_map() -> (CityMap, JunctionId, RoadId, JunctionId) {
    let mut builder = CityMapBuilder::new();
    let a = builder.add_junction(Position::new(0.0, 0.0));
    let b = builder.add_junction(Position::new(40.0, 0.0));
    let r = builder.add_road(a, b).unwrap();
    (builder.build().unwrap(), a, r, b)
}

/// A vehicle standing at the start of road `r`, following `[a, r, b]`
fn vehicle_on_route(map: &CityMap, pool: &mut NodePool, a: JunctionId, r: RoadId, b: JunctionId) -> PathFollower {
    let head = Pathfinder::new()
        .connect(map, pool, MapElement::Junction(a), MapElement::Junction(b))
        .unwrap();
    let start = map.road(r).unwrap().enter_point(0);
    let mut follower = PathFollower::new(TravelMode::Vehicle, MapElement::Junction(a), start);
    follower.start(pool, head);
    follower
}

#[test]
fn test_exact_budget_arrives_at_final_point() {
    let (map, a, r, b) = two_junction_map();
    let mut pool = NodePool::new(8);
    let mut follower = vehicle_on_route(&map, &mut pool, a, r, b);

    let total = follower.remaining_length(&map, &pool).unwrap();
    assert!(total > map.road(r).unwrap().length());

    let step = follower.advance(&map, &mut pool, total).unwrap();
    assert!(step.arrived);
    assert_eq!(step.head, None);
    assert!(step.point.position.same_place(&Position::new(40.0, 0.0)));
    assert_eq!(follower.element(), MapElement::Junction(b));
    assert!(!follower.is_travelling());
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn test_road_length_budget_reaches_leave_point() {
    let (map, a, r, b) = two_junction_map();
    let mut pool = NodePool::new(8);
    let mut follower = vehicle_on_route(&map, &mut pool, a, r, b);
    let road = map.road(r).unwrap();

    let step = follower.advance(&map, &mut pool, road.length()).unwrap();
    assert!(!step.arrived);
    assert!(step.point.same_place(&road.leave_point(1, 0.0)));
    // Heading runs along the road
    assert!(step.point.direction.cross(&road.direction()).abs() < 1e-3);
    assert!((step.point.direction.dot(&road.direction()) - 1.0).abs() < 1e-3);
    // Only the last junction is left
    assert_eq!(pool.elements(step.head), vec![MapElement::Junction(b)]);
    assert_eq!(follower.element(), MapElement::Junction(b));
}

#[test]
fn test_nodes_are_released_as_segments_complete() {
    let (map, a, r, b) = two_junction_map();
    let mut pool = NodePool::new(8);
    let mut follower = vehicle_on_route(&map, &mut pool, a, r, b);
    assert_eq!(pool.in_use(), 3);

    follower.advance(&map, &mut pool, 1.0).unwrap();
    assert_eq!(pool.in_use(), 2);
    assert_eq!(follower.element(), MapElement::Road(r));

    // The rest of the road
    follower.advance(&map, &mut pool, 35.0).unwrap();
    assert_eq!(pool.in_use(), 1);
    assert_eq!(follower.element(), MapElement::Junction(b));

    let rest = follower.remaining_length(&map, &pool).unwrap();
    follower.advance(&map, &mut pool, rest).unwrap();
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn test_small_steps_never_overshoot() {
    let (map, a, r, b) = two_junction_map();
    let mut pool = NodePool::new(8);
    let mut follower = vehicle_on_route(&map, &mut pool, a, r, b);

    let step = follower.advance(&map, &mut pool, 5.0).unwrap();
    assert!(step.point.position.same_place(&Position::new(7.0, -1.0)));

    let mut previous = step.point.position.x;
    let mut arrived = false;
    for _ in 0..100 {
        let step = follower.advance(&map, &mut pool, 2.5).unwrap();
        assert!(step.point.position.x >= previous - 1e-3);
        assert!(step.point.position.x <= 40.0 + 1e-3);
        previous = step.point.position.x;
        if step.arrived {
            arrived = true;
            break;
        }
    }
    assert!(arrived);
    assert!(follower.point().position.same_place(&Position::new(40.0, 0.0)));
}

#[test]
fn test_zero_budget_does_not_move() {
    let (map, a, r, b) = two_junction_map();
    let mut pool = NodePool::new(8);
    let mut follower = vehicle_on_route(&map, &mut pool, a, r, b);
    let before = follower.point();

    let step = follower.advance(&map, &mut pool, 0.0).unwrap();
    assert!(step.point.same_place(&before));
    assert!(!step.arrived);
}

#[test]
fn test_remaining_shrinks_by_budget() {
    let (map, a, r, b) = two_junction_map();
    let mut pool = NodePool::new(8);
    let mut follower = vehicle_on_route(&map, &mut pool, a, r, b);

    let before = follower.remaining_length(&map, &pool).unwrap();
    follower.advance(&map, &mut pool, 10.0).unwrap();
    let after = follower.remaining_length(&map, &pool).unwrap();
    assert!((before - after - 10.0).abs() < 1e-2);
}

#[test]
fn test_pedestrian_moves_by_time() {
    let (map, _, r, b) = two_junction_map();
    let mut pool = NodePool::new(8);
    let head = Pathfinder::new()
        .connect_sidewalk(&map, &mut pool, MapElement::RoadSidewalk(r), MapElement::JunctionSidewalk(b))
        .unwrap();

    let start = DirectedPoint::new(Position::new(20.0, -2.5), Position::new(1.0, 0.0));
    let mut walker = PathFollower::new(TravelMode::Pedestrian, MapElement::RoadSidewalk(r), start)
        .with_walk_speed(2.0);
    walker.start(&mut pool, head);

    // 17.5 units to the south-west corner of b at 2 units per second
    let total = walker.remaining_length(&map, &pool).unwrap();
    assert!((total - 8.75).abs() < 1e-3);

    let step = walker.advance(&map, &mut pool, 1.0).unwrap();
    assert!(step.point.position.same_place(&Position::new(22.0, -2.5)));

    let step = walker.advance(&map, &mut pool, 7.75).unwrap();
    assert!(step.arrived);
    assert!(step.point.position.same_place(&Position::new(37.5, -2.5)));
    assert_eq!(walker.element(), MapElement::JunctionSidewalk(b));
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn test_fast_pedestrian_stops_short_of_corner() {
    let (map, _, r, b) = two_junction_map();
    let mut pool = NodePool::new(8);
    let head = Pathfinder::new()
        .connect_sidewalk(&map, &mut pool, MapElement::RoadSidewalk(r), MapElement::JunctionSidewalk(b))
        .unwrap();

    let start = DirectedPoint::new(Position::new(20.0, -2.5), Position::new(1.0, 0.0));
    let mut runner = PathFollower::new(TravelMode::Pedestrian, MapElement::RoadSidewalk(r), start)
        .with_walk_speed(1000.0);
    runner.start(&mut pool, head);

    // 17 of the 17.5 units: half a unit short is not close enough to arrive
    let step = runner.advance(&map, &mut pool, 0.017).unwrap();
    assert!(!step.arrived);
    assert!(step.point.position.same_place(&Position::new(37.0, -2.5)));
    assert!(runner.is_travelling());

    let step = runner.advance(&map, &mut pool, 0.0005).unwrap();
    assert!(step.arrived);
    assert!(step.point.position.same_place(&Position::new(37.5, -2.5)));
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn test_abandon_returns_path_to_pool() {
    let (map, a, r, b) = two_junction_map();
    let mut pool = NodePool::new(8);
    let mut follower = vehicle_on_route(&map, &mut pool, a, r, b);
    follower.advance(&map, &mut pool, 3.0).unwrap();

    follower.abandon(&mut pool);
    assert_eq!(pool.in_use(), 0);
    assert!(!follower.is_travelling());

    let step = follower.advance(&map, &mut pool, 10.0).unwrap();
    assert!(!step.arrived);
    assert_eq!(step.head, None);
}

#[test]
fn test_starting_a_new_path_releases_the_old_one() {
    let (map, a, r, b) = two_junction_map();
    let mut pool = NodePool::new(8);
    let mut follower = vehicle_on_route(&map, &mut pool, a, r, b);

    let back = Pathfinder::new()
        .connect(&map, &mut pool, MapElement::Road(r), MapElement::Junction(a))
        .unwrap();
    assert_eq!(pool.in_use(), 5);

    follower.start(&mut pool, back);
    assert_eq!(pool.in_use(), 2);
    assert_eq!(follower.element(), MapElement::Road(r));
}

#[test]
fn test_path_points_trace_the_rest_of_the_route() {
    let (map, a, r, b) = two_junction_map();
    let mut pool = NodePool::new(8);
    let follower = vehicle_on_route(&map, &mut pool, a, r, b);

    let points = follower.path_points(&map, &pool, 8).unwrap();
    assert!(points[0].same_place(&follower.point()));
    assert!(points
        .last()
        .unwrap()
        .position
        .same_place(&Position::new(40.0, 0.0)));
    // Read-only: nothing was released
    assert_eq!(pool.in_use(), 3);
}

#[test]
fn test_straight_curve_length_is_chord() {
    let start = DirectedPoint::new(Position::new(0.0, 0.0), Position::new(1.0, 0.0));
    let end = DirectedPoint::new(Position::new(12.0, 0.0), Position::new(1.0, 0.0));
    let curve = CubicCurve::between(&start, &end);

    assert!((curve.length() - 12.0).abs() < 1e-3);
    let t = curve.param_at_distance(0.0, 3.0);
    assert!(curve.point_at(t).same_place(&Position::new(3.0, 0.0)));
}

#[test]
fn test_turn_curve_length_and_inversion() {
    let start = DirectedPoint::new(Position::new(0.0, 0.0), Position::new(1.0, 0.0));
    let end = DirectedPoint::new(Position::new(10.0, 10.0), Position::new(0.0, 1.0));
    let curve = CubicCurve::between(&start, &end);

    let length = curve.length();
    let chord = start.position.distance(&end.position);
    assert!(length > chord);
    assert!(length < 20.0);

    let t = curve.param_at_distance(0.0, length * 0.5);
    assert!((curve.arc_length(0.0, t) - length * 0.5).abs() < 1e-2);
    assert_eq!(curve.param_at_distance(0.0, length * 2.0), 1.0);

    let heading = curve.directed_at(1.0).direction;
    assert!(heading.same_place(&Position::new(0.0, 1.0)));
}
