use city_paths::simulation::{
    CityMapBuilder, JunctionId, MapError, Position, RoadId, SimId, TrafficLight,
};

#[test]
fn test_traffic_lights_are_set_per_incoming_road() {
    let mut builder = CityMapBuilder::new();
    let a = builder.add_junction(Position::new(0.0, 0.0));
    let b = builder.add_junction(Position::new(40.0, 0.0));
    let c = builder.add_junction(Position::new(40.0, 40.0));
    let ab = builder.add_road(a, b).unwrap();
    let bc = builder.add_road(b, c).unwrap();
    let mut map = builder.build().unwrap();

    let junction = map.junction(b).unwrap();
    assert_eq!(junction.traffic_light(ab), Some(TrafficLight::Green));
    assert_eq!(junction.traffic_light(bc), Some(TrafficLight::Green));

    map.set_traffic_light(b, ab, TrafficLight::Red).unwrap();
    let junction = map.junction(b).unwrap();
    assert_eq!(junction.traffic_light(ab), Some(TrafficLight::Red));
    assert_eq!(junction.traffic_light(bc), Some(TrafficLight::Green));
    // The other end of the road keeps its own light
    assert_eq!(map.junction(a).unwrap().traffic_light(ab), Some(TrafficLight::Green));

    // Roads that do not meet the junction have no light there
    assert_eq!(map.junction(a).unwrap().traffic_light(bc), None);
    assert_eq!(
        map.set_traffic_light(a, bc, TrafficLight::Yellow),
        Err(MapError::UnknownRoad(bc))
    );

    let missing = JunctionId(SimId(7));
    assert_eq!(
        map.set_traffic_light(missing, ab, TrafficLight::Yellow),
        Err(MapError::UnknownJunction(missing))
    );
    assert_eq!(
        map.set_traffic_light(b, RoadId(SimId(9)), TrafficLight::Yellow),
        Err(MapError::UnknownRoad(RoadId(SimId(9))))
    );
}
