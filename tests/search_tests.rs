use std::collections::HashSet;

use petgraph::algo::dijkstra;
use petgraph::graph::{NodeIndex as GraphNode, UnGraph};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use city_paths::simulation::{
    find_route, CityMap, CityMapBuilder, JunctionId, Layer, MapElement, PathError, Position,
    RoadId, SearchScratch, SimId,
};

/// Two junctions joined by one road
fn two_junction_map() -> (CityMap, JunctionId, RoadId, JunctionId) {
    let mut builder = CityMapBuilder::new();
    let a = builder.add_junction(Position::new(0.0, 0.0));
    let b = builder.add_junction(Position::new(40.0, 0.0));
    let r = builder.add_road(a, b).unwrap();
    (builder.build().unwrap(), a, r, b)
}

fn route(
    map: &CityMap,
    layer: Layer,
    start: MapElement,
    end: MapElement,
) -> Result<Vec<MapElement>, PathError> {
    let mut scratch = SearchScratch::new();
    let mut out = Vec::new();
    find_route(map, &mut scratch, layer, start, end, &mut out).map(|_| out)
}

/// Consecutive elements must be a road and one of its junctions
fn assert_adjacent_steps(map: &CityMap, path: &[MapElement]) {
    for pair in path.windows(2) {
        let (road, junction) = match (pair[0], pair[1]) {
            (MapElement::Road(r), MapElement::Junction(j))
            | (MapElement::Junction(j), MapElement::Road(r))
            | (MapElement::RoadSidewalk(r), MapElement::JunctionSidewalk(j))
            | (MapElement::JunctionSidewalk(j), MapElement::RoadSidewalk(r)) => (r, j),
            other => panic!("non-adjacent step {:?}", other),
        };
        assert!(map.road(road).unwrap().end_index(junction).is_some());
    }
}

#[test]
fn test_two_junction_route() {
    let (map, a, r, b) = two_junction_map();
    let path = route(&map, Layer::Roadway, MapElement::Junction(a), MapElement::Junction(b)).unwrap();
    assert_eq!(
        path,
        vec![
            MapElement::Junction(a),
            MapElement::Road(r),
            MapElement::Junction(b)
        ]
    );
}

#[test]
fn test_same_start_and_end_gives_single_element() {
    let (map, a, r, _) = two_junction_map();
    assert_eq!(
        route(&map, Layer::Roadway, MapElement::Junction(a), MapElement::Junction(a)).unwrap(),
        vec![MapElement::Junction(a)]
    );
    assert_eq!(
        route(&map, Layer::Roadway, MapElement::Road(r), MapElement::Road(r)).unwrap(),
        vec![MapElement::Road(r)]
    );
}

#[test]
fn test_route_from_road_to_junction() {
    let (map, _, r, b) = two_junction_map();
    let path = route(&map, Layer::Roadway, MapElement::Road(r), MapElement::Junction(b)).unwrap();
    assert_eq!(path, vec![MapElement::Road(r), MapElement::Junction(b)]);
}

#[test]
fn test_sidewalk_layer_uses_sidewalk_tags() {
    let (map, a, r, b) = two_junction_map();
    let path = route(
        &map,
        Layer::Sidewalk,
        MapElement::JunctionSidewalk(a),
        MapElement::JunctionSidewalk(b),
    )
    .unwrap();
    assert_eq!(
        path,
        vec![
            MapElement::JunctionSidewalk(a),
            MapElement::RoadSidewalk(r),
            MapElement::JunctionSidewalk(b)
        ]
    );
}

#[test]
fn test_equal_length_routes_prefer_first_clockwise_road() {
    // Square a-b-c-d: a and c are opposite corners with two 4-hop routes
    let mut builder = CityMapBuilder::new();
    let a = builder.add_junction(Position::new(0.0, 0.0));
    let b = builder.add_junction(Position::new(20.0, 0.0));
    let c = builder.add_junction(Position::new(20.0, 20.0));
    let d = builder.add_junction(Position::new(0.0, 20.0));
    let south = builder.add_road(a, b).unwrap();
    let east = builder.add_road(b, c).unwrap();
    let north = builder.add_road(c, d).unwrap();
    let west = builder.add_road(d, a).unwrap();
    let map = builder.build().unwrap();

    // Slots start at north, so `a` looks up `west` before `south`
    let junction = map.junction(a).unwrap();
    assert_eq!(junction.road_slot(west), Some(0));
    assert_eq!(junction.road_slot(south), Some(1));

    let path = route(&map, Layer::Roadway, MapElement::Junction(a), MapElement::Junction(c)).unwrap();
    assert_eq!(
        path,
        vec![
            MapElement::Junction(a),
            MapElement::Road(west),
            MapElement::Junction(d),
            MapElement::Road(north),
            MapElement::Junction(c)
        ]
    );

    // From `c`, `east` heads south and `north` heads west, so `east` is seen first
    let back = route(&map, Layer::Roadway, MapElement::Junction(c), MapElement::Junction(a)).unwrap();
    assert_eq!(
        back,
        vec![
            MapElement::Junction(c),
            MapElement::Road(east),
            MapElement::Junction(b),
            MapElement::Road(south),
            MapElement::Junction(a)
        ]
    );
}

#[test]
fn test_disconnected_elements_are_not_reachable() {
    let mut builder = CityMapBuilder::new();
    let a = builder.add_junction(Position::new(0.0, 0.0));
    let b = builder.add_junction(Position::new(20.0, 0.0));
    let c = builder.add_junction(Position::new(100.0, 0.0));
    let d = builder.add_junction(Position::new(120.0, 0.0));
    builder.add_road(a, b).unwrap();
    let far = builder.add_road(c, d).unwrap();
    let map = builder.build().unwrap();

    let err = route(&map, Layer::Roadway, MapElement::Junction(a), MapElement::Road(far)).unwrap_err();
    assert_eq!(
        err,
        PathError::NotReachable {
            from: MapElement::Junction(a),
            to: MapElement::Road(far)
        }
    );
}

#[test]
fn test_wrong_layer_and_unknown_elements_are_rejected() {
    let (map, a, r, _) = two_junction_map();

    let err = route(&map, Layer::Roadway, MapElement::RoadSidewalk(r), MapElement::Junction(a))
        .unwrap_err();
    assert_eq!(err, PathError::InvalidEndpoint(MapElement::RoadSidewalk(r)));

    let missing = MapElement::Junction(JunctionId(SimId(99)));
    let err = route(&map, Layer::Roadway, MapElement::Junction(a), missing).unwrap_err();
    assert_eq!(err, PathError::UnknownElement(missing));
}

#[test]
fn test_scratch_is_reusable_between_searches() {
    let (map, a, r, b) = two_junction_map();
    let mut scratch = SearchScratch::new();
    let mut first = Vec::new();
    let mut second = Vec::new();

    find_route(&map, &mut scratch, Layer::Roadway, MapElement::Junction(a), MapElement::Junction(b), &mut first).unwrap();
    find_route(&map, &mut scratch, Layer::Roadway, MapElement::Junction(b), MapElement::Junction(a), &mut second).unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(
        second,
        vec![
            MapElement::Junction(b),
            MapElement::Road(r),
            MapElement::Junction(a)
        ]
    );
}

/// A `size` x `size` grid of junctions with each possible road kept at random
fn random_grid(rng: &mut StdRng, size: usize) -> CityMap {
    let mut builder = CityMapBuilder::new();
    let mut ids = Vec::new();
    for row in 0..size {
        for col in 0..size {
            ids.push(builder.add_junction(Position::new(col as f32 * 20.0, row as f32 * 20.0)));
        }
    }
    for row in 0..size {
        for col in 0..size {
            let here = ids[row * size + col];
            if col + 1 < size && rng.random_bool(0.75) {
                builder.add_road(here, ids[row * size + col + 1]).unwrap();
            }
            if row + 1 < size && rng.random_bool(0.75) {
                builder.add_road(here, ids[(row + 1) * size + col]).unwrap();
            }
        }
    }
    builder.build().unwrap()
}

/// Same network as a petgraph graph: junctions first, then roads
fn to_graph(map: &CityMap) -> UnGraph<(), ()> {
    let mut graph = UnGraph::new_undirected();
    for _ in 0..map.junction_count() + map.road_count() {
        graph.add_node(());
    }
    let junctions = map.junction_count();
    for road in map.roads() {
        let road_node = GraphNode::new(junctions + road.id.index());
        for j in road.junctions {
            graph.add_edge(road_node, GraphNode::new(j.index()), ());
        }
    }
    graph
}

fn graph_node(map: &CityMap, element: MapElement) -> GraphNode {
    match element {
        MapElement::Junction(id) => GraphNode::new(id.index()),
        MapElement::Road(id) => GraphNode::new(map.junction_count() + id.index()),
        other => panic!("not a roadway element: {}", other),
    }
}

#[test]
fn test_hop_count_matches_reference_bfs_on_random_grids() {
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..20 {
        let map = random_grid(&mut rng, 5);
        let graph = to_graph(&map);

        let mut elements: Vec<MapElement> = map
            .junctions()
            .iter()
            .map(|j| MapElement::Junction(j.id))
            .collect();
        elements.extend(map.roads().iter().map(|r| MapElement::Road(r.id)));

        for _ in 0..30 {
            let start = elements[rng.random_range(0..elements.len())];
            let end = elements[rng.random_range(0..elements.len())];
            let distances = dijkstra(&graph, graph_node(&map, start), Some(graph_node(&map, end)), |_| 1usize);

            match (route(&map, Layer::Roadway, start, end), distances.get(&graph_node(&map, end))) {
                (Ok(path), Some(hops)) => {
                    assert_eq!(path.len() - 1, *hops, "route {} -> {} is not minimal", start, end);
                    assert_eq!(path.first(), Some(&start));
                    assert_eq!(path.last(), Some(&end));
                    let unique: HashSet<_> = path.iter().collect();
                    assert_eq!(unique.len(), path.len(), "route repeats an element");
                    assert_adjacent_steps(&map, &path);
                }
                (Err(PathError::NotReachable { .. }), None) => {}
                (result, hops) => panic!(
                    "search and reference disagree for {} -> {}: {:?} vs {:?}",
                    start, end, result, hops
                ),
            }
        }
    }
}
