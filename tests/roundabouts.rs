// Full-pipeline tests over small synthetic road networks. Each network is a
// regular-polygon "circle" face standing in for a roundabout, plus enough
// low-compactness filler faces that the area percentile sits above the
// circle.

use approx::assert_relative_eq;
use geo::{Contains, ConvexHull, Coord, LineString, Polygon, coord, polygon};
use ranunculus::{
    CenterStrategy, EdgeId, EdgeRecord, FaceRecord, SimplifyOptions, simplify_roundabouts,
    simplify_roundabouts_report,
};
use std::f64::consts::PI;

#[derive(Clone, Debug, PartialEq)]
struct Attr {
    name: String,
    lanes: u32,
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn attr(name: &str) -> Attr {
    Attr {
        name: name.to_string(),
        lanes: 2,
    }
}

fn edge(id: u64, coords: Vec<Coord<f64>>, name: &str) -> EdgeRecord<Attr> {
    EdgeRecord::new(id, LineString::new(coords), attr(name))
}

const CIRCLE_SIDES: usize = 32;

fn circle_vertex(cx: f64, cy: f64, radius: f64, i: usize) -> Coord<f64> {
    let theta = 2.0 * PI * (i % CIRCLE_SIDES) as f64 / CIRCLE_SIDES as f64;
    coord! { x: cx + radius * theta.cos(), y: cy + radius * theta.sin() }
}

fn circle_face(id: u64, cx: f64, cy: f64, radius: f64) -> FaceRecord {
    let ring: Vec<Coord<f64>> = (0..=CIRCLE_SIDES)
        .map(|i| circle_vertex(cx, cy, radius, i))
        .collect();
    FaceRecord::new(id, Polygon::new(ring.into(), vec![]))
}

/// Quarter arc of the circle ring between vertex `from` and vertex `to`,
/// reusing the exact face coordinates so the edge lies on the boundary.
fn arc_edge(id: u64, cx: f64, cy: f64, radius: f64, from: usize, to: usize) -> EdgeRecord<Attr> {
    let coords: Vec<Coord<f64>> = (from..=to)
        .map(|i| circle_vertex(cx, cy, radius, i))
        .collect();
    edge(id, coords, "ring")
}

/// Low-compactness filler slivers, larger in area than a radius-10 circle,
/// so the 85th area percentile lands above the roundabout.
fn filler_faces(first_id: u64) -> Vec<FaceRecord> {
    (0..4)
        .map(|i| {
            let y0 = 100.0 + 20.0 * i as f64;
            FaceRecord::new(
                first_id + i,
                polygon![
                    (x: 100.0, y: y0),
                    (x: 200.0, y: y0),
                    (x: 200.0, y: y0 + 4.0),
                    (x: 100.0, y: y0 + 4.0),
                    (x: 100.0, y: y0),
                ],
            )
        })
        .collect()
}

/// Scenario A: a circular face with four cardinal access roads and its four
/// ring arcs. All arcs drop, all access roads end at the centroid.
#[test]
fn collapses_perfect_circle_to_centroid() {
    init_logging();
    let mut faces = vec![circle_face(0, 0.0, 0.0, 10.0)];
    faces.extend(filler_faces(1));

    let east = circle_vertex(0.0, 0.0, 10.0, 0);
    let north = circle_vertex(0.0, 0.0, 10.0, 8);
    let west = circle_vertex(0.0, 0.0, 10.0, 16);
    let south = circle_vertex(0.0, 0.0, 10.0, 24);
    let edges = vec![
        edge(0, vec![coord! { x: 30.0, y: 0.0 }, east], "east approach"),
        edge(1, vec![coord! { x: 0.0, y: 30.0 }, north], "north approach"),
        edge(2, vec![coord! { x: -30.0, y: 0.0 }, west], "west approach"),
        edge(3, vec![coord! { x: 0.0, y: -30.0 }, south], "south approach"),
        arc_edge(4, 0.0, 0.0, 10.0, 0, 8),
        arc_edge(5, 0.0, 0.0, 10.0, 8, 16),
        arc_edge(6, 0.0, 0.0, 10.0, 16, 24),
        arc_edge(7, 0.0, 0.0, 10.0, 24, 32),
    ];

    let (out, report) =
        simplify_roundabouts_report(&edges, &faces, &SimplifyOptions::default()).expect("run");

    assert_eq!(report.core_faces, 1);
    assert_eq!(report.clusters, 1);
    assert_eq!(report.dropped_edges, 4);
    assert_eq!(report.rewired_edges, 4);
    assert_eq!(out.len(), edges.len() - report.dropped_edges);

    for e in &out {
        assert!(e.id.0 < 4, "ring edge {:?} survived", e.id);
        let last = *e.geometry.0.last().unwrap();
        assert_relative_eq!(last.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(last.y, 0.0, epsilon = 1e-9);
        // One new vertex, the rest of the geometry untouched.
        assert_eq!(e.geometry.0.len(), 3);
    }
}

/// Scenario B: an adjacent sliver within the circle's diameter is absorbed,
/// and its boundary edge inside the cluster drops with the roundabout.
#[test]
fn absorbs_adjacent_sliver_and_drops_its_boundary() {
    init_logging();
    // 8x1: low compactness, small area, farthest vertex well inside the
    // circle's 20-unit diameter.
    let sliver = polygon![
        (x: 10.0, y: -0.5),
        (x: 18.0, y: -0.5),
        (x: 18.0, y: 0.5),
        (x: 10.0, y: 0.5),
        (x: 10.0, y: -0.5),
    ];
    let mut faces = vec![circle_face(0, 0.0, 0.0, 10.0), FaceRecord::new(1, sliver)];
    faces.extend(filler_faces(2));

    let edges = vec![
        edge(
            0,
            vec![coord! { x: 30.0, y: 0.0 }, coord! { x: 18.0, y: 0.0 }],
            "approach",
        ),
        // Right side of the sliver: interior to the cluster once absorbed.
        edge(
            1,
            vec![coord! { x: 18.0, y: -0.5 }, coord! { x: 18.0, y: 0.5 }],
            "sliver boundary",
        ),
    ];

    let (out, report) =
        simplify_roundabouts_report(&edges, &faces, &SimplifyOptions::default()).expect("run");

    assert_eq!(report.clusters, 1);
    assert_eq!(report.dropped_edges, 1);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id, EdgeId(0));
    let last = *out[0].geometry.0.last().unwrap();
    assert_relative_eq!(last.x, 0.0, epsilon = 1e-9);
    assert_relative_eq!(last.y, 0.0, epsilon = 1e-9);
    // Attributes come through untouched.
    assert_eq!(out[0].attributes, attr("approach"));
}

/// Scenario C: two edges converge on the same boundary point; only the one
/// continuing the connector's stroke is rewired.
#[test]
fn convergence_bundle_keeps_only_the_straight_continuation() {
    init_logging();
    let mut faces = vec![circle_face(0, 0.0, 0.0, 10.0)];
    faces.extend(filler_faces(1));

    let meeting = circle_vertex(0.0, 0.0, 10.0, 0);
    let straight = edge(0, vec![coord! { x: 30.0, y: 0.0 }, meeting], "straight");
    let angled = edge(1, vec![coord! { x: 30.0, y: 20.0 }, meeting], "angled");
    let edges = vec![straight.clone(), angled.clone()];

    let out = simplify_roundabouts(&edges, &faces, &SimplifyOptions::default()).expect("run");

    assert_eq!(out.len(), 2);
    let rewired = out.iter().find(|e| e.id == EdgeId(0)).unwrap();
    let last = *rewired.geometry.0.last().unwrap();
    assert_relative_eq!(last.x, 0.0, epsilon = 1e-9);
    assert_relative_eq!(last.y, 0.0, epsilon = 1e-9);
    let untouched = out.iter().find(|e| e.id == EdgeId(1)).unwrap();
    assert_eq!(untouched.geometry, angled.geometry);
}

/// Scenario D: a zero area percentile disqualifies every face, so the input
/// comes back unchanged.
#[test]
fn zero_area_percentile_is_a_no_op() {
    init_logging();
    let mut faces = vec![circle_face(0, 0.0, 0.0, 10.0)];
    faces.extend(filler_faces(1));
    let edges = vec![edge(
        0,
        vec![coord! { x: 30.0, y: 0.0 }, circle_vertex(0.0, 0.0, 10.0, 0)],
        "approach",
    )];

    let options = SimplifyOptions {
        area_percentile: 0.0,
        ..Default::default()
    };
    let (out, report) = simplify_roundabouts_report(&edges, &faces, &options).expect("run");
    assert_eq!(report.core_faces, 0);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].geometry, edges[0].geometry);
}

/// An already-simplified network (nothing passes the compactness filter) is
/// a fixed point of the pipeline.
#[test]
fn pipeline_is_idempotent_on_simplified_networks() {
    init_logging();
    let faces = filler_faces(0);
    let edges = vec![
        edge(
            0,
            vec![coord! { x: 0.0, y: 0.0 }, coord! { x: 50.0, y: 0.0 }],
            "a",
        ),
        edge(
            1,
            vec![coord! { x: 50.0, y: 0.0 }, coord! { x: 50.0, y: 50.0 }],
            "b",
        ),
    ];

    let options = SimplifyOptions::default();
    let once = simplify_roundabouts(&edges, &faces, &options).expect("first run");
    let twice = simplify_roundabouts(&once, &faces, &options).expect("second run");
    assert_eq!(once.len(), edges.len());
    for (a, b) in once.iter().zip(&twice) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.geometry, b.geometry);
        assert_eq!(a.attributes, b.attributes);
    }
}

/// The mean strategy produces a center inside the convex hull of the
/// cluster's combined geometry even with an absorbed neighbor skewing it.
#[test]
fn mean_center_stays_in_cluster_hull() {
    init_logging();
    // 8x1: low compactness, small area, farthest vertex well inside the
    // circle's 20-unit diameter.
    let sliver = polygon![
        (x: 10.0, y: -0.5),
        (x: 18.0, y: -0.5),
        (x: 18.0, y: 0.5),
        (x: 10.0, y: 0.5),
        (x: 10.0, y: -0.5),
    ];
    let mut faces = vec![circle_face(0, 0.0, 0.0, 10.0), FaceRecord::new(1, sliver)];
    faces.extend(filler_faces(2));
    let edges = vec![edge(
        0,
        vec![coord! { x: 30.0, y: 0.0 }, coord! { x: 18.0, y: 0.0 }],
        "approach",
    )];

    let options = SimplifyOptions {
        center_strategy: CenterStrategy::Mean,
        ..Default::default()
    };
    let out = simplify_roundabouts(&edges, &faces, &options).expect("run");
    let center = *out[0].geometry.0.last().unwrap();

    // Hull of the cluster parts: circle plus sliver.
    let hull = geo::MultiPolygon::new(vec![
        circle_face(0, 0.0, 0.0, 10.0).geometry,
        faces[1].geometry.clone(),
    ])
    .convex_hull();
    assert!(hull.contains(&geo::Point::from(center)));
    // Pulled toward the sliver side.
    assert!(center.x > 0.0);
}

/// An edge touching two clusters is rewired once, by the lower cluster id;
/// the second claim is reported, not applied.
#[test]
fn edge_between_two_roundabouts_is_claimed_once() {
    init_logging();
    let mut faces = vec![
        circle_face(0, 0.0, 0.0, 10.0),
        circle_face(1, 40.0, 0.0, 10.0),
    ];
    faces.extend(filler_faces(2));

    let a_east = circle_vertex(0.0, 0.0, 10.0, 0); // (10, 0)
    let b_west = circle_vertex(40.0, 0.0, 10.0, 16); // (30, 0)
    let edges = vec![edge(0, vec![a_east, b_west], "link road")];

    let (out, report) =
        simplify_roundabouts_report(&edges, &faces, &SimplifyOptions::default()).expect("run");

    assert_eq!(report.clusters, 2);
    assert_eq!(out.len(), 1);
    // Prepended center of the first cluster; the second claim left the rest
    // of the geometry alone.
    assert_relative_eq!(out[0].geometry.0[0].x, 0.0, epsilon = 1e-9);
    assert_relative_eq!(out[0].geometry.0[0].y, 0.0, epsilon = 1e-9);
    assert_eq!(out[0].geometry.0.len(), 3);
    assert!(
        report.warnings.iter().any(|w| w.contains("already rewired")),
        "{:?}",
        report.warnings
    );
}

/// Lenient mode reports degenerate records and keeps going; strict mode
/// refuses the run.
#[test]
fn strict_mode_rejects_degenerate_records() {
    init_logging();
    let mut faces = vec![circle_face(0, 0.0, 0.0, 10.0)];
    faces.extend(filler_faces(1));
    faces.push(FaceRecord::new(
        99,
        polygon![(x: 0.0, y: 50.0), (x: 1.0, y: 50.0), (x: 0.0, y: 50.0)],
    ));

    let edges = vec![
        edge(
            0,
            vec![coord! { x: 30.0, y: 0.0 }, circle_vertex(0.0, 0.0, 10.0, 0)],
            "approach",
        ),
        // Zero-length edge: passes through untouched in lenient mode.
        edge(
            1,
            vec![coord! { x: 70.0, y: 70.0 }, coord! { x: 70.0, y: 70.0 }],
            "stub",
        ),
    ];

    let (out, report) =
        simplify_roundabouts_report(&edges, &faces, &SimplifyOptions::default()).expect("lenient");
    assert_eq!(out.len(), 2);
    assert!(report.warnings.iter().any(|w| w.contains("face 99")));
    assert!(report.warnings.iter().any(|w| w.contains("edge 1")));
    let stub = out.iter().find(|e| e.id == EdgeId(1)).unwrap();
    assert_eq!(stub.geometry, edges[1].geometry);

    let strict = SimplifyOptions {
        strict: true,
        ..Default::default()
    };
    assert!(simplify_roundabouts(&edges, &faces, &strict).is_err());
}
