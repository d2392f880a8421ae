use crate::center;
use crate::classify;
use crate::cluster;
use crate::error::SimplifyError;
use crate::incoming;
use crate::options::SimplifyOptions;
use crate::records::{EdgeRecord, FaceRecord};
use crate::rewrite;
use crate::spatial::{EdgeIndex, FaceIndex};
use geo::{EuclideanLength, LineString, Polygon};
use log::{info, warn};

/// External collaborator that derives polygonal faces from raw edge
/// geometry when the caller has none. Planar subdivision is out of scope
/// here; implementations typically wrap a polygonization utility.
pub trait Polygonizer {
    fn polygonize(&self, lines: &[LineString<f64>]) -> Result<Vec<Polygon<f64>>, SimplifyError>;
}

/// Run counters and accumulated warnings for one pipeline invocation.
#[derive(Clone, Debug, Default)]
pub struct SimplifyReport {
    pub faces: usize,
    pub core_faces: usize,
    pub clusters: usize,
    pub rewired_edges: usize,
    pub dropped_edges: usize,
    pub warnings: Vec<String>,
}

/// Collapse every roundabout in `faces` and rewire the touching edges of
/// `edges` to the computed centers.
///
/// The returned table has the input's attribute schema: untouched edges are
/// clones, rewired edges carry new geometry over a cloned payload, and
/// edges interior to a cluster are removed. With no qualifying face the
/// input comes back unchanged.
pub fn simplify_roundabouts<A: Clone + Send + Sync>(
    edges: &[EdgeRecord<A>],
    faces: &[FaceRecord],
    options: &SimplifyOptions,
) -> Result<Vec<EdgeRecord<A>>, SimplifyError> {
    run(edges, faces, options).map(|(out, _)| out)
}

/// Like [`simplify_roundabouts`], additionally returning the run report.
pub fn simplify_roundabouts_report<A: Clone + Send + Sync>(
    edges: &[EdgeRecord<A>],
    faces: &[FaceRecord],
    options: &SimplifyOptions,
) -> Result<(Vec<EdgeRecord<A>>, SimplifyReport), SimplifyError> {
    run(edges, faces, options)
}

/// Like [`simplify_roundabouts`], deriving the face set first through the
/// supplied polygonization collaborator.
pub fn simplify_roundabouts_derived<A, P>(
    edges: &[EdgeRecord<A>],
    polygonizer: &P,
    options: &SimplifyOptions,
) -> Result<Vec<EdgeRecord<A>>, SimplifyError>
where
    A: Clone + Send + Sync,
    P: Polygonizer + ?Sized,
{
    let lines: Vec<LineString<f64>> = edges.iter().map(|e| e.geometry.clone()).collect();
    let faces: Vec<FaceRecord> = polygonizer
        .polygonize(&lines)?
        .into_iter()
        .enumerate()
        .map(|(i, polygon)| FaceRecord::new(i as u64, polygon))
        .collect();
    run(edges, &faces, options).map(|(out, _)| out)
}

fn run<A: Clone + Send + Sync>(
    edges: &[EdgeRecord<A>],
    faces: &[FaceRecord],
    options: &SimplifyOptions,
) -> Result<(Vec<EdgeRecord<A>>, SimplifyReport), SimplifyError> {
    options.validate()?;

    let mut report = SimplifyReport {
        faces: faces.len(),
        ..Default::default()
    };

    // Edges too degenerate to take part in spatial reasoning pass through
    // untouched in lenient mode.
    let mut usable = vec![true; edges.len()];
    for (i, edge) in edges.iter().enumerate() {
        if edge.geometry.0.len() < 2 || edge.geometry.euclidean_length() <= 0.0 {
            let reason = "degenerate edge (fewer than two vertices or zero length)".to_string();
            if options.strict {
                return Err(SimplifyError::InvalidGeometry {
                    kind: "edge",
                    id: edge.id.0,
                    reason,
                });
            }
            warn!("edge {} passes through untouched: {}", edge.id.0, reason);
            report
                .warnings
                .push(format!("edge {}: {}", edge.id.0, reason));
            usable[i] = false;
        }
    }

    let metrics = classify::compute_metrics(faces, options.strict, &mut report.warnings)?;
    let cores = classify::select_cores(&metrics, options);
    report.core_faces = cores.len();
    if cores.is_empty() {
        info!("no roundabout core faces found; returning input unchanged");
        return Ok((edges.to_vec(), report));
    }
    info!(
        "classified {} core face(s) out of {} faces",
        cores.len(),
        faces.len()
    );

    let face_index = FaceIndex::build(faces, &metrics);
    let (shapes, warnings) =
        cluster::build_clusters(faces, &metrics, &cores, &face_index, options);
    report.warnings.extend(warnings);

    let clusters = center::place_centers(
        shapes,
        faces,
        &metrics,
        options.center_strategy,
        options.strict,
        &mut report.warnings,
    )?;
    report.clusters = clusters.len();
    if clusters.is_empty() {
        info!("all candidate clusters degenerate; returning input unchanged");
        return Ok((edges.to_vec(), report));
    }

    let edge_index = EdgeIndex::build(edges, &usable);
    let (resolution, warnings) =
        incoming::resolve_incoming(edges, &usable, &edge_index, &clusters, options);
    report.warnings.extend(warnings);
    report.rewired_edges = resolution.rewires.len();
    report.dropped_edges = resolution.dropped.len();

    let out = rewrite::rewrite_edges(edges, &resolution)?;
    info!(
        "collapsed {} cluster(s): {} edge(s) rewired, {} interior edge(s) dropped",
        clusters.len(),
        report.rewired_edges,
        report.dropped_edges
    );
    Ok((out, report))
}
