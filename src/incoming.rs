// ===========================================================================
// Incoming Edge Resolution
// ===========================================================================
//
// Decides, per cluster, which edges get pulled into the roundabout's center
// point and which interior edges disappear entirely.
//
// Phase 1 (parallel over clusters): classify every bbox-candidate edge by
// its DE-9IM relation to the cluster geometry. Edges covered by a cluster
// are the roundabout's own internal geometry and are marked for removal
// globally before anything else happens, so a lane segment inside cluster A
// can never double as an access road of neighboring cluster B.
//
// Phase 2 (parallel over clusters): every touching edge gets a connector
// from its nearer endpoint to the cluster center. Connectors landing on the
// same quantized boundary point form a bundle; a bundle of one passes
// through, a bigger bundle is settled by stroke construction: the edge that
// shares the connector's stroke is the street that continues, the rest keep
// their geometry.
//
// The final claim pass runs sequentially in cluster-id order: if two
// clusters both claim one edge, the lower id wins and the later claim is
// logged and skipped.
// ===========================================================================

use crate::center::Cluster;
use crate::options::SimplifyOptions;
use crate::records::{EdgeId, EdgeRecord};
use crate::spatial::EdgeIndex;
use crate::strokes::{build_strokes, quantize};
use ahash::{AHashMap, AHashSet};
use geo::{BoundingRect, Coord, EuclideanDistance, LineString, Point, Relate};
use itertools::Itertools;
use log::{debug, warn};
use rayon::prelude::*;

/// One edge to be merged with its connector segment.
#[derive(Clone, Debug)]
pub(crate) struct Rewire {
    pub edge: EdgeId,
    /// Connector from the edge's near endpoint to the cluster center.
    pub connector: LineString<f64>,
    /// Whether the near endpoint is the edge's last vertex.
    pub near_is_last: bool,
}

/// Outcome of incoming-edge resolution across all clusters.
pub(crate) struct Resolution {
    pub rewires: Vec<Rewire>,
    /// Edges covered by a cluster: roundabout-interior geometry to drop.
    pub dropped: AHashSet<EdgeId>,
}

struct Candidate {
    edge_idx: usize,
    near: Coord<f64>,
    near_is_last: bool,
}

pub(crate) fn resolve_incoming<A: Sync>(
    edges: &[EdgeRecord<A>],
    usable: &[bool],
    index: &EdgeIndex,
    clusters: &[Cluster],
    options: &SimplifyOptions,
) -> (Resolution, Vec<String>) {
    // Phase 1: DE-9IM classification per cluster.
    let scans: Vec<(Vec<usize>, Vec<usize>)> = clusters
        .par_iter()
        .map(|cluster| scan_cluster(edges, usable, index, cluster))
        .collect();

    let mut dropped: AHashSet<EdgeId> = AHashSet::new();
    for (covered, _) in &scans {
        dropped.extend(covered.iter().map(|&ei| edges[ei].id));
    }

    // Phase 2: connectors, bundles, stroke disambiguation per cluster.
    let resolved: Vec<(Vec<Rewire>, Vec<String>)> = clusters
        .par_iter()
        .zip(&scans)
        .map(|(cluster, (_, touching))| {
            resolve_cluster(edges, cluster, touching, &dropped, options)
        })
        .collect();

    // Claim pass, in cluster-id order.
    let mut claimed: AHashSet<EdgeId> = AHashSet::new();
    let mut rewires = Vec::new();
    let mut warnings = Vec::new();
    for (cluster, (cluster_rewires, cluster_warnings)) in clusters.iter().zip(resolved) {
        warnings.extend(cluster_warnings);
        for rewire in cluster_rewires {
            if claimed.insert(rewire.edge) {
                rewires.push(rewire);
            } else {
                let msg = format!(
                    "edge {} already rewired by an earlier cluster; skipping claim by cluster {}",
                    rewire.edge.0, cluster.id.0
                );
                warn!("{msg}");
                warnings.push(msg);
            }
        }
    }

    (Resolution { rewires, dropped }, warnings)
}

/// Classify bbox candidates of one cluster: (covered edge idxs, touching
/// edge idxs).
fn scan_cluster<A>(
    edges: &[EdgeRecord<A>],
    usable: &[bool],
    index: &EdgeIndex,
    cluster: &Cluster,
) -> (Vec<usize>, Vec<usize>) {
    let Some(rect) = cluster.geometry.bounding_rect() else {
        return (Vec::new(), Vec::new());
    };
    let mut covered = Vec::new();
    let mut touching = Vec::new();
    for ei in index.locate(&rect) {
        if !usable[ei] {
            continue;
        }
        let matrix = edges[ei].geometry.relate(&cluster.geometry);
        if matrix.is_coveredby() {
            covered.push(ei);
        } else if matrix.is_touches() {
            touching.push(ei);
        }
    }
    (covered, touching)
}

fn resolve_cluster<A>(
    edges: &[EdgeRecord<A>],
    cluster: &Cluster,
    touching: &[usize],
    dropped: &AHashSet<EdgeId>,
    options: &SimplifyOptions,
) -> (Vec<Rewire>, Vec<String>) {
    let mut warnings = Vec::new();
    let center = cluster.center;
    let center_key = quantize(center.0, options.snap_grid);

    // Build one connector candidate per touching edge, bundled by the
    // quantized near endpoint.
    let mut bundles: AHashMap<(i64, i64), Vec<Candidate>> = AHashMap::new();
    for &edge_idx in touching {
        let edge = &edges[edge_idx];
        if dropped.contains(&edge.id) {
            continue;
        }
        let coords = &edge.geometry.0;
        let first = coords[0];
        let last = coords[coords.len() - 1];
        let d_first = center.euclidean_distance(&Point::from(first));
        let d_last = center.euclidean_distance(&Point::from(last));
        let (near, near_is_last) = if d_first < d_last {
            (first, false)
        } else {
            (last, true)
        };
        let key = quantize(near, options.snap_grid);
        if key == center_key {
            let msg = format!(
                "edge {}: near endpoint coincides with the center of cluster {}; left untouched",
                edge.id.0, cluster.id.0
            );
            warn!("{msg}");
            warnings.push(msg);
            continue;
        }
        bundles.entry(key).or_default().push(Candidate {
            edge_idx,
            near,
            near_is_last,
        });
    }

    let mut rewires = Vec::new();
    for (_, bundle) in bundles.into_iter().sorted_by_key(|(key, _)| *key) {
        if bundle.len() == 1 {
            rewires.push(to_rewire(edges, &bundle[0], center));
            continue;
        }
        match pick_continuation(edges, &bundle, center, options) {
            Some(winner_pos) => {
                debug!(
                    "cluster {}: bundle of {} resolved to edge {}",
                    cluster.id.0,
                    bundle.len(),
                    edges[bundle[winner_pos].edge_idx].id.0
                );
                rewires.push(to_rewire(edges, &bundle[winner_pos], center));
            }
            None => {
                let ids = bundle
                    .iter()
                    .map(|c| edges[c.edge_idx].id.0)
                    .collect::<Vec<_>>();
                let msg = format!(
                    "cluster {}: no stroke continuation among converging edges {ids:?}; none rewired",
                    cluster.id.0
                );
                warn!("{msg}");
                warnings.push(msg);
            }
        }
    }

    (rewires, warnings)
}

fn to_rewire<A>(edges: &[EdgeRecord<A>], candidate: &Candidate, center: Point<f64>) -> Rewire {
    Rewire {
        edge: edges[candidate.edge_idx].id,
        connector: LineString::new(vec![candidate.near, center.0]),
        near_is_last: candidate.near_is_last,
    }
}

/// Stroke disambiguation for a convergence bundle: returns the bundle
/// position of the one edge chained into the connector's stroke.
fn pick_continuation<A>(
    edges: &[EdgeRecord<A>],
    bundle: &[Candidate],
    center: Point<f64>,
    options: &SimplifyOptions,
) -> Option<usize> {
    let mut lines: Vec<LineString<f64>> = bundle
        .iter()
        .map(|c| edges[c.edge_idx].geometry.clone())
        .collect();
    // All bundle connectors are identical on the snap grid; one stands in
    // for the group.
    lines.push(LineString::new(vec![bundle[0].near, center.0]));
    let connector_line = lines.len() - 1;

    let strokes = build_strokes(&lines, options.angle_threshold, options.snap_grid);
    let stroke = strokes.line_stroke(connector_line)?;

    let winners: Vec<usize> = (0..bundle.len())
        .filter(|&pos| strokes.line_stroke(pos) == Some(stroke))
        .collect();
    match winners.as_slice() {
        [] => None,
        [only] => Some(*only),
        multiple => {
            // Deterministic fallback for the pathological case of several
            // fully-chained edges: lowest edge id.
            let best = multiple
                .iter()
                .copied()
                .min_by_key(|&pos| edges[bundle[pos].edge_idx].id)?;
            warn!(
                "stroke covered {} bundle edges; keeping edge {}",
                multiple.len(),
                edges[bundle[best].edge_idx].id.0
            );
            Some(best)
        }
    }
}
