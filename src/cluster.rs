// ===========================================================================
// Roundabout Cluster Builder
// ===========================================================================
//
// A roundabout is rarely a single clean face. Slip lanes, pedestrian islands
// and stub faces sit right next to the circular core, and collapsing the core
// alone leaves their geometry dangling. This module grows each core face into
// a cluster by absorbing neighbors that plausibly belong to the same
// composition:
//
// 1. Candidate faces come from the shared face index (bbox query, refined
//    with an exact intersection test against the core).
// 2. A neighbor must not be larger than the core itself.
// 3. The directed Hausdorff distance from the neighbor to the core must stay
//    strictly below the core's bounding-box diameter, which rejects long
//    service-road slivers that merely touch the circle. The directed form
//    matters: the symmetric maximum is dominated by the core's far pole and
//    would reject every exterior neighbor outright.
//
// The cluster geometry keeps one polygon part per retained face. Center
// computation needs the parts individually, so repair of an invalid
// composition only ever replaces the combined query geometry, never the
// per-face part list.
// ===========================================================================

use crate::classify::FaceMetrics;
use crate::options::SimplifyOptions;
use crate::records::{FaceId, FaceRecord};
use crate::spatial::FaceIndex;
use geo::{BooleanOps, BoundingRect, CoordsIter, Intersects, MultiPolygon, Polygon, Validation};
use log::{debug, warn};
use rayon::prelude::*;

/// A core face plus its absorbed neighbors, before center placement.
#[derive(Clone, Debug)]
pub(crate) struct ClusterShape {
    /// Id of the core face, which also identifies the cluster.
    pub id: FaceId,
    /// Metrics position of the core face.
    pub core: usize,
    /// Metrics positions of every constituent face, core first.
    pub parts: Vec<usize>,
    /// Combined multi-part geometry, validity-repaired if the raw
    /// composition self-intersects.
    pub geometry: MultiPolygon<f64>,
}

/// Grow every core face into a cluster. Workers share the immutable face
/// table and index; results come back in core-id order regardless of
/// scheduling.
pub(crate) fn build_clusters(
    faces: &[FaceRecord],
    metrics: &[FaceMetrics],
    cores: &[usize],
    index: &FaceIndex,
    options: &SimplifyOptions,
) -> (Vec<ClusterShape>, Vec<String>) {
    let results: Vec<(Option<ClusterShape>, Vec<String>)> = cores
        .par_iter()
        .map(|&core| build_one(faces, metrics, core, index, options))
        .collect();

    let mut clusters = Vec::with_capacity(results.len());
    let mut warnings = Vec::new();
    for (cluster, w) in results {
        clusters.extend(cluster);
        warnings.extend(w);
    }
    (clusters, warnings)
}

fn build_one(
    faces: &[FaceRecord],
    metrics: &[FaceMetrics],
    core: usize,
    index: &FaceIndex,
    options: &SimplifyOptions,
) -> (Option<ClusterShape>, Vec<String>) {
    let core_m = &metrics[core];
    let core_poly = &faces[core_m.face_idx].geometry;
    let mut warnings = Vec::new();

    let Some(rect) = core_poly.bounding_rect() else {
        // Cannot happen for classified faces; treat as a degenerate cluster.
        warn!("cluster {}: core face lost its bounding box", core_m.id.0);
        warnings.push(format!("cluster {}: degenerate core face", core_m.id.0));
        return (None, warnings);
    };
    let diameter = rect.width().max(rect.height());

    let mut parts = vec![core];
    if options.include_adjacent {
        for cand in index.locate(&rect) {
            if cand == core {
                continue;
            }
            let cand_m = &metrics[cand];
            if cand_m.area > core_m.area {
                continue;
            }
            let cand_poly = &faces[cand_m.face_idx].geometry;
            if !cand_poly.intersects(core_poly) {
                continue;
            }
            // Strictly below the diameter; boundary equality excludes.
            if directed_hausdorff(cand_poly, core_poly) < diameter {
                parts.push(cand);
            }
        }
    }

    let part_polys: Vec<&Polygon<f64>> =
        parts.iter().map(|&p| &faces[metrics[p].face_idx].geometry).collect();
    let mut geometry = MultiPolygon::new(part_polys.iter().map(|p| (*p).clone()).collect());
    if !geometry.is_valid() {
        debug!(
            "cluster {}: composed geometry invalid, repairing {} parts",
            core_m.id.0,
            parts.len()
        );
        let mut repaired = MultiPolygon::new(vec![part_polys[0].clone()]);
        for poly in &part_polys[1..] {
            repaired = repaired.union(&MultiPolygon::new(vec![(*poly).clone()]));
        }
        geometry = repaired;
        if geometry.0.is_empty() {
            warn!("cluster {}: validity repair emptied the geometry", core_m.id.0);
            warnings.push(format!(
                "cluster {}: dropped, no valid geometry after repair",
                core_m.id.0
            ));
            return (None, warnings);
        }
    }

    debug!(
        "cluster {}: {} part(s), bbox diameter {diameter}",
        core_m.id.0,
        parts.len()
    );
    (
        Some(ClusterShape {
            id: core_m.id,
            core,
            parts,
            geometry,
        }),
        warnings,
    )
}

/// Directed discrete Hausdorff distance: how far `from` extends away from
/// `to`, measured over polygon vertices.
fn directed_hausdorff(from: &Polygon<f64>, to: &Polygon<f64>) -> f64 {
    from.coords_iter().fold(0.0f64, |max_d, p| {
        let min_d = to.coords_iter().fold(f64::INFINITY, |min_d, q| {
            min_d.min((p.x - q.x).hypot(p.y - q.y))
        });
        max_d.max(min_d)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::metrics_for_test;
    use geo::{Polygon, coord, polygon};
    use std::f64::consts::PI;

    fn circle(cx: f64, cy: f64, radius: f64) -> Polygon<f64> {
        let n = 32;
        let ring: Vec<_> = (0..=n)
            .map(|i| {
                let theta = 2.0 * PI * (i % n) as f64 / n as f64;
                coord! { x: cx + radius * theta.cos(), y: cy + radius * theta.sin() }
            })
            .collect();
        Polygon::new(ring.into(), vec![])
    }

    /// Rectangle flush against the right side of a radius-10 circle at the
    /// origin, spanning x in [10, 10+width].
    fn side_rect(width: f64, height: f64) -> Polygon<f64> {
        polygon![
            (x: 10.0, y: -height / 2.0),
            (x: 10.0 + width, y: -height / 2.0),
            (x: 10.0 + width, y: height / 2.0),
            (x: 10.0, y: height / 2.0),
            (x: 10.0, y: -height / 2.0),
        ]
    }

    fn build(faces: Vec<FaceRecord>, options: &SimplifyOptions) -> Vec<ClusterShape> {
        let metrics = metrics_for_test(&faces);
        let cores = vec![0]; // circle is always pushed first
        let index = FaceIndex::build(&faces, &metrics);
        let (clusters, warnings) = build_clusters(&faces, &metrics, &cores, &index, options);
        assert!(warnings.is_empty(), "{warnings:?}");
        clusters
    }

    #[test]
    fn directed_hausdorff_is_asymmetric() {
        let core = circle(0.0, 0.0, 10.0);
        let sliver = side_rect(5.0, 4.0);
        // The sliver stays close to the circle...
        assert!(directed_hausdorff(&sliver, &core) < 6.0);
        // ...but the circle's far pole is a full diameter from the sliver.
        assert!(directed_hausdorff(&core, &sliver) > 20.0);
    }

    #[test]
    fn absorbs_small_touching_neighbor() {
        let faces = vec![
            FaceRecord::new(0, circle(0.0, 0.0, 10.0)),
            FaceRecord::new(1, side_rect(5.0, 4.0)),
        ];
        let clusters = build(faces, &SimplifyOptions::default());
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].parts.len(), 2);
    }

    #[test]
    fn rejects_neighbor_larger_than_core() {
        let faces = vec![
            FaceRecord::new(0, circle(0.0, 0.0, 10.0)),
            FaceRecord::new(1, side_rect(30.0, 30.0)),
        ];
        let clusters = build(faces, &SimplifyOptions::default());
        assert_eq!(clusters[0].parts.len(), 1);
    }

    #[test]
    fn rejects_neighbor_beyond_core_diameter() {
        // Thin but long: small area, yet its far end is >20 units from the
        // circle, so the Hausdorff bound throws it out.
        let faces = vec![
            FaceRecord::new(0, circle(0.0, 0.0, 10.0)),
            FaceRecord::new(1, side_rect(25.0, 1.0)),
        ];
        let clusters = build(faces, &SimplifyOptions::default());
        assert_eq!(clusters[0].parts.len(), 1);
    }

    #[test]
    fn rejects_disjoint_neighbor() {
        let faces = vec![
            FaceRecord::new(0, circle(0.0, 0.0, 10.0)),
            FaceRecord::new(1, circle(14.0, 0.0, 2.0)),
        ];
        let clusters = build(faces, &SimplifyOptions::default());
        assert_eq!(clusters[0].parts.len(), 1);
    }

    #[test]
    fn include_adjacent_off_keeps_core_alone() {
        let faces = vec![
            FaceRecord::new(0, circle(0.0, 0.0, 10.0)),
            FaceRecord::new(1, side_rect(5.0, 4.0)),
        ];
        let options = SimplifyOptions {
            include_adjacent: false,
            ..Default::default()
        };
        let clusters = build(faces, &options);
        assert_eq!(clusters[0].parts.len(), 1);
    }
}
