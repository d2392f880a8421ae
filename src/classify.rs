use crate::error::SimplifyError;
use crate::options::SimplifyOptions;
use crate::records::{FaceId, FaceRecord};
use geo::{Area, BoundingRect, EuclideanLength};
use itertools::Itertools;
use log::{debug, trace, warn};
use ordered_float::OrderedFloat;
use std::f64::consts::PI;

/// Shape measurements for one input face, computed once per run.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FaceMetrics {
    /// Position in the caller's face slice.
    pub face_idx: usize,
    pub id: FaceId,
    pub area: f64,
    pub perimeter: f64,
    pub compactness: f64,
}

/// Circular compactness: ratio of the face area to the area of a circle with
/// the same perimeter. 1.0 for a perfect circle, lower for stretched shapes.
fn circular_compactness(area: f64, perimeter: f64) -> f64 {
    4.0 * PI * area / (perimeter * perimeter)
}

/// Measure every face, skipping (lenient) or failing on (strict) faces whose
/// geometry is degenerate beyond use.
pub(crate) fn compute_metrics(
    faces: &[FaceRecord],
    strict: bool,
    warnings: &mut Vec<String>,
) -> Result<Vec<FaceMetrics>, SimplifyError> {
    let mut metrics = Vec::with_capacity(faces.len());
    for (face_idx, face) in faces.iter().enumerate() {
        let area = face.geometry.unsigned_area();
        let perimeter = face.geometry.exterior().euclidean_length();
        if area <= 0.0 || perimeter <= 0.0 || face.geometry.bounding_rect().is_none() {
            let reason = format!(
                "degenerate face (area {area}, perimeter {perimeter})"
            );
            if strict {
                return Err(SimplifyError::InvalidGeometry {
                    kind: "face",
                    id: face.id.0,
                    reason,
                });
            }
            warn!("skipping face {}: {}", face.id.0, reason);
            warnings.push(format!("face {}: {}", face.id.0, reason));
            continue;
        }
        let m = FaceMetrics {
            face_idx,
            id: face.id,
            area,
            perimeter,
            compactness: circular_compactness(area, perimeter),
        };
        trace!(
            "face {}: area {:.3}, perimeter {:.3}, compactness {:.3}",
            m.id.0, m.area, m.perimeter, m.compactness
        );
        metrics.push(m);
    }
    Ok(metrics)
}

/// Linear-interpolated quantile over sorted samples.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted {
        [] => 0.0,
        [only] => *only,
        _ => {
            let h = (sorted.len() - 1) as f64 * q;
            let lo = h.floor() as usize;
            let hi = (lo + 1).min(sorted.len() - 1);
            sorted[lo] + (sorted[hi] - sorted[lo]) * (h - lo as f64)
        }
    }
}

/// Select roundabout core faces: compact enough, and strictly below the area
/// quantile of the full face population so whole blocks never qualify.
///
/// Returns positions into `metrics`, ordered by face id.
pub(crate) fn select_cores(metrics: &[FaceMetrics], options: &SimplifyOptions) -> Vec<usize> {
    let areas: Vec<f64> = metrics
        .iter()
        .map(|m| m.area)
        .sorted_by_key(|a| OrderedFloat(*a))
        .collect();
    let area_threshold = quantile_sorted(&areas, options.area_percentile);
    debug!(
        "area threshold at p{}: {area_threshold}",
        options.area_percentile
    );

    metrics
        .iter()
        .enumerate()
        .filter(|(_, m)| m.compactness > options.circom_threshold && m.area < area_threshold)
        .map(|(pos, _)| pos)
        .sorted_by_key(|pos| metrics[*pos].id)
        .collect()
}

#[cfg(test)]
pub(crate) fn metrics_for_test(faces: &[FaceRecord]) -> Vec<FaceMetrics> {
    let mut warnings = Vec::new();
    compute_metrics(faces, true, &mut warnings).expect("test faces must be valid")
}
