use crate::classify::FaceMetrics;
use crate::cluster::ClusterShape;
use crate::error::SimplifyError;
use crate::options::CenterStrategy;
use crate::records::{FaceId, FaceRecord};
use geo::{Centroid, CoordsIter, MultiPolygon, Point};
use log::warn;

/// A roundabout cluster with its representative point placed.
#[derive(Clone, Debug)]
pub(crate) struct Cluster {
    pub id: FaceId,
    pub parts: Vec<usize>,
    pub geometry: MultiPolygon<f64>,
    pub center: Point<f64>,
}

/// Place one center point per cluster shape.
///
/// Strategies always work on the constituent face parts, never on the
/// repaired query geometry, so an overlapping composition cannot shift the
/// center.
pub(crate) fn place_centers(
    shapes: Vec<ClusterShape>,
    faces: &[FaceRecord],
    metrics: &[FaceMetrics],
    strategy: CenterStrategy,
    strict: bool,
    warnings: &mut Vec<String>,
) -> Result<Vec<Cluster>, SimplifyError> {
    let mut clusters = Vec::with_capacity(shapes.len());
    for shape in shapes {
        match center_of(&shape, faces, metrics, strategy) {
            Some(center) => clusters.push(Cluster {
                id: shape.id,
                parts: shape.parts,
                geometry: shape.geometry,
                center,
            }),
            None => {
                let reason = "no center point could be derived".to_string();
                if strict {
                    return Err(SimplifyError::InvalidGeometry {
                        kind: "cluster",
                        id: shape.id.0,
                        reason,
                    });
                }
                warn!("cluster {}: {}", shape.id.0, reason);
                warnings.push(format!("cluster {}: {}", shape.id.0, reason));
            }
        }
    }
    Ok(clusters)
}

fn center_of(
    shape: &ClusterShape,
    faces: &[FaceRecord],
    metrics: &[FaceMetrics],
    strategy: CenterStrategy,
) -> Option<Point<f64>> {
    match strategy {
        CenterStrategy::Centroid => faces[metrics[shape.core].face_idx].geometry.centroid(),
        CenterStrategy::Mean => {
            // Mean over every exterior-ring coordinate of every part. The
            // closing coordinate counts like any other vertex.
            let mut sx = 0.0;
            let mut sy = 0.0;
            let mut n = 0usize;
            for &part in &shape.parts {
                for c in faces[metrics[part].face_idx].geometry.exterior().coords_iter() {
                    sx += c.x;
                    sy += c.y;
                    n += 1;
                }
            }
            (n > 0).then(|| Point::new(sx / n as f64, sy / n as f64))
        }
    }
}
