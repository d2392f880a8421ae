use crate::classify::FaceMetrics;
use crate::records::{EdgeRecord, FaceRecord};
use geo::{BoundingRect, Rect};
use rstar::{AABB, RTree, RTreeObject};

struct SpatialItem {
    pos: usize,
    env: AABB<[f64; 2]>,
}

impl RTreeObject for SpatialItem {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.env
    }
}

fn rect_envelope(rect: &Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners(
        [rect.min().x, rect.min().y],
        [rect.max().x, rect.max().y],
    )
}

/// Read-only bounding-box index over the classified faces.
///
/// Built once per run and shared by reference across cluster workers.
/// Queries return candidate positions into the metrics table; callers refine
/// with exact predicates.
pub(crate) struct FaceIndex {
    tree: RTree<SpatialItem>,
}

impl FaceIndex {
    pub fn build(faces: &[FaceRecord], metrics: &[FaceMetrics]) -> Self {
        let items: Vec<SpatialItem> = metrics
            .iter()
            .enumerate()
            .filter_map(|(pos, m)| {
                let rect = faces[m.face_idx].geometry.bounding_rect()?;
                Some(SpatialItem {
                    pos,
                    env: rect_envelope(&rect),
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    /// Metrics positions whose face bounding box intersects `rect`, sorted
    /// for deterministic iteration.
    pub fn locate(&self, rect: &Rect<f64>) -> Vec<usize> {
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&rect_envelope(rect))
            .map(|item| item.pos)
            .collect();
        hits.sort_unstable();
        hits
    }
}

/// Read-only bounding-box index over the usable input edges.
pub(crate) struct EdgeIndex {
    tree: RTree<SpatialItem>,
}

impl EdgeIndex {
    pub fn build<A>(edges: &[EdgeRecord<A>], usable: &[bool]) -> Self {
        let items: Vec<SpatialItem> = edges
            .iter()
            .enumerate()
            .filter(|(pos, _)| usable[*pos])
            .filter_map(|(pos, e)| {
                let rect = e.geometry.bounding_rect()?;
                Some(SpatialItem {
                    pos,
                    env: rect_envelope(&rect),
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    /// Edge positions whose bounding box intersects `rect`, sorted.
    pub fn locate(&self, rect: &Rect<f64>) -> Vec<usize> {
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&rect_envelope(rect))
            .map(|item| item.pos)
            .collect();
        hits.sort_unstable();
        hits
    }
}
