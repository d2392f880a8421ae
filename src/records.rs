use geo::{LineString, Polygon};

/// Stable identifier of a polygonal face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceId(pub u64);

/// Stable identifier of a network edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u64);

/// A polygonal face of the planar road network, bounded by edges.
#[derive(Clone, Debug)]
pub struct FaceRecord {
    pub id: FaceId,
    pub geometry: Polygon<f64>,
}

impl FaceRecord {
    pub fn new(id: u64, geometry: Polygon<f64>) -> Self {
        Self {
            id: FaceId(id),
            geometry,
        }
    }
}

/// A street segment with an opaque attribute payload.
///
/// The pipeline never inspects `attributes`; rewritten edges carry a clone of
/// the input payload, so the caller's attribute schema survives untouched.
/// Ids must be unique within one run.
#[derive(Clone, Debug)]
pub struct EdgeRecord<A> {
    pub id: EdgeId,
    pub geometry: LineString<f64>,
    pub attributes: A,
}

impl<A> EdgeRecord<A> {
    pub fn new(id: u64, geometry: LineString<f64>, attributes: A) -> Self {
        Self {
            id: EdgeId(id),
            geometry,
            attributes,
        }
    }
}
