use crate::error::SimplifyError;
use crate::incoming::{Resolution, Rewire};
use crate::records::{EdgeId, EdgeRecord};
use ahash::AHashMap;
use geo::LineString;

/// Reassemble the output edge table: pass untouched edges through in input
/// order, substitute rewired geometry in place, and drop cluster-interior
/// edges. Attribute payloads are cloned verbatim.
pub(crate) fn rewrite_edges<A: Clone>(
    edges: &[EdgeRecord<A>],
    resolution: &Resolution,
) -> Result<Vec<EdgeRecord<A>>, SimplifyError> {
    let by_edge: AHashMap<EdgeId, &Rewire> =
        resolution.rewires.iter().map(|r| (r.edge, r)).collect();

    let mut out = Vec::with_capacity(edges.len().saturating_sub(resolution.dropped.len()));
    for edge in edges {
        if resolution.dropped.contains(&edge.id) {
            continue;
        }
        match by_edge.get(&edge.id) {
            Some(rewire) => out.push(EdgeRecord {
                id: edge.id,
                geometry: merge_connector(&edge.geometry, rewire)?,
                attributes: edge.attributes.clone(),
            }),
            None => out.push(edge.clone()),
        }
    }
    Ok(out)
}

/// Merge an edge with its connector into one linestring. The connector was
/// built from the edge's own endpoint, so a mismatch here is an internal
/// invariant violation, not bad input.
fn merge_connector(
    geometry: &LineString<f64>,
    rewire: &Rewire,
) -> Result<LineString<f64>, SimplifyError> {
    let near = rewire.connector.0[0];
    let center = rewire.connector.0[1];
    let mut coords = geometry.0.clone();
    if rewire.near_is_last {
        if coords.last() != Some(&near) {
            return Err(SimplifyError::DisjointMerge(rewire.edge));
        }
        coords.push(center);
    } else {
        if coords.first() != Some(&near) {
            return Err(SimplifyError::DisjointMerge(rewire.edge));
        }
        coords.insert(0, center);
    }
    Ok(LineString::new(coords))
}
