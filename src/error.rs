use crate::records::EdgeId;
use thiserror::Error;

/// Errors surfaced by the roundabout collapse pipeline.
///
/// Recoverable per-record conditions (a single degenerate face, a cluster
/// that loses all its parts) are reported as warnings in lenient mode and
/// only become `InvalidGeometry` errors under `SimplifyOptions::strict`.
/// `DisjointMerge` is always fatal: it signals a broken internal invariant,
/// never bad input.
#[derive(Debug, Error)]
pub enum SimplifyError {
    #[error("invalid geometry for {kind} {id}: {reason}")]
    InvalidGeometry {
        kind: &'static str,
        id: u64,
        reason: String,
    },

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("edge {0:?} does not share an endpoint with its connector")]
    DisjointMerge(EdgeId),

    #[error("polygonization failed: {0}")]
    Polygonization(String),
}
