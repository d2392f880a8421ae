// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

//! Roundabout collapse for road-network graphs.
//!
//! Takes a planar edge set and its polygonal faces, finds the faces shaped
//! like roundabouts, clusters them with their small adjacent faces, and
//! rewires every street touching a cluster to a single center point while
//! dropping the roundabout's interior geometry. Edge attributes are opaque
//! to the pipeline and survive untouched.
//!
//! ```no_run
//! use ranunculus::{SimplifyOptions, simplify_roundabouts};
//! # let edges: Vec<ranunculus::EdgeRecord<()>> = vec![];
//! # let faces: Vec<ranunculus::FaceRecord> = vec![];
//! let simplified = simplify_roundabouts(&edges, &faces, &SimplifyOptions::default())?;
//! # Ok::<(), ranunculus::SimplifyError>(())
//! ```

#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::arc_with_non_send_sync,
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::bytes_nth,
    clippy::deprecated_clippy_cfg_attr,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::cmp_null,
    clippy::op_ref
)]

mod center;
mod classify;
mod cluster;
mod error;
mod incoming;
mod options;
mod pipeline;
mod records;
mod rewrite;
mod spatial;
mod strokes;

pub use error::SimplifyError;
pub use options::{CenterStrategy, SimplifyOptions};
pub use pipeline::{
    Polygonizer, SimplifyReport, simplify_roundabouts, simplify_roundabouts_derived,
    simplify_roundabouts_report,
};
pub use records::{EdgeId, EdgeRecord, FaceId, FaceRecord};
