// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

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
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::op_ref
)]

//! Topology-preserving simplification of administrative boundary ways.
//!
//! Ways are reduced with Douglas-Peucker on the sphere. Simplified segments
//! of all ways are then checked against each other, and spans whose
//! simplification introduced a crossing are refined until the simplified
//! network is as free of crossings as the input.

pub mod boundary_segment;
pub mod conflicts;
pub mod error;
pub mod geo_distance;
pub mod osm_types;
pub mod pipeline;
pub mod repair;
pub mod simplifier;


pub use error::SimplifyError;
pub use pipeline::{SimplificationOutcome, SimplifyConfig, simplify_boundaries};
