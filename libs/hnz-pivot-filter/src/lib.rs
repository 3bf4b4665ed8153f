//! # hnz-pivot-filter
//!
//! Bidirectional conversion engine between the legacy HNZ point encoding and
//! the pivot information model. The filter inspects each unit of an ingest
//! batch and routes it through the matching direction:
//!
//! - `data_object` units (HNZ telemetry and command acknowledgments) become
//!   typed pivot objects;
//! - `PIVOT` units become legacy telemetry or command objects;
//! - `south_event` units pass through unchanged.
//!
//! Malformed units are dropped one by one without aborting the batch, and the
//! exchange directory can be swapped by reconfiguration between batches.

pub mod decoder;
pub mod encoder;
pub mod filter;

pub use decoder::convert_pivot_to_hnz;
pub use encoder::convert_data_object_to_pivot;
pub use filter::{FilterOptions, HnzPivotFilter};

// Re-export the model types used at the filter boundary.
pub use hnz_pivot_model::{Datapoint, ExchangeDirectory, Reading};
