//! # hnz-pivot-model
//!
//! Data model and codecs for translating between the legacy HNZ point
//! encoding and the pivot information model used between protocol adapters.
//!
//! This crate holds the passive pieces of the translation: the exchange
//! directory built from configuration, the normalized form of an incoming
//! legacy unit, the pivot object tree with its quality and timestamp
//! attributes, and the millisecond/fraction-of-second timestamp codec. The
//! conversion engine that drives them lives in `hnz-pivot-filter`.

pub mod data_object;
pub mod error;
pub mod exchange;
pub mod pivot;
pub mod reading;
pub mod timestamp;
pub mod tree;

pub use data_object::GenericDataObject;
pub use error::{ConversionError, Result};
pub use exchange::{ExchangeDefinition, ExchangeDirectory};
pub use pivot::{
    DetailQuality, PivotBuilder, PivotCdc, PivotClass, PivotObject, Source, Validity,
};
pub use reading::{Datapoint, Reading};
pub use timestamp::{current_timestamp_ms, from_epoch_ms, to_epoch_ms, PivotTimestamp};
