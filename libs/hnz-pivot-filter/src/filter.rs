//! Conversion filter
//!
//! Routes each unit of an ingest batch to the encoder or decoder based on its
//! wrapper name, drops units that fail conversion, and keeps the exchange
//! directory swappable under reconfiguration without ever interleaving a
//! rebuild with an in-flight batch.

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use hnz_pivot_model::exchange::ExchangeDirectory;
use hnz_pivot_model::reading::Reading;

use crate::decoder::convert_pivot_to_hnz;
use crate::encoder::convert_data_object_to_pivot;

/// Wrapper name of a legacy telemetry/command unit.
const DATA_OBJECT: &str = "data_object";
/// Wrapper name of a pivot unit.
const PIVOT: &str = "PIVOT";
/// Wrapper name of connection events, forwarded unchanged.
const SOUTH_EVENT: &str = "south_event";

/// Tuning knobs of the filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterOptions {
    /// Abort (instead of warn on) status conversions whose configured
    /// common-data-class cannot carry a status point.
    pub strict_status_typing: bool,
}

/// Bidirectional HNZ/pivot conversion filter.
///
/// Ingest holds the directory read lock for a whole batch and reconfiguration
/// takes the write lock, so a rebuild fully completes before or after any
/// given batch, never in the middle of one.
pub struct HnzPivotFilter {
    directory: RwLock<ExchangeDirectory>,
    options: FilterOptions,
}

impl HnzPivotFilter {
    /// Build a filter from the exchange configuration text.
    pub fn new(exchange_config: &str) -> Self {
        Self::with_options(exchange_config, FilterOptions::default())
    }

    pub fn with_options(exchange_config: &str, options: FilterOptions) -> Self {
        Self {
            directory: RwLock::new(ExchangeDirectory::import(exchange_config)),
            options,
        }
    }

    /// Whether the last imported configuration parsed without defect.
    pub fn is_complete(&self) -> bool {
        self.directory.read().is_complete()
    }

    /// Rebuild the exchange directory from a new configuration text.
    ///
    /// The new directory replaces the old one in a single swap.
    pub fn reconfigure(&self, exchange_config: &str) {
        debug!("reconfigure called");
        let directory = ExchangeDirectory::import(exchange_config);
        *self.directory.write() = directory;
    }

    /// Transform one batch of readings.
    ///
    /// Units that fail conversion are dropped individually; readings left
    /// without datapoints are removed. The returned batch is never larger
    /// than the input.
    pub fn ingest(&self, mut readings: Vec<Reading>) -> Vec<Reading> {
        let directory = self.directory.read();
        info!(readings = readings.len(), "ingest");

        for reading in &mut readings {
            let asset_name = reading.asset_name.clone();
            let mut converted = Vec::with_capacity(reading.datapoints.len());

            for dp in reading.datapoints.drain(..) {
                match dp.name.as_str() {
                    DATA_OBJECT => match convert_data_object_to_pivot(
                        &asset_name,
                        &dp.value,
                        &directory,
                        self.options.strict_status_typing,
                    ) {
                        Ok(pivot) => converted.push(pivot),
                        Err(err) => {
                            error!(asset = %asset_name, %err, "failed to convert data_object");
                        }
                    },
                    PIVOT => match convert_pivot_to_hnz(&asset_name, &dp, &directory) {
                        Ok(dps) => converted.extend(dps),
                        Err(err) => {
                            error!(asset = %asset_name, %err, "failed to convert PIVOT object");
                        }
                    },
                    SOUTH_EVENT => {
                        debug!(asset = %asset_name, "forwarding south_event unchanged");
                        converted.push(dp);
                    }
                    other => {
                        warn!(asset = %asset_name, name = other, "unknown reading type, message removed");
                    }
                }
            }

            reading.datapoints = converted;
        }

        readings.retain(|reading| !reading.datapoints.is_empty());
        debug!(readings = readings.len(), "converted readings");
        readings
    }
}
