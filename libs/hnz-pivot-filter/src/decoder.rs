//! Pivot to HNZ decoder
//!
//! Parses one `PIVOT` unit and renders its legacy counterpart: a telemetry
//! object for status points and measured values, a command object for
//! commands and their acknowledgments.

use tracing::warn;

use hnz_pivot_model::error::{ConversionError, Result};
use hnz_pivot_model::exchange::ExchangeDirectory;
use hnz_pivot_model::pivot::{PivotClass, PivotObject};
use hnz_pivot_model::reading::Datapoint;

/// Convert one `PIVOT` datapoint into its legacy datapoints.
pub fn convert_pivot_to_hnz(
    asset_name: &str,
    dp: &Datapoint,
    directory: &ExchangeDirectory,
) -> Result<Vec<Datapoint>> {
    let pivot = PivotObject::parse(dp)?;

    let Some(def) = directory.definition_for(&pivot.identifier) else {
        return Err(ConversionError::UnknownPivotId {
            pivot_id: pivot.identifier.clone(),
            known: directory.pivot_ids().join(", "),
        });
    };
    if asset_name != def.label {
        warn!(
            asset = asset_name,
            label = %def.label,
            pivot_id = %def.pivot_id,
            "input label does not match configured label"
        );
    }

    match pivot.class {
        PivotClass::Gtis | PivotClass::Gtim => Ok(pivot.to_hnz_telemetry(def)),
        PivotClass::Gtic => Ok(pivot.to_hnz_command(def)),
    }
}
