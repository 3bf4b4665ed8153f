//! HNZ to pivot encoder
//!
//! Turns one `data_object` unit into a pivot object, using the exchange
//! directory to resolve the pivot identifier from the message type and
//! address. Structural problems abort the unit; everything else is a warning
//! and the conversion carries on with best-effort defaults.

use tracing::warn;

use hnz_pivot_model::data_object::GenericDataObject;
use hnz_pivot_model::error::{ConversionError, Result};
use hnz_pivot_model::exchange::{ExchangeDefinition, ExchangeDirectory};
use hnz_pivot_model::pivot::{PivotBuilder, PivotCdc, PivotClass};
use hnz_pivot_model::reading::Datapoint;
use hnz_pivot_model::timestamp::current_timestamp_ms;

/// Convert one legacy `data_object` into a `PIVOT` datapoint.
pub fn convert_data_object_to_pivot(
    asset_name: &str,
    value: &serde_json::Value,
    directory: &ExchangeDirectory,
    strict_status_typing: bool,
) -> Result<Datapoint> {
    let Some(gdo) = GenericDataObject::from_value(value) else {
        return Err(ConversionError::NotADictionary("data_object".to_string()));
    };

    let Some(do_type) = gdo.do_type.clone() else {
        return Err(ConversionError::MissingAttribute("do_type"));
    };
    let Some(address) = gdo.address else {
        return Err(ConversionError::MissingAttribute("do_addr"));
    };

    let Some(pivot_id) = directory.find_pivot_id(&do_type, address) else {
        return Err(ConversionError::UnmappedAddress {
            type_code: do_type,
            address,
        });
    };
    let Some(def) = directory.definition_for(pivot_id) else {
        return Err(ConversionError::UnknownPivotId {
            pivot_id: pivot_id.to_string(),
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

    // a TS or TM without do_value is a quality-only reading
    match do_type.as_str() {
        "TS" => encode_status(asset_name, &gdo, def, strict_status_typing),
        "TM" => encode_measure(asset_name, &gdo, def),
        "TC" | "TVC" => encode_acknowledgment(asset_name, &do_type, &gdo, def),
        _ => Err(ConversionError::UnknownTypeCode(do_type)),
    }
}

/// Whether the configured common-data-class can carry this message type.
fn check_pivot_type(do_type: &str, def: &ExchangeDefinition) -> bool {
    match (do_type, def.cdc()) {
        ("TS", Some(PivotCdc::Sps | PivotCdc::Dps)) => true,
        ("TM", Some(PivotCdc::Mv)) => true,
        ("TC" | "TVC", Some(PivotCdc::Spc | PivotCdc::Dpc | PivotCdc::Inc)) => true,
        _ => false,
    }
}

fn warn_pivot_type_mismatch(asset_name: &str, do_type: &str, def: &ExchangeDefinition) {
    warn!(
        asset = asset_name,
        pivot_type = %def.pivot_type,
        do_type,
        "invalid pivot type for data object type"
    );
}

fn warn_missing(asset_name: &str, attribute: &str, context: &str) {
    warn!(asset = asset_name, attribute, context, "missing attribute");
}

fn encode_status(
    asset_name: &str,
    gdo: &GenericDataObject,
    def: &ExchangeDefinition,
    strict_status_typing: bool,
) -> Result<Datapoint> {
    if !check_pivot_type("TS", def) {
        if strict_status_typing {
            return Err(ConversionError::PivotTypeMismatch {
                pivot_type: def.pivot_type.clone(),
                type_code: "TS".to_string(),
            });
        }
        warn_pivot_type_mismatch(asset_name, "TS", def);
    }
    if gdo.valid.is_none() {
        warn_missing(asset_name, "do_valid", "TS");
    }
    match gdo.cg {
        None => warn_missing(asset_name, "do_cg", "TS"),
        Some(false) => {
            // a state change event carries its own time information
            if gdo.ts.is_none() {
                warn_missing(asset_name, "do_ts", "TS CE");
            }
            if gdo.ts_iv.is_none() {
                warn_missing(asset_name, "do_ts_iv", "TS CE");
            }
            if gdo.ts_c.is_none() {
                warn_missing(asset_name, "do_ts_c", "TS CE");
            }
            if gdo.ts_s.is_none() {
                warn_missing(asset_name, "do_ts_s", "TS CE");
            }
        }
        Some(true) => {}
    }
    match gdo.outdated {
        None => warn_missing(asset_name, "do_outdated", "TS"),
        Some(false) => {
            if gdo.value.is_none() {
                warn_missing(asset_name, "do_value", "TS");
            }
        }
        Some(true) => {}
    }

    let mut builder = PivotBuilder::new(PivotClass::Gtis, &def.pivot_type);
    builder.identifier(&def.pivot_id);
    builder.cause(if gdo.cg.unwrap_or(false) { 20 } else { 3 });

    if gdo.value.is_some() {
        let mut status = false;
        if let Some(value) = gdo.value_i64() {
            check_value_range(asset_name, value, 0, 1, "TS");
            status = value != 0;
        }
        // a double point is reported through its string states
        if def.pivot_type == "DpsTyp" {
            builder.st_val_str(if status { "on" } else { "off" });
        } else {
            builder.st_val(status);
        }
    }

    builder.quality(
        gdo.valid.unwrap_or(0),
        gdo.outdated.unwrap_or(false),
        gdo.ts_c.unwrap_or(false),
        gdo.ts_s.unwrap_or(false),
    );
    append_timestamp(&mut builder, gdo.ts, gdo.ts_iv, gdo.ts_s);

    Ok(builder.into_datapoint())
}

fn encode_measure(
    asset_name: &str,
    gdo: &GenericDataObject,
    def: &ExchangeDefinition,
) -> Result<Datapoint> {
    if !check_pivot_type("TM", def) {
        warn_pivot_type_mismatch(asset_name, "TM", def);
    }
    if gdo.valid.is_none() {
        warn_missing(asset_name, "do_valid", "TM");
    }
    if gdo.an.is_none() {
        warn_missing(asset_name, "do_an", "TM");
    }
    match gdo.outdated {
        None => warn_missing(asset_name, "do_outdated", "TM"),
        Some(false) => {
            if gdo.value.is_none() {
                warn_missing(asset_name, "do_value", "TM");
            }
        }
        Some(true) => {}
    }

    let mut builder = PivotBuilder::new(PivotClass::Gtim, &def.pivot_type);
    builder.identifier(&def.pivot_id);
    builder.cause(1);

    if let Some(value) = gdo.value_i64() {
        match gdo.an.as_deref() {
            Some("TMA") => {
                check_value_range(asset_name, value, -127, 127, "TMA");
            }
            Some("TM8") => {
                check_value_range(asset_name, value, 0, 255, "TM8");
            }
            Some("TM16") => {
                check_value_range(asset_name, value, -32768, 32767, "TM16");
            }
            Some(unknown) => {
                warn!(asset = asset_name, do_an = unknown, "unknown do_an");
            }
            None => {}
        }
        builder.mag_i(value);
    }

    builder.quality(gdo.valid.unwrap_or(0), gdo.outdated.unwrap_or(false), false, false);
    // the legacy protocol carries no time for measures
    append_timestamp(&mut builder, None, None, None);

    Ok(builder.into_datapoint())
}

fn encode_acknowledgment(
    asset_name: &str,
    do_type: &str,
    gdo: &GenericDataObject,
    def: &ExchangeDefinition,
) -> Result<Datapoint> {
    if !check_pivot_type(do_type, def) {
        warn_pivot_type_mismatch(asset_name, do_type, def);
    }
    if gdo.valid.is_none() {
        warn_missing(asset_name, "do_valid", "ACK");
    }

    let mut builder = PivotBuilder::new(PivotClass::Gtic, &def.pivot_type);
    builder.identifier(&def.pivot_id);
    builder.cause(7);
    // the acknowledgment validity rides in the confirmation: 1 means rejected
    builder.confirmation(gdo.valid == Some(1));
    builder.quality(gdo.valid.unwrap_or(0), false, false, false);
    append_timestamp(&mut builder, None, None, None);

    Ok(builder.into_datapoint())
}

fn check_value_range(asset_name: &str, value: i64, min: i64, max: i64, kind: &str) -> bool {
    if value < min || value > max {
        warn!(
            asset = asset_name,
            value, min, max, kind, "do_value out of range"
        );
        return false;
    }
    true
}

/// Attach the source timestamp when the protocol carried one; otherwise stamp
/// the current time and mark the origin as substituted.
fn append_timestamp(
    builder: &mut PivotBuilder,
    ts: Option<i64>,
    ts_iv: Option<bool>,
    ts_s: Option<bool>,
) {
    match ts {
        Some(ts) => {
            builder.timestamp(ts, ts_s.unwrap_or(false));
            builder.tm_org(false);
            builder.tm_validity(ts_iv.unwrap_or(false));
        }
        None => {
            builder.timestamp(current_timestamp_ms(), false);
            builder.tm_org(true);
        }
    }
}
