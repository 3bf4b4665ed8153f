//! Generic Data Object
//!
//! Normalized form of one incoming legacy `data_object` unit. Every `do_*`
//! attribute is captured in a single pass, at most once, and only when its
//! payload kind matches; the consumer then decides which absences are fatal,
//! which warrant a warning and which are fine.

use serde_json::Value;

/// Decoded `data_object` attributes. `None` means absent or wrong kind.
#[derive(Debug, Clone, Default)]
pub struct GenericDataObject {
    pub do_type: Option<String>,
    pub station: Option<u32>,
    pub address: Option<u32>,
    /// Raw value payload; its kind is checked at the point of use.
    pub value: Option<Value>,
    pub valid: Option<u32>,
    pub an: Option<String>,
    pub cg: Option<bool>,
    pub outdated: Option<bool>,
    pub ts: Option<i64>,
    pub ts_iv: Option<bool>,
    pub ts_c: Option<bool>,
    pub ts_s: Option<bool>,
}

impl GenericDataObject {
    /// Capture the `do_*` attributes of a `data_object` tree.
    ///
    /// Returns `None` when the unit does not carry an attribute dictionary.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let mut gdo = GenericDataObject::default();
        for (name, v) in map {
            match name.as_str() {
                "do_type" => gdo.do_type = v.as_str().map(str::to_string),
                "do_station" => gdo.station = as_u32(v),
                "do_addr" => gdo.address = as_u32(v),
                "do_value" => gdo.value = Some(v.clone()),
                "do_valid" => gdo.valid = as_u32(v),
                "do_an" => gdo.an = v.as_str().map(str::to_string),
                "do_cg" => gdo.cg = as_flag(v),
                "do_outdated" => gdo.outdated = as_flag(v),
                "do_ts" => gdo.ts = v.as_i64(),
                "do_ts_iv" => gdo.ts_iv = as_flag(v),
                "do_ts_c" => gdo.ts_c = as_flag(v),
                "do_ts_s" => gdo.ts_s = as_flag(v),
                _ => {}
            }
        }
        Some(gdo)
    }

    /// Integer reading of the raw value, when it carries one.
    pub fn value_i64(&self) -> Option<i64> {
        self.value.as_ref().and_then(Value::as_i64)
    }
}

fn as_u32(v: &Value) -> Option<u32> {
    v.as_i64().and_then(|i| u32::try_from(i).ok())
}

fn as_flag(v: &Value) -> Option<bool> {
    v.as_i64().map(|i| i != 0)
}
