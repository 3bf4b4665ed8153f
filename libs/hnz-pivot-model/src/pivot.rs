//! Pivot object model
//!
//! The pivot side of the translation: logical-node classes, common-data
//! classes, quality attributes, and the two halves of the codec. `PivotObject`
//! parses an incoming pivot tree into a flat record; `PivotBuilder` assembles
//! an outgoing pivot tree attribute by attribute.

use std::fmt;

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::{ConversionError, Result};
use crate::exchange::ExchangeDefinition;
use crate::reading::Datapoint;
use crate::timestamp::{from_epoch_ms, PivotTimestamp};
use crate::tree::{child, child_i64, child_str, read_bool, value_i64, value_str};

/// Name of the wrapper datapoint carrying a pivot object.
pub const PIVOT_ROOT: &str = "PIVOT";

/// Origin tag stamped on every pivot object produced by this engine.
pub const COMING_FROM: &str = "hnzip";

// ============================================================================
// Enumerations
// ============================================================================

/// Information-model class of a pivot object (the logical-node wrapper).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotClass {
    /// Single/double status point
    Gtis,
    /// Measured value
    Gtim,
    /// Command or command acknowledgment
    Gtic,
}

impl PivotClass {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GTIS" => Some(Self::Gtis),
            "GTIM" => Some(Self::Gtim),
            "GTIC" => Some(Self::Gtic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gtis => "GTIS",
            Self::Gtim => "GTIM",
            Self::Gtic => "GTIC",
        }
    }
}

impl fmt::Display for PivotClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Common-data-class of the value payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotCdc {
    Sps,
    Dps,
    Mv,
    Spc,
    Dpc,
    Inc,
}

impl PivotCdc {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SpsTyp" => Some(Self::Sps),
            "DpsTyp" => Some(Self::Dps),
            "MvTyp" => Some(Self::Mv),
            "SpcTyp" => Some(Self::Spc),
            "DpcTyp" => Some(Self::Dpc),
            "IncTyp" => Some(Self::Inc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sps => "SpsTyp",
            Self::Dps => "DpsTyp",
            Self::Mv => "MvTyp",
            Self::Spc => "SpcTyp",
            Self::Dpc => "DpcTyp",
            Self::Inc => "IncTyp",
        }
    }

    /// Compatibility matrix between value payloads and logical-node classes.
    pub fn matches_class(&self, class: PivotClass) -> bool {
        match class {
            PivotClass::Gtis => matches!(self, Self::Sps | Self::Dps),
            PivotClass::Gtim => matches!(self, Self::Mv),
            PivotClass::Gtic => matches!(self, Self::Spc | Self::Dpc | Self::Inc),
        }
    }
}

impl fmt::Display for PivotCdc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Quality validity of a pivot value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validity {
    #[default]
    Good,
    Invalid,
    Reserved,
    Questionable,
}

impl Validity {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "good" => Some(Self::Good),
            "invalid" => Some(Self::Invalid),
            "reserved" => Some(Self::Reserved),
            "questionable" => Some(Self::Questionable),
            _ => None,
        }
    }
}

/// Quality source of a pivot value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Source {
    #[default]
    Process,
    Substituted,
}

/// Detail-quality flags nested under `q.DetailQuality`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetailQuality {
    pub bad_reference: bool,
    pub failure: bool,
    pub inconsistent: bool,
    pub inaccurate: bool,
    pub old_data: bool,
    pub oscillatory: bool,
    pub out_of_range: bool,
    pub overflow: bool,
}

// ============================================================================
// Parsed pivot object (pivot -> legacy direction)
// ============================================================================

/// Flat record of one parsed pivot object.
#[derive(Debug, Clone)]
pub struct PivotObject {
    pub class: PivotClass,
    pub cdc: PivotCdc,
    pub identifier: String,
    pub coming_from: Option<String>,
    pub cause: i64,
    pub confirmation: bool,
    pub validity: Validity,
    pub source: Source,
    pub detail_quality: DetailQuality,
    pub operator_blocked: bool,
    pub test: bool,
    pub timestamp: Option<PivotTimestamp>,
    pub timestamp_substituted: bool,
    pub timestamp_invalid: bool,
    /// Decoded scalar, normalized to an integer (on = 1, off = 0).
    pub value: i64,
}

impl PivotObject {
    /// Parse a `PIVOT` datapoint into its flat record.
    pub fn parse(dp: &Datapoint) -> Result<Self> {
        if dp.name != PIVOT_ROOT {
            return Err(ConversionError::NotAPivot);
        }
        let root = dp
            .value
            .as_object()
            .ok_or_else(|| ConversionError::NotADictionary(PIVOT_ROOT.to_string()))?;

        let mut class = None;
        let mut unknown = Vec::new();
        for (name, value) in root {
            match PivotClass::parse(name) {
                Some(found) => {
                    class = Some((found, value));
                    break;
                }
                None => unknown.push(name.clone()),
            }
        }
        let Some((class, ln)) = class else {
            return Err(ConversionError::UnknownPivotClass(unknown.join(", ")));
        };

        let identifier = child_str(ln, "Identifier")?.to_string();
        let coming_from = match child(ln, "ComingFrom") {
            Some(v) => Some(value_str(v, "ComingFrom")?.to_string()),
            None => None,
        };
        let cause = match child(ln, "Cause") {
            Some(node) => child_i64(node, "stVal")?,
            None => 0,
        };
        let confirmation = match child(ln, "Confirmation") {
            Some(node) => child_i64(node, "stVal")? > 0,
            None => false,
        };
        let timestamp_substituted = match child(ln, "TmOrg") {
            Some(node) => child_str(node, "stVal")? == "substituted",
            None => false,
        };
        let timestamp_invalid = match child(ln, "TmValidity") {
            Some(node) => child_str(node, "stVal")? == "invalid",
            None => false,
        };

        let (cdc, cdc_node) = find_cdc(ln)?;
        if !cdc.matches_class(class) {
            return Err(ConversionError::CdcClassMismatch {
                cdc: cdc.as_str().to_string(),
                class: class.as_str().to_string(),
            });
        }

        let mut pivot = PivotObject {
            class,
            cdc,
            identifier,
            coming_from,
            cause,
            confirmation,
            validity: Validity::default(),
            source: Source::default(),
            detail_quality: DetailQuality::default(),
            operator_blocked: false,
            test: false,
            timestamp: None,
            timestamp_substituted,
            timestamp_invalid,
            value: 0,
        };

        match child(cdc_node, "q") {
            Some(q) => pivot.parse_quality(q)?,
            None => debug!(identifier = %pivot.identifier, "pivot object carries no quality"),
        }
        match child(cdc_node, "t") {
            Some(t) => pivot.timestamp = Some(PivotTimestamp::parse(t)?),
            None => debug!(identifier = %pivot.identifier, "pivot object carries no timestamp"),
        }
        pivot.value = parse_scalar(cdc, cdc_node)?;

        Ok(pivot)
    }

    fn parse_quality(&mut self, q: &Value) -> Result<()> {
        let Some(map) = q.as_object() else {
            return Ok(());
        };
        for (name, value) in map {
            match name.as_str() {
                "Validity" => {
                    let text = value_str(value, name)?;
                    self.validity = Validity::parse(text).ok_or_else(|| {
                        ConversionError::InvalidEnumValue {
                            field: "Validity".to_string(),
                            value: text.to_string(),
                        }
                    })?;
                }
                "Source" => {
                    let text = value_str(value, name)?;
                    self.source = match text {
                        "process" => Source::Process,
                        "substituted" => Source::Substituted,
                        _ => {
                            return Err(ConversionError::InvalidEnumValue {
                                field: "Source".to_string(),
                                value: text.to_string(),
                            })
                        }
                    };
                }
                "DetailQuality" => self.parse_detail_quality(value)?,
                "operatorBlocked" => self.operator_blocked = value_i64(value, name)? > 0,
                "test" => self.test = value_i64(value, name)? > 0,
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_detail_quality(&mut self, node: &Value) -> Result<()> {
        let dq = &mut self.detail_quality;
        read_bool(node, "badReference", &mut dq.bad_reference)?;
        read_bool(node, "failure", &mut dq.failure)?;
        read_bool(node, "inconsistent", &mut dq.inconsistent)?;
        // wire name carries the historical spelling
        read_bool(node, "inacurate", &mut dq.inaccurate)?;
        read_bool(node, "oldData", &mut dq.old_data)?;
        read_bool(node, "oscillatory", &mut dq.oscillatory)?;
        read_bool(node, "outOfRange", &mut dq.out_of_range)?;
        read_bool(node, "overflow", &mut dq.overflow)?;
        Ok(())
    }

    /// Render the legacy telemetry object for a status point or measured
    /// value, using the resolved exchange binding for its protocol address.
    pub fn to_hnz_telemetry(&self, def: &ExchangeDefinition) -> Vec<Datapoint> {
        let mut dps = vec![
            Datapoint::new("do_type", json!(def.type_code)),
            Datapoint::new("do_station", json!(def.station)),
            Datapoint::new("do_addr", json!(def.address)),
        ];
        if self.cdc == PivotCdc::Mv {
            dps.push(Datapoint::new("do_an", json!(measure_sub_type(self.value))));
        }
        dps.push(Datapoint::new("do_value", json!(self.value)));
        let (valid, outdated) = match self.validity {
            Validity::Good => (0, 0),
            Validity::Questionable => (0, 1),
            Validity::Invalid | Validity::Reserved => (1, 1),
        };
        dps.push(Datapoint::new("do_valid", json!(valid)));
        dps.push(Datapoint::new("do_outdated", json!(outdated)));

        if self.class == PivotClass::Gtis {
            dps.push(Datapoint::new(
                "do_cg",
                json!(i64::from(self.cause == 20)),
            ));
            // spontaneous state change carries the original time information
            if self.cause == 3 {
                if let Some(ts) = &self.timestamp {
                    dps.push(Datapoint::new("do_ts", json!(ts.epoch_ms())));
                }
                dps.push(Datapoint::new(
                    "do_ts_iv",
                    json!(i64::from(self.timestamp_invalid)),
                ));
                dps.push(Datapoint::new(
                    "do_ts_c",
                    json!(i64::from(self.detail_quality.old_data)),
                ));
                let not_synchronized = self
                    .timestamp
                    .as_ref()
                    .is_some_and(|ts| ts.clock_not_synchronized);
                dps.push(Datapoint::new("do_ts_s", json!(i64::from(not_synchronized))));
            }
        }
        dps
    }

    /// Render the legacy command object for a command or acknowledgment.
    pub fn to_hnz_command(&self, def: &ExchangeDefinition) -> Vec<Datapoint> {
        let value = match self.cdc {
            // on (1) / off (0) become the legacy on (1) / off (2)
            PivotCdc::Spc | PivotCdc::Dpc => {
                if self.value > 0 {
                    1
                } else {
                    2
                }
            }
            _ => self.value,
        };
        vec![
            Datapoint::new("co_type", json!(def.type_code)),
            Datapoint::new("co_addr", json!(def.address)),
            Datapoint::new("co_value", json!(value)),
        ]
    }
}

fn find_cdc(ln: &Value) -> Result<(PivotCdc, &Value)> {
    let map = ln
        .as_object()
        .ok_or_else(|| ConversionError::NotADictionary("logical node".to_string()))?;
    let mut unknown = Vec::new();
    for (name, value) in map {
        match PivotCdc::parse(name) {
            Some(cdc) => return Ok((cdc, value)),
            None => unknown.push(name.clone()),
        }
    }
    Err(ConversionError::UnknownCdc(unknown.join(", ")))
}

fn parse_scalar(cdc: PivotCdc, node: &Value) -> Result<i64> {
    // commands read ctlVal; state reports fall back to stVal
    let ctl = child(node, "ctlVal").or_else(|| child(node, "stVal"));
    match cdc {
        PivotCdc::Sps | PivotCdc::Spc => match ctl {
            Some(v) => Ok(i64::from(value_i64(v, "ctlVal")? > 0)),
            None => Ok(0),
        },
        PivotCdc::Dps | PivotCdc::Dpc => match ctl {
            Some(v) => match value_str(v, "ctlVal")? {
                "on" => Ok(1),
                "off" => Ok(0),
                other => Err(ConversionError::InvalidEnumValue {
                    field: cdc.as_str().to_string(),
                    value: other.to_string(),
                }),
            },
            None => Ok(0),
        },
        PivotCdc::Mv => {
            let mag = child(node, "mag");
            if let Some(i) = mag.and_then(|m| child(m, "i")) {
                return value_i64(i, "mag.i");
            }
            if let Some(f) = mag.and_then(|m| child(m, "f")) {
                let f = f.as_f64().ok_or_else(|| ConversionError::WrongValueType {
                    name: "mag.f".to_string(),
                    expected: "a number",
                })?;
                return Ok(f as i64);
            }
            Err(ConversionError::MissingMagnitude)
        }
        PivotCdc::Inc => match child(node, "ctlVal") {
            Some(v) => value_i64(v, "ctlVal"),
            None => Ok(0),
        },
    }
}

/// Measured-value sub-type derived from the scalar magnitude.
fn measure_sub_type(value: i64) -> &'static str {
    if (-127..=127).contains(&value) {
        "TMA"
    } else if (128..=255).contains(&value) {
        "TM8"
    } else {
        "TM16"
    }
}

// ============================================================================
// Pivot builder (legacy -> pivot direction)
// ============================================================================

/// Assembles an outgoing pivot tree, attribute by attribute.
///
/// The CDC node is named by the configured `pivot_type` string so that an
/// unknown configured class still produces a structurally complete object.
#[derive(Debug)]
pub struct PivotBuilder {
    class: PivotClass,
    cdc_name: String,
    ln: Map<String, Value>,
    cdc: Map<String, Value>,
}

impl PivotBuilder {
    pub fn new(class: PivotClass, cdc_name: &str) -> Self {
        let mut ln = Map::new();
        ln.insert("ComingFrom".to_string(), json!(COMING_FROM));
        Self {
            class,
            cdc_name: cdc_name.to_string(),
            ln,
            cdc: Map::new(),
        }
    }

    pub fn identifier(&mut self, identifier: &str) {
        self.ln.insert("Identifier".to_string(), json!(identifier));
    }

    pub fn cause(&mut self, cause: i64) {
        self.ln.insert("Cause".to_string(), json!({ "stVal": cause }));
    }

    pub fn confirmation(&mut self, negative: bool) {
        self.ln.insert(
            "Confirmation".to_string(),
            json!({ "stVal": i64::from(negative) }),
        );
    }

    pub fn st_val(&mut self, value: bool) {
        self.cdc.insert("stVal".to_string(), json!(i64::from(value)));
    }

    pub fn st_val_str(&mut self, value: &str) {
        self.cdc.insert("stVal".to_string(), json!(value));
    }

    pub fn mag_i(&mut self, value: i64) {
        self.cdc.insert("mag".to_string(), json!({ "i": value }));
    }

    /// Quality block from the legacy validity flags.
    ///
    /// `valid` equal to 1 means invalid; any other value is treated as valid.
    pub fn quality(&mut self, valid: u32, outdated: bool, ts_c: bool, ts_s: bool) {
        let mut q = Map::new();
        let validity = if valid == 1 {
            "invalid"
        } else if outdated || ts_c || ts_s {
            "questionable"
        } else {
            "good"
        };
        q.insert("Validity".to_string(), json!(validity));
        if ts_c || outdated {
            q.insert("DetailQuality".to_string(), json!({ "oldData": 1 }));
        }
        self.cdc.insert("q".to_string(), Value::Object(q));
    }

    pub fn timestamp(&mut self, epoch_ms: i64, not_synchronized: bool) {
        let (seconds, fraction) = from_epoch_ms(epoch_ms);
        let mut t = Map::new();
        t.insert("SecondSinceEpoch".to_string(), json!(seconds));
        t.insert("FractionOfSecond".to_string(), json!(fraction));
        if not_synchronized {
            t.insert("TimeQuality".to_string(), json!({ "clockNotSynchronized": 1 }));
        }
        self.cdc.insert("t".to_string(), Value::Object(t));
    }

    pub fn tm_org(&mut self, substituted: bool) {
        let origin = if substituted { "substituted" } else { "genuine" };
        self.ln
            .insert("TmOrg".to_string(), json!({ "stVal": origin }));
    }

    pub fn tm_validity(&mut self, invalid: bool) {
        let validity = if invalid { "invalid" } else { "good" };
        self.ln
            .insert("TmValidity".to_string(), json!({ "stVal": validity }));
    }

    /// Render the assembled tree as a `PIVOT` datapoint.
    pub fn into_datapoint(mut self) -> Datapoint {
        self.ln
            .insert(self.cdc_name.clone(), Value::Object(self.cdc));
        let mut root = Map::new();
        root.insert(self.class.as_str().to_string(), Value::Object(self.ln));
        Datapoint::new(PIVOT_ROOT, Value::Object(root))
    }
}
