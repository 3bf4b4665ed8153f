//! Exchange Directory
//!
//! Configured bindings between stable pivot identifiers and their legacy
//! protocol attributes. The import is deliberately forgiving: a broken field
//! clears the completeness flag but keeps every usable entry available for
//! resolution, and a broken document yields an empty directory instead of an
//! error.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::pivot::PivotCdc;

/// Protocol entry name consumed from the `protocols` array.
const PROTOCOL_NAME: &str = "hnzip";

/// One configured binding between a pivot identifier and a legacy address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeDefinition {
    pub label: String,
    pub pivot_id: String,
    /// Configured common-data-class, kept verbatim: it names the CDC node
    /// emitted on encode, and unknown values stay a conversion-time warning.
    pub pivot_type: String,
    /// Legacy message type code (TS/TM/TC/TVC).
    pub type_code: String,
    pub address: u32,
    pub station: u32,
}

impl ExchangeDefinition {
    /// Typed view of the configured common-data-class.
    pub fn cdc(&self) -> Option<PivotCdc> {
        PivotCdc::parse(&self.pivot_type)
    }
}

#[derive(Debug, Deserialize)]
struct ExchangedDataEnvelope {
    exchanged_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct DatapointEntry {
    label: Option<String>,
    pivot_id: Option<String>,
    pivot_type: Option<String>,
    protocols: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ProtocolEntry {
    name: Option<String>,
    address: Option<String>,
    station: Option<String>,
    #[serde(rename = "typeid")]
    type_id: Option<String>,
}

/// In-memory lookup table over the configured exchange definitions.
///
/// Rebuilt wholesale on every (re)configuration; the previous directory is
/// discarded in one swap by the owner.
#[derive(Debug, Default)]
pub struct ExchangeDirectory {
    /// Primary index, keyed by pivot identifier.
    definitions: BTreeMap<String, ExchangeDefinition>,
    /// Secondary index, (typeid, address) to pivot identifier. Last writer
    /// wins on duplicated bindings.
    pivot_id_lookup: HashMap<(String, u32), String>,
    complete: bool,
}

impl ExchangeDirectory {
    /// Build a directory from the host-supplied exchange configuration text.
    pub fn import(config_text: &str) -> Self {
        let mut directory = ExchangeDirectory::default();
        let mut complete = true;

        let envelope: ExchangedDataEnvelope = match serde_json::from_str(config_text) {
            Ok(envelope) => envelope,
            Err(err) => {
                error!(%err, "parsing error in exchanged_data json");
                return directory;
            }
        };
        let Some(info) = envelope.exchanged_data.as_ref().and_then(Value::as_object) else {
            error!("the object exchanged_data is required but not found");
            return directory;
        };

        complete &= check_string(info.get("name"), "name");
        complete &= check_string(info.get("version"), "version");

        let Some(datapoints) = info.get("datapoints").and_then(Value::as_array) else {
            error!("the array datapoints is required but not found");
            return directory;
        };

        for entry in datapoints {
            let entry: DatapointEntry = match serde_json::from_value(entry.clone()) {
                Ok(entry) => entry,
                Err(err) => {
                    error!(%err, "malformed datapoint entry in exchanged_data");
                    complete = false;
                    continue;
                }
            };
            complete &= check_present(&entry.label, "label");
            complete &= check_present(&entry.pivot_id, "pivot_id");
            complete &= check_present(&entry.pivot_type, "pivot_type");
            let label = entry.label.unwrap_or_default();
            let pivot_id = entry.pivot_id.unwrap_or_default();
            let pivot_type = entry.pivot_type.unwrap_or_default();

            let Some(protocols) = entry.protocols else {
                error!(%pivot_id, "the array protocols is required but not found");
                complete = false;
                continue;
            };
            for protocol in protocols {
                let protocol: ProtocolEntry = match serde_json::from_value(protocol) {
                    Ok(protocol) => protocol,
                    Err(err) => {
                        error!(%err, %pivot_id, "malformed protocol entry");
                        complete = false;
                        continue;
                    }
                };
                if protocol.name.as_deref() != Some(PROTOCOL_NAME) {
                    continue;
                }
                let address = parse_u32(protocol.address.as_deref(), "address", &mut complete);
                let station = parse_u32(protocol.station.as_deref(), "station", &mut complete);
                if protocol.type_id.is_none() {
                    error!(%pivot_id, "missing typeid in hnzip protocol entry");
                    complete = false;
                }
                let type_code = protocol.type_id.unwrap_or_default();

                directory
                    .pivot_id_lookup
                    .insert((type_code.clone(), address), pivot_id.clone());
                directory.definitions.insert(
                    pivot_id.clone(),
                    ExchangeDefinition {
                        label: label.clone(),
                        pivot_id: pivot_id.clone(),
                        pivot_type: pivot_type.clone(),
                        type_code,
                        address,
                        station,
                    },
                );
            }
        }

        directory.complete = complete;
        debug!(
            definitions = directory.definitions.len(),
            complete, "exchange directory imported"
        );
        directory
    }

    /// Definition bound to a pivot identifier.
    pub fn definition_for(&self, pivot_id: &str) -> Option<&ExchangeDefinition> {
        self.definitions.get(pivot_id)
    }

    /// Reverse lookup from (typeid, address) to the pivot identifier.
    pub fn find_pivot_id(&self, type_code: &str, address: u32) -> Option<&str> {
        self.pivot_id_lookup
            .get(&(type_code.to_string(), address))
            .map(String::as_str)
    }

    /// Whether every configured field parsed cleanly.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Known pivot identifiers, sorted, for diagnostics.
    pub fn pivot_ids(&self) -> Vec<&str> {
        self.definitions.keys().map(String::as_str).collect()
    }
}

fn check_present(value: &Option<String>, field: &str) -> bool {
    if value.is_none() {
        error!(field, "field does not exist or is not a string");
        return false;
    }
    true
}

fn check_string(value: Option<&Value>, field: &str) -> bool {
    if value.map(Value::is_string) != Some(true) {
        error!(field, "field does not exist or is not a string");
        return false;
    }
    true
}

fn parse_u32(value: Option<&str>, field: &str, complete: &mut bool) -> u32 {
    let Some(text) = value else {
        error!(field, "field does not exist or is not a string");
        *complete = false;
        return 0;
    };
    match text.parse::<u32>() {
        Ok(parsed) => parsed,
        Err(_) => {
            error!(field, value = text, "value is not an unsigned 32-bit integer");
            *complete = false;
            0
        }
    }
}
