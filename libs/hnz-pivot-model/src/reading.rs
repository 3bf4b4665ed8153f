//! Batch unit types
//!
//! The host pipeline delivers readings in batches; each reading carries an
//! asset name and a list of named attribute trees. The engine transforms the
//! datapoints and hands the (possibly smaller) batch back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One named attribute tree inside a reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    pub name: String,
    pub value: Value,
}

impl Datapoint {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// One unit of ingest: an asset name plus its datapoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub asset_name: String,
    pub datapoints: Vec<Datapoint>,
}

impl Reading {
    pub fn new(asset_name: impl Into<String>, datapoints: Vec<Datapoint>) -> Self {
        Self {
            asset_name: asset_name.into(),
            datapoints,
        }
    }

    /// Datapoint lookup by name, first match wins.
    pub fn datapoint(&self, name: &str) -> Option<&Datapoint> {
        self.datapoints.iter().find(|dp| dp.name == name)
    }
}
