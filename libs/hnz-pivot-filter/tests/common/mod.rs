//! Shared fixtures for the filter integration tests.

use serde_json::Value;

use hnz_pivot_filter::{Datapoint, HnzPivotFilter, Reading};

/// Exchange configuration covering every message kind under test.
pub const TEST_CONFIG: &str = r#"{
    "exchanged_data": {
        "name": "SAMPLE",
        "version": "1.0",
        "datapoints": [
            {
                "label": "TS1",
                "pivot_id": "ID114561",
                "pivot_type": "SpsTyp",
                "protocols": [
                    {"name": "hnzip", "address": "511", "station": "12", "typeid": "TS"}
                ]
            },
            {
                "label": "TS2",
                "pivot_id": "ID114562",
                "pivot_type": "DpsTyp",
                "protocols": [
                    {"name": "hnzip", "address": "522", "station": "12", "typeid": "TS"}
                ]
            },
            {
                "label": "TS3",
                "pivot_id": "ID114567",
                "pivot_type": "SpsTyp",
                "protocols": [
                    {"name": "hnzip", "address": "577", "station": "12", "typeid": "TS"}
                ]
            },
            {
                "label": "TM1",
                "pivot_id": "ID111111",
                "pivot_type": "MvTyp",
                "protocols": [
                    {"name": "hnzip", "address": "20", "station": "12", "typeid": "TM"}
                ]
            },
            {
                "label": "TC1",
                "pivot_id": "ID222222",
                "pivot_type": "SpcTyp",
                "protocols": [
                    {"name": "hnzip", "address": "142", "station": "12", "typeid": "TC"}
                ]
            },
            {
                "label": "TC2",
                "pivot_id": "ID333333",
                "pivot_type": "DpcTyp",
                "protocols": [
                    {"name": "hnzip", "address": "143", "station": "12", "typeid": "TC"}
                ]
            },
            {
                "label": "TVC1",
                "pivot_id": "ID444444",
                "pivot_type": "IncTyp",
                "protocols": [
                    {"name": "hnzip", "address": "31", "station": "12", "typeid": "TVC"}
                ]
            }
        ]
    }
}"#;

pub fn filter() -> HnzPivotFilter {
    HnzPivotFilter::new(TEST_CONFIG)
}

/// One reading carrying a single named datapoint.
pub fn reading(asset_name: &str, dp_name: &str, value: Value) -> Reading {
    Reading::new(asset_name, vec![Datapoint::new(dp_name, value)])
}

/// Run one reading through the filter and expect a single reading back.
pub fn ingest_one(filter: &HnzPivotFilter, input: Reading) -> Reading {
    let mut out = filter.ingest(vec![input]);
    assert_eq!(out.len(), 1, "expected exactly one reading in the output");
    out.remove(0)
}

/// Value of a named datapoint in a converted reading.
pub fn datapoint_value<'a>(reading: &'a Reading, name: &str) -> &'a Value {
    &reading
        .datapoint(name)
        .unwrap_or_else(|| panic!("datapoint {name} missing from reading"))
        .value
}
