//! End-to-end ingest tests: batches of legacy and pivot units through the
//! filter, asserting the exact shape of the converted datapoints.

mod common;

use serde_json::{json, Value};
use tracing_test::traced_test;

use common::{datapoint_value, filter, ingest_one, reading};
use hnz_pivot_filter::{Datapoint, FilterOptions, HnzPivotFilter, Reading};
use hnz_pivot_model::timestamp::current_timestamp_ms;

fn seconds_range(before_ms: i64, after_ms: i64, t: &Value) {
    let seconds = t["SecondSinceEpoch"].as_i64().unwrap();
    assert!(
        (before_ms / 1000..=after_ms / 1000 + 1).contains(&seconds),
        "SecondSinceEpoch {seconds} outside the test window"
    );
    assert!(t["FractionOfSecond"].as_i64().is_some());
}

// ============================================================================
// HNZ -> pivot
// ============================================================================

#[test]
fn ts_state_change_to_pivot() {
    let out = ingest_one(
        &filter(),
        reading(
            "TS1",
            "data_object",
            json!({
                "do_type": "TS",
                "do_station": 12,
                "do_addr": 511,
                "do_value": 1,
                "do_valid": 0,
                "do_cg": 0,
                "do_outdated": 0,
                "do_ts": 1_685_019_425_432_i64,
                "do_ts_iv": 0,
                "do_ts_c": 0,
                "do_ts_s": 0
            }),
        ),
    );
    assert_eq!(out.asset_name, "TS1");
    assert_eq!(out.datapoints.len(), 1);
    let ln = &datapoint_value(&out, "PIVOT")["GTIS"];
    assert_eq!(ln["ComingFrom"], json!("hnzip"));
    assert_eq!(ln["Identifier"], json!("ID114561"));
    assert_eq!(ln["Cause"]["stVal"], json!(3));
    assert_eq!(ln["TmOrg"]["stVal"], json!("genuine"));
    assert_eq!(ln["TmValidity"]["stVal"], json!("good"));
    let cdc = &ln["SpsTyp"];
    assert_eq!(cdc["stVal"], json!(1));
    assert_eq!(cdc["q"]["Validity"], json!("good"));
    assert!(cdc["q"].get("DetailQuality").is_none());
    // 432 ms into the second is 7247757 fraction units
    assert_eq!(cdc["t"]["SecondSinceEpoch"], json!(1_685_019_425));
    assert_eq!(cdc["t"]["FractionOfSecond"], json!(7_247_757));
}

#[test]
fn ts_interrogation_response_has_cause_20_and_substituted_time() {
    let before = current_timestamp_ms();
    let out = ingest_one(
        &filter(),
        reading(
            "TS1",
            "data_object",
            json!({
                "do_type": "TS",
                "do_station": 12,
                "do_addr": 511,
                "do_value": 0,
                "do_valid": 0,
                "do_cg": 1,
                "do_outdated": 0
            }),
        ),
    );
    let after = current_timestamp_ms();
    let ln = &datapoint_value(&out, "PIVOT")["GTIS"];
    assert_eq!(ln["Cause"]["stVal"], json!(20));
    // no protocol timestamp on an interrogation response: time is added here
    assert_eq!(ln["TmOrg"]["stVal"], json!("substituted"));
    assert!(ln.get("TmValidity").is_none());
    assert_eq!(ln["SpsTyp"]["stVal"], json!(0));
    seconds_range(before, after, &ln["SpsTyp"]["t"]);
}

#[test]
fn ts_double_point_encodes_string_states() {
    let make = |value: i64| {
        ingest_one(
            &filter(),
            reading(
                "TS2",
                "data_object",
                json!({
                    "do_type": "TS",
                    "do_station": 12,
                    "do_addr": 522,
                    "do_value": value,
                    "do_valid": 0,
                    "do_cg": 0,
                    "do_outdated": 0,
                    "do_ts": 1_685_019_425_432_i64,
                    "do_ts_iv": 0,
                    "do_ts_c": 0,
                    "do_ts_s": 0
                }),
            ),
        )
    };
    let on = make(1);
    assert_eq!(datapoint_value(&on, "PIVOT")["GTIS"]["DpsTyp"]["stVal"], json!("on"));
    let off = make(0);
    assert_eq!(datapoint_value(&off, "PIVOT")["GTIS"]["DpsTyp"]["stVal"], json!("off"));
}

#[test]
fn ts_invalid_flag_degrades_quality() {
    let out = ingest_one(
        &filter(),
        reading(
            "TS1",
            "data_object",
            json!({
                "do_type": "TS",
                "do_station": 12,
                "do_addr": 511,
                "do_value": 1,
                "do_valid": 1,
                "do_cg": 1,
                "do_outdated": 0
            }),
        ),
    );
    let q = &datapoint_value(&out, "PIVOT")["GTIS"]["SpsTyp"]["q"];
    assert_eq!(q["Validity"], json!("invalid"));
    assert!(q.get("DetailQuality").is_none());
}

#[test]
fn ts_outdated_flag_marks_old_data() {
    let out = ingest_one(
        &filter(),
        reading(
            "TS1",
            "data_object",
            json!({
                "do_type": "TS",
                "do_station": 12,
                "do_addr": 511,
                "do_value": 1,
                "do_valid": 0,
                "do_cg": 1,
                "do_outdated": 1
            }),
        ),
    );
    let q = &datapoint_value(&out, "PIVOT")["GTIS"]["SpsTyp"]["q"];
    assert_eq!(q["Validity"], json!("questionable"));
    assert_eq!(q["DetailQuality"]["oldData"], json!(1));
}

#[test]
fn ts_unsynchronized_time_marks_clock_quality() {
    let out = ingest_one(
        &filter(),
        reading(
            "TS1",
            "data_object",
            json!({
                "do_type": "TS",
                "do_station": 12,
                "do_addr": 511,
                "do_value": 1,
                "do_valid": 0,
                "do_cg": 0,
                "do_outdated": 0,
                "do_ts": 1_685_019_425_432_i64,
                "do_ts_iv": 1,
                "do_ts_c": 0,
                "do_ts_s": 1
            }),
        ),
    );
    let ln = &datapoint_value(&out, "PIVOT")["GTIS"];
    assert_eq!(ln["TmValidity"]["stVal"], json!("invalid"));
    let cdc = &ln["SpsTyp"];
    assert_eq!(cdc["q"]["Validity"], json!("questionable"));
    assert_eq!(cdc["t"]["TimeQuality"]["clockNotSynchronized"], json!(1));
}

#[test]
#[traced_test]
fn ts_quality_reading_without_value_encodes_no_st_val() {
    let out = ingest_one(
        &filter(),
        reading("TS3", "data_object", json!({"do_type": "TS", "do_addr": 577})),
    );
    let ln = &datapoint_value(&out, "PIVOT")["GTIS"];
    assert_eq!(ln["Identifier"], json!("ID114567"));
    assert_eq!(ln["Cause"]["stVal"], json!(3));
    assert!(ln["SpsTyp"].get("stVal").is_none());
    assert_eq!(ln["SpsTyp"]["q"]["Validity"], json!("good"));
    assert!(logs_contain("missing attribute"));
}

#[test]
#[traced_test]
fn tm_encodes_magnitude_and_warns_out_of_range() {
    let before = current_timestamp_ms();
    let out = ingest_one(
        &filter(),
        reading(
            "TM1",
            "data_object",
            json!({
                "do_type": "TM",
                "do_station": 12,
                "do_addr": 20,
                "do_value": 142,
                "do_valid": 0,
                "do_an": "TMA",
                "do_outdated": 0
            }),
        ),
    );
    let after = current_timestamp_ms();
    let ln = &datapoint_value(&out, "PIVOT")["GTIM"];
    assert_eq!(ln["Identifier"], json!("ID111111"));
    assert_eq!(ln["Cause"]["stVal"], json!(1));
    assert_eq!(ln["TmOrg"]["stVal"], json!("substituted"));
    // out of the TMA range, still encoded unchanged
    assert_eq!(ln["MvTyp"]["mag"]["i"], json!(142));
    seconds_range(before, after, &ln["MvTyp"]["t"]);
    assert!(logs_contain("do_value out of range"));
}

#[test]
fn tm_in_range_values_encode_silently() {
    for (an, value) in [("TMA", -127), ("TM8", 255), ("TM16", -32768)] {
        let out = ingest_one(
            &filter(),
            reading(
                "TM1",
                "data_object",
                json!({
                    "do_type": "TM",
                    "do_station": 12,
                    "do_addr": 20,
                    "do_value": value,
                    "do_valid": 0,
                    "do_an": an,
                    "do_outdated": 0
                }),
            ),
        );
        assert_eq!(
            datapoint_value(&out, "PIVOT")["GTIM"]["MvTyp"]["mag"]["i"],
            json!(value),
            "sub-type {an}"
        );
    }
}

#[test]
#[traced_test]
fn tm_unknown_sub_type_warns_but_encodes() {
    let out = ingest_one(
        &filter(),
        reading(
            "TM1",
            "data_object",
            json!({
                "do_type": "TM",
                "do_station": 12,
                "do_addr": 20,
                "do_value": 999_999,
                "do_valid": 0,
                "do_an": "TMT",
                "do_outdated": 0
            }),
        ),
    );
    assert_eq!(
        datapoint_value(&out, "PIVOT")["GTIM"]["MvTyp"]["mag"]["i"],
        json!(999_999)
    );
    assert!(logs_contain("unknown do_an"));
}

#[test]
fn tc_acknowledgment_to_pivot() {
    let before = current_timestamp_ms();
    let out = ingest_one(
        &filter(),
        reading(
            "TC1",
            "data_object",
            json!({"do_type": "TC", "do_addr": 142, "do_valid": 0}),
        ),
    );
    let after = current_timestamp_ms();
    let ln = &datapoint_value(&out, "PIVOT")["GTIC"];
    assert_eq!(ln["Identifier"], json!("ID222222"));
    assert_eq!(ln["Cause"]["stVal"], json!(7));
    assert_eq!(ln["Confirmation"]["stVal"], json!(0));
    assert_eq!(ln["TmOrg"]["stVal"], json!("substituted"));
    assert_eq!(ln["SpcTyp"]["q"]["Validity"], json!("good"));
    seconds_range(before, after, &ln["SpcTyp"]["t"]);
}

#[test]
fn rejected_acknowledgment_sets_confirmation() {
    let out = ingest_one(
        &filter(),
        reading(
            "TVC1",
            "data_object",
            json!({"do_type": "TVC", "do_addr": 31, "do_valid": 1}),
        ),
    );
    let ln = &datapoint_value(&out, "PIVOT")["GTIC"];
    assert_eq!(ln["Identifier"], json!("ID444444"));
    assert_eq!(ln["Confirmation"]["stVal"], json!(1));
    assert_eq!(ln["IncTyp"]["q"]["Validity"], json!("invalid"));
}

// ============================================================================
// Pivot -> HNZ
// ============================================================================

#[test]
fn pivot_single_command_to_tc() {
    let out = ingest_one(
        &filter(),
        reading(
            "TC1",
            "PIVOT",
            json!({
                "GTIC": {
                    "SpcTyp": {
                        "q": {"Source": "process", "Validity": "good"},
                        "t": {"FractionOfSecond": 9_529_458, "SecondSinceEpoch": 1_669_714_185},
                        "ctlVal": 1
                    },
                    "Identifier": "ID222222",
                    "TmOrg": {"stVal": "substituted"}
                }
            }),
        ),
    );
    assert_eq!(datapoint_value(&out, "co_type"), &json!("TC"));
    assert_eq!(datapoint_value(&out, "co_addr"), &json!(142));
    assert_eq!(datapoint_value(&out, "co_value"), &json!(1));
}

#[test]
fn pivot_double_command_off_maps_to_two() {
    let out = ingest_one(
        &filter(),
        reading(
            "TC2",
            "PIVOT",
            json!({
                "GTIC": {
                    "DpcTyp": {
                        "q": {"Source": "process", "Validity": "good"},
                        "ctlVal": "off"
                    },
                    "Identifier": "ID333333",
                    "TmOrg": {"stVal": "substituted"}
                }
            }),
        ),
    );
    assert_eq!(datapoint_value(&out, "co_type"), &json!("TC"));
    assert_eq!(datapoint_value(&out, "co_addr"), &json!(143));
    assert_eq!(datapoint_value(&out, "co_value"), &json!(2));
}

#[test]
fn pivot_step_command_to_tvc() {
    let out = ingest_one(
        &filter(),
        reading(
            "TVC1",
            "PIVOT",
            json!({
                "GTIC": {
                    "IncTyp": {
                        "q": {"Source": "process", "Validity": "good"},
                        "ctlVal": 42
                    },
                    "Identifier": "ID444444",
                    "TmOrg": {"stVal": "substituted"}
                }
            }),
        ),
    );
    assert_eq!(datapoint_value(&out, "co_type"), &json!("TVC"));
    assert_eq!(datapoint_value(&out, "co_addr"), &json!(31));
    assert_eq!(datapoint_value(&out, "co_value"), &json!(42));
}

#[test]
fn pivot_status_to_ts_telemetry() {
    let out = ingest_one(
        &filter(),
        reading(
            "TS1",
            "PIVOT",
            json!({
                "GTIS": {
                    "Identifier": "ID114561",
                    "Cause": {"stVal": 3},
                    "TmValidity": {"stVal": "good"},
                    "SpsTyp": {
                        "stVal": 1,
                        "q": {"Validity": "good"},
                        "t": {"SecondSinceEpoch": 1_685_019_425, "FractionOfSecond": 7_247_757}
                    }
                }
            }),
        ),
    );
    assert_eq!(datapoint_value(&out, "do_type"), &json!("TS"));
    assert_eq!(datapoint_value(&out, "do_station"), &json!(12));
    assert_eq!(datapoint_value(&out, "do_addr"), &json!(511));
    assert_eq!(datapoint_value(&out, "do_value"), &json!(1));
    assert_eq!(datapoint_value(&out, "do_valid"), &json!(0));
    assert_eq!(datapoint_value(&out, "do_outdated"), &json!(0));
    assert_eq!(datapoint_value(&out, "do_cg"), &json!(0));
    assert_eq!(datapoint_value(&out, "do_ts"), &json!(1_685_019_425_432_i64));
    assert_eq!(datapoint_value(&out, "do_ts_iv"), &json!(0));
    assert_eq!(datapoint_value(&out, "do_ts_c"), &json!(0));
    assert_eq!(datapoint_value(&out, "do_ts_s"), &json!(0));
}

#[test]
fn pivot_questionable_measure_to_tm_telemetry() {
    let out = ingest_one(
        &filter(),
        reading(
            "TM1",
            "PIVOT",
            json!({
                "GTIM": {
                    "Identifier": "ID111111",
                    "Cause": {"stVal": 1},
                    "MvTyp": {
                        "mag": {"f": 3.9},
                        "q": {"Validity": "questionable"}
                    }
                }
            }),
        ),
    );
    assert_eq!(datapoint_value(&out, "do_type"), &json!("TM"));
    assert_eq!(datapoint_value(&out, "do_addr"), &json!(20));
    // mag.i is absent: the float magnitude is truncated
    assert_eq!(datapoint_value(&out, "do_value"), &json!(3));
    assert_eq!(datapoint_value(&out, "do_an"), &json!("TMA"));
    assert_eq!(datapoint_value(&out, "do_valid"), &json!(0));
    assert_eq!(datapoint_value(&out, "do_outdated"), &json!(1));
    assert!(out.datapoint("do_cg").is_none());
}

// ============================================================================
// Dispatch, drops and pass-through
// ============================================================================

#[test]
fn south_event_passes_through_unchanged() {
    let event = json!({"connx_status": "not connected", "gi_status": "idle"});
    let out = ingest_one(&filter(), reading("CONNECTION-1", "south_event", event.clone()));
    assert_eq!(out.asset_name, "CONNECTION-1");
    assert_eq!(datapoint_value(&out, "south_event"), &event);
}

#[test]
#[traced_test]
fn unknown_unit_names_are_dropped() {
    let out = filter().ingest(vec![reading(
        "UNKNOWN",
        "unknown_message",
        json!({"val": 42}),
    )]);
    assert!(out.is_empty());
    assert!(logs_contain("unknown reading type"));
}

#[test]
fn structurally_invalid_units_are_dropped() {
    let f = filter();
    let cases = vec![
        // missing do_type
        reading(
            "TC1",
            "data_object",
            json!({"do_station": 12, "do_addr": 31, "do_value": 0, "do_valid": 0}),
        ),
        // missing do_addr
        reading(
            "TC1",
            "data_object",
            json!({"do_type": "TVC", "do_station": 12, "do_value": 0, "do_valid": 0}),
        ),
        // no binding for this type and address
        reading(
            "TC1",
            "data_object",
            json!({"do_type": "TVC", "do_station": 12, "do_addr": 1, "do_value": 0, "do_valid": 0}),
        ),
        // unsupported logical-node class
        reading(
            "TC1",
            "PIVOT",
            json!({"GTIX": {"SpcTyp": {"ctlVal": 1}, "Identifier": "ID222222"}}),
        ),
        // missing CDC
        reading("TC1", "PIVOT", json!({"GTIC": {"Identifier": "ID222222"}})),
        // CDC not allowed under GTIC
        reading(
            "TC1",
            "PIVOT",
            json!({"GTIC": {"SpsTyp": {"stVal": 1}, "Identifier": "ID222222"}}),
        ),
        // missing identifier
        reading("TC1", "PIVOT", json!({"GTIC": {"SpcTyp": {"ctlVal": 1}}})),
    ];
    for case in cases {
        let label = format!("{case:?}");
        assert!(f.ingest(vec![case]).is_empty(), "unit survived: {label}");
    }
}

#[test]
#[traced_test]
fn unknown_pivot_id_drops_unit_and_lists_known_ids() {
    let out = filter().ingest(vec![reading(
        "TC1",
        "PIVOT",
        json!({"GTIC": {"SpcTyp": {"ctlVal": 1}, "Identifier": "ID000000"}}),
    )]);
    assert!(out.is_empty());
    assert!(logs_contain("unknown pivot ID: ID000000"));
    assert!(logs_contain("ID114561"));
    assert!(logs_contain("ID444444"));
}

#[test]
#[traced_test]
fn label_mismatch_warns_but_converts() {
    let out = ingest_one(
        &filter(),
        reading(
            "TVC42",
            "PIVOT",
            json!({
                "GTIC": {
                    "IncTyp": {"ctlVal": 42},
                    "Identifier": "ID444444"
                }
            }),
        ),
    );
    assert_eq!(datapoint_value(&out, "co_value"), &json!(42));
    assert!(logs_contain("does not match configured label"));
}

#[test]
fn failed_units_do_not_abort_the_batch() {
    let f = filter();
    let out = f.ingest(vec![
        reading("TC1", "data_object", json!({"do_station": 12})),
        reading(
            "TVC1",
            "PIVOT",
            json!({"GTIC": {"IncTyp": {"ctlVal": 7}, "Identifier": "ID444444"}}),
        ),
        Reading::new("EMPTY", vec![]),
    ]);
    // the malformed and the empty readings disappear, the good one survives
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].asset_name, "TVC1");
    assert_eq!(datapoint_value(&out[0], "co_value"), &json!(7));
}

#[test]
fn mixed_reading_keeps_convertible_datapoints() {
    let f = filter();
    let mut readings = f.ingest(vec![Reading::new(
        "TC1",
        vec![
            Datapoint::new("data_object", json!({"do_type": "TC", "do_addr": 142, "do_valid": 0})),
            Datapoint::new("bogus", json!(1)),
        ],
    )]);
    assert_eq!(readings.len(), 1);
    let out = readings.remove(0);
    // the bogus datapoint is gone, the acknowledgment made it through
    assert_eq!(out.datapoints.len(), 1);
    assert_eq!(out.datapoints[0].name, "PIVOT");
}

#[test]
#[traced_test]
fn strict_status_typing_drops_mismatched_ts() {
    // a status address misconfigured with a measure common-data-class
    let config = r#"{
        "exchanged_data": {
            "name": "SAMPLE",
            "version": "1.0",
            "datapoints": [
                {
                    "label": "TS9",
                    "pivot_id": "ID900000",
                    "pivot_type": "MvTyp",
                    "protocols": [
                        {"name": "hnzip", "address": "900", "station": "12", "typeid": "TS"}
                    ]
                }
            ]
        }
    }"#;
    let unit = reading(
        "TS9",
        "data_object",
        json!({
            "do_type": "TS",
            "do_station": 12,
            "do_addr": 900,
            "do_value": 1,
            "do_valid": 0,
            "do_cg": 1,
            "do_outdated": 0
        }),
    );
    // permissive by default: the mismatch only warns
    let lenient = HnzPivotFilter::new(config).ingest(vec![unit.clone()]);
    assert_eq!(lenient.len(), 1);
    assert!(logs_contain("invalid pivot type"));

    let strict = HnzPivotFilter::with_options(
        config,
        FilterOptions {
            strict_status_typing: true,
        },
    );
    assert!(strict.ingest(vec![unit]).is_empty());
}
